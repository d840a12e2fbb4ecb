#![forbid(unsafe_code)]

pub mod document;
pub mod json_file;
pub mod repository;

pub use document::{DecodeError, StoreDocument};
pub use json_file::JsonFileStore;
pub use repository::{InMemoryStore, SessionStore, Storage, StorageError};
