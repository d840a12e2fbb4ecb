#![forbid(unsafe_code)]

pub mod app_services;
pub mod dashboard;
pub mod error;
pub mod tally_service;

pub use tally_core::Clock;

pub use app_services::AppServices;
pub use dashboard::{Dashboard, SessionList, SessionListItem};
pub use error::{AppServicesError, TallyError};
pub use tally_service::{NewSession, TallyService};
