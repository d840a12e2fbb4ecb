#![forbid(unsafe_code)]

pub mod error;
pub mod ledger;
pub mod model;
pub mod stats;
pub mod time;

pub use error::LedgerError;
pub use ledger::{AnswerLedger, IncrementRequest, LedgerStatus, PendingCommit, Snapshot, UndoOutcome};
pub use time::Clock;
