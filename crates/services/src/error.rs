//! Shared error types for the services crate.

use thiserror::Error;

use storage::StorageError;
use tally_core::LedgerError;

/// Errors emitted by `TallyService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TallyError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl TallyError {
    /// True for bad client input, as opposed to a storage failure.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, TallyError::Ledger(_))
    }
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}
