use thiserror::Error;

/// Validation failures raised by the answer ledger before any state changes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LedgerError {
    #[error("invalid answer kind: {0:?}")]
    InvalidKind(Option<String>),

    #[error("question metadata was not provided")]
    MissingMetadata,
}
