use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use tally_core::model::{AnswerEvent, Session};
use thiserror::Error;

use crate::document::StoreDocument;

/// Errors surfaced by storage adapters.
///
/// Reads never fail (a corrupt document reads as empty); only writes do.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("failed to {operation} {path}: {source}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("atomic replace of {target} failed: {source}")]
    AtomicReplace {
        target: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Durable ordered collection of committed sessions plus the answer history.
///
/// Every mutation is a load-modify-save of the whole document. Implementations
/// do not lock on their own: callers must serialize mutating calls so two
/// writers never interleave a read-modify-write.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Read the whole document. Missing, unreadable or malformed content
    /// reads as an empty document.
    async fn load_document(&self) -> StoreDocument;

    /// Replace the whole document in one step.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the document cannot be written.
    async fn save_document(&self, document: &StoreDocument) -> Result<(), StorageError>;

    /// All committed sessions in commit order.
    async fn load(&self) -> Vec<Session> {
        self.load_document().await.into_sessions()
    }

    /// The persisted answer history in chronological order.
    async fn history(&self) -> Vec<AnswerEvent> {
        self.load_document().await.into_history()
    }

    /// Append a session and extend the history with `events` in one write.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the document cannot be written.
    async fn append(&self, session: Session, events: Vec<AnswerEvent>) -> Result<(), StorageError> {
        let mut document = self.load_document().await;
        document.push_session(session);
        document.extend_history(events);
        self.save_document(&document).await
    }

    /// Remove the session at `index`, counted over the sessions [`load`]
    /// returns. Out of range is a no-op that does not touch the store.
    ///
    /// [`load`]: SessionStore::load
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the document cannot be written.
    async fn delete_at(&self, index: usize) -> Result<Option<Session>, StorageError> {
        let mut document = self.load_document().await;
        let Some(removed) = document.remove_session(index) else {
            return Ok(None);
        };
        self.save_document(&document).await?;
        Ok(Some(removed))
    }
}

/// Simple in-memory store for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    document: Arc<Mutex<StoreDocument>>,
    writes: Arc<Mutex<usize>>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_document(document: StoreDocument) -> Self {
        Self {
            document: Arc::new(Mutex::new(document)),
            writes: Arc::new(Mutex::new(0)),
        }
    }

    /// Number of successful `save_document` calls so far.
    #[must_use]
    pub fn write_count(&self) -> usize {
        *self.writes.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl SessionStore for InMemoryStore {
    async fn load_document(&self) -> StoreDocument {
        self.document
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn save_document(&self, document: &StoreDocument) -> Result<(), StorageError> {
        *self
            .document
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = document.clone();
        *self.writes.lock().unwrap_or_else(PoisonError::into_inner) += 1;
        Ok(())
    }
}

/// Store handle behind a trait object for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub sessions: Arc<dyn SessionStore>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            sessions: Arc::new(InMemoryStore::new()),
        }
    }
}
