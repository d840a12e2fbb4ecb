use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::document::StoreDocument;
use crate::repository::{SessionStore, Storage, StorageError};

/// Session store backed by a single JSON file.
///
/// Every save rewrites the whole document to a sibling temp file, syncs it,
/// then renames it over the target.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "sessions.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    /// Create the file with an empty document if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the file cannot be created.
    pub async fn ensure_exists(&self) -> Result<(), StorageError> {
        match tokio::fs::try_exists(&self.path).await {
            Ok(true) => Ok(()),
            Ok(false) => {
                tracing::info!(path = %self.path.display(), "creating empty session document");
                self.save_document(&StoreDocument::default()).await
            }
            Err(source) => Err(StorageError::Io {
                operation: "stat",
                path: self.path.clone(),
                source,
            }),
        }
    }
}

#[async_trait]
impl SessionStore for JsonFileStore {
    async fn load_document(&self) -> StoreDocument {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return StoreDocument::default();
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "session document unreadable, using empty");
                return StoreDocument::default();
            }
        };

        match StoreDocument::decode(&bytes) {
            Ok(document) => document,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "session document corrupt, using empty");
                StoreDocument::default()
            }
        }
    }

    async fn save_document(&self, document: &StoreDocument) -> Result<(), StorageError> {
        let bytes = document
            .encode()
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| StorageError::Io {
                    operation: "create directory",
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        let temp_path = self.temp_path();
        let io_err = |operation: &'static str| {
            let path = temp_path.clone();
            move |source: std::io::Error| StorageError::Io {
                operation,
                path,
                source,
            }
        };

        let mut file = tokio::fs::File::create(&temp_path)
            .await
            .map_err(io_err("create"))?;
        let written = match file.write_all(&bytes).await {
            Ok(()) => file.sync_all().await.map_err(io_err("sync")),
            Err(source) => Err(io_err("write")(source)),
        };
        drop(file);
        if let Err(e) = written {
            discard_temp(&temp_path).await;
            return Err(e);
        }

        if let Err(source) = tokio::fs::rename(&temp_path, &self.path).await {
            discard_temp(&temp_path).await;
            return Err(StorageError::AtomicReplace {
                target: self.path.clone(),
                source,
            });
        }

        tracing::debug!(
            path = %self.path.display(),
            sessions = document.sessions().count(),
            history = document.history().count(),
            unreadable = document.unreadable_count(),
            "saved session document"
        );
        Ok(())
    }
}

/// Best-effort removal of a half-written temp file.
async fn discard_temp(temp_path: &Path) {
    if let Err(e) = tokio::fs::remove_file(temp_path).await {
        tracing::warn!(path = %temp_path.display(), error = %e, "could not remove temp file");
    }
}

impl Storage {
    /// Build a `Storage` backed by a JSON document, creating it if missing.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the file cannot be created.
    pub async fn json_file(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let store = JsonFileStore::new(path);
        store.ensure_exists().await?;
        Ok(Self {
            sessions: Arc::new(store),
        })
    }
}
