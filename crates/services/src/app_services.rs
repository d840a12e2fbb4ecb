use std::path::PathBuf;
use std::sync::Arc;

use chrono::FixedOffset;
use storage::Storage;

use crate::Clock;
use crate::error::AppServicesError;
use crate::tally_service::TallyService;

/// Assembles app-facing services over a storage backend.
#[derive(Clone)]
pub struct AppServices {
    tally: Arc<TallyService>,
}

impl AppServices {
    /// Build services backed by a JSON document at `path`, creating it if missing.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the document cannot be created.
    pub async fn new_json_file(
        path: impl Into<PathBuf>,
        clock: Clock,
        offset: FixedOffset,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::json_file(path).await?;
        Ok(Self::from_storage(&storage, clock, offset))
    }

    #[must_use]
    pub fn from_storage(storage: &Storage, clock: Clock, offset: FixedOffset) -> Self {
        let tally = TallyService::new(clock, Arc::clone(&storage.sessions)).with_offset(offset);
        Self {
            tally: Arc::new(tally),
        }
    }

    #[must_use]
    pub fn tally(&self) -> Arc<TallyService> {
        Arc::clone(&self.tally)
    }
}
