use std::sync::Arc;

use chrono::{Datelike, FixedOffset, NaiveDateTime};
use serde::Deserialize;
use tokio::sync::Mutex;

use storage::SessionStore;
use tally_core::ledger::{AnswerLedger, IncrementRequest, LedgerStatus, PendingCommit, Snapshot, UndoOutcome};
use tally_core::model::Session;
use tally_core::stats::{self, DetailedStats};
use tally_core::time::default_offset;

use crate::Clock;
use crate::dashboard::{Dashboard, SessionList};
use crate::error::TallyError;

/// Totals submitted directly (the session form), bypassing the ledger counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NewSession {
    #[serde(rename = "materia", default)]
    pub subject: String,
    #[serde(rename = "caderno", default)]
    pub notebook: String,
    #[serde(rename = "acertos", default)]
    pub correct: u32,
    #[serde(rename = "erros", default)]
    pub incorrect: u32,
}

/// Single entry point for the live ledger and the session store.
///
/// Every mutating call takes the same lock and holds it until the ledger and
/// the store are both consistent again, so a commit can never interleave with
/// an increment and two store rewrites can never overlap. Read-only store
/// queries skip the lock; the store replaces its document atomically.
pub struct TallyService {
    clock: Clock,
    offset: FixedOffset,
    ledger: Mutex<AnswerLedger>,
    store: Arc<dyn SessionStore>,
}

impl TallyService {
    #[must_use]
    pub fn new(clock: Clock, store: Arc<dyn SessionStore>) -> Self {
        Self {
            clock,
            offset: default_offset(),
            ledger: Mutex::new(AnswerLedger::new()),
            store,
        }
    }

    #[must_use]
    pub fn with_offset(mut self, offset: FixedOffset) -> Self {
        self.offset = offset;
        self
    }

    #[must_use]
    pub fn in_memory(clock: Clock) -> Self {
        Self::new(clock, storage::Storage::in_memory().sessions)
    }

    /// Local wall-clock time used for every timestamp this service writes.
    #[must_use]
    pub fn now(&self) -> NaiveDateTime {
        self.clock.local_now(self.offset)
    }

    //
    // ─── LEDGER ───────────────────────────────────────────────────────────────
    //

    /// Record one answer.
    ///
    /// # Errors
    ///
    /// Returns `TallyError::Ledger` for an invalid kind or missing metadata.
    pub async fn increment(&self, request: IncrementRequest) -> Result<Snapshot, TallyError> {
        let at = self.now();
        let mut ledger = self.ledger.lock().await;
        let snapshot = ledger.increment(request, at)?;
        tracing::debug!(
            correct = snapshot.correct,
            incorrect = snapshot.incorrect,
            "answer recorded"
        );
        Ok(snapshot)
    }

    pub async fn undo(&self) -> UndoOutcome {
        let outcome = self.ledger.lock().await.undo();
        if let UndoOutcome::Undone { event, .. } = &outcome {
            tracing::debug!(kind = event.kind().as_wire(), "answer undone");
        }
        outcome
    }

    pub async fn status(&self) -> LedgerStatus {
        self.ledger.lock().await.status()
    }

    pub async fn reset(&self) -> Snapshot {
        let mut ledger = self.ledger.lock().await;
        ledger.reset();
        tracing::info!("ledger reset");
        ledger.snapshot()
    }

    //
    // ─── SESSIONS ─────────────────────────────────────────────────────────────
    //

    /// Turn the ledger's tallies into a session, persist it, and clear the ledger.
    ///
    /// # Errors
    ///
    /// Returns `TallyError::Storage` if the session cannot be written; the
    /// ledger is left as it was.
    pub async fn commit(
        &self,
        subject: impl Into<String>,
        notebook: impl Into<String>,
    ) -> Result<Session, TallyError> {
        let at = self.now();
        let mut ledger = self.ledger.lock().await;
        let pending = ledger.stage_commit(subject, notebook, at);
        self.persist(&mut ledger, pending).await
    }

    /// Persist a session from submitted totals and clear the ledger.
    ///
    /// # Errors
    ///
    /// Returns `TallyError::Storage` if the session cannot be written; the
    /// ledger is left as it was.
    pub async fn create_session(&self, new: NewSession) -> Result<Session, TallyError> {
        let at = self.now();
        let mut ledger = self.ledger.lock().await;
        let pending =
            ledger.stage_with_totals(new.subject, new.notebook, new.correct, new.incorrect, at);
        self.persist(&mut ledger, pending).await
    }

    async fn persist(
        &self,
        ledger: &mut AnswerLedger,
        pending: PendingCommit,
    ) -> Result<Session, TallyError> {
        let PendingCommit { session, events } = pending;
        let event_count = events.len();
        self.store.append(session.clone(), events).await?;
        ledger.reset();

        tracing::info!(
            subject = session.subject(),
            correct = session.correct(),
            incorrect = session.incorrect(),
            events = event_count,
            "session committed"
        );
        Ok(session)
    }

    /// Delete the session at `index`. Returns `None` when out of range.
    ///
    /// # Errors
    ///
    /// Returns `TallyError::Storage` if the document cannot be rewritten.
    pub async fn delete_session(&self, index: usize) -> Result<Option<Session>, TallyError> {
        let _guard = self.ledger.lock().await;
        let removed = self.store.delete_at(index).await?;
        match &removed {
            Some(session) => tracing::info!(index, subject = session.subject(), "session deleted"),
            None => tracing::debug!(index, "delete ignored, index out of range"),
        }
        Ok(removed)
    }

    //
    // ─── VIEWS ────────────────────────────────────────────────────────────────
    //

    pub async fn sessions(&self, subject_filter: Option<&str>) -> SessionList {
        SessionList::build(self.store.load().await, subject_filter)
    }

    pub async fn dashboard(&self) -> Dashboard {
        let sessions = self.store.load().await;
        let recent = self.status().await.recent;
        Dashboard::build(sessions, recent, self.now().year())
    }

    /// Per-dimension statistics over the whole persisted history.
    pub async fn detailed_stats(&self) -> DetailedStats {
        stats::detailed(&self.store.history().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use storage::{InMemoryStore, StorageError, StoreDocument};
    use tally_core::model::QuestionMeta;
    use tally_core::time::fixed_clock;

    fn meta(subject: &str, topic: &str) -> QuestionMeta {
        QuestionMeta::default().with_subject(subject).with_topic(topic)
    }

    fn service() -> (TallyService, InMemoryStore) {
        let store = InMemoryStore::new();
        let svc = TallyService::new(fixed_clock(), Arc::new(store.clone()));
        (svc, store)
    }

    #[tokio::test]
    async fn commit_persists_and_clears_ledger() {
        let (svc, store) = service();
        for _ in 0..7 {
            svc.increment(IncrementRequest::new("acerto", meta("Math", "Algebra")))
                .await
                .unwrap();
        }
        for _ in 0..3 {
            svc.increment(IncrementRequest::new("erro", meta("Math", "Geometry")))
                .await
                .unwrap();
        }

        let session = svc.commit("Math", "Caderno 1").await.unwrap();

        assert_eq!(session.total(), 10);
        assert!((session.accuracy_rate() - 70.0).abs() < 1e-9);
        assert_eq!(svc.status().await.snapshot.total, 0);
        assert!(svc.status().await.recent.is_empty());
        assert_eq!(store.load().await.last(), Some(&session));
        assert_eq!(store.history().await.len(), 10);
    }

    #[tokio::test]
    async fn history_accumulates_across_commits_and_feeds_stats() {
        let (svc, _store) = service();
        svc.increment(IncrementRequest::new("acerto", meta("Math", "Algebra")))
            .await
            .unwrap();
        svc.commit("Math", "a").await.unwrap();
        svc.increment(IncrementRequest::new("erro", meta("Math", "Geometry")))
            .await
            .unwrap();
        svc.commit("Math", "b").await.unwrap();

        let stats = svc.detailed_stats().await;

        assert_eq!(stats.total_events, 2);
        assert_eq!(stats.by_subject["Math"].total(), 2);
        assert!((stats.by_subject["Math"].accuracy_rate() - 50.0).abs() < 1e-9);
        assert_eq!(stats.by_topic.len(), 2);
    }

    #[tokio::test]
    async fn reset_discards_ledger_events_only() {
        let (svc, store) = service();
        svc.increment(IncrementRequest::new("acerto", meta("Math", "Algebra")))
            .await
            .unwrap();
        svc.commit("Math", "a").await.unwrap();
        svc.increment(IncrementRequest::new("erro", meta("Law", "Civil")))
            .await
            .unwrap();

        let snapshot = svc.reset().await;

        assert_eq!(snapshot.total, 0);
        assert_eq!(store.history().await.len(), 1);
    }

    #[tokio::test]
    async fn create_session_uses_submitted_totals() {
        let (svc, store) = service();
        svc.increment(IncrementRequest::new("acerto", meta("Math", "Algebra")))
            .await
            .unwrap();

        let session = svc
            .create_session(NewSession {
                subject: "Law".into(),
                notebook: "form".into(),
                correct: 5,
                incorrect: 5,
            })
            .await
            .unwrap();

        assert_eq!(session.total(), 10);
        assert_eq!(svc.status().await.snapshot.total, 0);
        assert_eq!(store.history().await.len(), 1);
    }

    #[tokio::test]
    async fn validation_error_is_reported() {
        let (svc, _store) = service();
        let err = svc
            .increment(IncrementRequest::new("acerto", QuestionMeta::default()))
            .await
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn delete_out_of_range_is_noop() {
        let (svc, store) = service();
        svc.commit("Math", "a").await.unwrap();
        let writes = store.write_count();

        assert_eq!(svc.delete_session(1).await.unwrap(), None);
        assert_eq!(store.write_count(), writes);
        assert_eq!(svc.sessions(None).await.sessions.len(), 1);
    }

    struct FailingStore;

    #[async_trait]
    impl SessionStore for FailingStore {
        async fn load_document(&self) -> StoreDocument {
            StoreDocument::default()
        }

        async fn save_document(&self, _document: &StoreDocument) -> Result<(), StorageError> {
            Err(StorageError::Serialization("disk full".into()))
        }
    }

    #[tokio::test]
    async fn failed_commit_keeps_ledger() {
        let svc = TallyService::new(fixed_clock(), Arc::new(FailingStore));
        svc.increment(IncrementRequest::new("acerto", meta("Math", "Algebra")))
            .await
            .unwrap();

        let err = svc.commit("Math", "a").await.unwrap_err();

        assert!(!err.is_validation());
        assert_eq!(svc.status().await.snapshot.correct, 1);
    }

    #[tokio::test]
    async fn concurrent_increments_are_not_lost() {
        let svc = Arc::new(TallyService::in_memory(fixed_clock()));
        let mut handles = Vec::new();
        for i in 0..32 {
            let svc = Arc::clone(&svc);
            handles.push(tokio::spawn(async move {
                let kind = if i % 2 == 0 { "acerto" } else { "erro" };
                svc.increment(IncrementRequest::new(kind, meta("Math", "Algebra")))
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let snapshot = svc.status().await.snapshot;
        assert_eq!((snapshot.correct, snapshot.incorrect), (16, 16));
    }

    /// In-memory store whose saves give other tasks a chance to run mid-write.
    #[derive(Clone, Default)]
    struct YieldingStore {
        inner: InMemoryStore,
    }

    #[async_trait]
    impl SessionStore for YieldingStore {
        async fn load_document(&self) -> StoreDocument {
            self.inner.load_document().await
        }

        async fn save_document(&self, document: &StoreDocument) -> Result<(), StorageError> {
            for _ in 0..8 {
                tokio::task::yield_now().await;
            }
            self.inner.save_document(document).await
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn commit_never_interleaves_with_increments() {
        const SENT: u32 = 64;
        let store = YieldingStore::default();
        let svc = Arc::new(TallyService::new(fixed_clock(), Arc::new(store.clone())));

        let mut handles = Vec::new();
        for i in 0..SENT {
            let svc_for_increment = Arc::clone(&svc);
            handles.push(tokio::spawn(async move {
                let kind = if i % 3 == 0 { "erro" } else { "acerto" };
                svc_for_increment
                    .increment(IncrementRequest::new(kind, meta("Math", "Algebra")))
                    .await
                    .unwrap();
            }));
            if i % 16 == 8 {
                let svc_for_commit = Arc::clone(&svc);
                handles.push(tokio::spawn(async move {
                    svc_for_commit.commit("Math", "race").await.unwrap();
                }));
            }
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let sessions = store.inner.load().await;
        let persisted: u32 = sessions.iter().map(Session::total).sum();
        let live = svc.status().await.snapshot.total;
        assert_eq!(sessions.len(), 4);
        assert_eq!(persisted + live, SENT);
        assert_eq!(store.inner.history().await.len(), persisted as usize);
    }
}
