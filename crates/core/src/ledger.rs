//! Live tally with single-step undo.
//!
//! The event log is the source of truth; the two counters are a cache that
//! moves in lockstep with it.

use chrono::NaiveDateTime;
use serde::Deserialize;

use crate::error::LedgerError;
use crate::model::{AnswerEvent, AnswerKind, QuestionMeta, Session};

/// Number of events returned by [`AnswerLedger::status`].
pub const RECENT_WINDOW: usize = 10;

//
// ─── REQUESTS / RESULTS ───────────────────────────────────────────────────────
//

/// Unvalidated increment request as submitted by a client.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IncrementRequest {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(rename = "question_info", default)]
    pub question: Option<QuestionMeta>,
}

impl IncrementRequest {
    #[must_use]
    pub fn new(kind: impl Into<String>, question: QuestionMeta) -> Self {
        Self {
            kind: Some(kind.into()),
            question: Some(question),
        }
    }

    fn validate(self) -> Result<(AnswerKind, QuestionMeta), LedgerError> {
        let Some(raw_kind) = self.kind else {
            return Err(LedgerError::InvalidKind(None));
        };
        let question = match self.question {
            Some(q) if !q.is_empty() => q,
            _ => return Err(LedgerError::MissingMetadata),
        };
        let kind = AnswerKind::from_wire(&raw_kind)?;
        Ok((kind, question))
    }
}

/// Counter view of the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    pub correct: u32,
    pub incorrect: u32,
    pub total: u32,
    /// Index of the newest event, if any.
    pub last_event_index: Option<usize>,
}

/// Read-only status: counters plus the most recent events, oldest first.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerStatus {
    pub snapshot: Snapshot,
    pub recent: Vec<AnswerEvent>,
}

/// Result of an undo. An empty ledger is a reportable no-op, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum UndoOutcome {
    NothingToUndo { snapshot: Snapshot },
    Undone { event: AnswerEvent, snapshot: Snapshot },
}

impl UndoOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, UndoOutcome::Undone { .. })
    }

    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        match self {
            UndoOutcome::NothingToUndo { snapshot } | UndoOutcome::Undone { snapshot, .. } => {
                *snapshot
            }
        }
    }
}

/// A session built from the ledger plus the events that produced it.
///
/// Produced by [`AnswerLedger::stage_commit`]; the caller persists it and only
/// then calls [`AnswerLedger::reset`].
#[derive(Debug, Clone, PartialEq)]
pub struct PendingCommit {
    pub session: Session,
    pub events: Vec<AnswerEvent>,
}

//
// ─── LEDGER ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Default)]
pub struct AnswerLedger {
    correct: u32,
    incorrect: u32,
    events: Vec<AnswerEvent>,
}

impl AnswerLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an answer stamped at `at`.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::InvalidKind` for a missing or unknown kind and
    /// `LedgerError::MissingMetadata` for absent or empty question metadata.
    /// The ledger is unchanged on error.
    pub fn increment(
        &mut self,
        request: IncrementRequest,
        at: NaiveDateTime,
    ) -> Result<Snapshot, LedgerError> {
        let (kind, mut question) = request.validate()?;
        question.stamp(at);

        match kind {
            AnswerKind::Correct => self.correct = self.correct.saturating_add(1),
            AnswerKind::Incorrect => self.incorrect = self.incorrect.saturating_add(1),
        }
        self.events.push(AnswerEvent::new(kind, at, question));
        Ok(self.snapshot())
    }

    /// Remove the most recent event.
    pub fn undo(&mut self) -> UndoOutcome {
        let Some(event) = self.events.pop() else {
            return UndoOutcome::NothingToUndo {
                snapshot: self.snapshot(),
            };
        };

        match event.kind() {
            AnswerKind::Correct if self.correct > 0 => self.correct -= 1,
            AnswerKind::Incorrect if self.incorrect > 0 => self.incorrect -= 1,
            _ => {}
        }

        UndoOutcome::Undone {
            event,
            snapshot: self.snapshot(),
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            correct: self.correct,
            incorrect: self.incorrect,
            total: self.correct.saturating_add(self.incorrect),
            last_event_index: self.events.len().checked_sub(1),
        }
    }

    #[must_use]
    pub fn status(&self) -> LedgerStatus {
        LedgerStatus {
            snapshot: self.snapshot(),
            recent: self.recent(RECENT_WINDOW).to_vec(),
        }
    }

    /// The last `n` events in chronological order.
    #[must_use]
    pub fn recent(&self, n: usize) -> &[AnswerEvent] {
        let start = self.events.len().saturating_sub(n);
        &self.events[start..]
    }

    #[must_use]
    pub fn events(&self) -> &[AnswerEvent] {
        &self.events
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn reset(&mut self) {
        self.correct = 0;
        self.incorrect = 0;
        self.events.clear();
    }

    /// Build a session from the current tallies without changing the ledger.
    #[must_use]
    pub fn stage_commit(
        &self,
        subject: impl Into<String>,
        notebook: impl Into<String>,
        at: NaiveDateTime,
    ) -> PendingCommit {
        self.stage_with_totals(subject, notebook, self.correct, self.incorrect, at)
    }

    /// Build a session from externally submitted totals, carrying the
    /// ledger's events along so they still reach the persisted history.
    #[must_use]
    pub fn stage_with_totals(
        &self,
        subject: impl Into<String>,
        notebook: impl Into<String>,
        correct: u32,
        incorrect: u32,
        at: NaiveDateTime,
    ) -> PendingCommit {
        PendingCommit {
            session: Session::new(at, subject, notebook, correct, incorrect),
            events: self.events.clone(),
        }
    }
}
