use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::model::stat::accuracy_rate;
use crate::time::truncate_to_minute;

/// A committed, named batch of tallies for one subject/notebook.
///
/// `total` and `accuracy_rate` are never stored on the value; they are
/// derived from the two counters every time they are read or serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "SessionRecord", into = "SessionRecord")]
pub struct Session {
    recorded_at: NaiveDateTime,
    subject: String,
    notebook: String,
    correct: u32,
    incorrect: u32,
}

impl Session {
    /// Build a session. The timestamp is kept at minute precision, which is
    /// all the persisted format carries.
    #[must_use]
    pub fn new(
        recorded_at: NaiveDateTime,
        subject: impl Into<String>,
        notebook: impl Into<String>,
        correct: u32,
        incorrect: u32,
    ) -> Self {
        Self {
            recorded_at: truncate_to_minute(recorded_at),
            subject: subject.into(),
            notebook: notebook.into(),
            correct,
            incorrect,
        }
    }

    #[must_use]
    pub fn recorded_at(&self) -> NaiveDateTime {
        self.recorded_at
    }

    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    #[must_use]
    pub fn notebook(&self) -> &str {
        &self.notebook
    }

    #[must_use]
    pub fn correct(&self) -> u32 {
        self.correct
    }

    #[must_use]
    pub fn incorrect(&self) -> u32 {
        self.incorrect
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.correct.saturating_add(self.incorrect)
    }

    #[must_use]
    pub fn accuracy_rate(&self) -> f64 {
        accuracy_rate(self.correct, self.total())
    }
}

/// Persisted shape. Older documents may omit the derived fields or the
/// counters; both are tolerated and the derived values are recomputed.
#[derive(Serialize, Deserialize)]
struct SessionRecord {
    #[serde(with = "crate::time::session_format")]
    date: NaiveDateTime,
    #[serde(default)]
    materia: String,
    #[serde(default)]
    caderno: String,
    #[serde(default)]
    acertos: u32,
    #[serde(default)]
    erros: u32,
    #[serde(default)]
    total: u32,
    #[serde(default)]
    taxa_acerto: f64,
}

impl From<SessionRecord> for Session {
    fn from(record: SessionRecord) -> Self {
        Session::new(
            record.date,
            record.materia,
            record.caderno,
            record.acertos,
            record.erros,
        )
    }
}

impl From<Session> for SessionRecord {
    fn from(session: Session) -> Self {
        let total = session.total();
        let taxa_acerto = session.accuracy_rate();
        SessionRecord {
            date: session.recorded_at,
            materia: session.subject,
            caderno: session.notebook,
            acertos: session.correct,
            erros: session.incorrect,
            total,
            taxa_acerto,
        }
    }
}
