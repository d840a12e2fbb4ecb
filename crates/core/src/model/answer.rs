use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::LedgerError;

//
// ─── ANSWER KIND ──────────────────────────────────────────────────────────────
//

/// Outcome of a single practice question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnswerKind {
    #[serde(rename = "acerto")]
    Correct,
    #[serde(rename = "erro")]
    Incorrect,
}

impl AnswerKind {
    /// Parses the wire name (`"acerto"` or `"erro"`).
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::InvalidKind` for any other value.
    pub fn from_wire(raw: &str) -> Result<Self, LedgerError> {
        match raw {
            "acerto" => Ok(Self::Correct),
            "erro" => Ok(Self::Incorrect),
            other => Err(LedgerError::InvalidKind(Some(other.to_owned()))),
        }
    }

    #[must_use]
    pub fn as_wire(self) -> &'static str {
        match self {
            AnswerKind::Correct => "acerto",
            AnswerKind::Incorrect => "erro",
        }
    }
}

//
// ─── QUESTION METADATA ────────────────────────────────────────────────────────
//

/// Metadata describing the question that was answered.
///
/// The four grouping dimensions are typed when the client sends a string,
/// number or boolean for them. Anything else the client sends (question id,
/// page url, a structured dimension value, ...) is kept verbatim in `extra`,
/// so no key of the submitted object is ever dropped.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "Map<String, Value>")]
pub struct QuestionMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,

    #[serde(rename = "examBoard", skip_serializing_if = "Option::is_none")]
    pub exam_board: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,

    /// Set by the ledger when the answer is recorded.
    #[serde(
        rename = "timestamp",
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_stamp"
    )]
    pub stamped_at: Option<NaiveDateTime>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

const SUBJECT: &str = "subject";
const TOPIC: &str = "topic";
const EXAM_BOARD: &str = "examBoard";
const YEAR: &str = "year";
const TIMESTAMP: &str = "timestamp";

impl From<Map<String, Value>> for QuestionMeta {
    fn from(mut raw: Map<String, Value>) -> Self {
        let subject = take_scalar(&mut raw, SUBJECT);
        let topic = take_scalar(&mut raw, TOPIC);
        let exam_board = take_scalar(&mut raw, EXAM_BOARD);
        let year = take_scalar(&mut raw, YEAR);
        let stamped_at = take_stamp(&mut raw);
        Self {
            subject,
            topic,
            exam_board,
            year,
            stamped_at,
            extra: raw,
        }
    }
}

impl QuestionMeta {
    /// True when the client sent no fields at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subject.is_none()
            && self.topic.is_none()
            && self.exam_board.is_none()
            && self.year.is_none()
            && self.stamped_at.is_none()
            && self.extra.is_empty()
    }

    /// Record when the answer was given, replacing any client-sent `timestamp`.
    pub fn stamp(&mut self, at: NaiveDateTime) {
        self.extra.remove(TIMESTAMP);
        self.stamped_at = Some(at);
    }

    #[must_use]
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.extra.remove(SUBJECT);
        self.subject = Some(subject.into());
        self
    }

    #[must_use]
    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.extra.remove(TOPIC);
        self.topic = Some(topic.into());
        self
    }

    #[must_use]
    pub fn with_exam_board(mut self, exam_board: impl Into<String>) -> Self {
        self.extra.remove(EXAM_BOARD);
        self.exam_board = Some(exam_board.into());
        self
    }

    #[must_use]
    pub fn with_year(mut self, year: impl Into<String>) -> Self {
        self.extra.remove(YEAR);
        self.year = Some(year.into());
        self
    }

    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

/// Moves a string, number or boolean out of `raw`; other values stay put.
fn take_scalar(raw: &mut Map<String, Value>, key: &str) -> Option<String> {
    let text = match raw.get(key)? {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    raw.remove(key);
    Some(text)
}

/// A `timestamp` in an unknown format stays in `raw` untouched.
fn take_stamp(raw: &mut Map<String, Value>) -> Option<NaiveDateTime> {
    let Some(Value::String(text)) = raw.get(TIMESTAMP) else {
        return None;
    };
    let at = NaiveDateTime::parse_from_str(text, crate::time::EVENT_TIMESTAMP_FORMAT).ok()?;
    raw.remove(TIMESTAMP);
    Some(at)
}

fn serialize_stamp<S: serde::Serializer>(
    at: &Option<NaiveDateTime>,
    s: S,
) -> Result<S::Ok, S::Error> {
    match at {
        Some(at) => crate::time::event_format::serialize(at, s),
        None => s.serialize_none(),
    }
}

//
// ─── ANSWER EVENT ─────────────────────────────────────────────────────────────
//

/// One recorded answer. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerEvent {
    #[serde(rename = "tipo")]
    kind: AnswerKind,
    #[serde(with = "crate::time::event_format")]
    timestamp: NaiveDateTime,
    #[serde(rename = "questao", default)]
    question: QuestionMeta,
}

impl AnswerEvent {
    #[must_use]
    pub fn new(kind: AnswerKind, timestamp: NaiveDateTime, question: QuestionMeta) -> Self {
        Self {
            kind,
            timestamp,
            question,
        }
    }

    #[must_use]
    pub fn kind(&self) -> AnswerKind {
        self.kind
    }

    #[must_use]
    pub fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }

    #[must_use]
    pub fn question(&self) -> &QuestionMeta {
        &self.question
    }
}
