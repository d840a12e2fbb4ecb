//! The persisted document and its tolerant decoder.
//!
//! Two shapes are accepted, tried in this order:
//! 1. the envelope `{"sessions": [...], "history": [...]}`
//! 2. a bare list of sessions (history is then empty)
//!
//! Individual entries that fail to decode are hidden from readers but kept as
//! written, so the next rewrite puts them back unchanged. Anything else is a
//! [`DecodeError`], which callers turn into an empty document.

use serde::Serialize;
use serde_json::Value;
use tally_core::model::{AnswerEvent, Session};
use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DecodeError {
    #[error("document is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("document has an unrecognised shape")]
    UnrecognisedShape,
}

/// One stored item: decoded, or the raw JSON it was read from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Entry<T> {
    Known(T),
    Raw(Value),
}

impl<T> Entry<T> {
    fn known(&self) -> Option<&T> {
        match self {
            Entry::Known(value) => Some(value),
            Entry::Raw(_) => None,
        }
    }

    fn into_known(self) -> Option<T> {
        match self {
            Entry::Known(value) => Some(value),
            Entry::Raw(_) => None,
        }
    }
}

/// Everything stored on disk, written and read as one unit.
///
/// Indices used by the session accessors count readable sessions only.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StoreDocument {
    sessions: Vec<Entry<Session>>,
    history: Vec<Entry<AnswerEvent>>,
}

impl StoreDocument {
    /// Decode raw bytes, accepting the legacy bare-list shape.
    ///
    /// # Errors
    ///
    /// Returns `DecodeError` when the bytes are not JSON or match neither shape.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let value: Value = serde_json::from_slice(bytes)?;
        match value {
            Value::Object(mut map) if map.contains_key("sessions") => {
                let sessions = decode_entries(map.remove("sessions"), "session");
                let history = decode_entries(map.remove("history"), "history event");
                Ok(Self { sessions, history })
            }
            Value::Array(items) => Ok(Self {
                sessions: decode_entries(Some(Value::Array(items)), "session"),
                history: Vec::new(),
            }),
            _ => Err(DecodeError::UnrecognisedShape),
        }
    }

    /// Pretty-printed JSON, two-space indented.
    ///
    /// # Errors
    ///
    /// Returns `serde_json::Error` if serialization fails.
    pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec_pretty(self)
    }

    /// Readable sessions in commit order.
    pub fn sessions(&self) -> impl Iterator<Item = &Session> {
        self.sessions.iter().filter_map(Entry::known)
    }

    /// Readable history events in chronological order.
    pub fn history(&self) -> impl Iterator<Item = &AnswerEvent> {
        self.history.iter().filter_map(Entry::known)
    }

    #[must_use]
    pub fn into_sessions(self) -> Vec<Session> {
        self.sessions.into_iter().filter_map(Entry::into_known).collect()
    }

    #[must_use]
    pub fn into_history(self) -> Vec<AnswerEvent> {
        self.history.into_iter().filter_map(Entry::into_known).collect()
    }

    /// Entries kept as written because they could not be decoded.
    #[must_use]
    pub fn unreadable_count(&self) -> usize {
        let raw_sessions = self.sessions.iter().filter(|e| e.known().is_none()).count();
        let raw_events = self.history.iter().filter(|e| e.known().is_none()).count();
        raw_sessions + raw_events
    }

    pub fn push_session(&mut self, session: Session) {
        self.sessions.push(Entry::Known(session));
    }

    pub fn extend_history(&mut self, events: impl IntoIterator<Item = AnswerEvent>) {
        self.history.extend(events.into_iter().map(Entry::Known));
    }

    /// Remove the readable session at `index`; unreadable entries keep their place.
    pub fn remove_session(&mut self, index: usize) -> Option<Session> {
        let position = self
            .sessions
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.known().is_some())
            .map(|(position, _)| position)
            .nth(index)?;
        self.sessions.remove(position).into_known()
    }
}

fn decode_entries<T: serde::de::DeserializeOwned>(
    value: Option<Value>,
    what: &str,
) -> Vec<Entry<T>> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match serde_json::from_value(item.clone()) {
            Ok(entry) => Entry::Known(entry),
            Err(e) => {
                tracing::warn!(index, error = %e, "keeping unreadable {what} as written");
                Entry::Raw(item)
            }
        })
        .collect()
}
