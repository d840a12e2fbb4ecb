use chrono::{DateTime, FixedOffset, NaiveDateTime, Offset, Timelike, Utc};

/// Offset used when none is configured: Brasília time (UTC-3).
pub const DEFAULT_UTC_OFFSET_HOURS: i32 = -3;

/// Human-readable format for session timestamps.
pub const SESSION_TIMESTAMP_FORMAT: &str = "%d/%m/%Y %H:%M";

/// Human-readable format for answer event timestamps.
pub const EVENT_TIMESTAMP_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

/// A simple clock abstraction for deterministic time in services and tests.
#[derive(Debug, Clone, Copy, Default)]
pub enum Clock {
    #[default]
    Default,
    Fixed(DateTime<Utc>),
}

impl Clock {
    /// Returns a clock that uses the current system time.
    #[must_use]
    pub fn default_clock() -> Self {
        Self::Default
    }

    /// Returns a clock fixed at the given timestamp.
    #[must_use]
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self::Fixed(at)
    }

    /// Returns the current time according to the clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::Default => Utc::now(),
            Clock::Fixed(t) => *t,
        }
    }

    /// Wall-clock time at the given offset, truncated to whole seconds.
    #[must_use]
    pub fn local_now(&self, offset: FixedOffset) -> NaiveDateTime {
        let local = self.now().with_timezone(&offset).naive_local();
        local.with_nanosecond(0).unwrap_or(local)
    }
}

/// Build a `FixedOffset` from whole hours east of UTC.
///
/// Returns `None` when the offset is outside ±23 hours.
#[must_use]
pub fn offset_from_hours(hours: i32) -> Option<FixedOffset> {
    hours
        .checked_mul(3600)
        .and_then(FixedOffset::east_opt)
}

/// The default display offset (UTC-3).
#[must_use]
pub fn default_offset() -> FixedOffset {
    offset_from_hours(DEFAULT_UTC_OFFSET_HOURS).unwrap_or_else(|| Utc.fix())
}

/// Drop seconds and sub-seconds so a value survives the session format unchanged.
#[must_use]
pub fn truncate_to_minute(at: NaiveDateTime) -> NaiveDateTime {
    at.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(at)
}

/// Serde adapter for session timestamps (`dd/mm/YYYY HH:MM`).
pub mod session_format {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::SESSION_TIMESTAMP_FORMAT;

    pub fn serialize<S: Serializer>(at: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(&at.format(SESSION_TIMESTAMP_FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(d)?;
        NaiveDateTime::parse_from_str(&raw, SESSION_TIMESTAMP_FORMAT)
            .map_err(serde::de::Error::custom)
    }
}

/// Serde adapter for event timestamps (`dd/mm/YYYY HH:MM:SS`).
pub mod event_format {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::EVENT_TIMESTAMP_FORMAT;

    pub fn serialize<S: Serializer>(at: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(&at.format(EVENT_TIMESTAMP_FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(d)?;
        NaiveDateTime::parse_from_str(&raw, EVENT_TIMESTAMP_FORMAT)
            .map_err(serde::de::Error::custom)
    }
}

/// Deterministic timestamp for tests and examples (2023-11-14T22:13:20Z).
pub const FIXED_TEST_TIMESTAMP: i64 = 1_700_000_000;

/// Returns a deterministic `DateTime<Utc>` for tests and doc examples.
///
/// # Panics
///
/// Panics if the fixed timestamp cannot be represented.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(FIXED_TEST_TIMESTAMP, 0)
        .expect("fixed timestamp should be valid")
}

/// Returns a `Clock` fixed at the deterministic test timestamp.
#[must_use]
pub fn fixed_clock() -> Clock {
    Clock::fixed(fixed_now())
}
