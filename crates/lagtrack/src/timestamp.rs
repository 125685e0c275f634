//! Timestamp intake.
//!
//! Every timestamp stored on a record is `DateTime<Utc>`. Upstream sources
//! hand us a mix of offset-carrying and naive values; naive ones are read as
//! UTC, unparsable ones are replaced by the caller's "now".

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Utc};

/// A timestamp as it arrives from an upstream source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawTimestamp {
    Naive(NaiveDateTime),
    Aware(DateTime<FixedOffset>),
}

impl From<NaiveDateTime> for RawTimestamp {
    fn from(value: NaiveDateTime) -> Self {
        Self::Naive(value)
    }
}

impl From<DateTime<FixedOffset>> for RawTimestamp {
    fn from(value: DateTime<FixedOffset>) -> Self {
        Self::Aware(value)
    }
}

impl From<DateTime<Utc>> for RawTimestamp {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Aware(value.fixed_offset())
    }
}

/// Normalize to UTC. Aware values keep their instant.
pub fn coerce_utc(raw: RawTimestamp) -> DateTime<Utc> {
    match raw {
        RawTimestamp::Naive(naive) => naive.and_utc(),
        RawTimestamp::Aware(aware) => aware.with_timezone(&Utc),
    }
}

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
];

/// Parse the date formats seen in feeds and the GitHub API.
pub fn parse_timestamp(input: &str) -> Option<RawTimestamp> {
    let s = input.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(RawTimestamp::Aware(dt));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(RawTimestamp::Aware(dt));
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(RawTimestamp::Naive(naive));
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(RawTimestamp::Naive)
}

/// Parse and coerce, substituting `now` when the input is unusable.
pub fn parse_or_now(input: &str, now: DateTime<Utc>) -> DateTime<Utc> {
    match parse_timestamp(input) {
        Some(raw) => coerce_utc(raw),
        None => {
            tracing::warn!(value = input, "unparsable date, using current time");
            now
        }
    }
}
