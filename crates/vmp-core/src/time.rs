// crates/vmp-core/src/time.rs
// ============================================================================
// Module: VMP Time Model
// Description: Wall-clock timestamp representation shared across entities.
// Purpose: Provide a single UTC-normalized timestamp type for all records.
// Dependencies: time, serde
// ============================================================================

//! ## Overview
//! Every entity in §3 carries one or more wall-clock timestamps with
//! timezone. [`Timestamp`] wraps [`OffsetDateTime`] normalized to UTC on
//! construction so comparisons and SLA arithmetic never cross timezones.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use time::Duration;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

// ============================================================================
// SECTION: Timestamp
// ============================================================================

/// A UTC wall-clock timestamp.
///
/// # Invariants
/// - Always normalized to the UTC offset; `now` and `from_offset` both
///   enforce this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timestamp(OffsetDateTime);

impl Timestamp {
    /// Returns the current wall-clock time.
    #[must_use]
    pub fn now() -> Self {
        Self(OffsetDateTime::now_utc())
    }

    /// Wraps an existing offset date-time, normalizing it to UTC.
    #[must_use]
    pub fn from_offset(value: OffsetDateTime) -> Self {
        Self(value.to_offset(time::UtcOffset::UTC))
    }

    /// Returns the underlying UTC offset date-time.
    #[must_use]
    pub const fn as_offset(self) -> OffsetDateTime {
        self.0
    }

    /// Returns a new timestamp offset forward by the given duration.
    #[must_use]
    pub fn plus(self, duration: Duration) -> Self {
        Self(self.0 + duration)
    }

    /// Returns the difference `self - other`.
    #[must_use]
    pub fn since(self, other: Self) -> Duration {
        self.0 - other.0
    }

    /// Formats the date portion as `YYYY-MM-DD`, used for evidence storage
    /// keys (§4.4).
    #[must_use]
    pub fn date_stamp(self) -> String {
        format!("{:04}-{:02}-{:02}", self.0.year(), u8::from(self.0.month()), self.0.day())
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.format(&Rfc3339) {
            Ok(text) => f.write_str(&text),
            Err(_) => write!(f, "{:?}", self.0),
        }
    }
}

impl Serialize for Timestamp {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let text = self.0.format(&Rfc3339).map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&text)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        let parsed = OffsetDateTime::parse(&text, &Rfc3339).map_err(serde::de::Error::custom)?;
        Ok(Self::from_offset(parsed))
    }
}

#[cfg(test)]
mod tests {
    use super::Timestamp;
    use time::Duration;

    #[test]
    fn date_stamp_is_zero_padded() {
        let ts = Timestamp::now();
        assert_eq!(ts.date_stamp().len(), 10);
    }

    #[test]
    fn plus_moves_forward() {
        let ts = Timestamp::now();
        let later = ts.plus(Duration::days(3));
        assert!(later > ts);
    }

    #[test]
    fn serde_round_trips() {
        let ts = Timestamp::now();
        let json = serde_json::to_string(&ts).expect("serialize");
        let back: Timestamp = serde_json::from_str(&json).expect("deserialize");
        // RFC3339 formatting is nanosecond-precise; round trip should be exact.
        assert_eq!(ts, back);
    }
}
