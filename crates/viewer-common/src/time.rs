//! Valid time handling for forecast frames.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Valid time of a forecast frame, in epoch seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidTime(pub i64);

impl ValidTime {
    pub fn seconds(&self) -> i64 {
        self.0
    }

    /// Epoch milliseconds, the unit time sliders report in.
    pub fn millis(&self) -> i64 {
        self.0.saturating_mul(1000)
    }

    /// Absolute distance to a target given in epoch milliseconds.
    pub fn distance_millis(&self, target_ms: i64) -> u64 {
        (self.millis() as i128 - target_ms as i128).unsigned_abs() as u64
    }

    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.0, 0).single()
    }

    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt.timestamp())
    }

    /// Parse an ISO 8601 timestamp, assuming UTC when no offset is given.
    pub fn parse_iso8601(s: &str) -> Result<Self, TimeParseError> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(Self::from_datetime(dt.with_timezone(&Utc)));
        }

        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
            return Ok(Self::from_datetime(Utc.from_utc_datetime(&ndt)));
        }

        Err(TimeParseError::InvalidFormat(s.to_string()))
    }
}

impl std::fmt::Display for ValidTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.datetime() {
            Some(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%SZ")),
            None => write!(f, "{}s", self.0),
        }
    }
}

impl From<i64> for ValidTime {
    fn from(seconds: i64) -> Self {
        Self(seconds)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TimeParseError {
    #[error("Invalid time format: {0}")]
    InvalidFormat(String),
}
