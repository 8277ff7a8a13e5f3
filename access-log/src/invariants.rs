use chrono::{DateTime, DurationRound, TimeDelta, Utc};
use derive_more::{AsRef, Debug, Display};

const MAX_ENDPOINT_CHARS: usize = 100;

#[derive(Debug, Display, AsRef, Clone, PartialEq, Eq, Hash)]
pub struct Hostname(String);

impl From<&str> for Hostname {
    fn from(s: &str) -> Self {
        Self(s.into())
    }
}

/// Request path, capped at [`MAX_ENDPOINT_CHARS`] characters.
#[derive(Debug, Display, AsRef, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint(String);

impl From<&str> for Endpoint {
    fn from(s: &str) -> Self {
        Self(s.chars().take(MAX_ENDPOINT_CHARS).collect())
    }
}

/// A UTC instant truncated to the start of its hour.
#[derive(Debug, Display, AsRef, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Copy)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    pub fn into_utc(self) -> DateTime<Utc> {
        self.0
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(value: DateTime<Utc>) -> Self {
        Self(value.duration_trunc(TimeDelta::hours(1)).unwrap_or(value))
    }
}
