//! Serde helpers for `std::time::Duration` settings.
//!
//! Durations are written as human-readable strings (`"3m"`, `"1m 30s"`).
//! Bare integers are read as nanoseconds so records persisted by older
//! deployments keep loading.

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDuration {
    Text(String),
    Nanos(u64),
}

/// Serializes a duration as a humantime string.
///
/// # Errors
///
/// Propagates serializer errors.
pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&humantime::format_duration(*value).to_string())
}

/// Deserializes a duration from a humantime string or integer nanoseconds.
///
/// # Errors
///
/// Returns an error if the string is not a valid humantime duration.
pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    match RawDuration::deserialize(deserializer)? {
        RawDuration::Text(text) => {
            humantime::parse_duration(text.trim()).map_err(serde::de::Error::custom)
        }
        RawDuration::Nanos(nanos) => Ok(Duration::from_nanos(nanos)),
    }
}
