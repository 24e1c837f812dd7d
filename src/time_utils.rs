// SPDX-License-Identifier: MIT
// Copyright 2026 The Acetrack Authors

//! Shared helpers for date/time formatting and parsing.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer};

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse a database timestamp. Columns without a zone are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Serde helper for timestamp columns that may omit the zone.
pub fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
}

/// Nullable variant of [`deserialize_timestamp`].
pub fn deserialize_optional_timestamp<'de, D>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw {
        None => Ok(None),
        Some(raw) => parse_timestamp(&raw)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_timestamp_with_offset() {
        let dt = parse_timestamp("2025-03-01T08:30:00+08:00").unwrap();
        assert_eq!(format_utc_rfc3339(dt), "2025-03-01T00:30:00Z");
    }

    #[test]
    fn test_parse_timestamp_without_zone_is_utc() {
        let dt = parse_timestamp("2025-03-01T08:30:00.123").unwrap();
        assert_eq!(format_utc_rfc3339(dt), "2025-03-01T08:30:00Z");

        let dt = parse_timestamp("2025-03-01 08:30:00").unwrap();
        assert_eq!(format_utc_rfc3339(dt), "2025-03-01T08:30:00Z");
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert!(parse_timestamp("yesterday").is_none());
    }
}
