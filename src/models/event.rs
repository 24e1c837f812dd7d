// SPDX-License-Identifier: MIT
// Copyright 2026 The Acetrack Authors

//! Event reference data. Read-only from this app's side.

use crate::time_utils::deserialize_timestamp;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Event lifecycle as stored by the organisers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    #[default]
    Upcoming,
    Ongoing,
    Completed,
    Cancelled,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Event {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    /// Banner image URL on the CDN
    #[serde(default)]
    pub banner: Option<String>,
    #[serde(default)]
    pub status: EventStatus,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub start_datetime: DateTime<Utc>,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub end_datetime: DateTime<Utc>,
}

impl Event {
    /// Still worth showing on the dashboard at `now`.
    pub fn is_upcoming(&self, now: DateTime<Utc>) -> bool {
        !matches!(self.status, EventStatus::Completed | EventStatus::Cancelled)
            && self.end_datetime >= now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_postgrest_row() {
        let event: Event = serde_json::from_value(serde_json::json!({
            "id": 12,
            "name": "Intramurals Opening",
            "description": null,
            "location": "Main Gym",
            "banner": "https://res.cloudinary.com/demo/image/upload/banner.jpg",
            "status": "ongoing",
            "start_datetime": "2025-09-01T08:00:00+00:00",
            "end_datetime": "2025-09-01T12:00:00"
        }))
        .unwrap();

        assert_eq!(event.status, EventStatus::Ongoing);
        assert_eq!(event.location.as_deref(), Some("Main Gym"));
        assert!(event.end_datetime > event.start_datetime);
    }

    #[test]
    fn test_unknown_status_does_not_fail() {
        let status: EventStatus = serde_json::from_str("\"postponed\"").unwrap();
        assert_eq!(status, EventStatus::Unknown);
    }
}
