// SPDX-License-Identifier: MIT
// Copyright 2026 The Acetrack Authors

//! Attendance records and the in-memory search/summary used by the
//! history and dashboard pages.

use crate::models::Event;
use crate::time_utils::deserialize_optional_timestamp;
use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// One check-in. Rows are created by the external check-in process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attendance {
    pub id: i64,
    pub event_id: i64,
    pub student_id: Uuid,
    /// Older deployments name this column `check_in_time`.
    #[serde(
        default,
        alias = "check_in_time",
        deserialize_with = "deserialize_optional_timestamp"
    )]
    pub time_in: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    pub time_out: Option<DateTime<Utc>>,
}

/// Attendance row with its event embedded (`select=*,events(*)`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceWithEvent {
    #[serde(flatten)]
    pub attendance: Attendance,
    #[serde(rename(serialize = "event", deserialize = "events"), default)]
    pub event: Option<Event>,
}

impl AttendanceWithEvent {
    /// Case-insensitive substring match on event name and location.
    /// `needle` must already be lowercase.
    fn matches(&self, needle: &str) -> bool {
        let Some(event) = &self.event else {
            return false;
        };
        event.name.to_lowercase().contains(needle)
            || event
                .location
                .as_deref()
                .is_some_and(|loc| loc.to_lowercase().contains(needle))
    }
}

/// Filter attendance history by free text. A blank query keeps everything;
/// otherwise the query is matched as typed, surrounding spaces included.
pub fn search_attendance(records: &[AttendanceWithEvent], query: &str) -> Vec<AttendanceWithEvent> {
    if query.trim().is_empty() {
        return records.to_vec();
    }
    let needle = query.to_lowercase();
    records
        .iter()
        .filter(|r| r.matches(&needle))
        .cloned()
        .collect()
}

/// Counts shown on the dashboard cards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct AttendanceSummary {
    pub total: u32,
    /// Check-ins in the current calendar month
    pub this_month: u32,
    /// Check-ins in the current ISO week (Monday start)
    pub this_week: u32,
}

impl AttendanceSummary {
    pub fn from_records(records: &[AttendanceWithEvent], now: DateTime<Utc>) -> Self {
        let week = now.iso_week();
        records
            .iter()
            .fold(Self::default(), |mut summary, record| {
                summary.total += 1;
                if let Some(time_in) = record.attendance.time_in {
                    if time_in.year() == now.year() && time_in.month() == now.month() {
                        summary.this_month += 1;
                    }
                    if time_in.iso_week() == week {
                        summary.this_week += 1;
                    }
                }
                summary
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EventStatus;
    use chrono::TimeZone;

    fn record(id: i64, name: &str, location: Option<&str>, time_in: DateTime<Utc>) -> AttendanceWithEvent {
        AttendanceWithEvent {
            attendance: Attendance {
                id,
                event_id: id,
                student_id: Uuid::nil(),
                time_in: Some(time_in),
                time_out: None,
            },
            event: Some(Event {
                id,
                name: name.to_string(),
                description: None,
                location: location.map(str::to_string),
                banner: None,
                status: EventStatus::Completed,
                start_datetime: time_in,
                end_datetime: time_in,
            }),
        }
    }

    fn sample() -> Vec<AttendanceWithEvent> {
        let t = Utc.with_ymd_and_hms(2025, 9, 10, 9, 0, 0).unwrap();
        vec![
            record(1, "Freshmen Orientation", Some("AVR Building"), t),
            record(2, "Coding Bootcamp", Some("Computer Lab 2"), t),
            record(3, "Sportsfest", None, t),
        ]
    }

    #[test]
    fn test_search_is_case_insensitive_over_name_and_location() {
        let records = sample();

        let by_name: Vec<i64> = search_attendance(&records, "BOOTCAMP")
            .iter()
            .map(|r| r.attendance.id)
            .collect();
        assert_eq!(by_name, vec![2]);

        let by_location: Vec<i64> = search_attendance(&records, "avr")
            .iter()
            .map(|r| r.attendance.id)
            .collect();
        assert_eq!(by_location, vec![1]);
    }

    #[test]
    fn test_search_keeps_surrounding_spaces() {
        let t = Utc.with_ymd_and_hms(2025, 9, 10, 9, 0, 0).unwrap();
        let records = vec![
            record(1, "Collaboration Summit", None, t),
            record(2, "Open House", Some("Computer Lab 2"), t),
        ];

        let ids: Vec<i64> = search_attendance(&records, " lab")
            .iter()
            .map(|r| r.attendance.id)
            .collect();
        assert_eq!(ids, vec![2]);
    }

    #[test]
    fn test_empty_query_returns_everything() {
        let records = sample();
        assert_eq!(search_attendance(&records, ""), records);
        assert_eq!(search_attendance(&records, "   "), records);
    }

    #[test]
    fn test_summary_counts_month_and_week() {
        // Wednesday 2025-09-10
        let now = Utc.with_ymd_and_hms(2025, 9, 10, 12, 0, 0).unwrap();
        let records = vec![
            record(1, "a", None, Utc.with_ymd_and_hms(2025, 9, 8, 8, 0, 0).unwrap()), // Monday
            record(2, "b", None, Utc.with_ymd_and_hms(2025, 9, 7, 8, 0, 0).unwrap()), // previous Sunday
            record(3, "c", None, Utc.with_ymd_and_hms(2025, 8, 31, 8, 0, 0).unwrap()),
            record(4, "d", None, Utc.with_ymd_and_hms(2024, 9, 10, 8, 0, 0).unwrap()),
        ];

        let summary = AttendanceSummary::from_records(&records, now);
        assert_eq!(
            summary,
            AttendanceSummary {
                total: 4,
                this_month: 2,
                this_week: 1,
            }
        );
    }

    #[test]
    fn test_legacy_check_in_time_column() {
        let row: AttendanceWithEvent = serde_json::from_value(serde_json::json!({
            "id": 5,
            "event_id": 9,
            "student_id": "00000000-0000-0000-0000-000000000000",
            "check_in_time": "2025-09-10T09:00:00+00:00",
            "events": null
        }))
        .unwrap();

        assert!(row.attendance.time_in.is_some());
        assert!(row.attendance.time_out.is_none());
        assert!(row.event.is_none());
    }
}
