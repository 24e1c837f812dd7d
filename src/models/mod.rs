// SPDX-License-Identifier: MIT
// Copyright 2026 The Acetrack Authors

//! Data models for the application.

pub mod attendance;
pub mod course;
pub mod event;
pub mod profile;
pub mod session;
pub mod user;

pub use attendance::{search_attendance, Attendance, AttendanceSummary, AttendanceWithEvent};
pub use course::Course;
pub use event::{Event, EventStatus};
pub use profile::{NewProfile, ProfileForm, UserProfile};
pub use session::Session;
pub use user::{User, UserMetadata};
