// SPDX-License-Identifier: MIT
// Copyright 2026 The Acetrack Authors

//! Repository interface over the hosted database.
//!
//! The only tables and shapes this app depends on are named here:
//! - Profiles (created once at profile setup)
//! - Courses and events (read-only reference data)
//! - Attendance (read-only, joined with events)

use crate::baas::auth::SessionStore;
use crate::baas::memory::MemoryStore;
use crate::baas::postgrest::{eq, PostgrestClient};
use crate::baas::tables;
use crate::error::AppError;
use crate::models::{AttendanceWithEvent, Course, Event, NewProfile, UserProfile};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
enum DatabaseBackend {
    Remote(PostgrestClient),
    Memory(Arc<MemoryStore>),
}

/// Database handle. Calls carry the current session's access token so
/// row-level security sees the signed-in user.
#[derive(Clone)]
pub struct Database {
    backend: DatabaseBackend,
    session: SessionStore,
}

impl Database {
    pub(crate) fn remote(client: PostgrestClient, session: SessionStore) -> Self {
        Self {
            backend: DatabaseBackend::Remote(client),
            session,
        }
    }

    pub(crate) fn memory(memory: Arc<MemoryStore>, session: SessionStore) -> Self {
        Self {
            backend: DatabaseBackend::Memory(memory),
            session,
        }
    }

    pub(crate) fn scoped(&self, session: SessionStore) -> Self {
        Self {
            backend: self.backend.clone(),
            session,
        }
    }

    fn bearer(&self, client: &PostgrestClient) -> String {
        self.session
            .access_token()
            .unwrap_or_else(|| client.anon_key().to_string())
    }

    // ─── Profiles ────────────────────────────────────────────────

    /// Profile for an auth user; `Ok(None)` when none has been set up.
    pub async fn get_profile(&self, user_id: Uuid) -> Result<Option<UserProfile>, AppError> {
        match &self.backend {
            DatabaseBackend::Remote(client) => {
                client
                    .select_one(
                        &self.bearer(client),
                        tables::PROFILES,
                        &[("select", "*".to_string()), ("id", eq(user_id))],
                    )
                    .await
            }
            DatabaseBackend::Memory(memory) => memory.get_profile(user_id),
        }
    }

    pub async fn insert_profile(&self, row: &NewProfile) -> Result<UserProfile, AppError> {
        match &self.backend {
            DatabaseBackend::Remote(client) => {
                client
                    .insert(&self.bearer(client), tables::PROFILES, row)
                    .await
            }
            DatabaseBackend::Memory(memory) => memory.insert_profile(row),
        }
    }

    // ─── Reference data ──────────────────────────────────────────

    pub async fn list_courses(&self) -> Result<Vec<Course>, AppError> {
        match &self.backend {
            DatabaseBackend::Remote(client) => {
                client
                    .select(
                        &self.bearer(client),
                        tables::COURSES,
                        &[
                            ("select", "id,course_name".to_string()),
                            ("order", "course_name.asc".to_string()),
                        ],
                    )
                    .await
            }
            DatabaseBackend::Memory(memory) => memory.list_courses(),
        }
    }

    /// All events, earliest start first.
    pub async fn list_events(&self) -> Result<Vec<Event>, AppError> {
        match &self.backend {
            DatabaseBackend::Remote(client) => {
                client
                    .select(
                        &self.bearer(client),
                        tables::EVENTS,
                        &[
                            ("select", "*".to_string()),
                            ("order", "start_datetime.asc".to_string()),
                        ],
                    )
                    .await
            }
            DatabaseBackend::Memory(memory) => memory.list_events(),
        }
    }

    pub async fn get_event(&self, id: i64) -> Result<Option<Event>, AppError> {
        match &self.backend {
            DatabaseBackend::Remote(client) => {
                client
                    .select_one(
                        &self.bearer(client),
                        tables::EVENTS,
                        &[("select", "*".to_string()), ("id", eq(id))],
                    )
                    .await
            }
            DatabaseBackend::Memory(memory) => memory.get_event(id),
        }
    }

    // ─── Attendance ──────────────────────────────────────────────

    /// A student's attendance with events embedded, latest check-in first.
    pub async fn get_attendance_for_user(
        &self,
        student_id: Uuid,
    ) -> Result<Vec<AttendanceWithEvent>, AppError> {
        match &self.backend {
            DatabaseBackend::Remote(client) => {
                client
                    .select(
                        &self.bearer(client),
                        tables::ATTENDANCE,
                        &[
                            ("select", format!("*,{}(*)", tables::EVENTS)),
                            ("student_id", eq(student_id)),
                            ("order", "time_in.desc.nullslast".to_string()),
                        ],
                    )
                    .await
            }
            DatabaseBackend::Memory(memory) => memory.get_attendance_for_user(student_id),
        }
    }

    pub async fn get_attendance_for_event(
        &self,
        event_id: i64,
        student_id: Uuid,
    ) -> Result<Option<AttendanceWithEvent>, AppError> {
        match &self.backend {
            DatabaseBackend::Remote(client) => {
                client
                    .select_one(
                        &self.bearer(client),
                        tables::ATTENDANCE,
                        &[
                            ("select", format!("*,{}(*)", tables::EVENTS)),
                            ("event_id", eq(event_id)),
                            ("student_id", eq(student_id)),
                        ],
                    )
                    .await
            }
            DatabaseBackend::Memory(memory) => {
                memory.get_attendance_for_event(event_id, student_id)
            }
        }
    }
}
