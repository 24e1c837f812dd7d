// SPDX-License-Identifier: MIT
// Copyright 2026 The Acetrack Authors

//! Page view-models. Every route here sits behind the session gate and
//! issues only its own queries.
//!
//! Read failures are logged and degrade to empty data; write failures are
//! returned as an inline error.

use axum::{
    extract::{Multipart, Path, Query, State},
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::{AppError, Result};
use crate::models::{
    search_attendance, Attendance, AttendanceSummary, AttendanceWithEvent, Course, Event,
    ProfileForm, User, UserProfile,
};
use crate::routes::auth::RedirectResponse;
use crate::services::AuthContext;
use crate::AppState;

/// Entries shown in the dashboard's short lists.
const DASHBOARD_LIST_LEN: usize = 5;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/setup-profile", get(setup_profile_view).post(create_profile))
        .route("/setup-profile/avatar", post(upload_avatar))
        .route("/dashboard", get(dashboard))
        .route("/events", get(list_events))
        .route("/events/{id}", get(event_detail))
        .route("/attendance", get(attendance_history))
}

/// Unwrap a read, logging and substituting an empty value on failure.
fn or_empty<T: Default>(result: Result<T>, what: &'static str) -> T {
    result.unwrap_or_else(|e| {
        tracing::warn!(error = %e, what, "Read failed, showing empty result");
        T::default()
    })
}

fn current_user(ctx: &AuthContext) -> Result<User> {
    ctx.state().user().cloned().ok_or(AppError::Unauthorized)
}

// ─── Profile setup ──────────────────────────────────────────────

/// Form prefill taken from the identity provider's metadata.
#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ProfilePrefill {
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SetupProfileView {
    pub courses: Vec<Course>,
    pub prefill: ProfilePrefill,
}

async fn setup_profile_view(
    Extension(ctx): Extension<Arc<AuthContext>>,
) -> Result<Json<SetupProfileView>> {
    let user = current_user(&ctx)?;
    let courses = or_empty(ctx.client().db.list_courses().await, "courses");

    let (first_name, last_name) = user.user_metadata.name_parts();
    Ok(Json(SetupProfileView {
        courses,
        prefill: ProfilePrefill {
            first_name,
            last_name,
            email: user.email.clone(),
            avatar_url: user.user_metadata.avatar().map(str::to_string),
        },
    }))
}

/// Create the caller's profile. Validation runs before any insert.
async fn create_profile(
    Extension(ctx): Extension<Arc<AuthContext>>,
    Json(form): Json<ProfileForm>,
) -> Result<Json<RedirectResponse>> {
    let user = current_user(&ctx)?;
    let row = form.into_new_profile(user.id, user.user_metadata.avatar())?;

    let profile = ctx
        .client()
        .db
        .insert_profile(&row)
        .await
        .map_err(|e| match e {
            AppError::Baas(msg) => AppError::WriteFailed(msg),
            other => AppError::WriteFailed(other.user_message()),
        })?;

    tracing::info!(user_id = %profile.id, course_id = profile.course_id, "Profile created");
    Ok(Json(RedirectResponse {
        redirect: "/dashboard".to_string(),
        message: None,
    }))
}

#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct AvatarResponse {
    pub secure_url: String,
}

/// Forward the `file` field of a multipart upload to the image CDN.
async fn upload_avatar(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<Arc<AuthContext>>,
    mut multipart: Multipart,
) -> Result<Json<AvatarResponse>> {
    let user = current_user(&ctx)?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid upload: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().unwrap_or("avatar").to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("Invalid upload: {e}")))?;

        let secure_url = state
            .cdn
            .upload(&file_name, content_type.as_deref(), bytes.to_vec())
            .await?;

        tracing::info!(user_id = %user.id, "Avatar uploaded");
        return Ok(Json(AvatarResponse { secure_url }));
    }

    Err(AppError::BadRequest("No file uploaded".to_string()))
}

// ─── Dashboard ──────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct DashboardView {
    pub profile: Option<UserProfile>,
    pub upcoming_events: Vec<Event>,
    pub recent_attendance: Vec<AttendanceWithEvent>,
    pub summary: AttendanceSummary,
}

async fn dashboard(Extension(ctx): Extension<Arc<AuthContext>>) -> Result<Json<DashboardView>> {
    let auth_state = ctx.state();
    let user = auth_state.user().ok_or(AppError::Unauthorized)?;
    let now = Utc::now();
    let db = &ctx.client().db;

    let events = or_empty(db.list_events().await, "events");
    let attendance = or_empty(db.get_attendance_for_user(user.id).await, "attendance");

    let upcoming_events = events
        .into_iter()
        .filter(|e| e.is_upcoming(now))
        .take(DASHBOARD_LIST_LEN)
        .collect();
    let summary = AttendanceSummary::from_records(&attendance, now);
    let recent_attendance = attendance.into_iter().take(DASHBOARD_LIST_LEN).collect();

    Ok(Json(DashboardView {
        profile: auth_state.profile().cloned(),
        upcoming_events,
        recent_attendance,
        summary,
    }))
}

// ─── Events ─────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct EventsView {
    pub events: Vec<Event>,
}

async fn list_events(Extension(ctx): Extension<Arc<AuthContext>>) -> Json<EventsView> {
    let events = or_empty(ctx.client().db.list_events().await, "events");
    Json(EventsView { events })
}

#[derive(Debug, Serialize)]
pub struct EventDetailView {
    pub event: Event,
    /// The caller's attendance record for this event, if any.
    pub attendance: Option<Attendance>,
}

async fn event_detail(
    Extension(ctx): Extension<Arc<AuthContext>>,
    Path(id): Path<i64>,
) -> Result<Json<EventDetailView>> {
    let user = current_user(&ctx)?;
    let db = &ctx.client().db;

    let event = or_empty(db.get_event(id).await, "event")
        .ok_or_else(|| AppError::NotFound(format!("Event {id}")))?;
    let attendance = or_empty(db.get_attendance_for_event(id, user.id).await, "event attendance")
        .map(|record| record.attendance);

    Ok(Json(EventDetailView { event, attendance }))
}

// ─── Attendance history ─────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AttendanceParams {
    #[serde(default)]
    q: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AttendanceView {
    pub query: String,
    pub records: Vec<AttendanceWithEvent>,
    pub summary: AttendanceSummary,
}

async fn attendance_history(
    Extension(ctx): Extension<Arc<AuthContext>>,
    Query(params): Query<AttendanceParams>,
) -> Result<Json<AttendanceView>> {
    let user = current_user(&ctx)?;
    let all = or_empty(
        ctx.client().db.get_attendance_for_user(user.id).await,
        "attendance",
    );

    let query = params.q.unwrap_or_default();
    let records = search_attendance(&all, &query);
    let summary = AttendanceSummary::from_records(&all, Utc::now());

    Ok(Json(AttendanceView {
        query,
        records,
        summary,
    }))
}
