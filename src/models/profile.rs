// SPDX-License-Identifier: MIT
// Copyright 2026 The Acetrack Authors

//! Student profile, created once during profile setup.

use crate::error::AppError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Role assigned to every self-registered profile.
pub const STUDENT_ROLE_ID: i64 = 3;

/// Application-specific user record keyed by the auth user id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub student_id: String,
    pub course_id: i64,
    pub year_level: String,
    pub role_id: i64,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Row inserted by profile setup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewProfile {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub student_id: String,
    pub course_id: i64,
    pub year_level: String,
    pub role_id: i64,
    pub avatar_url: Option<String>,
}

/// Profile-setup form as submitted by the browser. All select values
/// arrive as strings.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ProfileForm {
    #[validate(length(min = 1, max = 100, message = "First name is required"))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100, message = "Last name is required"))]
    pub last_name: String,
    #[validate(length(min = 1, max = 32, message = "Student ID is required"))]
    pub student_id: String,
    /// Selected course id
    #[serde(default)]
    #[validate(required(message = "Please select a program"))]
    pub program: Option<String>,
    #[validate(length(min = 1, max = 32, message = "Year level is required"))]
    pub year_level: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl ProfileForm {
    /// Validate the form and build the insert row. Fails before anything
    /// is sent to the database.
    pub fn into_new_profile(
        self,
        user_id: Uuid,
        fallback_avatar: Option<&str>,
    ) -> Result<NewProfile, AppError> {
        self.validate()
            .map_err(|e| AppError::BadRequest(first_validation_message(&e)))?;

        let course_id = self
            .program
            .as_deref()
            .map(str::trim)
            .and_then(|p| p.parse::<i64>().ok())
            .ok_or_else(|| AppError::BadRequest("Please select a valid program".to_string()))?;

        Ok(NewProfile {
            id: user_id,
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            student_id: self.student_id.trim().to_string(),
            course_id,
            year_level: self.year_level.trim().to_string(),
            role_id: STUDENT_ROLE_ID,
            avatar_url: self
                .avatar_url
                .filter(|url| !url.is_empty())
                .or_else(|| fallback_avatar.map(str::to_string)),
        })
    }
}

impl From<NewProfile> for UserProfile {
    fn from(row: NewProfile) -> Self {
        Self {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            student_id: row.student_id,
            course_id: row.course_id,
            year_level: row.year_level,
            role_id: row.role_id,
            avatar_url: row.avatar_url,
            created_at: Some(crate::time_utils::format_utc_rfc3339(chrono::Utc::now())),
        }
    }
}

/// Pick one message to show inline; field order is not significant.
pub(crate) fn first_validation_message(errors: &validator::ValidationErrors) -> String {
    errors
        .field_errors()
        .values()
        .flat_map(|errs| errs.iter())
        .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
        .unwrap_or_else(|| "Invalid profile".to_string())
}
