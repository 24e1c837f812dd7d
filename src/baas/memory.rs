// SPDX-License-Identifier: MIT
// Copyright 2026 The Acetrack Authors

//! In-process BaaS backend.
//!
//! Mirrors the hosted service closely enough for tests and offline
//! development: JWT access tokens signed with the project secret, rotating
//! refresh tokens, PKCE-checked OAuth codes, and the four tables the app
//! reads. Rows that the hosted platform fills from outside (courses, events,
//! attendance) are seeded through the `insert_*` helpers.

use crate::baas::gotrue::SignUpOutcome;
use crate::baas::{pkce, token};
use crate::error::AppError;
use crate::models::{
    Attendance, AttendanceWithEvent, Course, Event, NewProfile, Session, User, UserMetadata,
    UserProfile,
};
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicBool, Ordering};
use subtle::ConstantTimeEq;
use uuid::Uuid;

const ACCESS_TOKEN_TTL_SECS: usize = 60 * 60;
/// Unexchanged authorization codes are dropped after this long.
const OAUTH_CODE_TTL_SECS: i64 = 5 * 60;

struct Credential {
    user_id: Uuid,
    password_hash: [u8; 32],
}

struct PendingCode {
    user_id: Uuid,
    code_challenge: Option<String>,
    issued_at: i64,
}

impl PendingCode {
    fn is_expired(&self, now: i64) -> bool {
        now - self.issued_at > OAUTH_CODE_TTL_SECS
    }
}

/// Shared in-memory state. Wrap in `Arc` and hand to `BaasClient::in_memory`.
pub struct MemoryStore {
    jwt_secret: Vec<u8>,
    users: DashMap<Uuid, User>,
    /// Keyed by lowercase email
    credentials: DashMap<String, Credential>,
    refresh_tokens: DashMap<String, Uuid>,
    oauth_codes: DashMap<String, PendingCode>,
    profiles: DashMap<Uuid, UserProfile>,
    courses: DashMap<i64, Course>,
    events: DashMap<i64, Event>,
    attendance: DashMap<i64, Attendance>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new(jwt_secret: impl Into<Vec<u8>>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            users: DashMap::new(),
            credentials: DashMap::new(),
            refresh_tokens: DashMap::new(),
            oauth_codes: DashMap::new(),
            profiles: DashMap::new(),
            courses: DashMap::new(),
            events: DashMap::new(),
            attendance: DashMap::new(),
            unavailable: AtomicBool::new(false),
        }
    }

    pub fn jwt_secret(&self) -> &[u8] {
        &self.jwt_secret
    }

    /// Make every table operation fail, as when the database is unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    // ─── Auth ────────────────────────────────────────────────────

    pub fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &serde_json::Value,
    ) -> Result<SignUpOutcome, AppError> {
        let key = email.trim().to_lowercase();
        if self.credentials.contains_key(&key) {
            return Err(AppError::Auth("User already registered".to_string()));
        }

        let user = User {
            id: Uuid::new_v4(),
            email: Some(key.clone()),
            user_metadata: serde_json::from_value(metadata.clone()).unwrap_or_default(),
        };
        self.users.insert(user.id, user.clone());
        self.credentials.insert(
            key.clone(),
            Credential {
                user_id: user.id,
                password_hash: password_hash(&key, password),
            },
        );

        let session = self.issue_session(&user)?;
        Ok(SignUpOutcome {
            user,
            session: Some(session),
        })
    }

    pub fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, AppError> {
        let key = email.trim().to_lowercase();
        let invalid = || AppError::Auth("Invalid login credentials".to_string());

        let user_id = {
            let credential = self.credentials.get(&key).ok_or_else(invalid)?;
            let matches: bool = credential
                .password_hash
                .ct_eq(&password_hash(&key, password))
                .into();
            if !matches {
                return Err(invalid());
            }
            credential.user_id
        };

        let user = self.users.get(&user_id).map(|u| u.value().clone()).ok_or_else(invalid)?;
        self.issue_session(&user)
    }

    /// Simulate the provider side of an OAuth login: find or create the
    /// identity and return a one-time authorization code.
    pub fn issue_oauth_code(
        &self,
        email: &str,
        metadata: UserMetadata,
        code_challenge: Option<&str>,
    ) -> String {
        let key = email.trim().to_lowercase();
        let existing = self
            .users
            .iter()
            .find(|u| u.email.as_deref() == Some(key.as_str()))
            .map(|u| u.id);
        let user_id = existing.unwrap_or_else(|| {
            let user = User {
                id: Uuid::new_v4(),
                email: Some(key.clone()),
                user_metadata: metadata,
            };
            let id = user.id;
            self.users.insert(id, user);
            id
        });

        let now = Utc::now().timestamp();
        self.sweep_oauth_codes(now);

        let code = Uuid::new_v4().to_string();
        self.oauth_codes.insert(
            code.clone(),
            PendingCode {
                user_id,
                code_challenge: code_challenge.map(str::to_string),
                issued_at: now,
            },
        );
        code
    }

    /// Drop authorization codes that were never exchanged in time.
    fn sweep_oauth_codes(&self, now: i64) {
        let before = self.oauth_codes.len();
        self.oauth_codes.retain(|_, pending| !pending.is_expired(now));
        let swept = before.saturating_sub(self.oauth_codes.len());
        if swept > 0 {
            tracing::debug!(swept, "Expired OAuth codes removed");
        }
    }

    pub fn pending_oauth_codes(&self) -> usize {
        self.oauth_codes.len()
    }

    pub fn exchange_code(&self, code: &str, verifier: &str) -> Result<Session, AppError> {
        let (_, pending) = self
            .oauth_codes
            .remove(code)
            .filter(|(_, pending)| !pending.is_expired(Utc::now().timestamp()))
            .ok_or_else(|| {
                AppError::Auth("invalid flow state, no valid flow state found".to_string())
            })?;

        if let Some(challenge) = &pending.code_challenge {
            let matches: bool = pkce::challenge_for(verifier)
                .as_bytes()
                .ct_eq(challenge.as_bytes())
                .into();
            if !matches {
                return Err(AppError::Auth(
                    "code challenge does not match previously saved code verifier".to_string(),
                ));
            }
        }

        let user = self
            .users
            .get(&pending.user_id)
            .map(|u| u.value().clone())
            .ok_or_else(|| AppError::Auth("User not found".to_string()))?;
        self.issue_session(&user)
    }

    /// Rotate a refresh token.
    pub fn refresh(&self, refresh_token: &str) -> Result<Session, AppError> {
        let (_, user_id) = self.refresh_tokens.remove(refresh_token).ok_or_else(|| {
            AppError::Auth("Invalid Refresh Token: Refresh Token Not Found".to_string())
        })?;
        let user = self
            .users
            .get(&user_id)
            .map(|u| u.value().clone())
            .ok_or_else(|| AppError::Auth("User not found".to_string()))?;
        self.issue_session(&user)
    }

    pub fn get_user(&self, access_token: &str) -> Result<User, AppError> {
        let claims =
            token::verify_access_token(access_token, &self.jwt_secret).ok_or(AppError::InvalidToken)?;
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AppError::InvalidToken)?;
        self.users
            .get(&user_id)
            .map(|u| u.value().clone())
            .ok_or(AppError::InvalidToken)
    }

    /// Revoke every refresh token of the token's owner.
    pub fn logout(&self, access_token: &str) -> Result<(), AppError> {
        // Expired or unknown tokens are already signed out.
        let Ok(user) = self.get_user(access_token) else {
            return Ok(());
        };
        self.refresh_tokens.retain(|_, owner| *owner != user.id);
        Ok(())
    }

    /// Number of live refresh tokens for a user.
    pub fn active_sessions(&self, user_id: Uuid) -> usize {
        self.refresh_tokens
            .iter()
            .filter(|entry| *entry.value() == user_id)
            .count()
    }

    fn issue_session(&self, user: &User) -> Result<Session, AppError> {
        let access_token = token::create_access_token(user, ACCESS_TOKEN_TTL_SECS, &self.jwt_secret)?;
        let refresh_token = Uuid::new_v4().simple().to_string();
        self.refresh_tokens.insert(refresh_token.clone(), user.id);

        Ok(Session {
            expires_at: token::peek_expiry(&access_token),
            access_token,
            refresh_token,
            expires_in: Some(ACCESS_TOKEN_TTL_SECS as i64),
            user: Some(user.clone()),
        })
    }

    // ─── Tables ──────────────────────────────────────────────────

    fn check_available(&self) -> Result<(), AppError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AppError::Baas("database unavailable".to_string()));
        }
        Ok(())
    }

    pub fn get_profile(&self, user_id: Uuid) -> Result<Option<UserProfile>, AppError> {
        self.check_available()?;
        Ok(self.profiles.get(&user_id).map(|p| p.value().clone()))
    }

    pub fn insert_profile(&self, row: &NewProfile) -> Result<UserProfile, AppError> {
        self.check_available()?;
        if !self.courses.contains_key(&row.course_id) {
            return Err(AppError::Baas(
                "insert or update on table \"profiles\" violates foreign key constraint \"profiles_course_id_fkey\" (23503)"
                    .to_string(),
            ));
        }

        match self.profiles.entry(row.id) {
            Entry::Occupied(_) => Err(AppError::Baas(
                "duplicate key value violates unique constraint \"profiles_pkey\" (23505)"
                    .to_string(),
            )),
            Entry::Vacant(slot) => {
                let profile = UserProfile::from(row.clone());
                slot.insert(profile.clone());
                Ok(profile)
            }
        }
    }

    pub fn list_courses(&self) -> Result<Vec<Course>, AppError> {
        self.check_available()?;
        let mut courses: Vec<Course> = self.courses.iter().map(|c| c.value().clone()).collect();
        courses.sort_by(|a, b| a.course_name.cmp(&b.course_name));
        Ok(courses)
    }

    pub fn list_events(&self) -> Result<Vec<Event>, AppError> {
        self.check_available()?;
        let mut events: Vec<Event> = self.events.iter().map(|e| e.value().clone()).collect();
        events.sort_by(|a, b| a.start_datetime.cmp(&b.start_datetime).then(a.id.cmp(&b.id)));
        Ok(events)
    }

    pub fn get_event(&self, id: i64) -> Result<Option<Event>, AppError> {
        self.check_available()?;
        Ok(self.events.get(&id).map(|e| e.value().clone()))
    }

    pub fn get_attendance_for_user(
        &self,
        student_id: Uuid,
    ) -> Result<Vec<AttendanceWithEvent>, AppError> {
        self.check_available()?;
        let mut rows: Vec<AttendanceWithEvent> = self
            .attendance
            .iter()
            .filter(|a| a.student_id == student_id)
            .map(|a| self.with_event(a.value().clone()))
            .collect();
        // time_in desc, nulls last
        rows.sort_by(|a, b| {
            b.attendance
                .time_in
                .cmp(&a.attendance.time_in)
                .then(b.attendance.id.cmp(&a.attendance.id))
        });
        Ok(rows)
    }

    pub fn get_attendance_for_event(
        &self,
        event_id: i64,
        student_id: Uuid,
    ) -> Result<Option<AttendanceWithEvent>, AppError> {
        self.check_available()?;
        Ok(self
            .attendance
            .iter()
            .find(|a| a.event_id == event_id && a.student_id == student_id)
            .map(|a| self.with_event(a.value().clone())))
    }

    fn with_event(&self, attendance: Attendance) -> AttendanceWithEvent {
        let event = self.events.get(&attendance.event_id).map(|e| e.value().clone());
        AttendanceWithEvent { attendance, event }
    }

    // ─── Seeding (externally managed rows) ───────────────────────

    pub fn insert_course(&self, course: Course) {
        self.courses.insert(course.id, course);
    }

    pub fn insert_event(&self, event: Event) {
        self.events.insert(event.id, event);
    }

    /// Record a check-in, as the external check-in process would.
    pub fn insert_attendance(&self, attendance: Attendance) {
        self.attendance.insert(attendance.id, attendance);
    }
}

fn password_hash(email: &str, password: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(email.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    hasher.finalize().into()
}
