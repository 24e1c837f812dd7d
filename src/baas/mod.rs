// SPDX-License-Identifier: MIT
// Copyright 2026 The Acetrack Authors

//! BaaS client wrapper: one handle to the hosted auth + database service.

pub mod auth;
pub mod database;
pub mod gotrue;
pub mod memory;
pub mod pkce;
pub mod postgrest;
pub mod token;

pub use auth::{AuthApi, AuthEvent, AuthEventKind, SessionStore};
pub use database::Database;
pub use gotrue::SignUpOutcome;
pub use memory::MemoryStore;

use crate::config::Config;
use crate::error::AppError;
use crate::models::Session;
use anyhow::Context;
use gotrue::GoTrueClient;
use postgrest::PostgrestClient;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Table names as constants.
pub mod tables {
    pub const PROFILES: &str = "profiles";
    pub const COURSES: &str = "courses";
    pub const EVENTS: &str = "events";
    pub const ATTENDANCE: &str = "attendance";
}

/// Handle to the hosted service. Cheap to clone; `scoped` derives a handle
/// with its own session slot for one browser session.
#[derive(Clone)]
pub struct BaasClient {
    pub auth: AuthApi,
    pub db: Database,
}

impl BaasClient {
    /// Client for the hosted project.
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .context("failed building BaaS HTTP client")?;

        let store = SessionStore::new(config.session_storage_key());
        let auth = AuthApi::remote(
            GoTrueClient::new(http.clone(), &config.supabase_url, &config.supabase_anon_key),
            config.supabase_jwt_secret.as_deref(),
            store.clone(),
        );
        let db = Database::remote(
            PostgrestClient::new(http, &config.supabase_url, &config.supabase_anon_key),
            store,
        );

        tracing::info!(
            project = config.project_ref(),
            local_jwt_verification = config.supabase_jwt_secret.is_some(),
            "BaaS client initialized"
        );
        Ok(Self { auth, db })
    }

    /// Client backed by an in-process store.
    pub fn in_memory(config: &Config, memory: Arc<MemoryStore>) -> Self {
        let store = SessionStore::new(config.session_storage_key());
        Self {
            auth: AuthApi::memory(memory.clone(), &config.supabase_url, store.clone()),
            db: Database::memory(memory, store),
        }
    }

    /// Handle for one browser session, starting from `session`.
    pub fn scoped(&self, session: Option<Session>) -> Self {
        let store = SessionStore::new(self.auth.storage_key());
        store.set(session);
        Self {
            auth: self.auth.scoped(store.clone()),
            db: self.db.scoped(store),
        }
    }
}
