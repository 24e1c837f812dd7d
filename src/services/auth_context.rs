// SPDX-License-Identifier: MIT
// Copyright 2026 The Acetrack Authors

//! Who is logged in, and whether they may see protected pages.
//!
//! `AuthContext` is the only writer of its `AuthState`; readers hold a
//! `watch::Receiver`. State transitions:
//!
//! - `Loading` until the first session lookup completes; a lookup that
//!   fails upstream leaves it there, so the stored session is kept
//! - no session: `Anonymous`
//! - session on an auth-flow page: `AuthenticatedNoProfile` (the profile
//!   check is skipped so profile setup can run)
//! - session elsewhere: `Authenticated` when a profile exists, otherwise the
//!   session is signed out remotely and the state becomes `Anonymous`

use crate::baas::{pkce, BaasClient, SignUpOutcome};
use crate::error::AppError;
use crate::models::{Session, User, UserProfile};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

/// Pages reachable with a session but without a profile.
pub const AUTH_PAGES: &[&str] = &["/login", "/register", "/setup-profile"];

/// True for auth-flow paths, where the profile check is skipped.
pub fn is_auth_path(path: &str) -> bool {
    path == "/auth"
        || path.starts_with("/auth/")
        || AUTH_PAGES.iter().any(|page| {
            path == *page
                || path
                    .strip_prefix(page)
                    .is_some_and(|rest| rest.starts_with('/'))
        })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AuthState {
    Loading,
    Anonymous,
    AuthenticatedNoProfile { user: User },
    Authenticated { user: User, profile: UserProfile },
}

impl AuthState {
    pub fn is_authenticated(&self) -> bool {
        matches!(
            self,
            AuthState::AuthenticatedNoProfile { .. } | AuthState::Authenticated { .. }
        )
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, AuthState::Loading)
    }

    pub fn user(&self) -> Option<&User> {
        match self {
            AuthState::AuthenticatedNoProfile { user } | AuthState::Authenticated { user, .. } => {
                Some(user)
            }
            AuthState::Loading | AuthState::Anonymous => None,
        }
    }

    pub fn profile(&self) -> Option<&UserProfile> {
        match self {
            AuthState::Authenticated { profile, .. } => Some(profile),
            _ => None,
        }
    }
}

/// Error descriptor returned by sign-in, sign-up and OAuth operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct AuthFailure {
    pub message: String,
}

impl From<AppError> for AuthFailure {
    fn from(err: AppError) -> Self {
        Self {
            message: err.user_message(),
        }
    }
}

/// Provider redirect plus the PKCE verifier the callback will need.
#[derive(Debug, Clone)]
pub struct OAuthRedirect {
    pub url: String,
    pub code_verifier: String,
}

/// Keeps the auth-state subscription alive; dropping it unsubscribes.
pub struct AuthListener {
    handle: JoinHandle<()>,
}

impl Drop for AuthListener {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub struct AuthContext {
    client: BaasClient,
    /// Page the context gates
    path: String,
    /// Public origin used to build OAuth callback URLs
    origin: String,
    state: watch::Sender<AuthState>,
}

impl AuthContext {
    pub fn new(client: BaasClient, path: impl Into<String>, origin: impl Into<String>) -> Self {
        let (state, _) = watch::channel(AuthState::Loading);
        Self {
            client,
            path: path.into(),
            origin: origin.into(),
            state,
        }
    }

    pub fn client(&self) -> &BaasClient {
        &self.client
    }

    pub fn state(&self) -> AuthState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    fn publish(&self, next: AuthState) -> AuthState {
        self.state.send_replace(next.clone());
        next
    }

    /// Look up the current session and settle the initial state. When the
    /// lookup itself fails the state stays `Loading`.
    pub async fn init(&self) -> AuthState {
        let session = match self.client.auth.get_session().await {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!(error = %e, "Session lookup failed, keeping session");
                return self.state();
            }
        };
        let next = self.resolve(session).await;
        self.publish(next)
    }

    /// Re-run the gating logic for every auth-state change until the
    /// returned listener is dropped.
    pub fn listen(self: &Arc<Self>) -> AuthListener {
        let mut events = self.client.auth.on_auth_state_change();
        let ctx = Arc::clone(self);

        let handle = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        tracing::debug!(event = ?event.kind, path = %ctx.path, "Re-evaluating auth state");
                        let next = ctx.resolve(event.session).await;
                        ctx.publish(next);
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Auth listener lagged behind");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        AuthListener { handle }
    }

    async fn resolve(&self, session: Option<Session>) -> AuthState {
        let Some(user) = session.and_then(|s| s.user) else {
            return AuthState::Anonymous;
        };

        if is_auth_path(&self.path) {
            return AuthState::AuthenticatedNoProfile { user };
        }

        match self.client.db.get_profile(user.id).await {
            Ok(Some(profile)) => AuthState::Authenticated { user, profile },
            Ok(None) => {
                tracing::info!(user_id = %user.id, path = %self.path, "No profile for session, signing out");
                self.force_sign_out().await;
                AuthState::Anonymous
            }
            Err(e) => {
                tracing::warn!(user_id = %user.id, error = %e, "Profile lookup failed, signing out");
                self.force_sign_out().await;
                AuthState::Anonymous
            }
        }
    }

    async fn force_sign_out(&self) {
        if let Err(e) = self.client.auth.sign_out().await {
            tracing::warn!(error = %e, "Remote sign-out failed");
        }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthFailure> {
        let session = self
            .client
            .auth
            .sign_in_with_password(email, password)
            .await
            .inspect_err(|e| tracing::info!(error = %e, "Password sign-in failed"))?;

        let next = self.resolve(Some(session.clone())).await;
        self.publish(next);
        Ok(session)
    }

    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: serde_json::Value,
    ) -> Result<SignUpOutcome, AuthFailure> {
        let outcome = self
            .client
            .auth
            .sign_up(email, password, &metadata)
            .await
            .inspect_err(|e| tracing::info!(error = %e, "Sign-up failed"))?;

        let next = self.resolve(outcome.session.clone()).await;
        self.publish(next);
        Ok(outcome)
    }

    /// Start Google sign-in. The callback URL carries `next` so the user
    /// lands back where they started.
    pub fn sign_in_with_google(&self, next: Option<&str>) -> Result<OAuthRedirect, AuthFailure> {
        let code_verifier = pkce::generate_verifier().map_err(AppError::Internal)?;
        let challenge = pkce::challenge_for(&code_verifier);

        let mut callback = format!("{}/auth/callback", self.origin.trim_end_matches('/'));
        if let Some(next) = next.filter(|n| !n.is_empty()) {
            callback.push_str("?next=");
            callback.push_str(&urlencoding::encode(next));
        }

        Ok(OAuthRedirect {
            url: self.client.auth.authorize_url("google", &callback, &challenge),
            code_verifier,
        })
    }

    /// Sign out remotely (failures are logged) and clear the local state.
    pub async fn sign_out(&self) {
        self.force_sign_out().await;
        self.publish(AuthState::Anonymous);
    }

    /// Rotate the session and re-evaluate. On failure the state is kept.
    pub async fn refresh_session(&self) -> AuthState {
        match self.client.auth.refresh_current().await {
            Ok(session) => {
                let next = self.resolve(Some(session)).await;
                self.publish(next)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Session refresh failed");
                self.state()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::baas::MemoryStore;
    use crate::config::Config;
    use crate::models::{Course, NewProfile};
    use std::time::Duration;
    use uuid::Uuid;

    fn memory_client() -> (BaasClient, Arc<MemoryStore>) {
        let config = Config::default();
        let memory = Arc::new(MemoryStore::new(b"auth_context_test_secret".to_vec()));
        (BaasClient::in_memory(&config, memory.clone()), memory)
    }

    fn signed_up(client: &BaasClient, memory: &MemoryStore) -> (BaasClient, Session) {
        let session = memory
            .sign_up("student@school.edu", "pw123456", &serde_json::json!({}))
            .unwrap()
            .session
            .unwrap();
        (client.scoped(Some(session.clone())), session)
    }

    fn add_profile(memory: &MemoryStore, user_id: Uuid) {
        memory.insert_course(Course {
            id: 1,
            course_name: "BS Information Technology".into(),
        });
        memory
            .insert_profile(&NewProfile {
                id: user_id,
                first_name: "Ana".into(),
                last_name: "Reyes".into(),
                student_id: "2021-0001".into(),
                course_id: 1,
                year_level: "2".into(),
                role_id: 3,
                avatar_url: None,
            })
            .unwrap();
    }

    #[test]
    fn test_auth_paths() {
        for path in ["/login", "/register", "/setup-profile", "/setup-profile/avatar", "/auth/callback"] {
            assert!(is_auth_path(path), "{path}");
        }
        for path in ["/", "/dashboard", "/events/3", "/loginx", "/authority"] {
            assert!(!is_auth_path(path), "{path}");
        }
    }

    #[tokio::test]
    async fn test_starts_loading_then_anonymous_without_session() {
        let (client, _) = memory_client();
        let ctx = AuthContext::new(client, "/dashboard", "http://localhost:8080");
        assert!(ctx.state().is_loading());

        assert_eq!(ctx.init().await, AuthState::Anonymous);
    }

    #[tokio::test]
    async fn test_failed_session_lookup_stays_loading() {
        let config = Config {
            supabase_url: "http://127.0.0.1:9".into(),
            supabase_jwt_secret: None,
            ..Config::default()
        };
        let stored = Session::from_tokens("abc.def.ghi".into(), "r1".into());
        let client = BaasClient::new(&config).unwrap().scoped(Some(stored.clone()));

        let ctx = AuthContext::new(client, "/dashboard", "http://localhost:8080");

        assert!(ctx.init().await.is_loading());
        assert_eq!(ctx.client().auth.current_session(), Some(stored));
    }

    #[tokio::test]
    async fn test_auth_page_skips_profile_check() {
        let (client, memory) = memory_client();
        let (scoped, session) = signed_up(&client, &memory);
        // A profile lookup would fail; it must not happen.
        memory.set_unavailable(true);

        let ctx = AuthContext::new(scoped, "/setup-profile", "http://localhost:8080");
        let state = ctx.init().await;

        assert!(state.is_authenticated());
        assert_eq!(state.user(), session.user.as_ref());
        assert!(state.profile().is_none());
    }

    #[tokio::test]
    async fn test_missing_profile_forces_sign_out() {
        let (client, memory) = memory_client();
        let (scoped, session) = signed_up(&client, &memory);
        let user_id = session.user.unwrap().id;

        let ctx = AuthContext::new(scoped, "/dashboard", "http://localhost:8080");

        assert_eq!(ctx.init().await, AuthState::Anonymous);
        assert_eq!(memory.active_sessions(user_id), 0);
        assert!(ctx.client().auth.current_session().is_none());
    }

    #[tokio::test]
    async fn test_profile_lookup_error_forces_sign_out() {
        let (client, memory) = memory_client();
        let (scoped, session) = signed_up(&client, &memory);
        add_profile(&memory, session.user.as_ref().unwrap().id);
        memory.set_unavailable(true);

        let ctx = AuthContext::new(scoped, "/dashboard", "http://localhost:8080");
        assert_eq!(ctx.init().await, AuthState::Anonymous);
    }

    #[tokio::test]
    async fn test_profile_present_is_authenticated() {
        let (client, memory) = memory_client();
        let (scoped, session) = signed_up(&client, &memory);
        add_profile(&memory, session.user.as_ref().unwrap().id);

        let ctx = AuthContext::new(scoped, "/dashboard", "http://localhost:8080");
        let state = ctx.init().await;

        assert_eq!(state.profile().map(|p| p.first_name.as_str()), Some("Ana"));
    }

    #[tokio::test]
    async fn test_repeated_events_on_auth_page_are_idempotent() {
        let (client, memory) = memory_client();
        let (scoped, session) = signed_up(&client, &memory);
        let ctx = Arc::new(AuthContext::new(scoped, "/setup-profile", "http://localhost:8080"));
        let expected = AuthState::AuthenticatedNoProfile {
            user: session.user.clone().unwrap(),
        };

        assert_eq!(ctx.init().await, expected);
        let _listener = ctx.listen();
        let mut states = ctx.subscribe();

        for _ in 0..3 {
            ctx.client().auth.refresh_current().await.unwrap();
            tokio::time::timeout(Duration::from_secs(1), states.changed())
                .await
                .expect("state published")
                .unwrap();
            assert_eq!(*states.borrow_and_update(), expected);
        }
    }

    #[tokio::test]
    async fn test_listener_tracks_sign_out_and_stops_when_dropped() {
        let (client, memory) = memory_client();
        let (scoped, _) = signed_up(&client, &memory);
        let ctx = Arc::new(AuthContext::new(scoped, "/register", "http://localhost:8080"));
        ctx.init().await;

        let listener = ctx.listen();
        let mut states = ctx.subscribe();
        ctx.client().auth.sign_out().await.unwrap();
        tokio::time::timeout(
            Duration::from_secs(1),
            states.wait_for(|s| *s == AuthState::Anonymous),
        )
        .await
        .expect("signed-out state")
        .unwrap();

        drop(listener);
        tokio::task::yield_now().await;
        ctx.client()
            .auth
            .sign_in_with_password("student@school.edu", "pw123456")
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(ctx.state(), AuthState::Anonymous);
    }

    #[tokio::test]
    async fn test_sign_in_failure_is_returned_as_value() {
        let (client, _) = memory_client();
        let ctx = AuthContext::new(client, "/login", "http://localhost:8080");

        let failure = ctx.sign_in("nobody@school.edu", "nope").await.unwrap_err();
        assert_eq!(failure.message, "Invalid login credentials");
        assert!(ctx.state().is_loading());
    }

    #[tokio::test]
    async fn test_sign_out_clears_state() {
        let (client, memory) = memory_client();
        let (scoped, _) = signed_up(&client, &memory);
        let ctx = AuthContext::new(scoped, "/login", "http://localhost:8080");
        assert!(ctx.init().await.is_authenticated());

        ctx.sign_out().await;
        assert_eq!(ctx.state(), AuthState::Anonymous);
    }

    #[test]
    fn test_google_redirect_carries_next_and_challenge() {
        let (client, _) = memory_client();
        let ctx = AuthContext::new(client, "/login", "https://acetrack.example.edu/");

        let redirect = ctx.sign_in_with_google(Some("/events/4")).unwrap();

        assert!(redirect.url.contains("provider=google"));
        assert!(redirect.url.contains(&format!(
            "redirect_to={}",
            urlencoding::encode("https://acetrack.example.edu/auth/callback?next=%2Fevents%2F4")
        )));
        assert!(redirect.url.contains(&format!(
            "code_challenge={}",
            pkce::challenge_for(&redirect.code_verifier)
        )));
    }
}
