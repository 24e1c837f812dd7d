// SPDX-License-Identifier: MIT
// Copyright 2026 The Acetrack Authors

//! Auth half of the BaaS client: session persistence, auto-refresh and
//! auth-state-change notifications on top of either backend.

use crate::baas::gotrue::{GoTrueClient, SignUpOutcome};
use crate::baas::memory::MemoryStore;
use crate::baas::token;
use crate::error::AppError;
use crate::models::{Session, User};
use chrono::Utc;
use serde::Serialize;
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;

/// Refresh this long before the access token actually expires.
const REFRESH_MARGIN_SECS: i64 = 30;
const EVENT_CHANNEL_CAPACITY: usize = 16;

/// Kind of auth-state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthEventKind {
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
}

/// Notification published after every state-changing auth call.
#[derive(Debug, Clone)]
pub struct AuthEvent {
    pub kind: AuthEventKind,
    pub session: Option<Session>,
}

/// Named slot holding the current session (the client's "local storage").
#[derive(Clone)]
pub struct SessionStore {
    key: Arc<str>,
    slot: Arc<RwLock<Option<Session>>>,
}

impl SessionStore {
    pub fn new(key: impl Into<Arc<str>>) -> Self {
        Self {
            key: key.into(),
            slot: Arc::new(RwLock::new(None)),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn get(&self) -> Option<Session> {
        self.slot
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn set(&self, session: Option<Session>) {
        *self
            .slot
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = session;
    }

    /// Bearer for data calls, if a session is present.
    pub fn access_token(&self) -> Option<String> {
        self.get()
            .map(|s| s.access_token)
            .filter(|t| !t.is_empty())
    }
}

#[derive(Clone)]
enum AuthBackend {
    Remote(GoTrueClient),
    Memory(Arc<MemoryStore>),
}

/// Auth operations against the hosted service.
#[derive(Clone)]
pub struct AuthApi {
    backend: AuthBackend,
    /// `{project}/auth/v1`, used to build provider redirects
    auth_url: String,
    /// Enables local access-token verification instead of `/user` calls
    jwt_secret: Option<Arc<[u8]>>,
    store: SessionStore,
    events: broadcast::Sender<AuthEvent>,
}

impl AuthApi {
    pub(crate) fn remote(client: GoTrueClient, jwt_secret: Option<&[u8]>, store: SessionStore) -> Self {
        let auth_url = client.base_url().to_string();
        Self::with_backend(AuthBackend::Remote(client), auth_url, jwt_secret.map(Arc::from), store)
    }

    pub(crate) fn memory(memory: Arc<MemoryStore>, project_url: &str, store: SessionStore) -> Self {
        let auth_url = format!("{}/auth/v1", project_url.trim_end_matches('/'));
        Self::with_backend(AuthBackend::Memory(memory), auth_url, None, store)
    }

    fn with_backend(
        backend: AuthBackend,
        auth_url: String,
        jwt_secret: Option<Arc<[u8]>>,
        store: SessionStore,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            backend,
            auth_url,
            jwt_secret,
            store,
            events,
        }
    }

    /// Same backend, separate session slot and notification channel.
    pub(crate) fn scoped(&self, store: SessionStore) -> Self {
        Self::with_backend(
            self.backend.clone(),
            self.auth_url.clone(),
            self.jwt_secret.clone(),
            store,
        )
    }

    pub fn storage_key(&self) -> &str {
        self.store.key()
    }

    /// Subscribe to auth-state changes. Dropping the receiver unsubscribes.
    pub fn on_auth_state_change(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    /// The persisted session as-is, without verification or refresh.
    pub fn current_session(&self) -> Option<Session> {
        self.store.get()
    }

    fn emit(&self, kind: AuthEventKind, session: Option<Session>) {
        tracing::debug!(event = ?kind, "Auth state change");
        // No subscribers is fine.
        let _ = self.events.send(AuthEvent { kind, session });
    }

    fn persist(&self, kind: AuthEventKind, session: Session) -> Session {
        self.store.set(Some(session.clone()));
        self.emit(kind, Some(session.clone()));
        session
    }

    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AppError> {
        let session = match &self.backend {
            AuthBackend::Remote(client) => client.sign_in_with_password(email, password).await?,
            AuthBackend::Memory(memory) => memory.sign_in_with_password(email, password)?,
        };
        Ok(self.persist(AuthEventKind::SignedIn, session))
    }

    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &serde_json::Value,
    ) -> Result<SignUpOutcome, AppError> {
        let outcome = match &self.backend {
            AuthBackend::Remote(client) => client.sign_up(email, password, metadata).await?,
            AuthBackend::Memory(memory) => memory.sign_up(email, password, metadata)?,
        };
        if let Some(session) = &outcome.session {
            self.persist(AuthEventKind::SignedIn, session.clone());
        }
        Ok(outcome)
    }

    /// Provider redirect URL for the PKCE authorization-code flow.
    pub fn authorize_url(&self, provider: &str, redirect_to: &str, code_challenge: &str) -> String {
        format!(
            "{}/authorize?provider={}&redirect_to={}&code_challenge={}&code_challenge_method=s256",
            self.auth_url,
            urlencoding::encode(provider),
            urlencoding::encode(redirect_to),
            urlencoding::encode(code_challenge)
        )
    }

    pub async fn exchange_code_for_session(
        &self,
        auth_code: &str,
        code_verifier: &str,
    ) -> Result<Session, AppError> {
        let session = match &self.backend {
            AuthBackend::Remote(client) => client.exchange_code(auth_code, code_verifier).await?,
            AuthBackend::Memory(memory) => memory.exchange_code(auth_code, code_verifier)?,
        };
        Ok(self.persist(AuthEventKind::SignedIn, session))
    }

    /// Resolve the user behind an access token.
    pub async fn get_user(&self, access_token: &str) -> Result<User, AppError> {
        if let Some(secret) = &self.jwt_secret {
            if let Some(user) =
                token::verify_access_token(access_token, secret).and_then(|claims| claims.user())
            {
                return Ok(user);
            }
        }
        match &self.backend {
            AuthBackend::Remote(client) => client.get_user(access_token).await,
            AuthBackend::Memory(memory) => memory.get_user(access_token),
        }
    }

    /// Current session, verified. Expired or rejected access tokens are
    /// refreshed when a refresh token is available; a session that cannot
    /// be refreshed is dropped.
    pub async fn get_session(&self) -> Result<Option<Session>, AppError> {
        let Some(mut session) = self.store.get() else {
            return Ok(None);
        };

        let now = Utc::now().timestamp();
        if !session.expires_within(now, REFRESH_MARGIN_SECS) {
            match self.get_user(&session.access_token).await {
                Ok(user) => {
                    let updated = session.user.as_ref().is_some_and(|known| *known != user);
                    session.user = Some(user);
                    self.store.set(Some(session.clone()));
                    if updated {
                        self.emit(AuthEventKind::UserUpdated, Some(session.clone()));
                    }
                    return Ok(Some(session));
                }
                Err(AppError::InvalidToken) => {
                    tracing::debug!("Access token rejected, attempting refresh");
                }
                Err(e) => return Err(e),
            }
        }

        if session.refresh_token.is_empty() {
            self.store.set(None);
            return Ok(None);
        }

        match self.refresh_session(&session.refresh_token).await {
            Ok(refreshed) => Ok(Some(refreshed)),
            Err(AppError::Auth(msg)) => {
                tracing::info!(reason = %msg, "Stored session could not be refreshed");
                self.store.set(None);
                self.emit(AuthEventKind::SignedOut, None);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Exchange a refresh token for a new session.
    pub async fn refresh_session(&self, refresh_token: &str) -> Result<Session, AppError> {
        let mut session = match &self.backend {
            AuthBackend::Remote(client) => client.refresh(refresh_token).await?,
            AuthBackend::Memory(memory) => memory.refresh(refresh_token)?,
        };
        if session.user.is_none() {
            session.user = Some(self.get_user(&session.access_token).await?);
        }
        Ok(self.persist(AuthEventKind::TokenRefreshed, session))
    }

    /// Refresh the persisted session unconditionally.
    pub async fn refresh_current(&self) -> Result<Session, AppError> {
        let refresh_token = self
            .store
            .get()
            .map(|s| s.refresh_token)
            .filter(|t| !t.is_empty())
            .ok_or(AppError::Unauthorized)?;
        self.refresh_session(&refresh_token).await
    }

    /// Revoke the session remotely and forget it locally. The local session
    /// is cleared even when the remote call fails.
    pub async fn sign_out(&self) -> Result<(), AppError> {
        let access_token = self.store.access_token();
        self.store.set(None);

        let result = match (&self.backend, access_token) {
            (AuthBackend::Remote(client), Some(token)) => client.logout(&token).await,
            (AuthBackend::Memory(memory), Some(token)) => memory.logout(&token),
            (_, None) => Ok(()),
        };

        self.emit(AuthEventKind::SignedOut, None);
        result
    }

    /// Pick up a session delivered in a redirect URL fragment
    /// (`#access_token=...&refresh_token=...&expires_in=...`).
    pub async fn session_from_url(&self, url: &str) -> Result<Option<Session>, AppError> {
        let fragment = url.split_once('#').map(|(_, f)| f).unwrap_or(url);
        let params = parse_fragment(fragment);
        let param = |name: &str| {
            params
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.clone())
        };

        if let Some(description) = param("error_description").or_else(|| param("error")) {
            return Err(AppError::Auth(description));
        }

        let (Some(access_token), Some(refresh_token)) =
            (param("access_token"), param("refresh_token"))
        else {
            return Ok(None);
        };

        let mut session = Session::from_tokens(access_token, refresh_token);
        if let Some(expires_in) = param("expires_in").and_then(|v| v.parse::<i64>().ok()) {
            session.expires_in = Some(expires_in);
            session.expires_at = Some(Utc::now().timestamp() + expires_in);
        }
        session.user = Some(self.get_user(&session.access_token).await?);

        Ok(Some(self.persist(AuthEventKind::SignedIn, session)))
    }
}

fn parse_fragment(fragment: &str) -> Vec<(String, String)> {
    fragment
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .map(|(k, v)| {
            let v = v.replace('+', " ");
            (
                k.to_string(),
                urlencoding::decode(&v)
                    .map(|d| d.into_owned())
                    .unwrap_or(v),
            )
        })
        .collect()
}
