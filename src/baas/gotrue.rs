// SPDX-License-Identifier: MIT
// Copyright 2026 The Acetrack Authors

//! HTTP client for the hosted auth endpoints (`/auth/v1`).
//!
//! Handles:
//! - Password sign-in and sign-up
//! - PKCE authorization-code exchange
//! - Refresh-token rotation
//! - Token introspection (`/user`) and logout

use crate::error::AppError;
use crate::models::{Session, User};
use serde::Deserialize;
use serde_json::json;

/// Auth API client.
#[derive(Clone)]
pub struct GoTrueClient {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
}

/// Either a session (auto-confirmed sign-up) or a bare user awaiting email
/// confirmation.
#[derive(Debug, Clone)]
pub struct SignUpOutcome {
    pub user: User,
    pub session: Option<Session>,
}

impl GoTrueClient {
    pub fn new(http: reqwest::Client, project_url: &str, anon_key: &str) -> Self {
        Self {
            http,
            base_url: format!("{}/auth/v1", project_url.trim_end_matches('/')),
            anon_key: anon_key.to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AppError> {
        self.token_grant("password", json!({ "email": email, "password": password }))
            .await
    }

    pub async fn exchange_code(&self, auth_code: &str, verifier: &str) -> Result<Session, AppError> {
        self.token_grant(
            "pkce",
            json!({ "auth_code": auth_code, "code_verifier": verifier }),
        )
        .await
    }

    pub async fn refresh(&self, refresh_token: &str) -> Result<Session, AppError> {
        self.token_grant("refresh_token", json!({ "refresh_token": refresh_token }))
            .await
    }

    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &serde_json::Value,
    ) -> Result<SignUpOutcome, AppError> {
        let response = self
            .http
            .post(format!("{}/signup", self.base_url))
            .header("apikey", &self.anon_key)
            .json(&json!({ "email": email, "password": password, "data": metadata }))
            .send()
            .await
            .map_err(|e| AppError::Baas(e.to_string()))?;

        let body: serde_json::Value = check_auth_response(response).await?;

        // Auto-confirmed projects answer with a full session; otherwise the
        // body is the user itself.
        if body.get("access_token").is_some() {
            let session: Session = serde_json::from_value(body)
                .map_err(|e| AppError::Baas(format!("JSON parse error: {}", e)))?;
            let session = session.with_expiry_from(chrono::Utc::now().timestamp());
            let user = session
                .user
                .clone()
                .ok_or_else(|| AppError::Baas("sign-up session without user".to_string()))?;
            Ok(SignUpOutcome {
                user,
                session: Some(session),
            })
        } else {
            let user: User = serde_json::from_value(body)
                .map_err(|e| AppError::Baas(format!("JSON parse error: {}", e)))?;
            Ok(SignUpOutcome {
                user,
                session: None,
            })
        }
    }

    /// Resolve the user behind an access token.
    pub async fn get_user(&self, access_token: &str) -> Result<User, AppError> {
        let response = self
            .http
            .get(format!("{}/user", self.base_url))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AppError::Baas(e.to_string()))?;

        if matches!(response.status().as_u16(), 401 | 403) {
            return Err(AppError::InvalidToken);
        }
        check_auth_response(response).await
    }

    /// Revoke the refresh tokens behind an access token.
    pub async fn logout(&self, access_token: &str) -> Result<(), AppError> {
        let response = self
            .http
            .post(format!("{}/logout", self.base_url))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AppError::Baas(e.to_string()))?;

        // Already-expired sessions are as good as signed out.
        if response.status().is_success() || matches!(response.status().as_u16(), 401 | 404) {
            return Ok(());
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(AppError::Baas(format!("HTTP {}: {}", status, body)))
    }

    async fn token_grant(
        &self,
        grant_type: &str,
        body: serde_json::Value,
    ) -> Result<Session, AppError> {
        let response = self
            .http
            .post(format!("{}/token", self.base_url))
            .query(&[("grant_type", grant_type)])
            .header("apikey", &self.anon_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Baas(format!("Token request failed: {}", e)))?;

        let session: Session = check_auth_response(response).await?;
        Ok(session.with_expiry_from(chrono::Utc::now().timestamp()))
    }
}

/// Error body shapes used by the auth service across versions.
#[derive(Deserialize, Default)]
struct AuthErrorBody {
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl AuthErrorBody {
    fn into_message(self) -> Option<String> {
        self.error_description
            .or(self.msg)
            .or(self.message)
            .or(self.error)
    }
}

/// Map auth responses: 4xx are user-facing auth failures, everything else
/// is an upstream error.
async fn check_auth_response<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
) -> Result<T, AppError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<AuthErrorBody>(&body)
            .ok()
            .and_then(AuthErrorBody::into_message)
            .unwrap_or_else(|| format!("HTTP {}", status));

        if status.as_u16() == 429 {
            tracing::warn!("Auth rate limit hit (429)");
        }
        if status.is_client_error() {
            return Err(AppError::Auth(message));
        }
        return Err(AppError::Baas(format!("HTTP {}: {}", status, message)));
    }

    response
        .json()
        .await
        .map_err(|e| AppError::Baas(format!("JSON parse error: {}", e)))
}
