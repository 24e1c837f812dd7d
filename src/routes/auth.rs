// SPDX-License-Identifier: MIT
// Copyright 2026 The Acetrack Authors

//! Authentication routes: password login, registration, Google OAuth
//! (PKCE) and session maintenance.

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::cookies;
use crate::error::{AppError, Result};
use crate::models::profile::first_validation_message;
use crate::middleware::session::{found, LOGIN_PATH};
use crate::services::{AuthContext, AuthState};
use crate::AppState;

pub const AUTH_CODE_ERROR_PATH: &str = "/auth/auth-code-error";
const DASHBOARD_PATH: &str = "/dashboard";
const SETUP_PROFILE_PATH: &str = "/setup-profile";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
        .route("/auth/google", get(google_start))
        .route("/auth/callback", get(auth_callback))
        .route(AUTH_CODE_ERROR_PATH, get(auth_code_error))
        .route("/auth/logout", post(logout))
        .route("/auth/refresh", post(refresh))
        .route("/auth/session", get(session_state))
        .route("/auth/implicit", post(implicit_session))
}

/// Where the browser should navigate next.
#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RedirectResponse {
    pub redirect: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl RedirectResponse {
    fn to(path: &str) -> Json<Self> {
        Json(Self {
            redirect: path.to_string(),
            message: None,
        })
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Please enter a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Please enter a valid email address"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    #[validate(length(min = 1, max = 100, message = "First name is required"))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100, message = "Last name is required"))]
    pub last_name: String,
}

fn check<T: Validate>(body: &T) -> Result<()> {
    body.validate()
        .map_err(|errors| AppError::BadRequest(first_validation_message(&errors)))
}

/// Password sign-in. Users who have not finished profile setup are sent
/// there instead of the dashboard.
async fn login(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    jar: CookieJar,
    Json(body): Json<LoginRequest>,
) -> Result<(CookieJar, Json<RedirectResponse>)> {
    check(&body)?;

    let ctx = AuthContext::new(
        state.baas.scoped(None),
        LOGIN_PATH,
        state.config.public_origin(&headers),
    );
    let session = ctx
        .sign_in(body.email.trim(), &body.password)
        .await
        .map_err(|failure| AppError::Auth(failure.message))?;

    let user_id = session.user.as_ref().map(|u| u.id);
    tracing::info!(user_id = ?user_id, "Password sign-in");

    let needs_profile = match user_id {
        Some(id) => matches!(ctx.client().db.get_profile(id).await, Ok(None)),
        None => false,
    };
    let next = if needs_profile {
        SETUP_PROFILE_PATH
    } else {
        DASHBOARD_PATH
    };

    let jar = cookies::with_session(jar, &session, state.config.secure_cookies());
    Ok((jar, RedirectResponse::to(next)))
}

/// Account registration. Without a session (email confirmation pending)
/// the user is sent back to the login page.
async fn register(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    jar: CookieJar,
    Json(body): Json<RegisterRequest>,
) -> Result<(CookieJar, Json<RedirectResponse>)> {
    check(&body)?;

    let first_name = body.first_name.trim();
    let last_name = body.last_name.trim();
    let metadata = serde_json::json!({
        "first_name": first_name,
        "last_name": last_name,
        "full_name": format!("{first_name} {last_name}"),
    });

    let ctx = AuthContext::new(
        state.baas.scoped(None),
        "/register",
        state.config.public_origin(&headers),
    );
    let outcome = ctx
        .sign_up(body.email.trim(), &body.password, metadata)
        .await
        .map_err(|failure| AppError::Auth(failure.message))?;

    tracing::info!(user_id = %outcome.user.id, confirmed = outcome.session.is_some(), "Registered");

    match outcome.session {
        Some(session) => {
            let jar = cookies::with_session(jar, &session, state.config.secure_cookies());
            Ok((jar, RedirectResponse::to(SETUP_PROFILE_PATH)))
        }
        None => Ok((
            jar,
            Json(RedirectResponse {
                redirect: LOGIN_PATH.to_string(),
                message: Some("Check your email to confirm your account".to_string()),
            }),
        )),
    }
}

#[derive(Debug, Deserialize)]
pub struct GoogleStartParams {
    #[serde(default)]
    next: Option<String>,
}

/// Start Google sign-in: store the PKCE verifier and redirect to the
/// provider.
async fn google_start(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    jar: CookieJar,
    Query(params): Query<GoogleStartParams>,
) -> Result<Response> {
    let ctx = AuthContext::new(
        state.baas.scoped(None),
        LOGIN_PATH,
        state.config.public_origin(&headers),
    );
    let redirect = ctx
        .sign_in_with_google(params.next.as_deref())
        .map_err(|failure| AppError::Auth(failure.message))?;

    tracing::info!(next = ?params.next, "Starting Google OAuth flow");

    let jar = cookies::with_code_verifier(jar, &redirect.code_verifier, state.config.secure_cookies());
    Ok((jar, found(&redirect.url)).into_response())
}

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    next: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

/// Only same-site relative paths are honoured as redirect targets.
pub fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(path)
            if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') =>
        {
            path
        }
        _ => LOGIN_PATH,
    }
}

fn code_error_redirect(origin: &str, error: &str) -> Response {
    found(&format!(
        "{origin}{AUTH_CODE_ERROR_PATH}?error={}",
        urlencoding::encode(error)
    ))
}

/// OAuth callback: exchange the authorization code for a session and
/// store it in cookies.
async fn auth_callback(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> Response {
    let origin = state.config.public_origin(&headers);

    let Some(code) = params.code.filter(|c| !c.is_empty()) else {
        if let Some(description) = &params.error_description {
            tracing::warn!(error = %description, "OAuth provider returned an error");
        }
        return code_error_redirect(&origin, "no_code");
    };

    let verifier = cookies::code_verifier(&jar).unwrap_or_default();
    let client = state.baas.scoped(None);

    match client.auth.exchange_code_for_session(&code, &verifier).await {
        Ok(session) => {
            let secure = state.config.secure_cookies();
            let next = safe_next(params.next.as_deref());
            tracing::info!(
                user_id = ?session.user.as_ref().map(|u| u.id),
                next = %next,
                "OAuth code exchanged"
            );

            let jar = cookies::with_session(jar, &session, secure);
            let jar = cookies::clear_code_verifier(jar, secure);
            (jar, found(&format!("{origin}{next}"))).into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, "OAuth code exchange failed");
            code_error_redirect(&origin, &e.user_message())
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AuthCodeErrorParams {
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AuthCodeErrorResponse {
    pub error: String,
    pub message: String,
}

async fn auth_code_error(
    Query(params): Query<AuthCodeErrorParams>,
) -> (StatusCode, Json<AuthCodeErrorResponse>) {
    let error = params.error.unwrap_or_else(|| "unknown_error".to_string());
    (
        StatusCode::BAD_REQUEST,
        Json(AuthCodeErrorResponse {
            error,
            message: "Sign-in could not be completed. Please try again.".to_string(),
        }),
    )
}

/// Sign out everywhere this session is known. Remote failures are logged;
/// the cookies are cleared regardless.
async fn logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> (CookieJar, StatusCode) {
    let client = state.baas.scoped(cookies::read_session(&jar));
    if let Err(e) = client.auth.sign_out().await {
        tracing::warn!(error = %e, "Remote sign-out failed");
    }

    let jar = cookies::clear_session(jar, state.config.secure_cookies());
    (jar, StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub expires_at: Option<i64>,
}

/// Rotate the session tokens held in cookies.
async fn refresh(State(state): State<Arc<AppState>>, jar: CookieJar) -> Result<Response> {
    let secure = state.config.secure_cookies();
    let client = state.baas.scoped(cookies::read_session(&jar));

    match client.auth.refresh_current().await {
        Ok(session) => {
            let expires_at = session.expires_at;
            let jar = cookies::with_session(jar, &session, secure);
            Ok((jar, Json(RefreshResponse { expires_at })).into_response())
        }
        Err(AppError::Auth(msg)) => {
            tracing::info!(reason = %msg, "Refresh token rejected");
            Ok((cookies::clear_session(jar, secure), AppError::Unauthorized).into_response())
        }
        Err(e) => Err(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct SessionStateParams {
    /// Page to evaluate the session for; defaults to an auth-flow path.
    #[serde(default)]
    path: Option<String>,
}

/// Report the caller's auth state as the page at `path` would see it.
async fn session_state(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    jar: CookieJar,
    Query(params): Query<SessionStateParams>,
) -> (CookieJar, Json<AuthState>) {
    let incoming = cookies::read_session(&jar);
    let path = params
        .path
        .filter(|p| p.starts_with('/'))
        .unwrap_or_else(|| "/auth/session".to_string());

    let ctx = AuthContext::new(
        state.baas.scoped(incoming.clone()),
        path,
        state.config.public_origin(&headers),
    );
    let auth_state = ctx.init().await;

    let current = ctx.client().auth.current_session();
    let jar = cookies::sync_session(
        jar,
        incoming.as_ref(),
        current.as_ref(),
        state.config.secure_cookies(),
    );
    (jar, Json(auth_state))
}

#[derive(Debug, Deserialize)]
pub struct ImplicitSessionRequest {
    /// Redirect URL (or just its fragment) as seen by the browser.
    pub url: String,
    #[serde(default)]
    pub next: Option<String>,
}

/// Accept a session delivered in a redirect URL fragment, which the
/// browser cannot forward to the server on its own.
async fn implicit_session(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(body): Json<ImplicitSessionRequest>,
) -> Result<(CookieJar, Json<RedirectResponse>)> {
    let client = state.baas.scoped(None);
    let session = client
        .auth
        .session_from_url(&body.url)
        .await?
        .ok_or_else(|| AppError::BadRequest("No session found in URL".to_string()))?;

    let jar = cookies::with_session(jar, &session, state.config.secure_cookies());
    let next = match body.next.as_deref() {
        Some(_) => safe_next(body.next.as_deref()),
        None => DASHBOARD_PATH,
    };
    Ok((jar, RedirectResponse::to(next)))
}
