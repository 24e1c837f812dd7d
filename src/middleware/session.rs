// SPDX-License-Identifier: MIT
// Copyright 2026 The Acetrack Authors

//! Session gate for protected pages.

use crate::cookies;
use crate::services::{AuthContext, AuthState};
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;

pub const LOGIN_PATH: &str = "/login";

/// Plain `302 Found` redirect.
pub fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

/// Resolve the caller's auth state for the requested page. Anonymous
/// callers are sent to the login page; otherwise the `AuthContext` is
/// handed to the handler as an extension. Refreshed tokens are written
/// back as cookies.
///
/// Session cookies are only cleared once the session was rejected or
/// signed out. A lookup that failed upstream redirects with cookies intact.
pub async fn require_session(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let secure = state.config.secure_cookies();
    let incoming = cookies::read_session(&jar);
    let path = request.uri().path().to_string();
    let origin = state.config.public_origin(request.headers());

    let ctx = Arc::new(AuthContext::new(
        state.baas.scoped(incoming.clone()),
        path.as_str(),
        origin,
    ));
    let auth_state = ctx.init().await;

    if !auth_state.is_authenticated() {
        tracing::debug!(
            path = %path,
            had_session = incoming.is_some(),
            lookup_failed = auth_state.is_loading(),
            "Redirecting to login"
        );
        let jar = match (&incoming, &auth_state) {
            (Some(_), AuthState::Anonymous) => cookies::clear_session(jar, secure),
            _ => jar,
        };
        return (jar, found(LOGIN_PATH)).into_response();
    }

    request.extensions_mut().insert(ctx.clone());
    let response = next.run(request).await;

    let current = ctx.client().auth.current_session();
    let jar = cookies::sync_session(jar, incoming.as_ref(), current.as_ref(), secure);
    (jar, response).into_response()
}
