// SPDX-License-Identifier: MIT
// Copyright 2026 The Acetrack Authors

//! Session and PKCE cookies.
//!
//! Removal cookies repeat the path and flags used at creation so browsers
//! actually drop them.

use crate::models::Session;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::Duration;

pub const ACCESS_TOKEN_COOKIE: &str = "sb-access-token";
pub const REFRESH_TOKEN_COOKIE: &str = "sb-refresh-token";
pub const CODE_VERIFIER_COOKIE: &str = "sb-code-verifier";

const SESSION_PATH: &str = "/";
const CALLBACK_PATH: &str = "/auth/callback";
const SESSION_MAX_AGE: Duration = Duration::days(7);
const VERIFIER_MAX_AGE: Duration = Duration::minutes(10);

fn build(
    name: &'static str,
    value: String,
    path: &'static str,
    max_age: Duration,
    secure: bool,
) -> Cookie<'static> {
    Cookie::build((name, value))
        .path(path)
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(max_age)
        .build()
}

/// Rebuild the browser's session from its cookies. Either token alone is
/// enough; a lone refresh token gets refreshed on first use.
pub fn read_session(jar: &CookieJar) -> Option<Session> {
    let value = |name| {
        jar.get(name)
            .map(|c| c.value().to_string())
            .filter(|v| !v.is_empty())
    };
    let access_token = value(ACCESS_TOKEN_COOKIE);
    let refresh_token = value(REFRESH_TOKEN_COOKIE);

    if access_token.is_none() && refresh_token.is_none() {
        return None;
    }
    Some(Session::from_tokens(
        access_token.unwrap_or_default(),
        refresh_token.unwrap_or_default(),
    ))
}

pub fn with_session(jar: CookieJar, session: &Session, secure: bool) -> CookieJar {
    jar.add(build(
        ACCESS_TOKEN_COOKIE,
        session.access_token.clone(),
        SESSION_PATH,
        SESSION_MAX_AGE,
        secure,
    ))
    .add(build(
        REFRESH_TOKEN_COOKIE,
        session.refresh_token.clone(),
        SESSION_PATH,
        SESSION_MAX_AGE,
        secure,
    ))
}

pub fn clear_session(jar: CookieJar, secure: bool) -> CookieJar {
    jar.add(build(ACCESS_TOKEN_COOKIE, String::new(), SESSION_PATH, Duration::ZERO, secure))
        .add(build(REFRESH_TOKEN_COOKIE, String::new(), SESSION_PATH, Duration::ZERO, secure))
}

/// Write back whatever the request ended up with: rotated tokens are
/// stored, a dropped session is cleared, an unchanged one is left alone.
pub fn sync_session(
    jar: CookieJar,
    before: Option<&Session>,
    after: Option<&Session>,
    secure: bool,
) -> CookieJar {
    match (before, after) {
        (_, Some(after)) if before.map(|b| &b.access_token) != Some(&after.access_token) => {
            with_session(jar, after, secure)
        }
        (Some(_), None) => clear_session(jar, secure),
        _ => jar,
    }
}

/// The PKCE verifier is only needed by the callback, so it is scoped there.
pub fn with_code_verifier(jar: CookieJar, verifier: &str, secure: bool) -> CookieJar {
    jar.add(build(
        CODE_VERIFIER_COOKIE,
        verifier.to_string(),
        CALLBACK_PATH,
        VERIFIER_MAX_AGE,
        secure,
    ))
}

pub fn code_verifier(jar: &CookieJar) -> Option<String> {
    jar.get(CODE_VERIFIER_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
}

pub fn clear_code_verifier(jar: CookieJar, secure: bool) -> CookieJar {
    jar.add(build(CODE_VERIFIER_COOKIE, String::new(), CALLBACK_PATH, Duration::ZERO, secure))
}
