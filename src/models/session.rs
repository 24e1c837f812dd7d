// SPDX-License-Identifier: MIT
// Copyright 2026 The Acetrack Authors

//! Session tokens issued by the auth service.

use crate::models::User;
use serde::{Deserialize, Serialize};

/// An access/refresh token pair plus the identity it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token expiry (Unix seconds). Unknown for sessions rebuilt
    /// from tokens alone until the token is inspected.
    #[serde(default)]
    pub expires_at: Option<i64>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub user: Option<User>,
}

impl Session {
    /// Rebuild a session from raw tokens (cookies, URL fragments).
    pub fn from_tokens(access_token: String, refresh_token: String) -> Self {
        let expires_at = crate::baas::token::peek_expiry(&access_token);
        Self {
            access_token,
            refresh_token,
            expires_at,
            expires_in: None,
            user: None,
        }
    }

    /// True when the access token is gone or expires within `margin_secs`.
    pub fn expires_within(&self, now: i64, margin_secs: i64) -> bool {
        if self.access_token.is_empty() {
            return true;
        }
        match self.expires_at {
            Some(expires_at) => expires_at <= now + margin_secs,
            None => false,
        }
    }

    /// Fill `expires_at` from `expires_in` when the service only sent the latter.
    pub fn with_expiry_from(mut self, now: i64) -> Self {
        if self.expires_at.is_none() {
            self.expires_at = self.expires_in.map(|secs| now + secs);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(expires_at: Option<i64>) -> Session {
        Session {
            access_token: "token".into(),
            refresh_token: "refresh".into(),
            expires_at,
            expires_in: None,
            user: None,
        }
    }

    #[test]
    fn test_expires_within_margin() {
        assert!(session(Some(1_000)).expires_within(990, 30));
        assert!(!session(Some(1_000)).expires_within(900, 30));
        assert!(!session(None).expires_within(900, 30));
    }

    #[test]
    fn test_empty_access_token_counts_as_expired() {
        let s = Session::from_tokens(String::new(), "refresh".into());
        assert!(s.expires_within(0, 0));
    }

    #[test]
    fn test_expiry_from_expires_in() {
        let mut s = session(None);
        s.expires_in = Some(3600);
        assert_eq!(s.with_expiry_from(100).expires_at, Some(3700));
    }
}
