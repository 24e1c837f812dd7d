// SPDX-License-Identifier: MIT
// Copyright 2026 The Acetrack Authors

//! Access-token (JWT) helpers.

use crate::models::{User, UserMetadata};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Audience the auth service puts on user tokens.
pub const AUTHENTICATED_AUDIENCE: &str = "authenticated";

/// Claims carried by an access token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AccessClaims {
    /// Subject (auth user id)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
    pub aud: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: UserMetadata,
}

impl AccessClaims {
    pub fn user(&self) -> Option<User> {
        Some(User {
            id: Uuid::parse_str(&self.sub).ok()?,
            email: self.email.clone(),
            user_metadata: self.user_metadata.clone(),
        })
    }
}

/// Verify an HS256 access token against the project secret.
pub fn verify_access_token(token: &str, secret: &[u8]) -> Option<AccessClaims> {
    let key = DecodingKey::from_secret(secret);
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[AUTHENTICATED_AUDIENCE]);

    decode::<AccessClaims>(token, &key, &validation)
        .map(|data| data.claims)
        .ok()
}

/// Sign an access token for a user.
pub fn create_access_token(user: &User, ttl_secs: usize, secret: &[u8]) -> anyhow::Result<String> {
    use jsonwebtoken::{encode, EncodingKey, Header};
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs() as usize;

    let claims = AccessClaims {
        sub: user.id.to_string(),
        iat: now,
        exp: now + ttl_secs,
        aud: AUTHENTICATED_AUDIENCE.to_string(),
        role: Some(AUTHENTICATED_AUDIENCE.to_string()),
        email: user.email.clone(),
        user_metadata: user.user_metadata.clone(),
    };

    Ok(encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret),
    )?)
}

/// Read `exp` without checking the signature. Only used to decide whether
/// a refresh is due; the token is verified before it is trusted.
pub fn peek_expiry(token: &str) -> Option<i64> {
    #[derive(Deserialize)]
    struct ExpOnly {
        exp: i64,
    }

    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    decode::<ExpOnly>(token, &DecodingKey::from_secret(&[]), &validation)
        .map(|data| data.claims.exp)
        .ok()
}
