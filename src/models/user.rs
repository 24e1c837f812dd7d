// SPDX-License-Identifier: MIT
// Copyright 2026 The Acetrack Authors

//! Identity records issued by the auth service.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Authenticated identity. Owned by the auth service; this app only reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: UserMetadata,
}

/// Free-form metadata: sign-up form fields or OAuth provider claims.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Google `given_name` claim
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    /// Google `family_name` claim
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl UserMetadata {
    /// Best-effort (first, last) name from whatever the provider supplied.
    pub fn name_parts(&self) -> (String, String) {
        let first = self.first_name.as_ref().or(self.given_name.as_ref());
        let last = self.last_name.as_ref().or(self.family_name.as_ref());
        if let (Some(first), Some(last)) = (first, last) {
            return (first.clone(), last.clone());
        }

        let full = self
            .full_name
            .as_deref()
            .or(self.name.as_deref())
            .unwrap_or("")
            .trim();
        match full.rsplit_once(char::is_whitespace) {
            Some((first, last)) => (first.trim().to_string(), last.to_string()),
            None => (
                first.cloned().unwrap_or_else(|| full.to_string()),
                last.cloned().unwrap_or_default(),
            ),
        }
    }

    pub fn avatar(&self) -> Option<&str> {
        self.avatar_url.as_deref().or(self.picture.as_deref())
    }
}
