// SPDX-License-Identifier: MIT
// Copyright 2026 The Acetrack Authors

//! HTTP client for the hosted database's REST endpoints (`/rest/v1`).

use crate::error::AppError;
use serde::{Deserialize, Serialize};

/// Table REST client. Row-level security applies to the bearer token.
#[derive(Clone)]
pub struct PostgrestClient {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
}

impl PostgrestClient {
    pub fn new(http: reqwest::Client, project_url: &str, anon_key: &str) -> Self {
        Self {
            http,
            base_url: format!("{}/rest/v1", project_url.trim_end_matches('/')),
            anon_key: anon_key.to_string(),
        }
    }

    /// The anon key doubles as the bearer for signed-out requests.
    pub fn anon_key(&self) -> &str {
        &self.anon_key
    }

    /// `GET /rest/v1/{table}?{query}`
    pub async fn select<T: for<'de> Deserialize<'de>>(
        &self,
        bearer: &str,
        table: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, AppError> {
        let response = self
            .http
            .get(format!("{}/{}", self.base_url, table))
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer)
            .query(query)
            .send()
            .await
            .map_err(|e| AppError::Baas(e.to_string()))?;

        check_rest_response(response).await
    }

    /// Select at most one row; no match is `Ok(None)`.
    pub async fn select_one<T: for<'de> Deserialize<'de>>(
        &self,
        bearer: &str,
        table: &str,
        query: &[(&str, String)],
    ) -> Result<Option<T>, AppError> {
        let mut query = query.to_vec();
        query.push(("limit", "1".to_string()));
        let rows: Vec<T> = self.select(bearer, table, &query).await?;
        Ok(rows.into_iter().next())
    }

    /// Insert one row and return it as stored.
    pub async fn insert<B: Serialize, T: for<'de> Deserialize<'de>>(
        &self,
        bearer: &str,
        table: &str,
        row: &B,
    ) -> Result<T, AppError> {
        let response = self
            .http
            .post(format!("{}/{}", self.base_url, table))
            .header("apikey", &self.anon_key)
            .header("Prefer", "return=representation")
            .bearer_auth(bearer)
            .json(row)
            .send()
            .await
            .map_err(|e| AppError::Baas(e.to_string()))?;

        let rows: Vec<T> = check_rest_response(response).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| AppError::Baas(format!("insert into {} returned no row", table)))
    }
}

/// PostgREST error body.
#[derive(Deserialize)]
struct RestErrorBody {
    #[serde(default)]
    code: Option<String>,
    message: String,
}

async fn check_rest_response<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
) -> Result<T, AppError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let detail = match serde_json::from_str::<RestErrorBody>(&body) {
            Ok(err) => match err.code {
                Some(code) => format!("{} ({})", err.message, code),
                None => err.message,
            },
            Err(_) => body,
        };
        if status.as_u16() == 401 {
            return Err(AppError::InvalidToken);
        }
        return Err(AppError::Baas(format!("HTTP {}: {}", status, detail)));
    }

    response
        .json()
        .await
        .map_err(|e| AppError::Baas(format!("JSON parse error: {}", e)))
}

/// PostgREST equality filter value.
pub fn eq<T: std::fmt::Display>(value: T) -> String {
    format!("eq.{}", value)
}
