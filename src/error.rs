// SPDX-License-Identifier: MIT
// Copyright 2026 The Acetrack Authors

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid or expired token")]
    InvalidToken,

    /// Credentials or an OAuth exchange were rejected by the auth service.
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// A write was rejected; the message is shown inline next to the form.
    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("BaaS error: {0}")]
    Baas(String),

    #[error("Image CDN error: {0}")]
    Cdn(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Message suitable for showing next to a form field or banner.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Auth(msg)
            | AppError::BadRequest(msg)
            | AppError::WriteFailed(msg)
            | AppError::NotFound(msg) => msg.clone(),
            AppError::Unauthorized | AppError::InvalidToken => "Please sign in again".to_string(),
            AppError::Baas(_) | AppError::Cdn(_) | AppError::Internal(_) => {
                "Something went wrong, please try again".to_string()
            }
        }
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", None),
            AppError::InvalidToken => (StatusCode::UNAUTHORIZED, "invalid_token", None),
            AppError::Auth(msg) => (
                StatusCode::UNAUTHORIZED,
                "authentication_failed",
                Some(msg.clone()),
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::WriteFailed(msg) => {
                tracing::warn!(error = %msg, "Write rejected");
                (StatusCode::BAD_REQUEST, "write_failed", Some(msg.clone()))
            }
            AppError::Baas(msg) => {
                tracing::error!(error = %msg, "BaaS error");
                (StatusCode::BAD_GATEWAY, "baas_error", None)
            }
            AppError::Cdn(msg) => {
                tracing::error!(error = %msg, "Image CDN error");
                (StatusCode::BAD_GATEWAY, "cdn_error", Some(msg.clone()))
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
