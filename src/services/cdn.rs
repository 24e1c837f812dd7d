// SPDX-License-Identifier: MIT
// Copyright 2026 The Acetrack Authors

//! Image CDN uploads (avatars).

use crate::config::CdnConfig;
use crate::error::AppError;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use sha2::{Digest, Sha256};

const DEFAULT_API_BASE: &str = "https://api.cloudinary.com/v1_1";

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(default)]
    secure_url: Option<String>,
    #[serde(default)]
    error: Option<UploadError>,
}

#[derive(Debug, Deserialize)]
struct UploadError {
    message: String,
}

/// Uploads images to the CDN and returns their public HTTPS URL.
#[derive(Clone)]
pub struct CdnUploader {
    http: reqwest::Client,
    config: CdnConfig,
    api_base: String,
}

impl CdnUploader {
    pub fn new(http: reqwest::Client, config: CdnConfig) -> Self {
        Self {
            http,
            config,
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }

    /// Point the uploader at a different API host.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn is_configured(&self) -> bool {
        !self.config.cloud_name.is_empty() && !self.config.upload_preset.is_empty()
    }

    fn upload_url(&self) -> String {
        format!("{}/{}/image/upload", self.api_base, self.config.cloud_name)
    }

    /// Upload one image. Signed when both API key and secret are set,
    /// otherwise relies on the unsigned upload preset.
    pub async fn upload(
        &self,
        file_name: &str,
        content_type: Option<&str>,
        bytes: Vec<u8>,
    ) -> Result<String, AppError> {
        if !self.is_configured() {
            return Err(AppError::Cdn("Image uploads are not configured".to_string()));
        }
        if bytes.is_empty() {
            return Err(AppError::BadRequest("Uploaded file is empty".to_string()));
        }

        let mut part = Part::bytes(bytes).file_name(file_name.to_string());
        if let Some(content_type) = content_type {
            part = part
                .mime_str(content_type)
                .map_err(|_| AppError::BadRequest(format!("Unsupported content type: {content_type}")))?;
        }

        let mut form = Form::new()
            .part("file", part)
            .text("upload_preset", self.config.upload_preset.clone())
            .text("cloud_name", self.config.cloud_name.clone());

        if let (Some(api_key), Some(api_secret)) = (&self.config.api_key, &self.config.api_secret) {
            let timestamp = chrono::Utc::now().timestamp().to_string();
            let signature = sign_params(
                &[
                    ("timestamp", timestamp.as_str()),
                    ("upload_preset", self.config.upload_preset.as_str()),
                ],
                api_secret,
            );
            form = form
                .text("timestamp", timestamp)
                .text("api_key", api_key.clone())
                .text("signature", signature)
                .text("signature_algorithm", "sha256");
        }

        tracing::debug!(file_name, cloud = %self.config.cloud_name, "Uploading image");

        let response = self
            .http
            .post(self.upload_url())
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::Cdn(format!("upload request failed: {e}")))?;

        let status = response.status();
        let body: UploadResponse = response
            .json()
            .await
            .map_err(|e| AppError::Cdn(format!("HTTP {status}: unreadable response: {e}")))?;

        secure_url_from(status, body)
    }
}

fn secure_url_from(status: reqwest::StatusCode, body: UploadResponse) -> Result<String, AppError> {
    if let Some(err) = body.error {
        return Err(AppError::Cdn(err.message));
    }
    match body.secure_url {
        Some(url) if status.is_success() && !url.is_empty() => Ok(url),
        _ => Err(AppError::Cdn(format!("HTTP {status}: no secure_url in response"))),
    }
}

/// Request signature: SHA-256 over the parameters sorted by name, joined as
/// `k=v&k=v`, with the API secret appended. Hex encoded.
fn sign_params(params: &[(&str, &str)], api_secret: &str) -> String {
    let mut sorted = params.to_vec();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let to_sign = sorted
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}
