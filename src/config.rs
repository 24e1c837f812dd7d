// SPDX-License-Identifier: MIT
// Copyright 2026 The Acetrack Authors

//! Application configuration loaded from environment variables.
//!
//! Everything except the CDN API secret is public project configuration.

use axum::http::{header, HeaderMap};
use std::env;

const FORWARDED_HOST: &str = "x-forwarded-host";

/// Whole-app maintenance switch. When set, every route answers with the
/// static maintenance page. `MAINTENANCE_MODE=true` in the environment
/// flips it without a rebuild.
pub const MAINTENANCE_MODE: bool = false;

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

/// Which BaaS backend to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaasMode {
    /// Hosted project over HTTPS.
    Remote,
    /// Local in-process store (tests and offline development).
    Memory,
}

/// Image CDN settings.
#[derive(Debug, Clone)]
pub struct CdnConfig {
    pub cloud_name: String,
    pub upload_preset: String,
    pub api_key: Option<String>,
    /// Server only; never sent to the browser.
    pub api_secret: Option<String>,
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// BaaS project URL, e.g. `https://abcd.supabase.co`
    pub supabase_url: String,
    /// Public anon key sent as `apikey` on every BaaS call
    pub supabase_anon_key: String,
    /// Project JWT secret; enables local access-token verification
    pub supabase_jwt_secret: Option<Vec<u8>>,
    pub cdn: CdnConfig,
    pub app_env: AppEnv,
    pub baas_mode: BaasMode,
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    /// Server port
    pub port: u16,
    pub maintenance_mode: bool,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test_anon_key".to_string(),
            supabase_jwt_secret: Some(b"test_jwt_secret_32_bytes_minimum!".to_vec()),
            cdn: CdnConfig {
                cloud_name: "test-cloud".to_string(),
                upload_preset: "acetrack_unsigned".to_string(),
                api_key: None,
                api_secret: None,
            },
            app_env: AppEnv::Development,
            baas_mode: BaasMode::Memory,
            frontend_url: "http://localhost:3000".to_string(),
            port: 8080,
            maintenance_mode: false,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let baas_mode = match env::var("BAAS_MODE").as_deref() {
            Ok("memory") => BaasMode::Memory,
            Ok("remote") | Err(_) => BaasMode::Remote,
            Ok(_) => return Err(ConfigError::Invalid("BAAS_MODE")),
        };

        let supabase_url = match baas_mode {
            BaasMode::Remote => {
                env::var("SUPABASE_URL").map_err(|_| ConfigError::Missing("SUPABASE_URL"))?
            }
            BaasMode::Memory => env::var("SUPABASE_URL")
                .unwrap_or_else(|_| "http://localhost:54321".to_string()),
        };
        let supabase_anon_key = match baas_mode {
            BaasMode::Remote => env::var("SUPABASE_ANON_KEY")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("SUPABASE_ANON_KEY"))?,
            BaasMode::Memory => {
                env::var("SUPABASE_ANON_KEY").unwrap_or_else(|_| "local-anon-key".to_string())
            }
        };

        let supabase_jwt_secret = env::var("SUPABASE_JWT_SECRET")
            .ok()
            .map(|v| v.trim().as_bytes().to_vec())
            .filter(|v| !v.is_empty());
        if baas_mode == BaasMode::Memory && supabase_jwt_secret.is_none() {
            return Err(ConfigError::Missing("SUPABASE_JWT_SECRET"));
        }

        let app_env = match env::var("APP_ENV").as_deref() {
            Ok("production") => AppEnv::Production,
            _ => AppEnv::Development,
        };

        Ok(Self {
            supabase_url: supabase_url.trim_end_matches('/').to_string(),
            supabase_anon_key,
            supabase_jwt_secret,
            cdn: CdnConfig {
                cloud_name: env::var("CLOUDINARY_CLOUD_NAME").unwrap_or_default(),
                upload_preset: env::var("CLOUDINARY_UPLOAD_PRESET").unwrap_or_default(),
                api_key: non_empty_var("CLOUDINARY_API_KEY"),
                api_secret: non_empty_var("CLOUDINARY_API_SECRET"),
            },
            app_env,
            baas_mode,
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            maintenance_mode: env::var("MAINTENANCE_MODE")
                .map(|v| matches!(v.trim(), "1" | "true" | "yes"))
                .unwrap_or(MAINTENANCE_MODE),
        })
    }

    /// Local development relaxes the `Secure` cookie flag and ignores
    /// forwarded-host headers.
    pub fn is_local_development(&self) -> bool {
        self.app_env == AppEnv::Development
    }

    /// Session cookies carry `Secure` everywhere but local development.
    pub fn secure_cookies(&self) -> bool {
        !self.is_local_development()
    }

    /// Public origin of the request: the forwarded host behind a proxy
    /// (ignored in local development), else the `Host` header. Local
    /// development is always served over plain http.
    pub fn public_origin(&self, headers: &HeaderMap) -> String {
        let value_of = |name: &str| {
            headers
                .get(name)
                .and_then(|h| h.to_str().ok())
                .map(str::trim)
                .filter(|h| !h.is_empty())
        };

        if !self.is_local_development() {
            if let Some(forwarded) = value_of(FORWARDED_HOST) {
                return format!("https://{forwarded}");
            }
        }

        match value_of(header::HOST.as_str()) {
            Some(host)
                if self.is_local_development()
                    || host.starts_with("localhost")
                    || host.starts_with("127.0.0.1") =>
            {
                format!("http://{host}")
            }
            Some(host) => format!("https://{host}"),
            None => format!("http://localhost:{}", self.port),
        }
    }

    /// Project ref, the first DNS label of the project URL.
    pub fn project_ref(&self) -> &str {
        let host = self
            .supabase_url
            .split("://")
            .nth(1)
            .unwrap_or(&self.supabase_url);
        host.split(['.', ':', '/']).next().unwrap_or("local")
    }

    /// Name under which the client persists its session.
    pub fn session_storage_key(&self) -> String {
        format!("sb-{}-auth-token", self.project_ref())
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}
