// SPDX-License-Identifier: MIT
// Copyright 2026 The Acetrack Authors

//! Acetrack: student event attendance.
//!
//! This crate provides the backend for the Acetrack web app: session
//! handling against the hosted auth/database service, Google sign-in,
//! profile setup, and the event and attendance views.

pub mod baas;
pub mod config;
pub mod cookies;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use baas::BaasClient;
use config::Config;
use services::CdnUploader;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    /// Unscoped client; handlers derive a per-request client with `scoped`
    pub baas: BaasClient,
    pub cdn: CdnUploader,
}
