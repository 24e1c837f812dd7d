// SPDX-License-Identifier: MIT
// Copyright 2026 The Acetrack Authors

//! Services module - session gating and third-party integrations.

pub mod auth_context;
pub mod cdn;

pub use auth_context::{is_auth_path, AuthContext, AuthFailure, AuthListener, AuthState};
pub use cdn::CdnUploader;
