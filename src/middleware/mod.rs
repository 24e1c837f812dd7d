// SPDX-License-Identifier: MIT
// Copyright 2026 The Acetrack Authors

//! Middleware modules (session gate, maintenance, security headers).

pub mod maintenance;
pub mod security;
pub mod session;

pub use maintenance::maintenance_gate;
pub use session::require_session;
