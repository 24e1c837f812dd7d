// SPDX-License-Identifier: MIT
// Copyright 2026 The Acetrack Authors

//! Whole-app maintenance switch.

use crate::AppState;
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{Html, IntoResponse, Response},
};
use std::sync::Arc;

const MAINTENANCE_PAGE: &str = r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Acetrack - Under maintenance</title>
<style>
body { font-family: system-ui, sans-serif; display: grid; place-items: center; min-height: 100vh; margin: 0; background: #f8fafc; color: #0f172a; }
main { text-align: center; padding: 2rem; }
</style>
</head>
<body>
<main>
<h1>We'll be right back</h1>
<p>Acetrack is undergoing scheduled maintenance. Please check again later.</p>
</main>
</body>
</html>
"#;

/// Answer every request with the maintenance page while the switch is on.
pub async fn maintenance_gate(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    if state.config.maintenance_mode {
        tracing::debug!(path = %request.uri().path(), "Maintenance mode, short-circuiting");
        return (StatusCode::SERVICE_UNAVAILABLE, Html(MAINTENANCE_PAGE)).into_response();
    }
    next.run(request).await
}
