// SPDX-License-Identifier: MIT
// Copyright 2026 The Acetrack Authors

//! Maintenance mode short-circuits every route.

use acetrack::config::Config;
use axum::http::{header, StatusCode};
use serde_json::json;
use tower::ServiceExt;

mod common;
use common::*;

fn maintenance_app() -> TestApp {
    create_test_app_with_config(Config {
        maintenance_mode: true,
        ..Config::default()
    })
}

#[tokio::test]
async fn test_every_route_serves_maintenance_page() {
    let app = maintenance_app();

    for request in [
        get("/health", None),
        get("/dashboard", None),
        get("/auth/callback?code=abc", None),
        post_json("/auth/login", None, json!({})),
    ] {
        let response = app.router.clone().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(response
            .headers()
            .get(header::CONTENT_TYPE)
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("text/html"));
        assert!(set_cookie_headers(&response).is_empty());

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert!(String::from_utf8_lossy(&bytes).contains("maintenance"));
    }
}

#[tokio::test]
async fn test_maintenance_page_has_security_headers() {
    let app = maintenance_app();

    let response = app.router.oneshot(get("/events", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.headers().get("x-frame-options").unwrap(), "DENY");
}

#[tokio::test]
async fn test_routes_served_normally_when_off() {
    let app = create_test_app();

    let response = app.router.oneshot(get("/health", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
