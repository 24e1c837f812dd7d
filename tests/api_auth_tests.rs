// SPDX-License-Identifier: MIT
// Copyright 2026 The Acetrack Authors

//! Password login, registration and session maintenance endpoints.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::json;
use tower::ServiceExt;

mod common;
use common::*;

#[tokio::test]
async fn test_login_sets_cookies_and_redirects_to_dashboard() {
    let app = create_test_app();
    let session = register_user(&app.memory, "ana@school.edu");
    add_profile(&app.memory, user_id(&session));

    let response = app
        .router
        .oneshot(post_json(
            "/auth/login",
            None,
            json!({ "email": "Ana@School.edu", "password": TEST_PASSWORD }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let cookies = set_cookie_headers(&response);
    assert!(!cookie_value(&find_cookie(&cookies, "sb-access-token")).is_empty());
    assert!(!cookie_value(&find_cookie(&cookies, "sb-refresh-token")).is_empty());

    let body = body_json(response).await;
    assert_eq!(body["redirect"], "/dashboard");
}

#[tokio::test]
async fn test_login_without_profile_goes_to_setup() {
    let app = create_test_app();
    register_user(&app.memory, "halfway@school.edu");

    let response = app
        .router
        .oneshot(post_json(
            "/auth/login",
            None,
            json!({ "email": "halfway@school.edu", "password": TEST_PASSWORD }),
        ))
        .await
        .unwrap();

    let body = body_json(response).await;
    assert_eq!(body["redirect"], "/setup-profile");
}

#[tokio::test]
async fn test_login_with_wrong_password() {
    let app = create_test_app();
    register_user(&app.memory, "ana@school.edu");

    let response = app
        .router
        .oneshot(post_json(
            "/auth/login",
            None,
            json!({ "email": "ana@school.edu", "password": "wrong" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(set_cookie_headers(&response).is_empty());

    let body = body_json(response).await;
    assert_eq!(body["error"], "authentication_failed");
    assert_eq!(body["details"], "Invalid login credentials");
}

#[tokio::test]
async fn test_login_rejects_malformed_email() {
    let app = create_test_app();

    let response = app
        .router
        .oneshot(post_json(
            "/auth/login",
            None,
            json!({ "email": "not-an-email", "password": "x" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["details"], "Please enter a valid email address");
}

#[tokio::test]
async fn test_register_signs_in_and_goes_to_setup() {
    let app = create_test_app();

    let response = app
        .router
        .clone()
        .oneshot(post_json(
            "/auth/register",
            None,
            json!({
                "email": "new@school.edu",
                "password": "secret123",
                "first_name": "Lea",
                "last_name": "Cruz"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let cookies = set_cookie_headers(&response);
    let access = cookie_value(&find_cookie(&cookies, "sb-access-token"));
    let body = body_json(response).await;
    assert_eq!(body["redirect"], "/setup-profile");

    // Metadata carried through to the profile-setup prefill
    let response = app
        .router
        .oneshot(get(
            "/setup-profile",
            Some(&format!("sb-access-token={access}")),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["prefill"]["first_name"], "Lea");
    assert_eq!(body["prefill"]["last_name"], "Cruz");
}

#[tokio::test]
async fn test_register_duplicate_email() {
    let app = create_test_app();
    register_user(&app.memory, "taken@school.edu");

    let response = app
        .router
        .oneshot(post_json(
            "/auth/register",
            None,
            json!({
                "email": "taken@school.edu",
                "password": "secret123",
                "first_name": "Lea",
                "last_name": "Cruz"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["details"], "User already registered");
}

#[tokio::test]
async fn test_register_short_password() {
    let app = create_test_app();

    let response = app
        .router
        .oneshot(post_json(
            "/auth/register",
            None,
            json!({
                "email": "short@school.edu",
                "password": "123",
                "first_name": "Lea",
                "last_name": "Cruz"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_logout_revokes_session() {
    let app = create_test_app();
    let session = register_user(&app.memory, "leaving@school.edu");

    let response = app
        .router
        .oneshot(post_json("/auth/logout", Some(&session_cookie(&session)), json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(app.memory.active_sessions(user_id(&session)), 0);
}

#[tokio::test]
async fn test_logout_without_session_still_succeeds() {
    let app = create_test_app();

    let response = app
        .router
        .oneshot(post_json("/auth/logout", None, json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_refresh_rotates_tokens() {
    let app = create_test_app();
    let session = register_user(&app.memory, "rotating@school.edu");

    let response = app
        .router
        .clone()
        .oneshot(post_json("/auth/refresh", Some(&session_cookie(&session)), json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let cookies = set_cookie_headers(&response);
    let refresh = cookie_value(&find_cookie(&cookies, "sb-refresh-token"));
    assert_ne!(refresh, session.refresh_token);

    // The old refresh token is spent
    let response = app
        .router
        .oneshot(post_json("/auth/refresh", Some(&session_cookie(&session)), json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let cookies = set_cookie_headers(&response);
    assert!(find_cookie(&cookies, "sb-refresh-token").contains("Max-Age=0"));
}

#[tokio::test]
async fn test_refresh_without_cookie() {
    let app = create_test_app();

    let response = app
        .router
        .oneshot(post_json("/auth/refresh", None, json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_implicit_session_from_fragment() {
    let app = create_test_app();
    let session = register_user(&app.memory, "implicit@school.edu");
    let url = format!(
        "http://localhost:8080/login#access_token={}&refresh_token={}&expires_in=3600&token_type=bearer",
        session.access_token, session.refresh_token
    );

    let response = app
        .router
        .oneshot(post_json("/auth/implicit", None, json!({ "url": url })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let cookies = set_cookie_headers(&response);
    assert_eq!(
        cookie_value(&find_cookie(&cookies, "sb-access-token")),
        session.access_token
    );
    let body = body_json(response).await;
    assert_eq!(body["redirect"], "/dashboard");
}

#[tokio::test]
async fn test_implicit_session_error_fragment() {
    let app = create_test_app();

    let response = app
        .router
        .oneshot(post_json(
            "/auth/implicit",
            None,
            json!({ "url": "http://localhost:8080/#error=access_denied&error_description=User+cancelled" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_public_route_no_auth_required() {
    let app = create_test_app();

    let response = app.router.oneshot(get("/health", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["baas_mode"], "memory");
}

#[tokio::test]
async fn test_cors_preflight() {
    let app = create_test_app();

    let response = app
        .router
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/dashboard")
                .header(header::ORIGIN, "http://localhost:3000")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
}
