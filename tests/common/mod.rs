// SPDX-License-Identifier: MIT
// Copyright 2026 The Acetrack Authors

use acetrack::baas::{BaasClient, MemoryStore};
use acetrack::config::{BaasMode, CdnConfig, Config};
use acetrack::models::{Attendance, Course, Event, EventStatus, NewProfile, Session};
use acetrack::routes::create_router;
use acetrack::services::CdnUploader;
use acetrack::AppState;
use axum::body::Body;
use axum::http::{header, Request};
use axum::response::Response;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

pub const TEST_HOST: &str = "localhost:8080";
pub const TEST_PASSWORD: &str = "correct-horse";

/// Router wired to an in-memory BaaS.
#[allow(dead_code)]
pub struct TestApp {
    pub router: axum::Router,
    pub state: Arc<AppState>,
    pub memory: Arc<MemoryStore>,
}

#[allow(dead_code)]
pub fn create_test_app() -> TestApp {
    create_test_app_with_config(Config::default())
}

/// Create a test app with offline in-memory dependencies. The CDN points
/// at a closed local port so nothing leaves the machine.
#[allow(dead_code)]
pub fn create_test_app_with_config(config: Config) -> TestApp {
    let secret = config.supabase_jwt_secret.clone().unwrap_or_default();
    let memory = Arc::new(MemoryStore::new(secret));
    let baas = BaasClient::in_memory(&config, memory.clone());
    let cdn = CdnUploader::new(reqwest::Client::new(), config.cdn.clone())
        .with_api_base("http://127.0.0.1:9");

    let state = Arc::new(AppState { config, baas, cdn });
    TestApp {
        router: create_router(state.clone()),
        state,
        memory,
    }
}

/// Config for the HTTP backend at `supabase_url`. No JWT secret, so every
/// token check goes over the wire.
#[allow(dead_code)]
pub fn remote_config(supabase_url: &str) -> Config {
    Config {
        supabase_url: supabase_url.to_string(),
        supabase_jwt_secret: None,
        baas_mode: BaasMode::Remote,
        ..Config::default()
    }
}

/// Router wired to the HTTP backend at `supabase_url`.
#[allow(dead_code)]
pub fn create_remote_test_app(supabase_url: &str) -> axum::Router {
    let config = remote_config(supabase_url);
    let baas = BaasClient::new(&config).expect("remote client");
    let cdn = CdnUploader::new(reqwest::Client::new(), config.cdn.clone())
        .with_api_base("http://127.0.0.1:9");
    create_router(Arc::new(AppState { config, baas, cdn }))
}

/// Serve `router` on an ephemeral local port as a stand-in for the hosted
/// project and return its base URL.
#[allow(dead_code)]
pub async fn spawn_fake_baas(router: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

#[allow(dead_code)]
pub fn unconfigured_cdn() -> CdnConfig {
    CdnConfig {
        cloud_name: String::new(),
        upload_preset: String::new(),
        api_key: None,
        api_secret: None,
    }
}

/// Register a password user directly in the store.
#[allow(dead_code)]
pub fn register_user(memory: &MemoryStore, email: &str) -> Session {
    memory
        .sign_up(
            email,
            TEST_PASSWORD,
            &serde_json::json!({ "first_name": "Maria", "last_name": "Santos" }),
        )
        .expect("sign up")
        .session
        .expect("session issued")
}

#[allow(dead_code)]
pub fn user_id(session: &Session) -> Uuid {
    session.user.as_ref().expect("session user").id
}

#[allow(dead_code)]
pub fn seed_courses(memory: &MemoryStore) {
    for (id, name) in [(1, "BS Computer Science"), (2, "BS Information Technology")] {
        memory.insert_course(Course {
            id,
            course_name: name.to_string(),
        });
    }
}

#[allow(dead_code)]
pub fn add_profile(memory: &MemoryStore, user_id: Uuid) {
    seed_courses(memory);
    memory
        .insert_profile(&NewProfile {
            id: user_id,
            first_name: "Maria".into(),
            last_name: "Santos".into(),
            student_id: "2022-00042".into(),
            course_id: 1,
            year_level: "3".into(),
            role_id: 3,
            avatar_url: None,
        })
        .expect("insert profile");
}

#[allow(dead_code)]
pub fn event(id: i64, name: &str, location: &str, start: DateTime<Utc>) -> Event {
    Event {
        id,
        name: name.to_string(),
        description: None,
        location: Some(location.to_string()),
        banner: None,
        status: EventStatus::Upcoming,
        start_datetime: start,
        end_datetime: start + chrono::Duration::hours(2),
    }
}

#[allow(dead_code)]
pub fn check_in(memory: &MemoryStore, id: i64, event_id: i64, student: Uuid, at: DateTime<Utc>) {
    memory.insert_attendance(Attendance {
        id,
        event_id,
        student_id: student,
        time_in: Some(at),
        time_out: None,
    });
}

#[allow(dead_code)]
pub fn session_cookie(session: &Session) -> String {
    format!(
        "sb-access-token={}; sb-refresh-token={}",
        session.access_token, session.refresh_token
    )
}

#[allow(dead_code)]
pub fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("GET")
        .uri(uri)
        .header(header::HOST, TEST_HOST);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

#[allow(dead_code)]
pub fn post_json(uri: &str, cookie: Option<&str>, body: serde_json::Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::HOST, TEST_HOST)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

#[allow(dead_code)]
pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[allow(dead_code)]
pub fn location(response: &Response) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .expect("Location header")
        .to_str()
        .unwrap()
        .to_string()
}

#[allow(dead_code)]
pub fn set_cookie_headers(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|value| value.to_str().unwrap().to_string())
        .collect()
}

#[allow(dead_code)]
pub fn find_cookie(headers: &[String], name: &str) -> String {
    headers
        .iter()
        .find(|value| value.starts_with(&format!("{name}=")))
        .cloned()
        .unwrap_or_else(|| panic!("missing Set-Cookie header for {name}: {headers:?}"))
}

/// Value of a Set-Cookie header (`name=value; ...`).
#[allow(dead_code)]
pub fn cookie_value(set_cookie: &str) -> String {
    set_cookie
        .split(';')
        .next()
        .and_then(|pair| pair.split_once('='))
        .map(|(_, v)| v.to_string())
        .unwrap_or_default()
}
