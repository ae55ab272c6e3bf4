#![allow(dead_code)]

use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use jsonwebtoken::{encode, EncodingKey, Header};
use promptlab_api::auth::jwt::{Claims, JwtConfig};
use promptlab_api::config::ServerConfig;
use promptlab_api::router::build_app_router;
use promptlab_api::state::AppState;
use promptlab_llm::LlmConfig;
use sqlx::PgPool;
use tower::ServiceExt;
use uuid::Uuid;

const TEST_SECRET: &str = "integration-test-secret";

/// Test `ServerConfig` with safe defaults. The LLM runs in simulation mode.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        improve_timeout_secs: 90,
        shutdown_timeout_secs: 5,
        jwt: JwtConfig {
            secret: TEST_SECRET.to_string(),
        },
        llm: LlmConfig::default(),
    }
}

/// Build the full application router (same middleware stack as `main.rs`)
/// and return the state so tests can wait for pipeline runs.
pub fn build_test_app_with_state(pool: PgPool) -> (Router, AppState) {
    let config = test_config();
    let state = AppState::new(pool, config.clone()).expect("simulation mode needs no client");
    (build_app_router(state.clone(), &config), state)
}

pub fn build_test_app(pool: PgPool) -> Router {
    build_test_app_with_state(pool).0
}

/// Wait for every submitted pipeline run to settle.
pub async fn drain_pipeline(state: &AppState) {
    assert!(
        state.tasks.shutdown(Duration::from_secs(10)).await,
        "pipeline runs should settle in simulation mode"
    );
}

/// Signed access token for `user_id`.
pub fn token_for(user_id: Uuid) -> String {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: user_id,
        exp: now + 900,
        iat: now,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
    )
    .unwrap()
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

async fn send(
    app: Router,
    method: Method,
    uri: &str,
    user: Option<Uuid>,
    body: Option<serde_json::Value>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user_id) = user {
        builder = builder.header("authorization", format!("Bearer {}", token_for(user_id)));
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, None, None).await
}

pub async fn get_as(app: Router, uri: &str, user: Uuid) -> Response<Body> {
    send(app, Method::GET, uri, Some(user), None).await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    send(app, Method::POST, uri, None, Some(body)).await
}

pub async fn post_json_as(
    app: Router,
    uri: &str,
    user: Uuid,
    body: serde_json::Value,
) -> Response<Body> {
    send(app, Method::POST, uri, Some(user), Some(body)).await
}

pub async fn post_as(app: Router, uri: &str, user: Uuid) -> Response<Body> {
    send(app, Method::POST, uri, Some(user), None).await
}

pub async fn patch_json_as(
    app: Router,
    uri: &str,
    user: Uuid,
    body: serde_json::Value,
) -> Response<Body> {
    send(app, Method::PATCH, uri, Some(user), Some(body)).await
}

pub async fn delete_as(app: Router, uri: &str, user: Uuid) -> Response<Body> {
    send(app, Method::DELETE, uri, Some(user), None).await
}

/// Collect a response body as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
