//! Shared application router builder.
//!
//! Provides [`build_app_router`] so both the production binary (`main.rs`)
//! and integration tests (`tests/common/mod.rs`) use the exact same
//! middleware stack.

use std::time::Duration;

use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderName, Method, StatusCode};
use axum::Router;
use promptlab_pipeline::rewrite::MAX_IMPROVE_DURATION;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::config::ServerConfig;
use crate::routes;
use crate::state::AppState;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Methods the route tables use. Reads are GET, revisions and favorites
/// POST, metadata edits PATCH, deletes and unfavorite DELETE.
const CORS_METHODS: [Method; 4] = [Method::GET, Method::POST, Method::PATCH, Method::DELETE];

/// Build the full application [`Router`] with all middleware layers.
///
/// The middleware stack is applied bottom-up:
///
/// 1. CORS
/// 2. Set request ID on incoming requests
/// 3. Structured request/response tracing
/// 4. Propagate request ID to response
/// 5. Panic recovery (catch panics, return 500)
///
/// Request timeouts sit on the `/api/v1` tree itself. Pipeline runs are
/// detached, so most handlers only wait on the database, but fork and new
/// version may rewrite the text with the LLM first and get
/// [`improve_timeout`] instead.
pub fn build_app_router(state: AppState, config: &ServerConfig) -> Router {
    let cors = build_cors_layer(config);
    let request_id_header = HeaderName::from_static(REQUEST_ID_HEADER);

    let api = routes::api_routes()
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(config.request_timeout_secs),
        ))
        .merge(
            routes::improve_routes().layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                improve_timeout(config),
            )),
        );

    Router::new()
        // Health check at root level (not under /api/v1).
        .merge(routes::health::router())
        .nest("/api/v1", api)
        // -- Middleware stack (applied bottom-up) --
        .layer(CatchPanicLayer::new())
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .layer(cors)
        .with_state(state)
}

/// Timeout for the rewrite routes: the configured value, but never shorter
/// than a rewrite with both scoring calls can take.
pub fn improve_timeout(config: &ServerConfig) -> Duration {
    Duration::from_secs(config.improve_timeout_secs).max(MAX_IMPROVE_DURATION)
}

/// Build the CORS middleware layer from server configuration.
///
/// Panics at startup if any configured origin is invalid. The request id is
/// exposed so browser clients can quote it when a poll loop stalls.
pub fn build_cors_layer(config: &ServerConfig) -> CorsLayer {
    let origins: Vec<_> = config
        .cors_origins
        .iter()
        .map(|o| {
            o.parse()
                .unwrap_or_else(|e| panic!("Invalid CORS origin '{o}': {e}"))
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(CORS_METHODS)
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .expose_headers([HeaderName::from_static(REQUEST_ID_HEADER)])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::JwtConfig;
    use promptlab_llm::LlmConfig;

    fn config(improve_timeout_secs: u64) -> ServerConfig {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors_origins: vec![],
            request_timeout_secs: 30,
            improve_timeout_secs,
            shutdown_timeout_secs: 5,
            jwt: JwtConfig {
                secret: "s".to_string(),
            },
            llm: LlmConfig::default(),
        }
    }

    #[test]
    fn improve_timeout_covers_a_full_rewrite() {
        assert_eq!(improve_timeout(&config(5)), MAX_IMPROVE_DURATION);
        assert_eq!(improve_timeout(&config(600)), Duration::from_secs(600));
        assert!(MAX_IMPROVE_DURATION > Duration::from_secs(30));
    }
}
