pub mod config;
pub mod error;
pub mod metrics;
pub mod routes;
pub mod state;
pub mod validation;

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Request},
    http::{header::HeaderName, HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_governor::{governor::GovernorConfigBuilder, key_extractor::GlobalKeyExtractor, GovernorLayer};
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info;

use crate::routes::X_TEXT_LENGTH;
use crate::state::AppState;

pub const X_REQUEST_ID: &str = "x-request-id";

/// Request bodies above this are refused with a 413 by the JSON extractor.
const MAX_BODY_BYTES: usize = 256 * 1024;

// Request ID middleware for tracing
async fn add_request_id(mut request: Request, next: Next) -> Response {
    let Ok(request_id) = HeaderValue::from_str(&uuid::Uuid::new_v4().to_string()) else {
        return next.run(request).await;
    };
    request
        .headers_mut()
        .insert(X_REQUEST_ID, request_id.clone());
    let mut response = next.run(request).await;
    response.headers_mut().insert(X_REQUEST_ID, request_id);
    response
}

/// All origins, any header; the custom response headers are readable by browsers.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
        .expose_headers([
            HeaderName::from_static(X_TEXT_LENGTH),
            HeaderName::from_static(X_REQUEST_ID),
        ])
        .allow_credentials(false)
}

/// Routes, CORS, tracing and request ids. No rate limiting or timeouts.
pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/health", get(routes::health_check))
        .route("/voices", get(routes::list_voices))
        .route("/metrics", get(routes::metrics_endpoint))
        .route("/text-to-speech", post(routes::text_to_speech))
        .route("/generate-response", post(routes::generate_response));

    Router::new()
        .merge(api.clone()) // root paths
        .nest("/api", api) // /api prefix
        .layer(axum::middleware::from_fn(add_request_id))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer())
                .into_inner(),
        )
        .with_state(state)
}

/// The full service: [`build_router`] plus rate limiting, request timeout
/// and a body size limit taken from the server configuration.
pub fn build_app(state: AppState) -> anyhow::Result<Router> {
    let config = state.config.clone();

    // One global bucket: every request shares the same limit, which behaves
    // the same behind proxies where peer addresses are meaningless.
    let per_minute = config.rate_limit_per_minute.max(1);
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_millisecond((60_000 / per_minute as u64).max(1))
            .burst_size(per_minute)
            .key_extractor(GlobalKeyExtractor)
            .finish()
            .ok_or_else(|| anyhow::anyhow!("invalid rate limit configuration"))?,
    );
    info!("Rate limiting: {} requests per minute", per_minute);

    let middleware_stack = ServiceBuilder::new()
        .layer(GovernorLayer::new(governor_conf))
        .layer(TimeoutLayer::new(config.request_timeout()))
        .into_inner();

    Ok(build_router(state)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(middleware_stack))
}
