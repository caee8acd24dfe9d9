//! HTTP API server

use axum::{
    extract::{DefaultBodyLimit, State},
    http::HeaderValue,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::CorsSection;
use crate::error::ErrorDetail;
use crate::types::ExceptionMessage;

pub mod handlers;
pub mod openapi;
pub mod state;

pub use state::AppState;

/// Build the API router using the provided application state
pub fn create_router(state: AppState) -> Router {
    let config = state.config.clone();

    let mut router = Router::new()
        .merge(diagnostic_routes())
        .route("/test_upload/", post(handlers::test_upload));

    router = match config.app.api_prefix.as_str() {
        "" => router.merge(score_routes()),
        prefix => router.nest(prefix, score_routes()),
    };

    if !config.app.openapi_url.is_empty() {
        router = router.route(&config.app.openapi_url, get(handlers::openapi_json));
    }

    let mut router = router.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(middleware::map_response_with_state(
                state.clone(),
                expose_error_detail,
            ))
            .layer(DefaultBodyLimit::max(config.upload.max_body_bytes)),
    );

    if config.cors.enabled {
        router = router.layer(cors_layer(&config.cors));
    }

    router.with_state(state)
}

/// Liveness and readiness, mounted at the root
pub fn diagnostic_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/ready", get(handlers::ready))
}

/// Clinical score routes, mounted under `app.api_prefix`
pub fn score_routes() -> Router<AppState> {
    Router::new().route("/cha2ds2-vasc", post(handlers::cha2ds2_vasc))
}

/// A literal `*` cannot be combined with credentials, so without configured
/// origins the request origin is mirrored back.
fn cors_layer(cors: &CorsSection) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(cors.allow_credentials);

    if !cors.allowed_origins.is_empty() {
        let origins: Vec<HeaderValue> = cors
            .allowed_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        return layer.allow_origin(origins);
    }

    if cors.allow_credentials {
        layer.allow_origin(AllowOrigin::mirror_request())
    } else {
        layer.allow_origin(Any)
    }
}

/// Replace the generic 500 body with its cause when running in debug mode
async fn expose_error_detail(State(state): State<AppState>, mut response: Response) -> Response {
    let detail = response.extensions_mut().remove::<ErrorDetail>();
    match detail {
        Some(ErrorDetail(detail)) if state.debug() => {
            (response.status(), Json(ExceptionMessage::new(detail))).into_response()
        }
        _ => response,
    }
}
