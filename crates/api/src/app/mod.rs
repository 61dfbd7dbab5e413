//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store selection, token/password collaborators, admin bootstrap
//! - `routes/`: HTTP routes + handlers (one file per resource)
//! - `dto.rs`: query/request/response shapes that are not domain types
//! - `errors.rs`: consistent `{"error", "message"}` responses
//! - `extract.rs`: body/query extractors whose rejections share that shape

use axum::{
    Extension, Router,
    http::{HeaderValue, Method, header},
    routing::get,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use bookstore_infra::Services;

use crate::config::AppConfig;
use crate::middleware;

pub mod dto;
pub mod errors;
pub mod extract;
pub mod routes;
pub mod services;

/// Build services from configuration, then the router.
pub async fn build_app(config: &AppConfig) -> Result<Router, services::StartupError> {
    let services = services::build_services(config).await?;
    Ok(router(services, &config.cors_origins))
}

/// The full HTTP router over already-built services.
pub fn router(services: Services, cors_origins: &[String]) -> Router {
    let auth_state = middleware::AuthState {
        services: services.clone(),
    };

    let api = routes::router()
        .layer(Extension(services))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(api)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors(cors_origins)),
        )
}

fn cors(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "ignoring malformed CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}
