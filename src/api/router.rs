//! HTTP router.
//!
//! Returns a composable `Router` with every route nested under `/api/`.
//!
//! Middleware stack (outermost to innermost):
//! CORS, access log, identity (protected routes only).

use std::sync::Arc;

use axum::http::{HeaderName, HeaderValue, Method};
use axum::routing::{get, patch, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;
use crate::core_state::CoreState;

/// Build the API router.
pub fn api_router(core: Arc<CoreState>) -> Router {
    let cors = cors_layer(&core.config.allowed_origins);
    let ctx = ApiContext::new(core);

    // NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
    let protected = Router::new()
        .route("/triage/analyze", post(endpoints::triage::analyze))
        .route(
            "/triage/history/:patient_id",
            get(endpoints::triage::history),
        )
        .route("/staff/pending", get(endpoints::staff::pending))
        .route(
            "/staff/triage/:id/status",
            patch(endpoints::staff::update_status),
        )
        .route(
            "/patients/me",
            get(endpoints::patients::me).put(endpoints::patients::update_me),
        )
        .route("/admin/analytics", get(endpoints::admin::analytics))
        .route("/admin/audit", get(endpoints::admin::audit))
        .with_state(ctx.clone())
        .layer(axum::middleware::from_fn(middleware::identity::require_identity));

    let public = Router::new()
        .route("/health", get(endpoints::health::check))
        .with_state(ctx);

    Router::new()
        .nest("/api", protected)
        .nest("/api", public)
        .layer(axum::middleware::from_fn(middleware::access_log::log_access))
        .layer(cors)
}

/// CORS for the configured browser origins. Unparseable origins are skipped.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            HeaderName::from_static("x-user-id"),
            HeaderName::from_static("x-user-role"),
        ])
        .allow_credentials(true)
}
