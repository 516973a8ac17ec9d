/// Mailsink API - HTTP surface of the Mailsink capture service
///
/// This module contains the REST, server-sent event and websocket handlers.
pub mod api;
pub mod context;
pub mod error;
pub mod middleware;
pub mod tenant;

pub use context::ApiContext;
pub use error::ApiError;
pub use tenant::Tenant;

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

/// Builds the application router for the given context.
///
/// Every route sits under the configured web path. CORS is only enabled
/// when an origin is configured.
pub fn build_router(ctx: Arc<ApiContext>) -> Router {
    let routes = Router::new()
        .route("/health", get(api::health::handler))
        // API v1
        .route(
            "/api/v1/messages",
            get(api::v1::messages).delete(api::v1::delete_all),
        )
        .route(
            "/api/v1/messages/{id}",
            get(api::v1::message).delete(api::v1::delete_one),
        )
        .route("/api/v1/messages/{id}/download", get(api::v1::download))
        .route(
            "/api/v1/messages/{id}/mime/part/{part}/download",
            get(api::v1::download_part),
        )
        .route(
            "/api/v1/messages/{id}/release",
            post(api::v1::release),
        )
        .route("/api/v1/events", get(api::v1::events))
        // API v2
        .route("/api/v2/messages", get(api::v2::messages))
        .route("/api/v2/search", get(api::v2::search))
        .route("/api/v2/outgoing-smtp", get(api::v2::outgoing_smtp))
        .route("/api/v2/websocket", get(api::v2::websocket))
        .route("/api/v2/ingest", post(api::v2::ingest))
        .route_layer(axum_middleware::from_fn(middleware::logging_middleware));

    let web_path = ctx.config.web_path.trim_end_matches('/');
    let mut app = if web_path.is_empty() {
        routes
    } else {
        info!(web_path = %web_path, "Serving routes under web path");
        Router::new().nest(web_path, routes)
    };

    if let Some(origin) = &ctx.config.cors_origin {
        match HeaderValue::from_str(origin) {
            Ok(origin) => {
                app = app.layer(
                    CorsLayer::new()
                        .allow_origin(origin)
                        .allow_methods([
                            Method::OPTIONS,
                            Method::GET,
                            Method::POST,
                            Method::DELETE,
                        ])
                        .allow_headers([header::CONTENT_TYPE]),
                );
            }
            Err(e) => warn!(origin = %origin, "Ignoring invalid CORS origin: {}", e),
        }
    }

    app.with_state(ctx)
}
