/// Health check endpoint
use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::context::ApiContext;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
    pub subscribers: Subscribers,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Subscribers {
    pub events: usize,
    pub websockets: usize,
}

/// Health check handler
/// This endpoint does not require a tenant
pub async fn handler(State(ctx): State<Arc<ApiContext>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        subscribers: Subscribers {
            events: ctx.event_stream.len().await,
            websockets: ctx.hub.len().await,
        },
    })
}
