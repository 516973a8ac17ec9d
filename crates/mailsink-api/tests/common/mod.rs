//! Common test utilities and helpers for integration tests
#![allow(dead_code)]

pub mod fake_smtp;
pub mod test_data;

use axum::Router;
use axum::body::{Body, Bytes};
use axum::http::{Request, StatusCode};
use futures::StreamExt;
use mailsink_api::{ApiContext, build_router};
use mailsink_core::models::MailsinkConfig;
use mailsink_core::services::{InMemoryStore, LettreDialer, ProfileRegistry};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

pub const TENANT: &str = "acme";
pub const OTHER_TENANT: &str = "globex";

/// Configuration with timers far enough out that they never fire unless a
/// test asks for them
pub fn test_config() -> MailsinkConfig {
    MailsinkConfig {
        keepalive_secs: 3600,
        ping_secs: 3600,
        relay_timeout_secs: 5,
        write_timeout_ms: 500,
        ..Default::default()
    }
}

pub struct TestApp {
    pub router: Router,
    pub ctx: Arc<ApiContext>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with(test_config(), ProfileRegistry::new())
    }

    pub fn with(config: MailsinkConfig, profiles: ProfileRegistry) -> Self {
        let dialer = Arc::new(LettreDialer::new(
            config.hostname.clone(),
            config.relay_timeout(),
        ));
        let ctx = ApiContext::with_parts(config, Arc::new(InMemoryStore::new()), profiles, dialer);
        Self {
            router: build_router(Arc::clone(&ctx)),
            ctx,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> axum::response::Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Sends the request and reads the whole body
    pub async fn call(&self, request: Request<Body>) -> (StatusCode, Bytes) {
        let response = self.send(request).await;
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, body)
    }

    pub async fn call_json(&self, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let (status, body) = self.call(request).await;
        let value = if body.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&body).unwrap()
        };
        (status, value)
    }

    /// Ingests through the HTTP endpoint and returns the new message id
    pub async fn ingest(&self, tenant: &str, raw: &str) -> String {
        let (status, body) = self
            .call_json(post(tenant, "/api/v2/ingest", raw.to_string()))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["id"].as_str().unwrap().to_string()
    }
}

pub fn get(tenant: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("X-Tenant-Id", tenant)
        .body(Body::empty())
        .unwrap()
}

pub fn get_anonymous(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn delete(tenant: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .header("X-Tenant-Id", tenant)
        .body(Body::empty())
        .unwrap()
}

pub fn post(tenant: &str, uri: &str, body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("X-Tenant-Id", tenant)
        .body(body.into())
        .unwrap()
}

pub fn release(tenant: &str, id: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(format!("/api/v1/messages/{}/release", id))
        .header("X-Tenant-Id", tenant)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Reads an event-stream body until `done` accepts the accumulated text
pub async fn read_stream_until<F>(body: Body, done: F) -> String
where
    F: Fn(&str) -> bool,
{
    let mut stream = body.into_data_stream();
    let mut text = String::new();

    let read = async {
        while let Some(chunk) = stream.next().await {
            text.push_str(&String::from_utf8_lossy(&chunk.unwrap()));
            if done(&text) {
                return;
            }
        }
    };

    tokio::time::timeout(Duration::from_secs(120), read)
        .await
        .expect("event stream did not produce the expected frame");
    text
}
