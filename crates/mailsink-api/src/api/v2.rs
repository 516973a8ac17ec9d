/// API v2: paginated listing, search, relay profiles, websocket and ingestion
use axum::{
    Json,
    body::Bytes,
    extract::{Query, State, WebSocketUpgrade},
    http::StatusCode,
    response::Response,
};
use mailsink_core::constants::{DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
use mailsink_core::models::{Message, RelayProfile};
use mailsink_core::services::SearchKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::context::ApiContext;
use crate::error::ApiError;
use crate::tenant::Tenant;

/// Page of messages
#[derive(Debug, Serialize)]
pub struct MessagesResult {
    pub total: usize,
    pub count: usize,
    pub start: usize,
    pub items: Vec<Arc<Message>>,
}

impl MessagesResult {
    fn new(total: usize, start: usize, items: Vec<Arc<Message>>) -> Self {
        Self {
            total,
            count: items.len(),
            start,
            items,
        }
    }
}

/// Raw paging parameters; anything unparsable or non-positive is ignored
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub start: Option<String>,
    pub limit: Option<String>,
}

impl PageParams {
    pub fn start_limit(&self) -> (usize, usize) {
        let positive = |raw: &Option<String>| {
            raw.as_deref()
                .and_then(|value| value.trim().parse::<i64>().ok())
                .filter(|n| *n > 0)
                .and_then(|n| usize::try_from(n).ok())
        };

        let start = positive(&self.start).unwrap_or(0);
        let limit = positive(&self.limit)
            .map(|n| n.min(MAX_PAGE_LIMIT))
            .unwrap_or(DEFAULT_PAGE_LIMIT);
        (start, limit)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub kind: Option<String>,
    pub query: Option<String>,
    #[serde(flatten)]
    pub page: PageParams,
}

pub async fn messages(
    Tenant(tenant): Tenant,
    State(ctx): State<Arc<ApiContext>>,
    Query(params): Query<PageParams>,
) -> Result<Json<MessagesResult>, ApiError> {
    let (start, limit) = params.start_limit();
    let items = ctx.store.list(&tenant, start, limit).await?;
    let total = ctx.store.count(&tenant).await?;
    Ok(Json(MessagesResult::new(total, start, items)))
}

pub async fn search(
    Tenant(tenant): Tenant,
    State(ctx): State<Arc<ApiContext>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<MessagesResult>, ApiError> {
    let (start, limit) = params.page.start_limit();

    let kind: SearchKind = params.kind.as_deref().unwrap_or_default().parse()?;
    let query = params.query.unwrap_or_default();
    if query.is_empty() {
        return Err(ApiError::BadRequest("invalid search param: query".to_string()));
    }

    let (items, total) = ctx.store.search(&tenant, kind, &query, start, limit).await?;
    Ok(Json(MessagesResult::new(total, start, items)))
}

/// Relay profiles visible to the tenant; passwords are never included
pub async fn outgoing_smtp(
    Tenant(tenant): Tenant,
    State(ctx): State<Arc<ApiContext>>,
) -> Result<Json<BTreeMap<String, RelayProfile>>, ApiError> {
    Ok(Json(ctx.profiles.list(&tenant)?))
}

pub async fn websocket(
    Tenant(tenant): Tenant,
    State(ctx): State<Arc<ApiContext>>,
    ws: WebSocketUpgrade,
) -> Response {
    ctx.hub.upgrade(tenant, ws)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IngestResponse {
    pub id: String,
}

/// Accepts a raw RFC 5322 message for the tenant
pub async fn ingest(
    Tenant(tenant): Tenant,
    State(ctx): State<Arc<ApiContext>>,
    body: Bytes,
) -> Result<(StatusCode, Json<IngestResponse>), ApiError> {
    if body.is_empty() {
        return Err(ApiError::BadRequest("empty message".to_string()));
    }

    let message = ctx.ingestor.accept(tenant, &body).await?;
    Ok((
        StatusCode::CREATED,
        Json(IngestResponse {
            id: message.id.clone(),
        }),
    ))
}
