/// API v1: message listing, downloads, release and the event stream
use axum::{
    Json,
    body::{Body, Bytes},
    extract::{Path, State},
    http::{HeaderName, HeaderValue, StatusCode, header},
    response::{
        IntoResponse, Response,
        sse::{Event, Sse},
    },
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use futures::{Stream, StreamExt};
use mailsink_core::constants::V1_LIST_LIMIT;
use mailsink_core::models::{Content, Message};
use std::convert::Infallible;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::context::ApiContext;
use crate::error::ApiError;
use crate::tenant::Tenant;

/// Lists the tenant's messages, newest first
pub async fn messages(
    Tenant(tenant): Tenant,
    State(ctx): State<Arc<ApiContext>>,
) -> Result<Json<Vec<Arc<Message>>>, ApiError> {
    let messages = ctx.store.list(&tenant, 0, V1_LIST_LIMIT).await?;
    Ok(Json(messages))
}

pub async fn message(
    Tenant(tenant): Tenant,
    State(ctx): State<Arc<ApiContext>>,
    Path(id): Path<String>,
) -> Result<Json<Arc<Message>>, ApiError> {
    Ok(Json(ctx.store.load(&tenant, &id).await?))
}

pub async fn delete_all(
    Tenant(tenant): Tenant,
    State(ctx): State<Arc<ApiContext>>,
) -> Result<StatusCode, ApiError> {
    ctx.store.delete_all(&tenant).await?;
    Ok(StatusCode::OK)
}

pub async fn delete_one(
    Tenant(tenant): Tenant,
    State(ctx): State<Arc<ApiContext>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    ctx.store.delete_one(&tenant, &id).await?;
    Ok(StatusCode::OK)
}

/// Raw message as an `.eml` attachment
pub async fn download(
    Tenant(tenant): Tenant,
    State(ctx): State<Arc<ApiContext>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let message = ctx.store.load(&tenant, &id).await?;
    let disposition = attachment(&format!("{}.eml", message.id))?;

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("message/rfc822")),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        message.to_raw(),
    )
        .into_response())
}

/// One MIME part with its own headers; base64 bodies are decoded
pub async fn download_part(
    Tenant(tenant): Tenant,
    State(ctx): State<Arc<ApiContext>>,
    Path((id, part)): Path<(String, usize)>,
) -> Result<Response, ApiError> {
    let message = ctx.store.load(&tenant, &id).await?;
    let content = message
        .part(part)
        .ok_or_else(|| ApiError::NotFound(format!("part {} not found in message {}", part, id)))?;

    let mut response = Response::new(Body::from(part_body(content)));
    let headers = response.headers_mut();

    for (name, value) in content.headers.pairs() {
        let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) else {
            debug!(header = name, "Skipping part header not valid in HTTP");
            continue;
        };

        // A single disposition; every other header keeps all its values
        if name == header::CONTENT_DISPOSITION {
            headers.insert(name, value);
        } else {
            headers.append(name, value);
        }
    }

    if !headers.contains_key(header::CONTENT_DISPOSITION) {
        headers.insert(
            header::CONTENT_DISPOSITION,
            attachment(&format!("{}-part-{}", id, part))?,
        );
    }

    Ok(response)
}

fn part_body(content: &Content) -> Vec<u8> {
    let is_base64 = content
        .transfer_encoding()
        .is_some_and(|encoding| encoding.trim().eq_ignore_ascii_case("base64"));
    if !is_base64 {
        return content.body.clone().into_bytes();
    }

    let compact: String = content.body.split_whitespace().collect();
    match BASE64.decode(compact.as_bytes()) {
        Ok(decoded) => decoded,
        Err(e) => {
            warn!("Decoding base64 encoded body failed: {}", e);
            content.body.clone().into_bytes()
        }
    }
}

fn attachment(filename: &str) -> Result<HeaderValue, ApiError> {
    HeaderValue::from_str(&format!("attachment; filename=\"{}\"", filename))
        .map_err(|e| ApiError::BadRequest(format!("invalid attachment name: {}", e)))
}

/// Forwards a stored message to a real SMTP server
pub async fn release(
    Tenant(tenant): Tenant,
    State(ctx): State<Arc<ApiContext>>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    ctx.relay.release(&tenant, &id, &body).await?;
    Ok(StatusCode::OK)
}

/// Server-sent events: `event:` is the delivery kind, `data:` the message
pub async fn events(
    Tenant(tenant): Tenant,
    State(ctx): State<Arc<ApiContext>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let receiver = ctx.event_stream.subscribe(tenant).await;

    Sse::new(receiver.into_stream().map(|event| {
        Ok(Event::default()
            .event(event.kind.as_str())
            .data(event.data.as_ref()))
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mailsink_core::models::Headers;

    fn part(encoding: Option<&str>, body: &str) -> Content {
        let mut headers = Headers::new();
        headers.append("Content-Type", "text/plain");
        if let Some(encoding) = encoding {
            headers.append("Content-Transfer-Encoding", encoding);
        }
        Content::new(headers, body.to_string())
    }

    #[test]
    fn test_part_body_decodes_base64() {
        assert_eq!(part_body(&part(Some("base64"), "aGVs\r\nbG8=")), b"hello");
        assert_eq!(part_body(&part(Some("BASE64"), "aGVsbG8=")), b"hello");
    }

    #[test]
    fn test_part_body_passthrough() {
        assert_eq!(part_body(&part(None, "plain")), b"plain");
        assert_eq!(part_body(&part(Some("quoted-printable"), "a=3Db")), b"a=3Db");
        assert_eq!(part_body(&part(Some("base64"), "%%%")), b"%%%");
    }
}
