/// Tenant resolution for request handlers
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use mailsink_core::constants::TENANT_HEADER;
use mailsink_core::models::TenantId;

use crate::error::ApiError;

/// The tenant named by the `X-Tenant-Id` header.
///
/// Extraction fails with 412 when the header is missing or blank, before the
/// handler body (and therefore any storage access) runs.
#[derive(Debug, Clone)]
pub struct Tenant(pub TenantId);

impl Tenant {
    /// Raw header value, if present and valid UTF-8
    pub fn header_value(headers: &axum::http::HeaderMap) -> Option<&str> {
        headers.get(TENANT_HEADER).and_then(|value| value.to_str().ok())
    }
}

impl<S> FromRequestParts<S> for Tenant
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let tenant = TenantId::resolve(Self::header_value(&parts.headers))?;
        Ok(Tenant(tenant))
    }
}
