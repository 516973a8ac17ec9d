/// Tenant isolation key
use crate::error::MailsinkError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier partitioning stored messages, subscribers and saved relay
/// profiles. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TenantId(String);

impl TenantId {
    /// Resolves a tenant from a raw request value.
    ///
    /// A missing or blank value is `PreconditionFailed`, which callers must
    /// surface before touching any per-tenant state.
    pub fn resolve(raw: Option<&str>) -> Result<Self, MailsinkError> {
        match raw.map(str::trim) {
            Some(value) if !value.is_empty() => Ok(Self(value.to_string())),
            _ => Err(MailsinkError::PreconditionFailed(
                "tenant identifier required".to_string(),
            )),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TenantId {
    type Error = MailsinkError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::resolve(Some(&value))
    }
}

impl From<TenantId> for String {
    fn from(tenant: TenantId) -> Self {
        tenant.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_trims() {
        let tenant = TenantId::resolve(Some("  acme ")).unwrap();
        assert_eq!(tenant.as_str(), "acme");
    }

    #[test]
    fn test_missing_tenant_is_precondition_failed() {
        assert!(matches!(
            TenantId::resolve(None),
            Err(MailsinkError::PreconditionFailed(_))
        ));
        assert!(matches!(
            TenantId::resolve(Some("   ")),
            Err(MailsinkError::PreconditionFailed(_))
        ));
    }

    #[test]
    fn test_deserialize_rejects_empty() {
        assert!(serde_json::from_str::<TenantId>(r#""""#).is_err());
        let tenant: TenantId = serde_json::from_str(r#""B""#).unwrap();
        assert_eq!(tenant.to_string(), "B");
    }
}
