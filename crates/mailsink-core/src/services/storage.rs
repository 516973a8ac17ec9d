/// Message storage capability and the in-memory backend
use crate::error::MailsinkError;
use crate::models::{Message, TenantId};
use async_trait::async_trait;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, RwLock};

/// Which part of a message a search query is matched against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchKind {
    /// The `From` header
    From,
    /// `To`, `Cc` and `Bcc` headers
    To,
    /// Any header value or the body
    Containing,
}

impl FromStr for SearchKind {
    type Err = MailsinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "from" => Ok(Self::From),
            "to" => Ok(Self::To),
            "containing" => Ok(Self::Containing),
            _ => Err(MailsinkError::BadRequest(
                "invalid search param: kind".to_string(),
            )),
        }
    }
}

impl SearchKind {
    fn matches(&self, message: &Message, needle: &str) -> bool {
        let contains = |value: &str| value.to_lowercase().contains(needle);
        let header_matches = |name: &str| {
            message
                .headers()
                .get(name)
                .is_some_and(|values| values.iter().any(|v| contains(v.as_str())))
        };

        match self {
            Self::From => contains(message.from.as_str()) || header_matches("From"),
            Self::To => {
                message.to.iter().any(|addr| contains(addr.as_str()))
                    || header_matches("To")
                    || header_matches("Cc")
                    || header_matches("Bcc")
            }
            Self::Containing => {
                contains(message.content.body.as_str())
                    || message.headers().pairs().any(|(_, value)| contains(value))
            }
        }
    }
}

/// Storage collaborator. Every call is scoped to one tenant; another tenant's
/// message is indistinguishable from a missing one.
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn store(&self, message: Message) -> Result<Arc<Message>, MailsinkError>;
    async fn load(&self, tenant: &TenantId, id: &str) -> Result<Arc<Message>, MailsinkError>;
    async fn list(
        &self,
        tenant: &TenantId,
        start: usize,
        limit: usize,
    ) -> Result<Vec<Arc<Message>>, MailsinkError>;
    async fn delete_one(&self, tenant: &TenantId, id: &str) -> Result<(), MailsinkError>;
    async fn delete_all(&self, tenant: &TenantId) -> Result<(), MailsinkError>;
    async fn search(
        &self,
        tenant: &TenantId,
        kind: SearchKind,
        query: &str,
        start: usize,
        limit: usize,
    ) -> Result<(Vec<Arc<Message>>, usize), MailsinkError>;
    async fn count(&self, tenant: &TenantId) -> Result<usize, MailsinkError>;
}

/// Tenant-partitioned in-memory store; listings are newest first
#[derive(Default)]
pub struct InMemoryStore {
    messages: RwLock<HashMap<TenantId, Vec<Arc<Message>>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned<T>(_: T) -> MailsinkError {
        MailsinkError::Storage("message store lock poisoned".to_string())
    }
}

#[async_trait]
impl MessageStore for InMemoryStore {
    async fn store(&self, message: Message) -> Result<Arc<Message>, MailsinkError> {
        let message = Arc::new(message);
        self.messages
            .write()
            .map_err(Self::poisoned)?
            .entry(message.tenant.clone())
            .or_default()
            .push(Arc::clone(&message));

        tracing::debug!(id = %message.id, tenant = %message.tenant, "Stored message");
        Ok(message)
    }

    async fn load(&self, tenant: &TenantId, id: &str) -> Result<Arc<Message>, MailsinkError> {
        self.messages
            .read()
            .map_err(Self::poisoned)?
            .get(tenant)
            .and_then(|messages| messages.iter().find(|m| m.id == id))
            .cloned()
            .ok_or_else(|| MailsinkError::NotFound(format!("message {} not found", id)))
    }

    async fn list(
        &self,
        tenant: &TenantId,
        start: usize,
        limit: usize,
    ) -> Result<Vec<Arc<Message>>, MailsinkError> {
        Ok(self
            .messages
            .read()
            .map_err(Self::poisoned)?
            .get(tenant)
            .map(|messages| {
                messages
                    .iter()
                    .rev()
                    .skip(start)
                    .take(limit)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn delete_one(&self, tenant: &TenantId, id: &str) -> Result<(), MailsinkError> {
        let mut guard = self.messages.write().map_err(Self::poisoned)?;
        let messages = guard
            .get_mut(tenant)
            .ok_or_else(|| MailsinkError::NotFound(format!("message {} not found", id)))?;

        let before = messages.len();
        messages.retain(|m| m.id != id);
        if messages.len() == before {
            return Err(MailsinkError::NotFound(format!("message {} not found", id)));
        }

        Ok(())
    }

    async fn delete_all(&self, tenant: &TenantId) -> Result<(), MailsinkError> {
        self.messages.write().map_err(Self::poisoned)?.remove(tenant);
        Ok(())
    }

    async fn search(
        &self,
        tenant: &TenantId,
        kind: SearchKind,
        query: &str,
        start: usize,
        limit: usize,
    ) -> Result<(Vec<Arc<Message>>, usize), MailsinkError> {
        let needle = query.to_lowercase();
        let guard = self.messages.read().map_err(Self::poisoned)?;
        let matched: Vec<&Arc<Message>> = guard
            .get(tenant)
            .map(|messages| {
                messages
                    .iter()
                    .rev()
                    .filter(|m| kind.matches(m, &needle))
                    .collect()
            })
            .unwrap_or_default();

        let total = matched.len();
        let page = matched
            .into_iter()
            .skip(start)
            .take(limit)
            .cloned()
            .collect();

        Ok((page, total))
    }

    async fn count(&self, tenant: &TenantId) -> Result<usize, MailsinkError> {
        Ok(self
            .messages
            .read()
            .map_err(Self::poisoned)?
            .get(tenant)
            .map(Vec::len)
            .unwrap_or(0))
    }
}
