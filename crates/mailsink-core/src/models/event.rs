/// Fan-out event models
use crate::models::{Message, TenantId};
use serde::Serialize;
use std::sync::Arc;

/// Delivery kind of an event on a subscriber stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Data,
    Keepalive,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Data => "data",
            Self::Keepalive => "keepalive",
        }
    }
}

/// A stored message (or nothing, for keepalives) tagged with its delivery kind
#[derive(Debug, Clone)]
pub struct BroadcastEvent {
    pub kind: EventKind,
    pub message: Option<Arc<Message>>,
}

impl BroadcastEvent {
    pub fn data(message: Arc<Message>) -> Self {
        Self {
            kind: EventKind::Data,
            message: Some(message),
        }
    }

    pub fn keepalive() -> Self {
        Self {
            kind: EventKind::Keepalive,
            message: None,
        }
    }

    /// Tenant the event is restricted to; keepalives go to everyone
    pub fn tenant(&self) -> Option<&TenantId> {
        self.message.as_ref().map(|message| &message.tenant)
    }
}

/// What a subscriber actually receives: the kind and the serialized payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEvent {
    pub kind: EventKind,
    pub data: Arc<str>,
}
