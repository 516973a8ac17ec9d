/// Message ingestion point: parse, store, notify
use crate::email::parse_message;
use crate::error::MailsinkError;
use crate::models::{Message, TenantId};
use crate::services::storage::MessageStore;
use crate::utils::logging::{redact_body, redact_subject};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{info, warn};

/// Accepts raw messages for a tenant and emits exactly one notification per
/// stored message on the ingestion channel
pub struct Ingestor {
    store: Arc<dyn MessageStore>,
    notify: mpsc::Sender<Arc<Message>>,
}

impl Ingestor {
    pub fn new(store: Arc<dyn MessageStore>, notify: mpsc::Sender<Arc<Message>>) -> Self {
        Self { store, notify }
    }

    /// Bounded ingestion channel; the receiver feeds the broadcast router
    pub fn channel(bound: usize) -> (mpsc::Sender<Arc<Message>>, mpsc::Receiver<Arc<Message>>) {
        mpsc::channel(bound.max(1))
    }

    pub async fn accept(&self, tenant: TenantId, raw: &[u8]) -> Result<Arc<Message>, MailsinkError> {
        let message = parse_message(tenant, raw)?;
        let stored = self.store.store(message).await?;

        info!(
            id = %stored.id,
            tenant = %stored.tenant,
            size = %redact_body(raw),
            subject = %redact_subject(stored.headers().first("Subject").unwrap_or_default()),
            "Accepted message"
        );

        match self.notify.try_send(Arc::clone(&stored)) {
            Ok(()) => {}
            Err(TrySendError::Full(message)) => {
                warn!(id = %stored.id, "Ingestion queue full, waiting for the router");
                if self.notify.send(message).await.is_err() {
                    warn!(id = %stored.id, "Ingestion queue closed, message not broadcast");
                }
            }
            Err(TrySendError::Closed(_)) => {
                warn!(id = %stored.id, "Ingestion queue closed, message not broadcast");
            }
        }

        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::storage::InMemoryStore;

    #[tokio::test]
    async fn test_accept_stores_and_notifies_once() {
        let store = Arc::new(InMemoryStore::new());
        let (tx, mut rx) = Ingestor::channel(4);
        let ingestor = Ingestor::new(store.clone(), tx);
        let tenant = TenantId::resolve(Some("acme")).unwrap();

        let stored = ingestor
            .accept(
                tenant.clone(),
                b"From: a@example.com\r\nTo: b@example.com\r\nSubject: Quarterly numbers\r\n\r\nbody\r\n",
            )
            .await
            .unwrap();

        assert_eq!(store.count(&tenant).await.unwrap(), 1);
        let notified = rx.recv().await.unwrap();
        assert_eq!(notified.id, stored.id);
        assert_eq!(notified.tenant, tenant);
        assert_eq!(notified.headers().first("Subject"), Some("Quarterly numbers"));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_accept_survives_closed_channel() {
        let store = Arc::new(InMemoryStore::new());
        let (tx, rx) = Ingestor::channel(1);
        drop(rx);
        let ingestor = Ingestor::new(store.clone(), tx);
        let tenant = TenantId::resolve(Some("acme")).unwrap();

        ingestor
            .accept(tenant.clone(), b"Subject: x\r\n\r\nbody\r\n")
            .await
            .unwrap();
        assert_eq!(store.count(&tenant).await.unwrap(), 1);
    }
}
