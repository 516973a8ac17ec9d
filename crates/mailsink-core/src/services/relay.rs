/// Release of captured messages to a real SMTP server
use crate::error::MailsinkError;
use crate::models::{RelayAuth, RelayProfile, RelayTarget, ReleaseRequest, TenantId};
use crate::services::profiles::ProfileRegistry;
use crate::services::smtp::SmtpDialer;
use crate::services::storage::MessageStore;
use crate::utils::logging::redact_email;
use lettre::Address;
use std::sync::Arc;
use tracing::{info, warn};

/// Host, port, credentials and recipient after profile resolution
#[derive(Debug, Clone, PartialEq, Eq)]
struct Resolved {
    email: String,
    host: String,
    port: String,
    username: String,
    password: String,
    mechanism: String,
}

impl From<ReleaseRequest> for Resolved {
    fn from(req: ReleaseRequest) -> Self {
        Self {
            email: req.email,
            host: req.host,
            port: req.port,
            username: req.username,
            password: req.password,
            mechanism: req.mechanism,
        }
    }
}

impl Resolved {
    /// Profile values win, except that a recipient in the request is kept
    fn apply(mut self, profile: RelayProfile) -> Self {
        if self.email.is_empty() {
            self.email = profile.email;
        }
        self.host = profile.host;
        self.port = profile.port;
        self.username = profile.username;
        self.password = profile.password;
        self.mechanism = profile.mechanism;
        self
    }

    fn into_target(self, sender: &str) -> Result<RelayTarget, MailsinkError> {
        let host = self.host.trim();
        if host.is_empty() {
            return Err(MailsinkError::BadRequest("relay host required".to_string()));
        }

        let port = match self.port.trim().parse::<u16>() {
            Ok(port) if port > 0 => port,
            _ => {
                return Err(MailsinkError::BadRequest(format!(
                    "invalid relay port: '{}'",
                    self.port
                )));
            }
        };

        let recipient = self.email.trim();
        if recipient.is_empty() {
            return Err(MailsinkError::BadRequest("recipient email required".to_string()));
        }
        recipient.parse::<Address>().map_err(|e| {
            MailsinkError::BadRequest(format!("invalid recipient email: {}", e))
        })?;

        let auth = RelayAuth::select(&self.username, &self.password, &self.mechanism)?;

        Ok(RelayTarget {
            host: host.to_string(),
            port,
            sender: sender.to_string(),
            recipient: recipient.to_string(),
            auth,
        })
    }
}

/// Forwards stored messages to external SMTP servers, once per call
pub struct ReleaseRelay {
    store: Arc<dyn MessageStore>,
    profiles: Arc<ProfileRegistry>,
    dialer: Arc<dyn SmtpDialer>,
    sender: String,
}

impl ReleaseRelay {
    /// `sender` is the envelope sender used for every release
    pub fn new(
        store: Arc<dyn MessageStore>,
        profiles: Arc<ProfileRegistry>,
        dialer: Arc<dyn SmtpDialer>,
        sender: impl Into<String>,
    ) -> Self {
        Self {
            store,
            profiles,
            dialer,
            sender: sender.into(),
        }
    }

    pub fn profiles(&self) -> &Arc<ProfileRegistry> {
        &self.profiles
    }

    /// Releases message `id` of `tenant` as described by the JSON `body`.
    ///
    /// Every validation failure happens before the dialer is called. A failed
    /// SMTP exchange is reported as `RelayFailure` and never retried.
    #[tracing::instrument(skip(self, tenant, body), fields(tenant = %tenant))]
    pub async fn release(
        &self,
        tenant: &TenantId,
        id: &str,
        body: &[u8],
    ) -> Result<(), MailsinkError> {
        let message = self.store.load(tenant, id).await?;
        let request = ReleaseRequest::from_slice(body)?;

        if request.save {
            self.profiles.save(tenant, RelayProfile::from(&request))?;
        }

        let name = request.name.trim().to_string();
        let mut resolved = Resolved::from(request);
        if !name.is_empty() {
            let profile = self.profiles.get(tenant, &name)?.ok_or_else(|| {
                MailsinkError::BadRequest(format!("Server not found: {}", name))
            })?;
            resolved = resolved.apply(profile);
        }

        let target = resolved.into_target(&self.sender)?;
        let raw = message.to_raw();

        info!(
            message_id = %message.id,
            recipient = %redact_email(&target.recipient),
            host = %target.host,
            port = target.port,
            auth = target.auth.mechanism_name(),
            "Releasing message"
        );

        match self.dialer.deliver(&target, raw.as_bytes()).await {
            Ok(()) => {
                info!(message_id = %message.id, "Message released");
                Ok(())
            }
            Err(e) => {
                warn!(message_id = %message.id, host = %target.host, "Release failed: {}", e);
                Err(match e {
                    MailsinkError::RelayFailure(_) => e,
                    other => MailsinkError::RelayFailure(other.to_string()),
                })
            }
        }
    }
}
