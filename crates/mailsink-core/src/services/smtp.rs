/// Outbound SMTP hand-off using lettre's async connection
use crate::error::MailsinkError;
use crate::models::{RelayAuth, RelayTarget};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, Mac};
use lettre::address::{Address, Envelope};
use lettre::transport::smtp::authentication::{Credentials, Mechanism};
use lettre::transport::smtp::client::{AsyncSmtpConnection, TlsParameters};
use lettre::transport::smtp::extension::ClientId;
use md5::Md5;
use std::time::Duration;
use tracing::debug;

/// Performs one SMTP transaction against an external server
#[async_trait]
pub trait SmtpDialer: Send + Sync {
    async fn deliver(&self, target: &RelayTarget, raw: &[u8]) -> Result<(), MailsinkError>;
}

/// SMTP client: EHLO, STARTTLS when offered, optional AUTH, MAIL, RCPT, DATA, QUIT
pub struct LettreDialer {
    hello_name: String,
    timeout: Duration,
}

impl LettreDialer {
    pub fn new(hello_name: impl Into<String>, timeout: Duration) -> Self {
        Self {
            hello_name: hello_name.into(),
            timeout,
        }
    }
}

fn relay_failure(context: &str, err: impl std::fmt::Display) -> MailsinkError {
    MailsinkError::RelayFailure(format!("{}: {}", context, err))
}

#[async_trait]
impl SmtpDialer for LettreDialer {
    async fn deliver(&self, target: &RelayTarget, raw: &[u8]) -> Result<(), MailsinkError> {
        let sender: Address = target
            .sender
            .parse()
            .map_err(|e| relay_failure("Invalid envelope sender", e))?;
        let recipient: Address = target
            .recipient
            .parse()
            .map_err(|e| relay_failure("Invalid recipient", e))?;
        let envelope = Envelope::new(Some(sender), vec![recipient])
            .map_err(|e| relay_failure("Invalid envelope", e))?;

        let hello = ClientId::Domain(self.hello_name.clone());
        let mut conn = AsyncSmtpConnection::connect_tokio1(
            (target.host.as_str(), target.port),
            Some(self.timeout),
            &hello,
            None,
            None,
        )
        .await
        .map_err(|e| relay_failure("Connection failed", e))?;

        debug!(host = %target.host, port = target.port, auth = target.auth.mechanism_name(), "Connected to relay");

        // Credentials never cross a connection the server offered to encrypt
        if conn.can_starttls() {
            let tls = TlsParameters::new(target.host.clone())
                .map_err(|e| relay_failure("Invalid TLS parameters", e))?;
            conn.starttls(tls, &hello)
                .await
                .map_err(|e| relay_failure("STARTTLS failed", e))?;
            debug!(host = %target.host, "Relay connection upgraded with STARTTLS");
        }

        match &target.auth {
            RelayAuth::None => {}
            RelayAuth::Plain { username, password } => {
                let credentials = Credentials::new(username.clone(), password.clone());
                conn.auth(&[Mechanism::Plain], &credentials)
                    .await
                    .map_err(|e| relay_failure("PLAIN authentication failed", e))?;
            }
            RelayAuth::CramMd5 { username, password } => {
                cram_md5(&mut conn, username, password).await?;
            }
        }

        conn.send(&envelope, raw)
            .await
            .map_err(|e| relay_failure("Delivery failed", e))?;

        // The message is accepted at this point; a failed QUIT changes nothing
        if let Err(e) = conn.quit().await {
            debug!("QUIT after release failed: {}", e);
        }

        Ok(())
    }
}

/// RFC 2195 challenge/response exchange
async fn cram_md5(
    conn: &mut AsyncSmtpConnection,
    username: &str,
    password: &str,
) -> Result<(), MailsinkError> {
    let challenge = conn
        .command("AUTH CRAM-MD5\r\n")
        .await
        .map_err(|e| relay_failure("CRAM-MD5 authentication failed", e))?;

    let encoded = challenge.message().next().unwrap_or_default().trim().to_string();
    let decoded = BASE64
        .decode(encoded.as_bytes())
        .map_err(|e| relay_failure("Invalid CRAM-MD5 challenge", e))?;

    let reply = BASE64.encode(cram_md5_response(username, password, &decoded)?);
    conn.command(format!("{}\r\n", reply))
        .await
        .map_err(|e| relay_failure("CRAM-MD5 authentication failed", e))?;

    Ok(())
}

/// `<username> <hex HMAC-MD5(password, challenge)>`
pub fn cram_md5_response(
    username: &str,
    password: &str,
    challenge: &[u8],
) -> Result<String, MailsinkError> {
    Ok(format!("{} {}", username, hmac_md5_hex(password.as_bytes(), challenge)?))
}

type HmacMd5 = Hmac<Md5>;

fn hmac_md5_hex(key: &[u8], data: &[u8]) -> Result<String, MailsinkError> {
    let mut mac =
        HmacMd5::new_from_slice(key).map_err(|e| relay_failure("Invalid CRAM-MD5 key", e))?;
    mac.update(data);
    Ok(format!("{:x}", mac.finalize().into_bytes()))
}

/// Records every delivery instead of dialing
#[derive(Default)]
pub struct RecordingDialer {
    attempts: std::sync::Mutex<Vec<(RelayTarget, Vec<u8>)>>,
    fail_with: Option<String>,
}

impl RecordingDialer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            attempts: Default::default(),
            fail_with: Some(reason.to_string()),
        }
    }

    pub fn attempts(&self) -> Vec<(RelayTarget, Vec<u8>)> {
        self.attempts
            .lock()
            .map(|attempts| attempts.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl SmtpDialer for RecordingDialer {
    async fn deliver(&self, target: &RelayTarget, raw: &[u8]) -> Result<(), MailsinkError> {
        if let Ok(mut attempts) = self.attempts.lock() {
            attempts.push((target.clone(), raw.to_vec()));
        }
        match &self.fail_with {
            Some(reason) => Err(MailsinkError::RelayFailure(reason.clone())),
            None => Ok(()),
        }
    }
}
