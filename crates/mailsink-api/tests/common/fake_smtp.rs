/// Minimal SMTP server recording what a relay client sends
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

/// Challenge from RFC 2195, so expected responses are well known
pub const CRAM_CHALLENGE: &str = "<1896.697170952@postoffice.reston.mci.net>";

#[derive(Debug, Clone, Default)]
pub struct SmtpSession {
    pub connections: usize,
    pub ehlo: Option<String>,
    /// `PLAIN` or `CRAM-MD5`
    pub auth_mechanism: Option<String>,
    /// Decoded client credentials
    pub auth_payload: Option<String>,
    pub mail_from: Option<String>,
    pub rcpt_to: Vec<String>,
    pub data: String,
    /// Client issued STARTTLS
    pub starttls: bool,
    /// First byte after STARTTLS was a TLS handshake record
    pub tls_hello: bool,
}

#[derive(Clone)]
pub struct FakeSmtp {
    pub addr: SocketAddr,
    session: Arc<Mutex<SmtpSession>>,
}

impl FakeSmtp {
    pub async fn start() -> Self {
        Self::spawn(false).await
    }

    /// Advertises STARTTLS and records the client's handshake attempt.
    /// The server has no certificate, so the handshake never completes.
    pub async fn start_with_starttls() -> Self {
        Self::spawn(true).await
    }

    async fn spawn(offer_starttls: bool) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let session = Arc::new(Mutex::new(SmtpSession::default()));

        let shared = Arc::clone(&session);
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                shared.lock().unwrap().connections += 1;
                tokio::spawn(handle(stream, Arc::clone(&shared), offer_starttls));
            }
        });

        Self { addr, session }
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn session(&self) -> SmtpSession {
        self.session.lock().unwrap().clone()
    }
}

/// A port nothing listens on
pub async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

fn between_brackets(line: &str) -> String {
    let start = line.find('<').map(|i| i + 1).unwrap_or(0);
    let end = line.rfind('>').unwrap_or(line.len());
    line[start..end].to_string()
}

fn decode(encoded: &str) -> String {
    String::from_utf8(BASE64.decode(encoded.trim()).unwrap()).unwrap()
}

async fn handle(
    stream: TcpStream,
    session: Arc<Mutex<SmtpSession>>,
    offer_starttls: bool,
) -> std::io::Result<()> {
    let (read, mut write) = stream.into_split();
    let mut lines = BufReader::new(read).lines();

    write.write_all(b"220 fake.smtp ESMTP ready\r\n").await?;

    while let Some(line) = lines.next_line().await? {
        let upper = line.to_ascii_uppercase();

        if upper.starts_with("EHLO") || upper.starts_with("HELO") {
            session.lock().unwrap().ehlo = line.get(5..).map(|name| name.trim().to_string());
            if offer_starttls {
                write.write_all(b"250-fake.smtp greets you\r\n250-STARTTLS\r\n").await?;
            } else {
                write.write_all(b"250-fake.smtp greets you\r\n").await?;
            }
            write.write_all(b"250 AUTH PLAIN CRAM-MD5\r\n").await?;
        } else if offer_starttls && upper == "STARTTLS" {
            session.lock().unwrap().starttls = true;
            write.write_all(b"220 2.0.0 Ready to start TLS\r\n").await?;
            // 0x16 opens a TLS handshake record
            let first = lines.get_mut().read_u8().await?;
            session.lock().unwrap().tls_hello = first == 0x16;
            break;
        } else if upper.starts_with("AUTH PLAIN") {
            let mut encoded = line[10..].trim().to_string();
            if encoded.is_empty() {
                write.write_all(b"334 \r\n").await?;
                encoded = lines.next_line().await?.unwrap_or_default();
            }
            {
                let mut s = session.lock().unwrap();
                s.auth_mechanism = Some("PLAIN".to_string());
                s.auth_payload = Some(decode(&encoded));
            }
            write.write_all(b"235 2.7.0 Authentication successful\r\n").await?;
        } else if upper.starts_with("AUTH CRAM-MD5") {
            let challenge = BASE64.encode(CRAM_CHALLENGE);
            write
                .write_all(format!("334 {}\r\n", challenge).as_bytes())
                .await?;
            let reply = lines.next_line().await?.unwrap_or_default();
            {
                let mut s = session.lock().unwrap();
                s.auth_mechanism = Some("CRAM-MD5".to_string());
                s.auth_payload = Some(decode(&reply));
            }
            write.write_all(b"235 2.7.0 Authentication successful\r\n").await?;
        } else if upper.starts_with("MAIL FROM:") {
            session.lock().unwrap().mail_from = Some(between_brackets(&line));
            write.write_all(b"250 2.1.0 OK\r\n").await?;
        } else if upper.starts_with("RCPT TO:") {
            session.lock().unwrap().rcpt_to.push(between_brackets(&line));
            write.write_all(b"250 2.1.5 OK\r\n").await?;
        } else if upper == "DATA" {
            write
                .write_all(b"354 End data with <CR><LF>.<CR><LF>\r\n")
                .await?;
            let mut data = Vec::new();
            while let Some(data_line) = lines.next_line().await? {
                if data_line == "." {
                    break;
                }
                let unstuffed = data_line.strip_prefix('.').filter(|_| data_line.starts_with(".."));
                data.push(unstuffed.unwrap_or(&data_line).to_string());
            }
            session.lock().unwrap().data = data.join("\r\n");
            write.write_all(b"250 2.0.0 OK queued\r\n").await?;
        } else if upper == "QUIT" {
            write.write_all(b"221 2.0.0 Bye\r\n").await?;
            break;
        } else if upper == "RSET" || upper == "NOOP" {
            write.write_all(b"250 2.0.0 OK\r\n").await?;
        } else {
            write.write_all(b"502 5.5.2 Command not recognized\r\n").await?;
        }
    }

    Ok(())
}
