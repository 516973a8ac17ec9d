/// Release request and relay profile models
use crate::error::MailsinkError;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Body of a release call. Field names follow the web UI (`Email`, `Host`,
/// ...) with lower-case aliases accepted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ReleaseRequest {
    #[serde(alias = "email")]
    pub email: String,
    #[serde(alias = "host")]
    pub host: String,
    #[serde(alias = "port", deserialize_with = "string_or_number")]
    pub port: String,
    #[serde(alias = "name")]
    pub name: String,
    #[serde(alias = "username")]
    pub username: String,
    #[serde(alias = "password")]
    pub password: String,
    #[serde(alias = "mechanism")]
    pub mechanism: String,
    #[serde(alias = "save")]
    pub save: bool,
}

impl ReleaseRequest {
    /// Decodes a request body; malformed input is `BadRequest`
    pub fn from_slice(body: &[u8]) -> Result<Self, MailsinkError> {
        serde_json::from_slice(body)
            .map_err(|e| MailsinkError::BadRequest(format!("Invalid release request: {}", e)))
    }
}

/// A named, saved set of outbound relay settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RelayProfile {
    #[serde(default, alias = "name")]
    pub name: String,
    #[serde(default, alias = "email")]
    pub email: String,
    #[serde(alias = "host")]
    pub host: String,
    #[serde(alias = "port", deserialize_with = "string_or_number")]
    pub port: String,
    #[serde(default, alias = "username")]
    pub username: String,
    #[serde(default, alias = "password", skip_serializing)]
    pub password: String,
    #[serde(default, alias = "mechanism")]
    pub mechanism: String,
}

impl From<&ReleaseRequest> for RelayProfile {
    fn from(req: &ReleaseRequest) -> Self {
        Self {
            name: req.name.clone(),
            email: req.email.clone(),
            host: req.host.clone(),
            port: req.port.clone(),
            username: req.username.clone(),
            password: req.password.clone(),
            mechanism: req.mechanism.clone(),
        }
    }
}

/// Authentication strategy for the outbound SMTP session
#[derive(Clone, PartialEq, Eq)]
pub enum RelayAuth {
    None,
    CramMd5 { username: String, password: String },
    Plain { username: String, password: String },
}

impl RelayAuth {
    /// Selects a strategy from resolved credentials.
    ///
    /// No credentials means no authentication. With credentials the mechanism
    /// tag must be exactly `CRAMMD5` or `PLAIN`.
    pub fn select(username: &str, password: &str, mechanism: &str) -> Result<Self, MailsinkError> {
        if username.is_empty() && password.is_empty() {
            return Ok(Self::None);
        }

        let (username, password) = (username.to_string(), password.to_string());
        match mechanism {
            "CRAMMD5" => Ok(Self::CramMd5 { username, password }),
            "PLAIN" => Ok(Self::Plain { username, password }),
            _ => Err(MailsinkError::BadRequest(
                "invalid authentication mechanism".to_string(),
            )),
        }
    }

    pub fn mechanism_name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::CramMd5 { .. } => "CRAM-MD5",
            Self::Plain { .. } => "PLAIN",
        }
    }
}

// Keep passwords out of logs
impl fmt::Debug for RelayAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::CramMd5 { username, .. } | Self::Plain { username, .. } => f
                .debug_struct(self.mechanism_name())
                .field("username", username)
                .finish_non_exhaustive(),
        }
    }
}

/// Fully resolved destination of one release
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayTarget {
    pub host: String,
    pub port: u16,
    pub sender: String,
    pub recipient: String,
    pub auth: RelayAuth,
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Port {
        Text(String),
        Number(u64),
    }

    Ok(match Port::deserialize(deserializer)? {
        Port::Text(text) => text,
        Port::Number(number) => number.to_string(),
    })
}
