/// Error types for the Mailsink core
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MailsinkError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("Relay failure: {0}")]
    RelayFailure(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Email parsing error: {0}")]
    Parse(String),
}

impl MailsinkError {
    /// Whether the caller supplied something the service could not act on.
    ///
    /// Client errors are surfaced verbatim; nothing in the core retries them.
    pub fn is_client_error(&self) -> bool {
        match self {
            Self::NotFound(_) => true,
            Self::BadRequest(_) => true,
            Self::Conflict(_) => true,
            Self::PreconditionFailed(_) => true,
            Self::Parse(_) => true,
            Self::RelayFailure(_) => false,
            Self::Storage(_) => false,
            Self::Config(_) => false,
        }
    }
}

impl From<serde_json::Error> for MailsinkError {
    fn from(err: serde_json::Error) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl From<std::env::VarError> for MailsinkError {
    fn from(err: std::env::VarError) -> Self {
        Self::Config(err.to_string())
    }
}
