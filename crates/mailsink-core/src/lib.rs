/// Mailsink Core - capture-side library for the Mailsink mail catcher
///
/// This crate contains the message model, the storage capability, the
/// real-time fan-out pipeline (router, event stream, websocket hub) and the
/// release relay used by the Mailsink API.
pub mod constants;
pub mod email;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

// Re-export commonly used types
pub use error::MailsinkError;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
