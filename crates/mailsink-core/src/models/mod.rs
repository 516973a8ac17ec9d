/// Data models for the Mailsink core
pub mod config;
pub mod event;
pub mod message;
pub mod release;
pub mod tenant;

pub use config::*;
pub use event::*;
pub use message::*;
pub use release::*;
pub use tenant::*;
