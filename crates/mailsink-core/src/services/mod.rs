/// Service layer: storage, ingestion, fan-out and release
pub mod config;
pub mod event_stream;
pub mod hub;
pub mod ingest;
pub mod profiles;
pub mod relay;
pub mod router;
pub mod smtp;
pub mod storage;

pub use event_stream::{EventStream, Receiver};
pub use hub::{ConnectionHandle, ConnectionHub};
pub use ingest::Ingestor;
pub use profiles::ProfileRegistry;
pub use relay::ReleaseRelay;
pub use router::{BroadcastRouter, Sink};
pub use smtp::{LettreDialer, RecordingDialer, SmtpDialer};
pub use storage::{InMemoryStore, MessageStore, SearchKind};
