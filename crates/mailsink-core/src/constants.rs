/// Application constants
///
/// Defaults for every tunable in [`crate::models::MailsinkConfig`], plus the
/// fixed limits of the HTTP surface.
// ============================================================================
// Network Defaults
// ============================================================================

/// Default HTTP listen address
pub const DEFAULT_API_BIND_ADDR: &str = "0.0.0.0:8025";

/// Default hostname used for the synthesized envelope sender
pub const DEFAULT_HOSTNAME: &str = "mailsink.example";

/// Local part of the envelope sender used when releasing a message
pub const RELEASE_SENDER_LOCAL_PART: &str = "nobody";

/// Header carrying the tenant identifier
pub const TENANT_HEADER: &str = "x-tenant-id";

// ============================================================================
// Timing Constants
// ============================================================================

/// Event stream keepalive period in seconds
pub const DEFAULT_KEEPALIVE_SECS: u64 = 60;

/// Upper bound for a single subscriber write in milliseconds
pub const DEFAULT_WRITE_TIMEOUT_MS: u64 = 5_000;

/// Websocket ping period in seconds
pub const DEFAULT_PING_SECS: u64 = 30;

/// SMTP relay connect/command timeout in seconds
pub const DEFAULT_RELAY_TIMEOUT_SECS: u64 = 30;

// ============================================================================
// Queue Bounds
// ============================================================================

/// Capacity of the ingestion queue and of each router sink queue
pub const DEFAULT_QUEUE_BOUND: usize = 1024;

/// Per-subscriber outbound buffer
pub const DEFAULT_SUBSCRIBER_BUFFER: usize = 64;

// ============================================================================
// Listing Limits
// ============================================================================

/// Number of messages returned by the v1 listing
pub const V1_LIST_LIMIT: usize = 1000;

/// Default page size of the v2 listing and search
pub const DEFAULT_PAGE_LIMIT: usize = 50;

/// Maximum page size of the v2 listing and search
pub const MAX_PAGE_LIMIT: usize = 250;
