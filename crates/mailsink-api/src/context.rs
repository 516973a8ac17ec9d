/// API Context - shared state for all API handlers
use mailsink_core::MailsinkError;
use mailsink_core::models::MailsinkConfig;
use mailsink_core::services::config::load_relay_profiles;
use mailsink_core::services::{
    BroadcastRouter, ConnectionHub, EventStream, InMemoryStore, Ingestor, LettreDialer,
    MessageStore, ProfileRegistry, ReleaseRelay, SmtpDialer,
};
use std::sync::Arc;
use tracing::info;

/// Sink feeding the v1 event stream
pub const V1_EVENTS_SINK: &str = "v1-events";

/// Sink feeding the v2 websocket hub
pub const V2_WEBSOCKET_SINK: &str = "v2-websocket";

/// API Context contains shared resources for API handlers
pub struct ApiContext {
    /// Process configuration
    pub config: MailsinkConfig,

    /// Message storage
    pub store: Arc<dyn MessageStore>,

    /// Ingestion point feeding the broadcast router
    pub ingestor: Arc<Ingestor>,

    /// v1 server-sent event feed
    pub event_stream: Arc<EventStream>,

    /// v2 websocket feed
    pub hub: Arc<ConnectionHub>,

    /// Relay profiles, shared with the release relay
    pub profiles: Arc<ProfileRegistry>,

    /// Release relay
    pub relay: Arc<ReleaseRelay>,
}

impl ApiContext {
    /// Create a new API context with the in-memory store, relay profiles
    /// from `MAILSINK_OUTGOING_SMTP` and the lettre dialer.
    ///
    /// Must be called inside a tokio runtime: the router and both
    /// broadcasters are spawned here.
    pub fn new(config: MailsinkConfig) -> Result<Arc<Self>, MailsinkError> {
        let profiles = match &config.outgoing_smtp {
            Some(path) => {
                let profiles = load_relay_profiles(path)?;
                info!(path = %path.display(), count = profiles.len(), "Loaded relay profiles");
                ProfileRegistry::with_shared(profiles)
            }
            None => ProfileRegistry::new(),
        };

        let dialer = Arc::new(LettreDialer::new(
            config.hostname.clone(),
            config.relay_timeout(),
        ));

        Ok(Self::with_parts(
            config,
            Arc::new(InMemoryStore::new()),
            profiles,
            dialer,
        ))
    }

    /// Wires the fan-out pipeline around the given collaborators
    pub fn with_parts(
        config: MailsinkConfig,
        store: Arc<dyn MessageStore>,
        profiles: ProfileRegistry,
        dialer: Arc<dyn SmtpDialer>,
    ) -> Arc<Self> {
        let (notify, source) = Ingestor::channel(config.queue_bound);
        let ingestor = Arc::new(Ingestor::new(Arc::clone(&store), notify));

        let event_stream = Arc::new(EventStream::new(
            config.subscriber_buffer,
            config.write_timeout(),
        ));
        let hub = Arc::new(ConnectionHub::new(
            config.subscriber_buffer,
            config.write_timeout(),
            config.ping_interval(),
        ));

        let (v1_sink, v1_inbox) = BroadcastRouter::sink(V1_EVENTS_SINK, config.queue_bound);
        let (v2_sink, v2_inbox) = BroadcastRouter::sink(V2_WEBSOCKET_SINK, config.queue_bound);

        tokio::spawn(BroadcastRouter::new(vec![v1_sink, v2_sink]).run(source));
        tokio::spawn(
            Arc::clone(&event_stream).run(v1_inbox, config.keepalive_interval()),
        );
        tokio::spawn(Arc::clone(&hub).run(v2_inbox));

        let profiles = Arc::new(profiles);
        let relay = Arc::new(ReleaseRelay::new(
            Arc::clone(&store),
            Arc::clone(&profiles),
            dialer,
            config.release_sender(),
        ));

        Arc::new(Self {
            config,
            store,
            ingestor,
            event_stream,
            hub,
            profiles,
            relay,
        })
    }

    /// Ends every open subscriber stream so in-flight responses can finish
    pub async fn close_subscribers(&self) {
        let receivers = self.event_stream.close_all().await;
        let connections = self.hub.close_all().await;
        info!(receivers, connections, "Closed subscriber streams");
    }
}
