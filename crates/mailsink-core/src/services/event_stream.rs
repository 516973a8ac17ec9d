/// Legacy event feed: server-to-client text streams with periodic keepalives
use crate::models::{BroadcastEvent, EventKind, Message, StreamEvent, TenantId};
use futures::Stream;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, mpsc};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

struct Subscriber {
    tenant: TenantId,
    tx: mpsc::Sender<StreamEvent>,
}

/// One subscriber's end of the feed.
///
/// Dropping it closes the stream; the broadcaster notices on its next write
/// and unregisters it.
pub struct Receiver {
    id: u64,
    events: mpsc::Receiver<StreamEvent>,
}

impl Receiver {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub async fn recv(&mut self) -> Option<StreamEvent> {
        self.events.recv().await
    }

    pub fn into_stream(self) -> impl Stream<Item = StreamEvent> + Send + 'static {
        futures::stream::unfold(self, |mut receiver| async move {
            receiver.recv().await.map(|event| (event, receiver))
        })
    }
}

/// Registry of open event-stream receivers.
///
/// `publish` and `keepalive` share one serialization point, so every
/// receiver sees events in the order they were handed to the broadcaster.
pub struct EventStream {
    receivers: Mutex<HashMap<u64, Subscriber>>,
    fanout: Mutex<()>,
    next_id: AtomicU64,
    buffer: usize,
    write_timeout: Duration,
}

impl EventStream {
    pub fn new(buffer: usize, write_timeout: Duration) -> Self {
        Self {
            receivers: Mutex::new(HashMap::new()),
            fanout: Mutex::new(()),
            next_id: AtomicU64::new(1),
            buffer: buffer.max(1),
            write_timeout,
        }
    }

    /// Registers a new receiver. It sees only events published afterwards.
    pub async fn subscribe(&self, tenant: TenantId) -> Receiver {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, events) = mpsc::channel(self.buffer);

        let mut receivers = self.receivers.lock().await;
        receivers.insert(id, Subscriber { tenant: tenant.clone(), tx });
        info!(receiver = id, tenant = %tenant, active = receivers.len(), "Event stream receiver added");

        Receiver { id, events }
    }

    /// Removes a receiver; removing an unknown one is a no-op
    pub async fn unregister(&self, id: u64) -> bool {
        let removed = self.receivers.lock().await.remove(&id).is_some();
        if removed {
            debug!(receiver = id, "Event stream receiver removed");
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.receivers.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drops every receiver, ending their streams. Used on shutdown.
    pub async fn close_all(&self) -> usize {
        let mut receivers = self.receivers.lock().await;
        let closed = receivers.len();
        receivers.clear();
        info!(closed = closed, "Event stream receivers closed");
        closed
    }

    /// Writes the event to every eligible receiver and returns how many
    /// accepted it. Receivers that are closed or stay full past the write
    /// timeout are dropped; nothing is reported to the caller.
    pub async fn publish(&self, event: BroadcastEvent) -> usize {
        let _turn = self.fanout.lock().await;

        let data: Arc<str> = match &event.message {
            Some(message) => match serde_json::to_string(message.as_ref()) {
                Ok(json) => json.into(),
                Err(e) => {
                    error!(id = %message.id, "Failed to serialize message for event stream: {}", e);
                    return 0;
                }
            },
            None => Arc::from(""),
        };

        // Snapshot targets so registration is never blocked by slow writes
        let targets: Vec<(u64, mpsc::Sender<StreamEvent>)> = {
            let receivers = self.receivers.lock().await;
            receivers
                .iter()
                .filter(|(_, sub)| event.tenant().is_none_or(|tenant| *tenant == sub.tenant))
                .map(|(id, sub)| (*id, sub.tx.clone()))
                .collect()
        };

        let stream_event = StreamEvent {
            kind: event.kind,
            data,
        };

        let mut delivered = 0;
        let mut failed = Vec::new();
        for (id, tx) in targets {
            match tx.send_timeout(stream_event.clone(), self.write_timeout).await {
                Ok(()) => delivered += 1,
                Err(e) => {
                    warn!(receiver = id, kind = event.kind.as_str(), "Dropping event stream receiver: {}", e);
                    failed.push(id);
                }
            }
        }

        if !failed.is_empty() {
            let mut receivers = self.receivers.lock().await;
            for id in &failed {
                receivers.remove(id);
            }
        }

        debug!(
            kind = event.kind.as_str(),
            delivered = delivered,
            dropped = failed.len(),
            "Event stream fan-out complete"
        );

        delivered
    }

    /// Empty event used to prune dead receivers and keep intermediaries from
    /// timing out idle connections
    pub async fn keepalive(&self) -> usize {
        self.publish(BroadcastEvent::keepalive()).await
    }

    /// Drains the router sink and emits keepalives on a fixed period until
    /// the sink closes.
    pub async fn run(self: Arc<Self>, mut inbox: mpsc::Receiver<Arc<Message>>, interval: Duration) {
        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                next = inbox.recv() => match next {
                    Some(message) => {
                        debug!(id = %message.id, "Got message for event stream");
                        self.publish(BroadcastEvent::data(message)).await;
                    }
                    None => break,
                },
                _ = ticker.tick() => {
                    debug!(kind = EventKind::Keepalive.as_str(), "Event stream keepalive");
                    self.keepalive().await;
                }
            }
        }

        info!("Event stream inbox closed, broadcaster stopped");
    }
}
