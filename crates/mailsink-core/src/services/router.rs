/// Fan-out of ingestion notifications to a fixed set of named sinks
use crate::models::Message;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, error, info, warn};

/// One downstream consumer with its own bounded queue
pub struct Sink {
    name: &'static str,
    tx: mpsc::Sender<Arc<Message>>,
}

impl Sink {
    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// Forwards every ingested message, unmodified, to each registered sink.
///
/// The sink list is fixed at construction. Every sink gets its own forwarding
/// task with a backlog as deep as the sink's queue, so a stalled consumer only
/// ever blocks its own forwarder. Once a backlog is full, further messages are
/// dropped for that sink alone and logged.
pub struct BroadcastRouter {
    sinks: Vec<Sink>,
}

/// Router side of one sink's forwarding task
struct Lane {
    name: &'static str,
    backlog: mpsc::Sender<Arc<Message>>,
}

impl Lane {
    fn spawn(sink: Sink) -> Self {
        let (backlog, mut pending) = mpsc::channel::<Arc<Message>>(sink.tx.max_capacity());
        let name = sink.name;

        tokio::spawn(async move {
            while let Some(message) = pending.recv().await {
                if sink.tx.send(message).await.is_err() {
                    warn!(sink = name, "Sink closed, forwarder stopping");
                    break;
                }
            }
            debug!(sink = name, "Sink forwarder stopped");
        });

        Self { name, backlog }
    }

    /// Queues `message` for this sink without waiting. Returns false once the
    /// sink's forwarder has stopped.
    fn offer(&self, message: &Arc<Message>) -> bool {
        match self.backlog.try_send(Arc::clone(message)) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                error!(sink = self.name, id = %message.id, "Sink backlog full, message dropped for this sink");
                true
            }
            Err(TrySendError::Closed(_)) => {
                warn!(sink = self.name, "Sink closed, removed from router");
                false
            }
        }
    }
}

impl BroadcastRouter {
    pub fn new(sinks: Vec<Sink>) -> Self {
        Self { sinks }
    }

    /// Creates a named sink and the receiving end its consumer drains
    pub fn sink(name: &'static str, bound: usize) -> (Sink, mpsc::Receiver<Arc<Message>>) {
        let (tx, rx) = mpsc::channel(bound.max(1));
        (Sink { name, tx }, rx)
    }

    pub fn sink_names(&self) -> Vec<&'static str> {
        self.sinks.iter().map(Sink::name).collect()
    }

    /// Drains `source` until it closes or no sinks remain. Reading from
    /// `source` never waits on a sink.
    pub async fn run(self, mut source: mpsc::Receiver<Arc<Message>>) {
        info!(sinks = ?self.sink_names(), "Broadcast router started");

        let mut lanes: Vec<Lane> = self.sinks.into_iter().map(Lane::spawn).collect();

        while let Some(message) = source.recv().await {
            lanes.retain(|lane| lane.offer(&message));
            debug!(id = %message.id, sinks = lanes.len(), "Forwarded message");

            if lanes.is_empty() {
                warn!("No sinks left, broadcast router stopping");
                break;
            }
        }

        info!("Broadcast router stopped");
    }
}
