/// Current event feed: websocket connections receiving stored messages
use crate::models::{Message, TenantId};
use axum::body::Bytes;
use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, mpsc};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

struct Connection {
    tenant: TenantId,
    tx: mpsc::Sender<Arc<str>>,
}

/// Registration of one connection: its id and the queue of serialized
/// messages waiting to be written to the socket
pub struct ConnectionHandle {
    pub id: u64,
    pub outbound: mpsc::Receiver<Arc<str>>,
}

/// Registry of open websocket connections
pub struct ConnectionHub {
    connections: Mutex<HashMap<u64, Connection>>,
    fanout: Mutex<()>,
    next_id: AtomicU64,
    buffer: usize,
    write_timeout: Duration,
    ping_interval: Duration,
}

impl ConnectionHub {
    pub fn new(buffer: usize, write_timeout: Duration, ping_interval: Duration) -> Self {
        Self {
            connections: Mutex::new(HashMap::new()),
            fanout: Mutex::new(()),
            next_id: AtomicU64::new(1),
            buffer: buffer.max(1),
            write_timeout,
            ping_interval,
        }
    }

    /// Completes the websocket handshake; the connection is registered once
    /// the upgrade succeeds and removed when it closes.
    pub fn upgrade(self: &Arc<Self>, tenant: TenantId, ws: WebSocketUpgrade) -> Response {
        let hub = Arc::clone(self);
        ws.on_failed_upgrade(|e| warn!("Websocket upgrade failed: {}", e))
            .on_upgrade(move |socket| hub.serve(socket, tenant))
    }

    pub async fn register(&self, tenant: TenantId) -> ConnectionHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, outbound) = mpsc::channel(self.buffer);

        let mut connections = self.connections.lock().await;
        connections.insert(id, Connection { tenant: tenant.clone(), tx });
        info!(connection = id, tenant = %tenant, active = connections.len(), "Websocket connection added");

        ConnectionHandle { id, outbound }
    }

    /// Removes a connection; removing one that is already gone is a no-op
    pub async fn unregister(&self, id: u64) -> bool {
        let removed = self.connections.lock().await.remove(&id).is_some();
        if removed {
            info!(connection = id, "Websocket connection removed");
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.connections.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drops every connection; each socket task then closes its websocket
    pub async fn close_all(&self) -> usize {
        let mut connections = self.connections.lock().await;
        let closed = connections.len();
        connections.clear();
        info!(closed = closed, "Websocket connections closed");
        closed
    }

    /// Serializes the message once and queues it on every connection of the
    /// message's tenant. Returns how many connections accepted it.
    pub async fn broadcast(&self, message: &Message) -> usize {
        let _turn = self.fanout.lock().await;

        let payload: Arc<str> = match serde_json::to_string(message) {
            Ok(json) => json.into(),
            Err(e) => {
                error!(id = %message.id, "Failed to serialize message for websocket: {}", e);
                return 0;
            }
        };

        let targets: Vec<(u64, mpsc::Sender<Arc<str>>)> = {
            let connections = self.connections.lock().await;
            connections
                .iter()
                .filter(|(_, conn)| conn.tenant == message.tenant)
                .map(|(id, conn)| (*id, conn.tx.clone()))
                .collect()
        };

        let mut delivered = 0;
        for (id, tx) in targets {
            match tx.send_timeout(Arc::clone(&payload), self.write_timeout).await {
                Ok(()) => delivered += 1,
                Err(e) => {
                    warn!(connection = id, "Dropping websocket connection: {}", e);
                    self.unregister(id).await;
                }
            }
        }

        debug!(id = %message.id, delivered = delivered, "Websocket broadcast complete");
        delivered
    }

    /// Drains the router sink until it closes
    pub async fn run(self: Arc<Self>, mut inbox: mpsc::Receiver<Arc<Message>>) {
        while let Some(message) = inbox.recv().await {
            debug!(id = %message.id, "Got message in websocket channel");
            self.broadcast(&message).await;
        }

        info!("Websocket inbox closed, hub stopped");
    }

    async fn serve(self: Arc<Self>, socket: WebSocket, tenant: TenantId) {
        let ConnectionHandle { id, mut outbound } = self.register(tenant).await;
        let (mut sink, mut stream) = socket.split();

        let mut ping = tokio::time::interval_at(Instant::now() + self.ping_interval, self.ping_interval);
        ping.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                next = outbound.recv() => {
                    // None: the hub already dropped this connection
                    let Some(payload) = next else { break };
                    let frame = WsMessage::Text(String::from(&*payload).into());
                    if !self.write(&mut sink, frame, id).await {
                        break;
                    }
                }
                _ = ping.tick() => {
                    if !self.write(&mut sink, WsMessage::Ping(Bytes::new()), id).await {
                        break;
                    }
                }
                incoming = stream.next() => match incoming {
                    Some(Ok(WsMessage::Close(_))) | None => {
                        debug!(connection = id, "Websocket closed by client");
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        debug!(connection = id, "Websocket read failed: {}", e);
                        break;
                    }
                },
            }
        }

        self.unregister(id).await;
        let _ = sink.close().await;
    }

    async fn write<S>(&self, sink: &mut S, frame: WsMessage, id: u64) -> bool
    where
        S: futures::Sink<WsMessage, Error = axum::Error> + Unpin,
    {
        match tokio::time::timeout(self.write_timeout, sink.send(frame)).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                debug!(connection = id, "Websocket write failed: {}", e);
                false
            }
            Err(_) => {
                warn!(connection = id, "Websocket write timed out");
                false
            }
        }
    }
}
