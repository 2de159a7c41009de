use async_trait::async_trait;
use blueprint_hub::{ConnectionLifecycle, DeliveryError, NotificationEvent, Transport};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

// ---------------------------------------------------------------------------
// SseTransport
// ---------------------------------------------------------------------------

/// Per-connection outbound queues feeding open SSE streams.
///
/// A send awaits buffer space, so a reader that stops draining its stream
/// shows up to the fan-out as a delivery timeout.
#[derive(Debug, Default)]
pub struct SseTransport {
    senders: DashMap<String, mpsc::Sender<NotificationEvent>>,
}

impl SseTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `connection` and return the receiving half of its queue.
    pub fn open(&self, connection: &str, buffer: usize) -> mpsc::Receiver<NotificationEvent> {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        self.senders.insert(connection.to_string(), tx);
        rx
    }

    pub fn close(&self, connection: &str) {
        self.senders.remove(connection);
    }

    pub fn is_open(&self, connection: &str) -> bool {
        self.senders.contains_key(connection)
    }
}

#[async_trait]
impl Transport for SseTransport {
    async fn send(&self, connection: &str, event: &NotificationEvent) -> Result<(), DeliveryError> {
        let tx = self
            .senders
            .get(connection)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| DeliveryError::Closed(connection.to_string()))?;
        tx.send(event.clone())
            .await
            .map_err(|_| DeliveryError::Closed(connection.to_string()))
    }
}

// ---------------------------------------------------------------------------
// ConnectionGuard
// ---------------------------------------------------------------------------

/// Lives inside an SSE stream; dropping the stream disconnects.
pub struct ConnectionGuard {
    pub connection: String,
    identity: Option<String>,
    lifecycle: Arc<ConnectionLifecycle>,
    transport: Arc<SseTransport>,
}

impl ConnectionGuard {
    pub fn new(
        connection: String,
        identity: Option<String>,
        lifecycle: Arc<ConnectionLifecycle>,
        transport: Arc<SseTransport>,
    ) -> Self {
        Self {
            connection,
            identity,
            lifecycle,
            transport,
        }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.transport.close(&self.connection);
        self.lifecycle
            .on_disconnected(&self.connection, self.identity.as_deref());
    }
}
