use crate::registry::GroupRegistry;
use crate::transport::{DeliveryError, NotificationEvent, Transport};
use async_trait::async_trait;
use dashmap::DashMap;
use futures::future::join_all;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

const DEFAULT_DELIVERY_TIMEOUT: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// FanoutReport
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeliveryFailure {
    pub connection: String,
    pub error: DeliveryError,
}

/// Outcome of one fan-out. Failures are informational; the send itself
/// never fails.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FanoutReport {
    pub attempted: usize,
    pub delivered: usize,
    pub failures: Vec<DeliveryFailure>,
}

impl FanoutReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

// ---------------------------------------------------------------------------
// HubContext
// ---------------------------------------------------------------------------

/// The narrow surface business logic uses to push events. Kept as a trait so
/// callers can be exercised without a live transport.
#[async_trait]
pub trait HubContext: Send + Sync {
    async fn send_to_group(&self, group: &str, method: &str, payload: serde_json::Value)
        -> FanoutReport;

    async fn send_to_all(&self, method: &str, payload: serde_json::Value) -> FanoutReport;
}

// ---------------------------------------------------------------------------
// NotificationFanout
// ---------------------------------------------------------------------------

/// Delivers events to every member of a group.
///
/// Events for the same group are serialized through a per-group lane, so a
/// connection sees them in send order. Deliveries within one event run
/// concurrently and each is bounded by the delivery timeout, so one stalled
/// connection cannot hold up its siblings or other groups.
pub struct NotificationFanout {
    registry: Arc<dyn GroupRegistry>,
    transport: Arc<dyn Transport>,
    lanes: DashMap<String, Arc<Mutex<()>>>,
    delivery_timeout: Duration,
}

impl NotificationFanout {
    pub fn new(registry: Arc<dyn GroupRegistry>, transport: Arc<dyn Transport>) -> Self {
        Self {
            registry,
            transport,
            lanes: DashMap::new(),
            delivery_timeout: DEFAULT_DELIVERY_TIMEOUT,
        }
    }

    pub fn with_delivery_timeout(mut self, timeout: Duration) -> Self {
        self.delivery_timeout = timeout;
        self
    }

    pub async fn send_to_group(
        &self,
        group: &str,
        method: &str,
        payload: serde_json::Value,
    ) -> FanoutReport {
        let event = NotificationEvent::to_group(group, method, payload);
        let lane = self.lanes.entry(group.to_string()).or_default().clone();

        let report = {
            let _turn = lane.lock().await;
            // Snapshot membership only once this event owns the lane.
            let members = self.registry.members_of(group);
            self.deliver(members, &event).await
        };

        drop(lane);
        self.lanes.remove_if(group, |_, lane| Arc::strong_count(lane) == 1);

        tracing::debug!(
            group,
            method,
            attempted = report.attempted,
            delivered = report.delivered,
            "group fan-out complete"
        );
        report
    }

    /// Deliver to every live connection, grouped or not.
    pub async fn send_to_all(&self, method: &str, payload: serde_json::Value) -> FanoutReport {
        let event = NotificationEvent::broadcast(method, payload);
        let report = self.deliver(self.registry.connections(), &event).await;
        tracing::debug!(
            method,
            attempted = report.attempted,
            delivered = report.delivered,
            "broadcast complete"
        );
        report
    }

    async fn deliver(&self, members: BTreeSet<String>, event: &NotificationEvent) -> FanoutReport {
        let timeout = self.delivery_timeout;
        let attempts = members.iter().map(|connection| async move {
            let outcome = match tokio::time::timeout(timeout, self.transport.send(connection, event))
                .await
            {
                Ok(result) => result,
                Err(_) => Err(DeliveryError::TimedOut(timeout.as_millis() as u64)),
            };
            (connection, outcome)
        });

        let outcomes = join_all(attempts).await;
        let mut report = FanoutReport {
            attempted: outcomes.len(),
            ..FanoutReport::default()
        };
        for (connection, outcome) in outcomes {
            match outcome {
                Ok(()) => report.delivered += 1,
                Err(error) => {
                    tracing::warn!(
                        connection = %connection,
                        method = %event.method,
                        error = %error,
                        "delivery failed"
                    );
                    report.failures.push(DeliveryFailure {
                        connection: connection.clone(),
                        error,
                    });
                }
            }
        }
        report
    }

    #[cfg(test)]
    fn lane_count(&self) -> usize {
        self.lanes.len()
    }
}

#[async_trait]
impl HubContext for NotificationFanout {
    async fn send_to_group(
        &self,
        group: &str,
        method: &str,
        payload: serde_json::Value,
    ) -> FanoutReport {
        NotificationFanout::send_to_group(self, group, method, payload).await
    }

    async fn send_to_all(&self, method: &str, payload: serde_json::Value) -> FanoutReport {
        NotificationFanout::send_to_all(self, method, payload).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ConnectionGroupRegistry;
    use crate::transport::mock::RecordingTransport;
    use serde_json::json;
    use std::time::Instant;

    fn setup(
        transport: RecordingTransport,
    ) -> (
        Arc<ConnectionGroupRegistry>,
        Arc<RecordingTransport>,
        NotificationFanout,
    ) {
        let registry = Arc::new(ConnectionGroupRegistry::new());
        let transport = Arc::new(transport);
        let fanout = NotificationFanout::new(registry.clone(), transport.clone());
        (registry, transport, fanout)
    }

    #[tokio::test]
    async fn failed_member_does_not_block_others() {
        let (registry, transport, fanout) = setup(RecordingTransport::default().failing("B"));
        for c in ["A", "B", "C"] {
            registry.join("ws1alice", c);
        }

        let report = fanout
            .send_to_group("ws1alice", "ReceiveAction", json!({ "id": 1 }))
            .await;

        assert_eq!(report.attempted, 3);
        assert_eq!(report.delivered, 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].connection, "B");
        assert_eq!(transport.received_by("A").len(), 1);
        assert_eq!(transport.received_by("C").len(), 1);
        assert!(transport.received_by("B").is_empty());
    }

    #[tokio::test]
    async fn empty_group_is_noop() {
        let (_, transport, fanout) = setup(RecordingTransport::default());
        let report = fanout.send_to_group("nobody", "ReceiveAction", json!({})).await;
        assert_eq!(report, FanoutReport::default());
        assert!(transport.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn non_members_receive_nothing() {
        let (registry, transport, fanout) = setup(RecordingTransport::default());
        registry.join("ws1alice", "alice-1");
        registry.join("ws1bob", "bob-1");

        fanout.send_to_group("ws1alice", "ReceiveAction", json!({ "x": 1 })).await;

        assert_eq!(transport.received_by("alice-1").len(), 1);
        assert!(transport.received_by("bob-1").is_empty());
    }

    #[tokio::test]
    async fn events_arrive_in_send_order() {
        let (registry, transport, fanout) = setup(RecordingTransport::default());
        registry.join("g", "c1");
        registry.join("g", "c2");

        for n in 0..5 {
            fanout.send_to_group("g", "ReceiveAction", json!({ "n": n })).await;
        }

        for conn in ["c1", "c2"] {
            let seen: Vec<_> = transport
                .received_by(conn)
                .iter()
                .map(|e| e.payload["n"].as_i64().unwrap())
                .collect();
            assert_eq!(seen, vec![0, 1, 2, 3, 4]);
        }
    }

    #[tokio::test]
    async fn concurrent_sends_to_one_group_keep_order_per_connection() {
        let (registry, transport, fanout) =
            setup(RecordingTransport::default().delayed("slow", Duration::from_millis(20)));
        registry.join("g", "slow");
        registry.join("g", "fast");
        let fanout = Arc::new(fanout);

        let first = {
            let fanout = fanout.clone();
            tokio::spawn(async move { fanout.send_to_group("g", "m", json!({ "n": 1 })).await })
        };
        tokio::time::sleep(Duration::from_millis(5)).await;
        let second = {
            let fanout = fanout.clone();
            tokio::spawn(async move { fanout.send_to_group("g", "m", json!({ "n": 2 })).await })
        };
        first.await.unwrap();
        second.await.unwrap();

        for conn in ["slow", "fast"] {
            let seen: Vec<_> = transport
                .received_by(conn)
                .iter()
                .map(|e| e.payload["n"].as_i64().unwrap())
                .collect();
            assert_eq!(seen, vec![1, 2], "order for {conn}");
        }
        assert_eq!(fanout.lane_count(), 0);
    }

    #[tokio::test]
    async fn stalled_connection_times_out_without_holding_siblings() {
        let (registry, transport, fanout) =
            setup(RecordingTransport::default().delayed("stuck", Duration::from_secs(30)));
        let fanout = fanout.with_delivery_timeout(Duration::from_millis(50));
        registry.join("g", "stuck");
        registry.join("g", "ok");

        let started = Instant::now();
        let report = fanout.send_to_group("g", "m", json!({})).await;

        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(report.delivered, 1);
        assert_eq!(report.failures[0].error, DeliveryError::TimedOut(50));
        assert_eq!(transport.received_by("ok").len(), 1);
    }

    #[tokio::test]
    async fn broadcast_reaches_every_connection_once() {
        let (registry, transport, fanout) = setup(RecordingTransport::default());
        registry.connect("c1");
        registry.connect("c2");
        registry.join("actionClients", "c1");
        registry.join("ws1alice", "c1");
        registry.join("ws1bob", "c2");

        let report = fanout.send_to_all("ReceiveAction", json!({ "id": 9 })).await;

        assert_eq!(report.attempted, 2);
        assert_eq!(transport.received_by("c1").len(), 1);
        assert_eq!(transport.received_by("c2").len(), 1);
        assert!(transport.received_by("c1")[0].group.is_none());
    }

    #[tokio::test]
    async fn broadcast_reaches_connection_outside_every_group() {
        let (registry, transport, fanout) = setup(RecordingTransport::default());
        let lifecycle = crate::lifecycle::ConnectionLifecycle::new(registry.clone());
        lifecycle.on_connected("c1", Some("ws1alice"));
        lifecycle.unsubscribe("c1", "ws1alice");
        assert_eq!(registry.group_count(), 0);

        let report = fanout.send_to_all("RegisterStatus", json!({ "online": true })).await;

        assert_eq!(report.attempted, 1);
        assert_eq!(report.delivered, 1);
        assert_eq!(transport.received_by("c1").len(), 1);
    }

    #[tokio::test]
    async fn broadcast_skips_disconnected_connections() {
        let (registry, transport, fanout) = setup(RecordingTransport::default());
        registry.connect("c1");
        registry.connect("c2");
        registry.disconnect("c2");

        let report = fanout.send_to_all("m", json!({})).await;

        assert_eq!(report.attempted, 1);
        assert!(transport.received_by("c2").is_empty());
    }

    #[tokio::test]
    async fn usable_through_hub_context() {
        let (registry, transport, fanout) = setup(RecordingTransport::default());
        registry.join("g", "c1");
        let hub: Arc<dyn HubContext> = Arc::new(fanout);

        let report = hub.send_to_group("g", "ReceiveAction", json!({ "ok": true })).await;

        assert!(report.is_clean());
        let events = transport.received_by("c1");
        assert_eq!(events[0].method, "ReceiveAction");
        assert_eq!(events[0].group.as_deref(), Some("g"));
    }
}
