// Relay actor - Ingest device samples, keep history, fan out to dashboards
use crate::application::clock::Clock;
use crate::application::connection::{ConnectionId, ConnectionRegistry, DashboardConnection};
use crate::application::error::RelayError;
use crate::domain::history::{HistoryBuffer, HistorySnapshot};
use crate::domain::telemetry::Sample;
use crate::infrastructure::protocol::{decode_inbound, encode, OutboundMessage};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Everything that can happen to the relay. Events are handled one at a
/// time, to completion, so appends and snapshots never interleave.
///
/// Connect and Disconnect travel on an unbounded control channel and are
/// never lost. Messages and Snapshot requests share a bounded inbound queue,
/// in order; a message that finds the queue full is dropped.
pub enum RelayEvent {
    Connect {
        id: ConnectionId,
        connection: Box<dyn DashboardConnection>,
    },
    Message {
        id: ConnectionId,
        payload: String,
    },
    Disconnect {
        id: ConnectionId,
    },
    Snapshot {
        reply: oneshot::Sender<HistorySnapshot>,
    },
}

/// Sole owner of the history buffer and the connection registry.
pub struct Relay {
    history: HistoryBuffer,
    connections: ConnectionRegistry,
    clock: Box<dyn Clock>,
}

impl Relay {
    pub fn new(history: HistoryBuffer, clock: Box<dyn Clock>) -> Self {
        Self {
            history,
            connections: ConnectionRegistry::new(),
            clock,
        }
    }

    pub fn history(&self) -> &HistoryBuffer {
        &self.history
    }

    pub fn connections(&self) -> &ConnectionRegistry {
        &self.connections
    }

    /// Dispatch loop. Control events are taken first when both queues are
    /// ready. Returns once every `RelayHandle` has been dropped.
    pub async fn run(
        mut self,
        mut control: mpsc::UnboundedReceiver<RelayEvent>,
        mut inbound: mpsc::Receiver<RelayEvent>,
    ) {
        loop {
            let event = tokio::select! {
                biased;
                Some(event) = control.recv() => event,
                Some(event) = inbound.recv() => event,
                else => break,
            };
            self.handle(event);
        }
        tracing::info!("Relay stopped");
    }

    pub fn handle(&mut self, event: RelayEvent) {
        match event {
            RelayEvent::Connect { id, connection } => self.connect(id, connection),
            RelayEvent::Message { id, payload } => {
                if let Err(e) = self.ingest(&payload) {
                    tracing::warn!("Discarding payload from connection {}: {}", id, e);
                }
            }
            RelayEvent::Disconnect { id } => {
                if self.connections.close(id) {
                    tracing::info!(
                        "Connection {} closed ({} open)",
                        id,
                        self.connections.len()
                    );
                }
            }
            RelayEvent::Snapshot { reply } => {
                let _ = reply.send(self.history.snapshot());
            }
        }
    }

    /// The snapshot is queued before the connection can see any update.
    fn connect(&mut self, id: ConnectionId, connection: Box<dyn DashboardConnection>) {
        let message = OutboundMessage::HistoricalData {
            data: self.history.snapshot(),
        };
        let text = match encode(&message) {
            Ok(text) => text,
            Err(e) => {
                tracing::error!("Failed to encode history for connection {}: {}", id, e);
                return;
            }
        };

        if let Err(e) = self.connections.open(id, connection, &text) {
            tracing::warn!("Connection {} dropped before history was sent: {}", id, e);
            return;
        }

        tracing::info!(
            "Connection {} open, sent {} historical samples ({} open)",
            id,
            self.history.len(),
            self.connections.len()
        );
    }

    /// Decode, stamp, store and broadcast one device payload.
    ///
    /// On error nothing is stored and nothing is sent.
    pub fn ingest(&mut self, payload: &str) -> Result<Sample, RelayError> {
        let reading = decode_inbound(payload)?;
        let sample = Sample::new(reading, self.clock.timestamp());

        let text = encode(&OutboundMessage::Update {
            data: sample.reading,
            timestamp: sample.captured_at.clone(),
        })?;

        self.history.append(sample.clone());
        let delivered = self.connections.broadcast(&text);

        tracing::debug!(
            "Sample at {} stored ({}/{}), delivered to {} connections",
            sample.captured_at,
            self.history.len(),
            self.history.capacity(),
            delivered
        );

        Ok(sample)
    }
}

/// Cloneable front door to a running relay.
#[derive(Clone)]
pub struct RelayHandle {
    control: mpsc::UnboundedSender<RelayEvent>,
    inbound: mpsc::Sender<RelayEvent>,
    next_id: Arc<AtomicU64>,
}

impl RelayHandle {
    pub fn new(
        control: mpsc::UnboundedSender<RelayEvent>,
        inbound: mpsc::Sender<RelayEvent>,
    ) -> Self {
        Self {
            control,
            inbound,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn connect(&self, connection: Box<dyn DashboardConnection>) -> ConnectionId {
        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.dispatch(RelayEvent::Connect { id, connection });
        id
    }

    /// Queue a payload for ingest without waiting. Returns false if it was dropped.
    pub fn message(&self, id: ConnectionId, payload: String) -> bool {
        match self.inbound.try_send(RelayEvent::Message { id, payload }) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::warn!("Inbound queue full; dropping payload from connection {}", id);
                false
            }
            Err(TrySendError::Closed(_)) => {
                tracing::warn!("Relay is not running; payload from connection {} dropped", id);
                false
            }
        }
    }

    pub fn disconnect(&self, id: ConnectionId) {
        self.dispatch(RelayEvent::Disconnect { id });
    }

    /// Current history, or `None` if the relay has stopped. Waits for room in
    /// the inbound queue, so the snapshot includes every payload queued before it.
    pub async fn snapshot(&self) -> Option<HistorySnapshot> {
        let (reply, rx) = oneshot::channel();
        self.inbound
            .send(RelayEvent::Snapshot { reply })
            .await
            .ok()?;
        rx.await.ok()
    }

    fn dispatch(&self, event: RelayEvent) {
        if self.control.send(event).is_err() {
            tracing::warn!("Relay is not running; event dropped");
        }
    }
}

/// Start the relay on its own task.
pub fn spawn_relay(
    capacity: usize,
    inbound_queue_capacity: usize,
    clock: Box<dyn Clock>,
) -> (RelayHandle, JoinHandle<()>) {
    let (control_tx, control_rx) = mpsc::unbounded_channel();
    let (inbound_tx, inbound_rx) = mpsc::channel(inbound_queue_capacity);
    let relay = Relay::new(HistoryBuffer::new(capacity), clock);
    let task = tokio::spawn(relay.run(control_rx, inbound_rx));
    (RelayHandle::new(control_tx, inbound_tx), task)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::connection::test_support::RecordingConnection;
    use crate::application::connection::ConnectionState;
    use std::sync::atomic::AtomicUsize;

    /// Emits "t1", "t2", ... on successive calls.
    #[derive(Default)]
    struct SequenceClock(AtomicUsize);

    impl Clock for SequenceClock {
        fn timestamp(&self) -> String {
            format!("t{}", self.0.fetch_add(1, Ordering::SeqCst) + 1)
        }
    }

    fn relay(capacity: usize) -> Relay {
        Relay::new(
            HistoryBuffer::new(capacity),
            Box::new(SequenceClock::default()),
        )
    }

    fn sensor_data(power: f64, irradiation: f64) -> String {
        serde_json::json!({
            "type": "sensor_data",
            "power": power,
            "performance": 75.0,
            "irradiation": irradiation,
            "temperature": 28.0,
            "humidity": 45.0,
        })
        .to_string()
    }

    fn connect(relay: &mut Relay, id: u64, conn: &RecordingConnection) {
        relay.handle(RelayEvent::Connect {
            id: ConnectionId(id),
            connection: conn.boxed(),
        });
    }

    fn message(relay: &mut Relay, payload: String) {
        relay.handle(RelayEvent::Message {
            id: ConnectionId(99),
            payload,
        });
    }

    #[test]
    fn new_connection_gets_history_first() {
        let mut relay = relay(5);
        message(&mut relay, sensor_data(1.0, 100.0));
        message(&mut relay, sensor_data(2.0, 500.0));

        let dashboard = RecordingConnection::new();
        connect(&mut relay, 1, &dashboard);
        message(&mut relay, sensor_data(3.0, 900.0));

        let frames = dashboard.frames();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0]["type"], "historical_data");
        assert_eq!(frames[0]["data"]["irradiation"], serde_json::json!([100.0, 500.0]));
        assert_eq!(frames[0]["data"]["timestamps"], serde_json::json!(["t1", "t2"]));
        assert_eq!(frames[1]["type"], "update");
        assert_eq!(frames[1]["timestamp"], "t3");
    }

    #[test]
    fn history_frame_matches_snapshot() {
        let mut relay = relay(3);
        for i in 0..5 {
            message(&mut relay, sensor_data(i as f64, i as f64 * 10.0));
        }

        let dashboard = RecordingConnection::new();
        connect(&mut relay, 1, &dashboard);

        let expected = serde_json::to_value(relay.history().snapshot()).unwrap();
        assert_eq!(dashboard.frames()[0]["data"], expected);
    }

    #[test]
    fn ingest_appends_in_order() {
        let mut relay = relay(5);
        for v in [100.0, 500.0, 900.0] {
            relay.ingest(&sensor_data(1.0, v)).unwrap();
        }

        assert_eq!(
            relay.history().snapshot().irradiation,
            vec![100.0, 500.0, 900.0]
        );
    }

    #[test]
    fn ingest_evicts_oldest_at_capacity() {
        let mut relay = relay(2);
        for v in [10.0, 20.0, 30.0] {
            relay.ingest(&sensor_data(1.0, v)).unwrap();
        }

        let snapshot = relay.history().snapshot();
        assert_eq!(snapshot.irradiation, vec![20.0, 30.0]);
        assert_eq!(snapshot.timestamps, vec!["t2".to_string(), "t3".to_string()]);
    }

    #[test]
    fn malformed_payload_changes_nothing() {
        let mut relay = relay(5);
        let dashboard = RecordingConnection::new();
        connect(&mut relay, 1, &dashboard);

        message(&mut relay, "not json at all".to_string());
        message(&mut relay, r#"{"type":"config","interval":5}"#.to_string());
        message(&mut relay, r#"{"type":"sensor_data","power":1}"#.to_string());

        assert!(relay.history().is_empty());
        assert_eq!(dashboard.frames().len(), 1);
    }

    #[test]
    fn failed_connection_does_not_block_others() {
        let mut relay = relay(5);
        let broken = RecordingConnection::new();
        let healthy = RecordingConnection::new();
        connect(&mut relay, 1, &broken);
        connect(&mut relay, 2, &healthy);

        broken.fail_sends.store(true, Ordering::SeqCst);
        message(&mut relay, sensor_data(4.2, 300.0));

        let frames = healthy.frames();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1]["type"], "update");
        assert_eq!(frames[1]["data"]["power"], 4.2);
        assert_eq!(
            relay.connections().state(ConnectionId(1)),
            ConnectionState::Closed
        );
        assert_eq!(relay.connections().len(), 1);
    }

    #[test]
    fn connection_failing_history_send_is_not_registered() {
        let mut relay = relay(5);
        let broken = RecordingConnection::failing();
        connect(&mut relay, 1, &broken);

        assert!(relay.connections().is_empty());
    }

    #[test]
    fn disconnected_client_misses_updates_then_resyncs() {
        let mut relay = relay(5);
        let dashboard = RecordingConnection::new();
        connect(&mut relay, 1, &dashboard);
        relay.handle(RelayEvent::Disconnect {
            id: ConnectionId(1),
        });

        message(&mut relay, sensor_data(1.0, 100.0));
        assert_eq!(dashboard.frames().len(), 1);

        let reconnected = RecordingConnection::new();
        connect(&mut relay, 2, &reconnected);
        let frames = reconnected.frames();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0]["data"]["irradiation"], serde_json::json!([100.0]));
    }

    #[tokio::test]
    async fn spawned_relay_serves_snapshots() {
        let (handle, task) = spawn_relay(2, 16, Box::new(SequenceClock::default()));
        let dashboard = RecordingConnection::new();
        let id = handle.connect(dashboard.boxed());

        for v in [10.0, 20.0, 30.0] {
            assert!(handle.message(id, sensor_data(1.0, v)));
        }

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.irradiation, vec![20.0, 30.0]);
        assert!(snapshot.is_aligned());
        assert_eq!(dashboard.frames().len(), 4);

        drop(handle);
        task.await.unwrap();
    }

    #[tokio::test]
    async fn full_inbound_queue_drops_payloads() {
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::channel(2);
        let handle = RelayHandle::new(control_tx, inbound_tx);

        let dashboard = RecordingConnection::new();
        let id = handle.connect(dashboard.boxed());
        let accepted: Vec<bool> = [10.0, 20.0, 30.0, 40.0]
            .into_iter()
            .map(|v| handle.message(id, sensor_data(1.0, v)))
            .collect();
        assert_eq!(accepted, vec![true, true, false, false]);

        drop(handle);
        relay(5).run(control_rx, inbound_rx).await;

        let frames = dashboard.frames();
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0]["type"], "historical_data");
        assert_eq!(frames[1]["data"]["irradiation"], 10.0);
        assert_eq!(frames[2]["data"]["irradiation"], 20.0);
    }

    #[tokio::test]
    async fn stopped_relay_rejects_payloads() {
        let (handle, task) = spawn_relay(2, 4, Box::new(SequenceClock::default()));
        task.abort();
        let _ = task.await;

        assert!(!handle.message(ConnectionId(1), sensor_data(1.0, 1.0)));
        assert_eq!(handle.snapshot().await, None);
    }
}
