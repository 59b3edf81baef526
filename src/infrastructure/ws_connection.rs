// WebSocket-backed dashboard connection
use crate::application::connection::{ConnectionId, DashboardConnection};
use crate::application::error::SendError;
use axum::extract::ws::{Message, WebSocket};
use futures::stream::SplitSink;
use futures::StreamExt;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;

/// Queues frames for a socket writer task. Sending never waits on the network.
pub struct WsConnection {
    outbound: mpsc::Sender<String>,
}

impl WsConnection {
    pub fn channel(queue_capacity: usize) -> (Self, mpsc::Receiver<String>) {
        let (outbound, rx) = mpsc::channel(queue_capacity);
        (Self { outbound }, rx)
    }
}

impl DashboardConnection for WsConnection {
    fn send(&self, text: &str) -> Result<(), SendError> {
        self.outbound
            .try_send(text.to_owned())
            .map_err(|e| match e {
                TrySendError::Full(_) => SendError::QueueFull,
                TrySendError::Closed(_) => SendError::Closed,
            })
    }

    fn is_open(&self) -> bool {
        !self.outbound.is_closed()
    }
}

/// Drain queued frames into the socket until the relay drops the connection
/// or the peer goes away.
pub fn spawn_writer(
    id: ConnectionId,
    sink: SplitSink<WebSocket, Message>,
    rx: mpsc::Receiver<String>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let frames =
            ReceiverStream::new(rx).map(|text| Ok::<_, axum::Error>(Message::Text(text)));
        if let Err(e) = frames.forward(sink).await {
            tracing::debug!("Writer for connection {} stopped: {}", id, e);
        }
    })
}
