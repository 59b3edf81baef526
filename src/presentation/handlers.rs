// HTTP and WebSocket request handlers
use crate::application::connection::ConnectionId;
use crate::application::error::RelayError;
use crate::application::relay::RelayHandle;
use crate::domain::history::HistorySnapshot;
use crate::infrastructure::ws_connection::{spawn_writer, WsConnection};
use crate::presentation::app_state::AppState;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};
use futures::StreamExt;
use std::sync::Arc;

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Current history as JSON, same shape as the `historical_data` payload
pub async fn history(
    State(state): State<Arc<AppState>>,
) -> Result<Json<HistorySnapshot>, StatusCode> {
    state
        .relay
        .snapshot()
        .await
        .map(Json)
        .ok_or(StatusCode::SERVICE_UNAVAILABLE)
}

/// Root path: relay socket when upgrading, dashboard page otherwise.
/// Devices and dashboards connect to `ws://host:port/`.
pub async fn root(
    ws: Option<WebSocketUpgrade>,
    State(state): State<Arc<AppState>>,
) -> Response {
    if let Some(ws) = ws {
        return ws.on_upgrade(move |socket| handle_socket(socket, state));
    }

    let index = state.static_dir.join("index.html");
    match tokio::fs::read_to_string(&index).await {
        Ok(page) => Html(page).into_response(),
        Err(e) => {
            tracing::debug!("No dashboard page at {}: {}", index.display(), e);
            StatusCode::NOT_FOUND.into_response()
        }
    }
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (sink, mut stream) = socket.split();
    let (connection, outbound) = WsConnection::channel(state.client_queue_capacity);
    let id = state.relay.connect(Box::new(connection));
    let writer = spawn_writer(id, sink, outbound);

    // Disconnect on every exit path, including panics in this task.
    struct DisconnectGuard {
        relay: RelayHandle,
        id: ConnectionId,
    }
    impl Drop for DisconnectGuard {
        fn drop(&mut self) {
            self.relay.disconnect(self.id);
        }
    }
    let guard = DisconnectGuard {
        relay: state.relay.clone(),
        id,
    };

    while let Some(frame) = stream.next().await {
        match frame {
            // A dropped payload is already logged by the relay handle.
            Ok(Message::Text(text)) => {
                state.relay.message(id, text);
            }
            Ok(Message::Binary(bytes)) => match String::from_utf8(bytes) {
                Ok(text) => {
                    state.relay.message(id, text);
                }
                Err(_) => {
                    tracing::warn!(
                        "Discarding payload from connection {}: {}",
                        id,
                        RelayError::InvalidUtf8
                    );
                }
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::debug!("Connection {} read error: {}", id, e);
                break;
            }
        }
    }

    // Once the relay forgets the connection the writer drains and closes the sink.
    drop(guard);
    let _ = writer.await;
}
