//! WebSocket session lifecycle: one connected client from upgrade through
//! disconnect.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use mise_events::EventHub;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use super::connection::ClientConnection;
use super::handler::{Outcome, handle_message, sync_batch_response};
use super::registry::ConnectionRegistry;

/// Outbound channel depth per connection.
const SEND_BUFFER: usize = 256;

/// Run a WebSocket session for a connected client.
///
/// 1. Registers the connection and spawns the outbound writer with periodic
///    protocol-level pings
/// 2. Dispatches incoming frames as envelope requests
/// 3. Opens one forwarding task per `syncEvents` subscription
/// 4. Cleans up connection state and subscription tasks on disconnect
#[instrument(skip_all, fields(client_id = %client_id))]
pub async fn run_ws_session(
    ws: WebSocket,
    client_id: String,
    hub: Arc<EventHub>,
    registry: Arc<ConnectionRegistry>,
    heartbeat_interval: Duration,
    heartbeat_timeout: Duration,
) {
    let (mut ws_tx, mut ws_rx) = ws.split();

    let (send_tx, mut send_rx) = mpsc::channel::<String>(SEND_BUFFER);
    let connection = Arc::new(ClientConnection::new(client_id.clone(), send_tx));

    info!("client connected");
    registry.add(connection.clone());

    // Outbound writer with heartbeat pings.
    let outbound_conn = connection.clone();
    let outbound = tokio::spawn(async move {
        let mut ping_interval = tokio::time::interval(heartbeat_interval);
        // Skip the immediate first tick.
        let _ = ping_interval.tick().await;

        loop {
            tokio::select! {
                message = send_rx.recv() => {
                    match message {
                        Some(text) => {
                            if ws_tx.send(Message::Text(text.into())).await.is_err() {
                                break;
                            }
                        }
                        None => break,
                    }
                }
                _ = ping_interval.tick() => {
                    if !outbound_conn.check_alive()
                        && outbound_conn.silent_for() > heartbeat_timeout
                    {
                        warn!("client unresponsive for {heartbeat_timeout:?}, disconnecting");
                        break;
                    }
                    if ws_tx.send(Message::Ping(Vec::new().into())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    let mut subscriptions: Vec<JoinHandle<()>> = Vec::new();

    // Inbound loop.
    while let Some(Ok(message)) = ws_rx.next().await {
        connection.mark_alive();

        let text = match message {
            Message::Text(ref text) => Some(text.to_string()),
            Message::Binary(ref data) => match std::str::from_utf8(data) {
                Ok(text) => Some(text.to_owned()),
                Err(_) => {
                    debug!(len = data.len(), "ignoring non-UTF8 binary frame");
                    None
                }
            },
            Message::Close(_) => {
                info!("client sent close frame");
                break;
            }
            Message::Ping(_) | Message::Pong(_) => None,
        };

        let Some(text) = text else { continue };

        match handle_message(&text, &hub).await {
            Outcome::Reply(response) => match serde_json::to_string(&response) {
                Ok(json) => {
                    if !connection.send(json) {
                        warn!("failed to enqueue response (channel full or closed)");
                    }
                }
                Err(error) => warn!(%error, "failed to serialize response"),
            },
            Outcome::Subscribe { request_id, cursor } => {
                debug!(request_id, "opening syncEvents subscription");
                subscriptions.push(spawn_subscription(
                    request_id,
                    cursor,
                    hub.clone(),
                    connection.clone(),
                ));
            }
        }
    }

    // Clean up.
    info!("client disconnected");
    for subscription in &subscriptions {
        subscription.abort();
    }
    outbound.abort();
    registry.remove(&client_id);
}

/// Forward the catch-up snapshot and then every accepted batch to one
/// subscription.
///
/// The live receiver is registered before the snapshot is read, so events
/// accepted in between appear in both; merging by event ID on the client
/// makes the duplication harmless, whereas the opposite order would lose
/// them.
fn spawn_subscription(
    request_id: u64,
    cursor: Option<chrono::DateTime<chrono::Utc>>,
    hub: Arc<EventHub>,
    connection: Arc<ClientConnection>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut live = hub.subscribe();

        match hub.events_since(cursor.as_ref()).await {
            Ok(snapshot) => {
                if let Some(response) = sync_batch_response(request_id, snapshot) {
                    if let Ok(json) = serde_json::to_string(&response) {
                        let _ = connection.send(json);
                    }
                }
            }
            Err(error) => {
                warn!(%error, "failed to read catch-up snapshot");
                return;
            }
        }

        loop {
            match live.recv().await {
                Ok(batch) => {
                    if let Some(response) = sync_batch_response(request_id, batch) {
                        if let Ok(json) = serde_json::to_string(&response) {
                            if !connection.send(json) {
                                debug!(request_id, "dropping batch for saturated connection");
                            }
                        }
                    }
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    // The client recovers the gap on its next catch-up sync.
                    warn!(request_id, skipped, "subscription lagged behind the hub");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}
