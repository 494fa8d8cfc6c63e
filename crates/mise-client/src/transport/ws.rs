//! Reconnecting WebSocket transport.
//!
//! One actor task owns the socket: it multiplexes request/response pairs by
//! request ID, keeps subscriptions alive across reconnects (re-sending each
//! with fresh request data), sends keepalive pings, and forces a reconnect
//! when the server stops answering them.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use mise_core::api::{
    AddEventsRequest, AddEventsResponse, FailedEvent, RequestEnvelope, RequestKind,
    SyncEventsRequest, SyncEventsResponse, ResponseEnvelope,
};
use mise_core::event::Event;
use mise_core::ids::EntityId;
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};

use super::{ServerApi, TransportError};
use crate::sync::SyncEngine;

/// How long a request may wait for its response.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Pause between reconnection attempts.
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Keepalive ping cadence; a ping still unanswered at the next tick forces a
/// reconnect.
const PING_INTERVAL: Duration = Duration::from_secs(30);

/// Connection lifecycle notifications for the application.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// The socket is open and subscriptions have been re-sent.
    Connected,
    /// The socket is gone; a reconnect attempt follows.
    Disconnected,
}

type ReplySender = oneshot::Sender<Result<Value, TransportError>>;

/// Produces the request payload each time a subscription is (re-)opened, so
/// a re-subscribe after reconnect picks up the current cursor.
pub type DataProvider = Box<dyn Fn() -> Option<Value> + Send + Sync>;

enum Command {
    Request {
        kind: RequestKind,
        data: Option<Value>,
        reply: ReplySender,
    },
    Subscribe {
        kind: RequestKind,
        data: DataProvider,
        sink: mpsc::UnboundedSender<Value>,
    },
}

/// WebSocket implementation of [`ServerApi`].
pub struct WsTransport {
    commands: mpsc::UnboundedSender<Command>,
}

impl WsTransport {
    /// Start the transport. The actor connects (and reconnects) in the
    /// background; the returned receiver reports connection status changes.
    pub fn start(url: String) -> (Arc<Self>, mpsc::UnboundedReceiver<ConnectionStatus>) {
        let (commands, commands_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = mpsc::unbounded_channel();
        let _ = tokio::spawn(run_actor(url, commands_rx, status_tx));
        (Arc::new(Self { commands }), status_rx)
    }

    /// Open a long-lived `syncEvents` subscription. Every batch response,
    /// snapshot and live alike, arrives on the returned channel; after a
    /// reconnect the subscription is re-sent with fresh data from the
    /// provider.
    pub fn subscribe_sync(&self, data: DataProvider) -> mpsc::UnboundedReceiver<Value> {
        let (sink, receiver) = mpsc::unbounded_channel();
        let _ = self.commands.send(Command::Subscribe {
            kind: RequestKind::SyncEvents,
            data,
            sink,
        });
        receiver
    }

    async fn request(
        &self,
        kind: RequestKind,
        data: Option<Value>,
    ) -> Result<Value, TransportError> {
        let (reply, receiver) = oneshot::channel();
        self.commands
            .send(Command::Request { kind, data, reply })
            .map_err(|_| TransportError::Closed)?;

        match tokio::time::timeout(REQUEST_TIMEOUT, receiver).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(TransportError::Closed),
            Err(_) => Err(TransportError::Timeout),
        }
    }
}

#[async_trait]
impl ServerApi for WsTransport {
    async fn add_events(
        &self,
        entity_id: &EntityId,
        events: Vec<Event>,
    ) -> Result<Vec<FailedEvent>, TransportError> {
        let data = serde_json::to_value(AddEventsRequest {
            id: entity_id.clone(),
            events,
        })?;
        let value = self.request(RequestKind::AddEvents, Some(data)).await?;
        let response: AddEventsResponse = serde_json::from_value(value)?;
        Ok(response.failed)
    }

    /// Single-shot catch-up: returns the first batch the server answers
    /// with. Prefer [`WsTransport::subscribe_sync`] for the continuous feed;
    /// a server with nothing past the cursor answers nothing, which
    /// surfaces here as [`TransportError::Timeout`].
    async fn sync_events(
        &self,
        cursor: Option<DateTime<Utc>>,
    ) -> Result<SyncEventsResponse, TransportError> {
        let data = serde_json::to_value(SyncEventsRequest { cursor })?;
        let value = self.request(RequestKind::SyncEvents, Some(data)).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn ping(&self) -> Result<(), TransportError> {
        let value = self.request(RequestKind::Ping, None).await?;
        if value == Value::String("pong".into()) {
            Ok(())
        } else {
            Err(TransportError::Remote(format!(
                "unexpected ping response: {value}"
            )))
        }
    }
}

/// Glue loop: feeds transport status changes and subscription batches into
/// the sync engine. Run it as its own task for the life of the client.
pub async fn drive(
    engine: Arc<SyncEngine>,
    transport: Arc<WsTransport>,
    mut status: mpsc::UnboundedReceiver<ConnectionStatus>,
) {
    let provider_engine = engine.clone();
    let mut batches =
        transport.subscribe_sync(Box::new(move || provider_engine.sync_request_data()));

    loop {
        tokio::select! {
            status_change = status.recv() => match status_change {
                Some(ConnectionStatus::Connected) => {
                    if let Err(error) = engine.handle_connected().await {
                        warn!(%error, "failed to push pending events on connect");
                    }
                }
                Some(ConnectionStatus::Disconnected) => engine.handle_disconnected(),
                None => break,
            },
            batch = batches.recv() => match batch {
                Some(value) => match serde_json::from_value::<SyncEventsResponse>(value) {
                    Ok(batch) => {
                        if let Err(error) = engine.apply_server_batch(batch) {
                            warn!(%error, "failed to apply server batch");
                        }
                    }
                    Err(error) => warn!(%error, "malformed sync batch"),
                },
                None => break,
            },
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Actor
// ─────────────────────────────────────────────────────────────────────────────

struct Subscription {
    kind: RequestKind,
    data: DataProvider,
    sink: mpsc::UnboundedSender<Value>,
    active_id: Option<u64>,
}

enum ServeEnd {
    Disconnected,
    Shutdown,
}

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

async fn run_actor(
    url: String,
    mut commands: mpsc::UnboundedReceiver<Command>,
    status: mpsc::UnboundedSender<ConnectionStatus>,
) {
    let mut subscriptions: Vec<Subscription> = Vec::new();
    let mut next_request_id: u64 = 0;

    loop {
        match connect_async(url.as_str()).await {
            Ok((socket, _)) => {
                info!(%url, "websocket connected");
                let _ = status.send(ConnectionStatus::Connected);
                let end = serve_connection(
                    socket,
                    &mut commands,
                    &mut subscriptions,
                    &mut next_request_id,
                )
                .await;
                let _ = status.send(ConnectionStatus::Disconnected);
                if matches!(end, ServeEnd::Shutdown) {
                    return;
                }
            }
            Err(error) => {
                warn!(%url, %error, "websocket connect failed");
            }
        }

        // Answer commands while waiting out the reconnect delay.
        let deadline = tokio::time::sleep(RECONNECT_DELAY);
        tokio::pin!(deadline);
        loop {
            tokio::select! {
                () = &mut deadline => break,
                command = commands.recv() => match command {
                    None => return,
                    Some(Command::Request { reply, .. }) => {
                        let _ = reply.send(Err(TransportError::Closed));
                    }
                    Some(Command::Subscribe { kind, data, sink }) => {
                        subscriptions.push(Subscription {
                            kind,
                            data,
                            sink,
                            active_id: None,
                        });
                    }
                },
            }
        }
    }
}

async fn serve_connection(
    socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
    commands: &mut mpsc::UnboundedReceiver<Command>,
    subscriptions: &mut Vec<Subscription>,
    next_request_id: &mut u64,
) -> ServeEnd {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let mut pending: HashMap<u64, ReplySender> = HashMap::new();

    // (Re-)open every subscription with a fresh ID and current data.
    for subscription in subscriptions.iter_mut() {
        *next_request_id += 1;
        subscription.active_id = Some(*next_request_id);
        let envelope = RequestEnvelope {
            request_id: *next_request_id,
            kind: subscription.kind,
            data: (subscription.data)(),
        };
        if send_envelope(&mut ws_tx, &envelope).await.is_err() {
            return finish(ServeEnd::Disconnected, &mut pending, subscriptions);
        }
    }

    let mut ping_interval = tokio::time::interval(PING_INTERVAL);
    // Skip the immediate first tick.
    let _ = ping_interval.tick().await;
    let mut outstanding_ping: Option<u64> = None;

    let end = loop {
        tokio::select! {
            command = commands.recv() => match command {
                None => break ServeEnd::Shutdown,
                Some(Command::Request { kind, data, reply }) => {
                    *next_request_id += 1;
                    let id = *next_request_id;
                    let envelope = RequestEnvelope { request_id: id, kind, data };
                    if send_envelope(&mut ws_tx, &envelope).await.is_err() {
                        let _ = reply.send(Err(TransportError::Closed));
                        break ServeEnd::Disconnected;
                    }
                    let _ = pending.insert(id, reply);
                }
                Some(Command::Subscribe { kind, data, sink }) => {
                    *next_request_id += 1;
                    let id = *next_request_id;
                    let envelope = RequestEnvelope { request_id: id, kind, data: (data)() };
                    subscriptions.push(Subscription { kind, data, sink, active_id: Some(id) });
                    if send_envelope(&mut ws_tx, &envelope).await.is_err() {
                        break ServeEnd::Disconnected;
                    }
                }
            },
            _ = ping_interval.tick() => {
                if outstanding_ping.is_some() {
                    warn!("server did not answer the last ping, reconnecting");
                    break ServeEnd::Disconnected;
                }
                *next_request_id += 1;
                let id = *next_request_id;
                let envelope = RequestEnvelope { request_id: id, kind: RequestKind::Ping, data: None };
                if send_envelope(&mut ws_tx, &envelope).await.is_err() {
                    break ServeEnd::Disconnected;
                }
                outstanding_ping = Some(id);
            }
            frame = ws_rx.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    handle_frame(&text, &mut pending, subscriptions, &mut outstanding_ping);
                }
                Some(Ok(Message::Ping(payload))) => {
                    if ws_tx.send(Message::Pong(payload)).await.is_err() {
                        break ServeEnd::Disconnected;
                    }
                }
                Some(Ok(Message::Close(_))) | None => break ServeEnd::Disconnected,
                Some(Ok(_)) => {}
                Some(Err(error)) => {
                    warn!(%error, "websocket read error");
                    break ServeEnd::Disconnected;
                }
            }
        }
    };

    finish(end, &mut pending, subscriptions)
}

/// Fail in-flight requests and deactivate subscriptions; queued events are
/// re-sent by the engine's staleness window after reconnect.
fn finish(
    end: ServeEnd,
    pending: &mut HashMap<u64, ReplySender>,
    subscriptions: &mut [Subscription],
) -> ServeEnd {
    for (_, reply) in pending.drain() {
        let _ = reply.send(Err(TransportError::Closed));
    }
    for subscription in subscriptions.iter_mut() {
        subscription.active_id = None;
    }
    end
}

async fn send_envelope(ws_tx: &mut WsSink, envelope: &RequestEnvelope) -> Result<(), ()> {
    match serde_json::to_string(envelope) {
        Ok(json) => ws_tx
            .send(Message::Text(json.into()))
            .await
            .map_err(|error| {
                warn!(%error, "websocket send failed");
            }),
        Err(error) => {
            warn!(%error, "failed to serialize request envelope");
            Ok(())
        }
    }
}

fn handle_frame(
    text: &str,
    pending: &mut HashMap<u64, ReplySender>,
    subscriptions: &[Subscription],
    outstanding_ping: &mut Option<u64>,
) {
    let response: ResponseEnvelope = match serde_json::from_str(text) {
        Ok(response) => response,
        Err(error) => {
            warn!(%error, "malformed response frame");
            return;
        }
    };

    if *outstanding_ping == Some(response.request_id) {
        *outstanding_ping = None;
        return;
    }

    if let Some(reply) = pending.remove(&response.request_id) {
        let result = match (response.data, response.error) {
            (_, Some(error)) => Err(TransportError::Remote(error)),
            (Some(data), None) => Ok(data),
            (None, None) => Ok(Value::Null),
        };
        let _ = reply.send(result);
        return;
    }

    if let Some(subscription) = subscriptions
        .iter()
        .find(|s| s.active_id == Some(response.request_id))
    {
        match (response.data, response.error) {
            (Some(data), None) => {
                let _ = subscription.sink.send(data);
            }
            (_, Some(error)) => {
                warn!(request_id = response.request_id, %error, "subscription error");
            }
            (None, None) => {}
        }
        return;
    }

    debug!(
        request_id = response.request_id,
        "response for unknown request"
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
