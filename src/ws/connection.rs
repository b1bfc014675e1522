//! Lifecycle of a single WebSocket subscriber.
//!
//! A subscriber runs two halves concurrently: a writer draining its hub
//! queue into the socket, and a reader watching the socket for liveness.
//! Whichever half ends first ends the connection, after which it is
//! unregistered from the hub.

use axum::extract::ws::{Message, WebSocket};
use bytes::Bytes;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use crate::app_state::WsSettings;
use crate::domain::{Connection, ConnectionId, Hub};

/// Registers a subscriber with `hub` and serves it until either side
/// fails or closes.
pub async fn run_connection(socket: WebSocket, hub: Hub, settings: WsSettings) {
    let (connection, outbound) = Connection::new(settings.queue_depth);
    let id = connection.id();
    if let Err(e) = hub.register(connection).await {
        tracing::warn!(error = %e, "ws subscriber rejected");
        return;
    }
    tracing::debug!(connection = %id, "ws connection opened");

    let (ws_tx, ws_rx) = socket.split();
    tokio::select! {
        _ = write_loop(ws_tx, outbound, id) => {}
        _ = read_loop(ws_rx, &hub, settings.echo, id) => {}
    }

    let _ = hub.unregister(id).await;
    tracing::debug!(connection = %id, "ws connection closed");
}

async fn write_loop(
    mut ws_tx: SplitSink<WebSocket, Message>,
    mut outbound: mpsc::Receiver<Bytes>,
    id: ConnectionId,
) {
    while let Some(payload) = outbound.recv().await {
        if let Err(e) = ws_tx.send(frame(payload)).await {
            tracing::debug!(connection = %id, error = %e, "ws write failed");
            return;
        }
    }
    // Queue closed by the hub (evicted or unregistered).
    let _ = ws_tx.close().await;
}

async fn read_loop(mut ws_rx: SplitStream<WebSocket>, hub: &Hub, echo: bool, id: ConnectionId) {
    while let Some(msg) = ws_rx.next().await {
        match msg {
            Ok(Message::Text(text)) if echo => {
                let payload = Bytes::copy_from_slice(text.as_str().as_bytes());
                if hub.broadcast(payload).await.is_err() {
                    return;
                }
            }
            Ok(Message::Close(_)) => return,
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(connection = %id, error = %e, "ws read failed");
                return;
            }
        }
    }
}

/// Payloads are JSON, so they go out as text frames; anything that is
/// not UTF-8 is sent as binary.
fn frame(payload: Bytes) -> Message {
    match String::from_utf8(payload.to_vec()) {
        Ok(text) => Message::text(text),
        Err(_) => Message::Binary(payload),
    }
}
