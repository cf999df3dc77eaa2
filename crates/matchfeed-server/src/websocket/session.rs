//! WebSocket session lifecycle: handles a single connected client from
//! upgrade through disconnect.
//!
//! States run `Connecting -> Open -> Closing -> Closed`. The session owns
//! the read half of the socket; a spawned writer owns the write half and
//! drains the connection's outbound queue. The session ends when the client
//! closes, the transport fails, or the connection's token is cancelled by
//! a heartbeat eviction or hub shutdown.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::ws::{Message, WebSocket};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use matchfeed_core::protocol::OutboundFrame;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument};

use super::connection::{ClientConnection, Outbound};
use super::handler::dispatch;
use crate::hub::{DisconnectReason, Hub};

/// Run a WebSocket session for a newly upgraded socket.
///
/// Registers the connection, sends `connected`, dispatches inbound frames
/// until the session ends, then removes the connection from the hub once.
pub async fn run_session(socket: WebSocket, hub: Arc<Hub>) {
    let (conn, rx) = hub.register();
    serve(socket, hub, conn, rx).await;
}

#[instrument(skip_all, fields(conn_id = %conn.id))]
async fn serve(
    socket: WebSocket,
    hub: Arc<Hub>,
    conn: Arc<ClientConnection>,
    rx: mpsc::Receiver<Outbound>,
) {
    let (ws_tx, mut ws_rx) = socket.split();
    let writer = tokio::spawn(write_loop(ws_tx, rx, Arc::clone(&conn)));

    let connected = OutboundFrame::Connected {
        client_id: conn.id.clone(),
    };
    if let Err(e) = conn.send_frame(&connected) {
        debug!(error = %e, "failed to enqueue connected frame");
    }
    let _ = conn.mark_open();

    let cancel = conn.cancel_token().clone();
    let reason = loop {
        let msg = tokio::select! {
            () = cancel.cancelled() => break None,
            msg = ws_rx.next() => msg,
        };

        let reply = match msg {
            Some(Ok(Message::Text(text))) => dispatch(&hub, &conn, text.as_str().as_bytes()),
            Some(Ok(Message::Binary(data))) => dispatch(&hub, &conn, &data),
            Some(Ok(Message::Pong(_))) => {
                conn.mark_alive();
                None
            }
            // axum answers pings itself
            Some(Ok(Message::Ping(_))) => None,
            Some(Ok(Message::Close(_))) | None => break Some(DisconnectReason::ClientClosed),
            Some(Err(e)) => {
                debug!(error = %e, "transport read failed");
                break Some(DisconnectReason::TransportError);
            }
        };

        if let Some(frame) = reply {
            if let Err(e) = conn.send_frame(&frame) {
                debug!(error = %e, "failed to enqueue reply");
            }
        }
    };

    let _ = conn.begin_close();
    match reason {
        Some(reason) => {
            let _ = hub.disconnect(&conn.id, reason);
        }
        None => info!("session cancelled by hub"),
    }
    conn.terminate();
    if let Err(e) = writer.await {
        debug!(error = %e, "writer task failed");
    }
    conn.mark_closed();
}

/// Forward queued frames to the socket until cancelled, then flush what is
/// already queued and close.
async fn write_loop(
    mut sink: SplitSink<WebSocket, Message>,
    mut rx: mpsc::Receiver<Outbound>,
    conn: Arc<ClientConnection>,
) {
    let cancel = conn.cancel_token().clone();
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            item = rx.recv() => match item {
                Some(item) => {
                    if write_one(&mut sink, &conn, item).await.is_err() {
                        return;
                    }
                }
                None => break,
            },
        }
    }

    while let Ok(item) = rx.try_recv() {
        if write_one(&mut sink, &conn, item).await.is_err() {
            return;
        }
    }
    let _ = sink.send(Message::Close(None)).await;
    let _ = sink.close().await;
}

async fn write_one(
    sink: &mut SplitSink<WebSocket, Message>,
    conn: &ClientConnection,
    item: Outbound,
) -> Result<(), axum::Error> {
    match item {
        Outbound::Text(text) => {
            let len = text.as_str().len();
            let result = sink.send(Message::Text(text)).await;
            conn.release_queued(len);
            result
        }
        Outbound::Ping => sink.send(Message::Ping(Bytes::new())).await,
    }
}
