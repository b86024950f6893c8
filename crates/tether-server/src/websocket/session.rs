//! WebSocket session lifecycle: one connected client from upgrade through
//! disconnect.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use metrics::{counter, gauge, histogram};
use tether_core::ConnectionId;
use tether_core::ServerEvent;
use tether_core::protocol::Established;
use tether_relay::Transport;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::connection::ClientConnection;
use super::handler::{FrameAction, decode_frame};
use super::heartbeat::{HeartbeatResult, run_heartbeat};
use super::registry::ConnectionRegistry;
use crate::dispatcher::Inbound;
use crate::metrics::{
    WS_CONNECTION_DURATION_SECONDS, WS_CONNECTIONS_ACTIVE, WS_CONNECTIONS_TOTAL,
    WS_DISCONNECTIONS_TOTAL, WS_HEARTBEAT_TIMEOUTS_TOTAL,
};

/// How long the writer gets to flush queued frames after the reader stops.
const OUTBOUND_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Everything a session needs from the server.
#[derive(Clone, Debug)]
pub struct SessionContext {
    /// Live connections; the session registers itself here.
    pub registry: Arc<ConnectionRegistry>,
    /// Channel to the dispatcher.
    pub inbound: mpsc::Sender<Inbound>,
    /// Outbound frames buffered per connection.
    pub send_queue_capacity: usize,
    /// Ping and liveness check interval.
    pub heartbeat_interval: Duration,
    /// Silence after which the connection is closed.
    pub heartbeat_timeout: Duration,
    /// Child of the server's shutdown token.
    pub cancel: CancellationToken,
}

/// Run a WebSocket session for a connected client.
///
/// 1. Allocates a handle, registers the connection and queues the
///    `connection_established` greeting
/// 2. Forwards queued frames to the socket and sends periodic pings
/// 3. Decodes inbound frames and hands events to the dispatcher
/// 4. Closes the connection after `heartbeat_timeout` of silence
/// 5. On exit, unregisters and reports the disconnect to the dispatcher
#[instrument(skip_all, fields(conn_id = %conn_id))]
pub async fn run_ws_session(ws: WebSocket, conn_id: ConnectionId, ctx: SessionContext) {
    let (mut ws_tx, mut ws_rx) = ws.split();

    let (send_tx, mut send_rx) = mpsc::channel::<Arc<str>>(ctx.send_queue_capacity.max(1));
    let connection = Arc::new(ClientConnection::new(conn_id.clone(), send_tx));
    ctx.registry.add(Arc::clone(&connection));

    info!("client connected");
    counter!(WS_CONNECTIONS_TOTAL).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).increment(1.0);

    let greeting = ServerEvent::ConnectionEstablished(Established {
        connection_id: conn_id.clone(),
    });
    if !ctx.registry.deliver(&conn_id, &greeting) {
        warn!("failed to queue greeting");
    }

    let cancel = ctx.cancel.clone();
    let outbound_cancel = cancel.clone();
    let ping_every = ctx.heartbeat_interval;
    let outbound = tokio::spawn(async move {
        let mut ping_interval = tokio::time::interval(ping_every);
        let _ = ping_interval.tick().await;

        loop {
            tokio::select! {
                frame = send_rx.recv() => {
                    let Some(text) = frame else { break };
                    if ws_tx.send(Message::Text(text.to_string().into())).await.is_err() {
                        break;
                    }
                }
                _ = ping_interval.tick() => {
                    if ws_tx.send(Message::Ping(Vec::new().into())).await.is_err() {
                        break;
                    }
                }
                () = outbound_cancel.cancelled() => {
                    while let Ok(text) = send_rx.try_recv() {
                        if ws_tx.send(Message::Text(text.to_string().into())).await.is_err() {
                            break;
                        }
                    }
                    let _ = ws_tx.send(Message::Close(None)).await;
                    break;
                }
            }
        }
    });

    let heartbeat = tokio::spawn(run_heartbeat(
        Arc::clone(&connection),
        ctx.heartbeat_interval,
        ctx.heartbeat_timeout,
        cancel.clone(),
    ));
    let heartbeat_cancel = cancel.clone();
    let heartbeat_conn = Arc::clone(&connection);
    let watchdog = tokio::spawn(async move {
        if let Ok(HeartbeatResult::TimedOut) = heartbeat.await {
            warn!(
                silent_secs = heartbeat_conn.last_seen_elapsed().as_secs(),
                "client unresponsive, disconnecting"
            );
            counter!(WS_HEARTBEAT_TIMEOUTS_TOTAL).increment(1);
            heartbeat_cancel.cancel();
        }
    });

    loop {
        let frame = tokio::select! {
            frame = ws_rx.next() => frame,
            () = cancel.cancelled() => break,
        };
        let Some(Ok(message)) = frame else { break };
        connection.mark_alive();

        match decode_frame(&message) {
            FrameAction::Event(event) => {
                debug!(event = event.name(), "event received");
                let inbound = Inbound::Event {
                    from: conn_id.clone(),
                    event,
                };
                if ctx.inbound.send(inbound).await.is_err() {
                    warn!("dispatcher gone, closing session");
                    break;
                }
            }
            FrameAction::Close => {
                info!("client sent close frame");
                break;
            }
            FrameAction::Control | FrameAction::Skip => {}
        }
    }

    cancel.cancel();
    let _ = ctx.registry.remove(&conn_id);
    if ctx
        .inbound
        .send(Inbound::Disconnected {
            id: conn_id.clone(),
        })
        .await
        .is_err()
    {
        debug!("dispatcher gone before disconnect");
    }

    let outbound_abort = outbound.abort_handle();
    if tokio::time::timeout(OUTBOUND_DRAIN_TIMEOUT, outbound).await.is_err() {
        outbound_abort.abort();
    }
    let _ = watchdog.await;

    info!(
        age_secs = connection.age().as_secs(),
        dropped = connection.drop_count(),
        "client disconnected"
    );
    counter!(WS_DISCONNECTIONS_TOTAL).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).decrement(1.0);
    histogram!(WS_CONNECTION_DURATION_SECONDS).record(connection.age().as_secs_f64());
}
