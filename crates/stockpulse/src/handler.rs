//! Per-connection lifecycle: handshake, room control, event delivery, cleanup.
//!
//! Each accepted socket gets its own Tokio task running [`handle_connection`].
//! The flow is:
//!   1. `Connecting`: receive Handshake, check version and optional token
//!   2. `Connected`: attach an outbound channel, then serve room control
//!      frames and forward room events until the socket goes away
//!   3. `Disconnected`: leave every room and detach the channel
//!
//! Step 3 runs on every exit path once step 2 began, including transport
//! errors and server shutdown, so the registry never keeps a dead member.
//! Socket writes are bounded by `write_timeout` and raced against shutdown,
//! so a client that stops reading cannot hold its task in step 2.

use std::sync::Arc;
use std::time::Duration;

use stockpulse_protocol::{
    Codec, Envelope, InventoryEvent, Payload, ProtocolError, SystemMessage,
    PROTOCOL_VERSION,
};
use stockpulse_room::{Broadcaster, ClientReceiver};
use stockpulse_session::{Identity, SharedSessions};
use stockpulse_transport::{Connection, ConnectionId, TransportError, WebSocketConnection};
use tokio::sync::watch;
use tokio::time::Instant;

use crate::config::RealtimeConfig;
use crate::StockpulseError;

/// State shared by every connection task.
pub(crate) struct RealtimeState<C: Codec> {
    pub(crate) sessions: SharedSessions,
    pub(crate) broadcaster: Broadcaster,
    pub(crate) codec: C,
    pub(crate) config: RealtimeConfig,
}

/// Where a connection is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Accepted, waiting for a valid Handshake.
    Connecting,
    /// Handshake done; may join rooms and receives their events.
    Connected,
    /// Terminal. Left every room and detached from the broadcaster.
    Disconnected,
}

/// What the task knows about its own connection.
struct ConnectionRecord {
    id: ConnectionId,
    state: ConnectionState,
    identity: Option<Identity>,
    seq: u64,
    accepted_at: Instant,
    /// Last time any frame arrived from the client. Only inbound traffic
    /// moves this; the idle deadline is measured from it.
    last_inbound: Instant,
}

impl ConnectionRecord {
    fn new(id: ConnectionId) -> Self {
        let now = Instant::now();
        Self {
            id,
            state: ConnectionState::Connecting,
            identity: None,
            seq: 0,
            accepted_at: now,
            last_inbound: now,
        }
    }

    fn transition(&mut self, next: ConnectionState) {
        tracing::trace!(connection = %self.id, from = ?self.state, to = ?next, "state change");
        self.state = next;
    }

    /// Milliseconds since accept, used for `timestamp` and `server_time`.
    fn elapsed_ms(&self) -> u64 {
        self.accepted_at.elapsed().as_millis() as u64
    }

    fn next_seq(&mut self) -> u64 {
        let current = self.seq;
        self.seq += 1;
        current
    }

    fn username(&self) -> &str {
        self.identity
            .as_ref()
            .map(|i| i.username.as_str())
            .unwrap_or("anonymous")
    }
}

/// Handles a single connection from accept to close.
///
/// `shutdown` flips to `true` when the server stops; the connection is then
/// told why and closed.
pub(crate) async fn handle_connection<C: Codec>(
    conn: WebSocketConnection,
    state: Arc<RealtimeState<C>>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), StockpulseError> {
    let mut record = ConnectionRecord::new(conn.id());
    tracing::debug!(connection = %record.id, "handling new connection");

    if let Err(e) = perform_handshake(&conn, &state, &mut record).await {
        record.transition(ConnectionState::Disconnected);
        close(&conn, &state).await;
        return Err(e);
    }

    let mut outbound = state.broadcaster.attach(record.id).await;
    record.transition(ConnectionState::Connected);
    tracing::info!(connection = %record.id, user = record.username(), "client connected");

    let result = serve(&conn, &state, &mut record, &mut outbound, &mut shutdown).await;

    disconnect(&state, &mut record).await;
    close(&conn, &state).await;
    result
}

/// Receives and validates the Handshake, then sends HandshakeAck.
async fn perform_handshake<C: Codec>(
    conn: &WebSocketConnection,
    state: &RealtimeState<C>,
    record: &mut ConnectionRecord,
) -> Result<(), StockpulseError> {
    let data = match tokio::time::timeout(state.config.handshake_timeout, conn.recv()).await {
        Ok(Ok(Some(data))) => data,
        Ok(Ok(None)) => {
            return Err(ProtocolError::InvalidMessage(
                "connection closed before handshake".into(),
            )
            .into());
        }
        Ok(Err(e)) => return Err(e.into()),
        Err(_) => {
            return Err(ProtocolError::InvalidMessage("handshake timed out".into()).into());
        }
    };

    let envelope: Envelope = match state.codec.decode(&data) {
        Ok(envelope) => envelope,
        Err(e) => {
            send_error(conn, state, record, 400, "malformed handshake").await?;
            return Err(e.into());
        }
    };

    let (version, token) = match envelope.payload {
        Payload::System(SystemMessage::Handshake { version, token }) => (version, token),
        _ => {
            send_error(conn, state, record, 400, "expected Handshake").await?;
            return Err(ProtocolError::InvalidMessage(
                "first message must be Handshake".into(),
            )
            .into());
        }
    };

    if version != PROTOCOL_VERSION {
        send_error(
            conn,
            state,
            record,
            400,
            &format!("version mismatch: expected {PROTOCOL_VERSION}, got {version}"),
        )
        .await?;
        return Err(ProtocolError::InvalidMessage("protocol version mismatch".into()).into());
    }

    record.identity = match token {
        Some(token) => {
            let resolved = state.sessions.lock().await.resolve(&token);
            match resolved {
                Some(identity) => Some(identity),
                None => {
                    send_error(conn, state, record, 401, "unauthorized").await?;
                    return Err(StockpulseError::Unauthenticated);
                }
            }
        }
        None if state.config.require_session => {
            send_error(conn, state, record, 401, "session required").await?;
            return Err(StockpulseError::Unauthenticated);
        }
        None => None,
    };

    let ack = SystemMessage::HandshakeAck {
        connection_id: record.id.into_inner(),
        server_time: record.elapsed_ms(),
    };
    send_system(conn, state, record, ack).await
}

/// The connected phase. Returns when the client leaves, the socket fails,
/// the idle timeout fires, or the server shuts down.
async fn serve<C: Codec>(
    conn: &WebSocketConnection,
    state: &RealtimeState<C>,
    record: &mut ConnectionRecord,
    outbound: &mut ClientReceiver,
    shutdown: &mut watch::Receiver<bool>,
) -> Result<(), StockpulseError> {
    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                tracing::debug!(connection = %record.id, "server shutting down");
                let bye = SystemMessage::Disconnect { reason: "server shutting down".into() };
                let _ = send_system(conn, state, record, bye).await;
                return Ok(());
            }

            Some(event) = outbound.recv() => {
                // A peer that stopped reading stalls this write; shutdown
                // must still get through.
                tokio::select! {
                    sent = send_event(conn, state, record, &event) => sent?,
                    _ = shutdown.changed() => {
                        tracing::debug!(connection = %record.id, "server shutting down during pending write");
                        return Ok(());
                    }
                }
            }

            _ = idle_deadline(record.last_inbound, state.config.idle_timeout) => {
                tracing::info!(connection = %record.id, "connection idle, closing");
                let bye = SystemMessage::Disconnect { reason: "idle timeout".into() };
                let _ = send_system(conn, state, record, bye).await;
                return Ok(());
            }

            frame = conn.recv() => {
                let data = match frame {
                    Ok(Some(data)) => data,
                    Ok(None) => {
                        tracing::debug!(connection = %record.id, "connection closed by peer");
                        return Ok(());
                    }
                    Err(e) => return Err(e.into()),
                };
                record.last_inbound = Instant::now();

                let envelope: Envelope = match state.codec.decode(&data) {
                    Ok(envelope) => envelope,
                    Err(e) => {
                        tracing::debug!(connection = %record.id, error = %e, "failed to decode envelope");
                        continue;
                    }
                };

                match envelope.payload {
                    Payload::System(msg) => {
                        if handle_system_message(conn, state, record, msg).await? {
                            return Ok(());
                        }
                    }
                    Payload::Event(_) => {
                        tracing::debug!(connection = %record.id, "ignoring client-sent event");
                    }
                }
            }
        }
    }
}

/// Completes `limit` after the last inbound frame. Never completes when no
/// limit is set.
async fn idle_deadline(last_inbound: Instant, limit: Option<Duration>) {
    match limit {
        Some(limit) => tokio::time::sleep_until(last_inbound + limit).await,
        None => std::future::pending().await,
    }
}

/// Handles a control message. Returns `true` if the connection should close.
async fn handle_system_message<C: Codec>(
    conn: &WebSocketConnection,
    state: &RealtimeState<C>,
    record: &mut ConnectionRecord,
    msg: SystemMessage,
) -> Result<bool, StockpulseError> {
    match msg {
        SystemMessage::JoinRoom { room } => {
            // Lock for the join only; never across the socket write.
            let joined = state
                .broadcaster
                .registry()
                .lock()
                .await
                .join(record.id, &room);

            match joined {
                Ok(_) => {
                    tracing::info!(connection = %record.id, %room, "joined room");
                    send_system(conn, state, record, SystemMessage::RoomJoined { room })
                        .await?;
                }
                Err(e) => {
                    send_error(conn, state, record, 400, &e.to_string()).await?;
                }
            }
        }

        SystemMessage::LeaveRoom { room } => {
            state
                .broadcaster
                .registry()
                .lock()
                .await
                .leave(record.id, &room);
            send_system(conn, state, record, SystemMessage::RoomLeft { room }).await?;
        }

        SystemMessage::Heartbeat { client_time } => {
            let ack = SystemMessage::HeartbeatAck {
                client_time,
                server_time: record.elapsed_ms(),
            };
            send_system(conn, state, record, ack).await?;
        }

        SystemMessage::Disconnect { reason } => {
            tracing::info!(connection = %record.id, %reason, "client disconnected");
            return Ok(true);
        }

        _ => {
            tracing::debug!(connection = %record.id, "ignoring unexpected system message");
        }
    }

    Ok(false)
}

/// Removes the connection from every room and drops its outbound channel.
async fn disconnect<C: Codec>(state: &RealtimeState<C>, record: &mut ConnectionRecord) {
    let left = state
        .broadcaster
        .registry()
        .lock()
        .await
        .leave_all(record.id);
    state.broadcaster.detach(record.id).await;
    record.transition(ConnectionState::Disconnected);
    tracing::info!(
        connection = %record.id,
        user = record.username(),
        rooms_left = ?left,
        "client disconnected, cleaned up"
    );
}

/// Closes the socket, giving up after `write_timeout` if the peer is not
/// reading. Dropping the connection afterwards releases the TCP stream.
async fn close<C: Codec>(conn: &WebSocketConnection, state: &RealtimeState<C>) {
    if tokio::time::timeout(state.config.write_timeout, conn.close())
        .await
        .is_err()
    {
        tracing::debug!(connection = %conn.id(), "close handshake timed out");
    }
}

async fn send_event<C: Codec>(
    conn: &WebSocketConnection,
    state: &RealtimeState<C>,
    record: &mut ConnectionRecord,
    event: &InventoryEvent,
) -> Result<(), StockpulseError> {
    let envelope = Envelope::event(record.next_seq(), record.elapsed_ms(), event.clone());
    let bytes = state.codec.encode(&envelope)?;
    write(conn, state, &bytes).await
}

async fn send_system<C: Codec>(
    conn: &WebSocketConnection,
    state: &RealtimeState<C>,
    record: &mut ConnectionRecord,
    msg: SystemMessage,
) -> Result<(), StockpulseError> {
    let envelope = Envelope::system(record.next_seq(), record.elapsed_ms(), msg);
    let bytes = state.codec.encode(&envelope)?;
    write(conn, state, &bytes).await
}

/// Sends a `SystemMessage::Error` to the client.
async fn send_error<C: Codec>(
    conn: &WebSocketConnection,
    state: &RealtimeState<C>,
    record: &mut ConnectionRecord,
    code: u16,
    message: &str,
) -> Result<(), StockpulseError> {
    let msg = SystemMessage::Error {
        code,
        message: message.to_string(),
    };
    send_system(conn, state, record, msg).await
}

/// Writes one frame, failing if the socket does not accept it within
/// `write_timeout`.
async fn write<C: Codec>(
    conn: &WebSocketConnection,
    state: &RealtimeState<C>,
    bytes: &[u8],
) -> Result<(), StockpulseError> {
    match tokio::time::timeout(state.config.write_timeout, conn.send(bytes)).await {
        Ok(sent) => Ok(sent?),
        Err(_) => Err(TransportError::SendFailed(std::io::Error::new(
            std::io::ErrorKind::TimedOut,
            "socket write timed out",
        ))
        .into()),
    }
}
