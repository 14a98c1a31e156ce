//! Best-effort fan-out of inventory events to room members.
//!
//! Each live connection has a bounded outbound channel. The connection's
//! own task drains it onto the socket, so a broadcast never waits on network
//! I/O and never holds a registry lock while a socket write is pending.
//!
//! Delivery is fire-and-forget: no acknowledgement, no retry, no ordering
//! across rooms. A member whose channel is gone is logged and skipped, and a
//! member whose queue is full misses the event.

use std::collections::HashMap;
use std::sync::Arc;

use stockpulse_protocol::{InventoryEvent, RoomName};
use stockpulse_transport::ConnectionId;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Mutex};

use crate::{RoomConfig, SharedRegistry};

/// Outbound half handed to the broadcaster for one connection.
pub type ClientSender = mpsc::Sender<Arc<InventoryEvent>>;

/// Inbound half drained by the connection's task.
pub type ClientReceiver = mpsc::Receiver<Arc<InventoryEvent>>;

/// Publishes events to every connection currently in a room.
///
/// Cheap to clone; clones share the same registry and client table.
#[derive(Clone)]
pub struct Broadcaster {
    registry: SharedRegistry,
    clients: Arc<Mutex<HashMap<ConnectionId, ClientSender>>>,
    capacity: usize,
}

impl Broadcaster {
    /// Creates a broadcaster that reads membership from `registry`, with the
    /// default per-connection queue size.
    pub fn new(registry: SharedRegistry) -> Self {
        Self::with_capacity(registry, RoomConfig::default().outbound_capacity)
    }

    /// Like [`new`](Self::new), but each connection queues at most
    /// `capacity` undelivered events.
    pub fn with_capacity(registry: SharedRegistry, capacity: usize) -> Self {
        Self {
            registry,
            clients: Arc::new(Mutex::new(HashMap::new())),
            capacity: capacity.max(1),
        }
    }

    /// The registry this broadcaster reads.
    pub fn registry(&self) -> SharedRegistry {
        Arc::clone(&self.registry)
    }

    /// Registers an outbound channel for `connection` and returns the
    /// receiving half. Attaching again replaces the previous channel.
    pub async fn attach(&self, connection: ConnectionId) -> ClientReceiver {
        let (tx, rx) = mpsc::channel(self.capacity);
        self.clients.lock().await.insert(connection, tx);
        rx
    }

    /// Drops the outbound channel for `connection`. Returns `true` if one was
    /// attached.
    pub async fn detach(&self, connection: ConnectionId) -> bool {
        self.clients.lock().await.remove(&connection).is_some()
    }

    /// Number of attached connections.
    pub async fn client_count(&self) -> usize {
        self.clients.lock().await.len()
    }

    /// Delivers `event` to every current member of `room`.
    ///
    /// Never fails and never waits on a slow member. Returns how many
    /// members the event was handed to; a member that disconnected in the
    /// meantime, or whose queue is full, is skipped and logged.
    pub async fn broadcast(&self, room: &RoomName, event: InventoryEvent) -> usize {
        // Snapshot membership, then release the registry before touching
        // client channels.
        let members = self.registry.lock().await.members_of(room);
        if members.is_empty() {
            tracing::debug!(%room, kind = %event.kind, "broadcast to empty room");
            return 0;
        }

        let event = Arc::new(event);
        let clients = self.clients.lock().await;
        let mut delivered = 0;
        for connection in &members {
            match clients.get(connection) {
                Some(tx) => match tx.try_send(Arc::clone(&event)) {
                    Ok(()) => delivered += 1,
                    Err(TrySendError::Full(_)) => {
                        tracing::debug!(%connection, %room, "client lagging, event dropped");
                    }
                    Err(TrySendError::Closed(_)) => {
                        tracing::debug!(%connection, %room, "delivery failed, client gone");
                    }
                },
                None => {
                    tracing::debug!(%connection, %room, "member has no outbound channel, skipping");
                }
            }
        }

        tracing::info!(
            %room,
            kind = %event.kind,
            delivered,
            members = members.len(),
            "event broadcast"
        );
        delivered
    }

    /// Broadcasts `event` to the room named in the event itself.
    pub async fn publish(&self, event: InventoryEvent) -> usize {
        let room = event.room.clone();
        self.broadcast(&room, event).await
    }
}
