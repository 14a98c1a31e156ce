//! Core protocol types for the real-time update channel.
//!
//! Everything in this module is serialized to JSON and sent over the
//! WebSocket between the server and browsers. The browser side is plain
//! JavaScript, so the layouts favour readable, internally tagged JSON.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// RoomName
// ---------------------------------------------------------------------------

/// The name of a room: a logical grouping of connections that receive the
/// same inventory events.
///
/// Room names are free-form strings chosen by the client (or, for inventory
/// notifications, by server configuration). `#[serde(transparent)]` keeps
/// the JSON form a bare string: `"inventory-updates"`, not
/// `{ "0": "inventory-updates" }`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomName(String);

impl RoomName {
    /// Creates a room name from anything string-like.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Borrows the name as a `&str`.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomName {
    fn from(name: &str) -> Self {
        Self(name.to_owned())
    }
}

impl From<String> for RoomName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

// ---------------------------------------------------------------------------
// InventoryEvent
// ---------------------------------------------------------------------------

/// A change notification pushed to every member of a room.
///
/// The payload is opaque to the real-time layer. Whoever triggers the
/// broadcast decides what goes in it (usually the changed item as JSON).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryEvent {
    /// Room the event is addressed to.
    pub room: RoomName,
    /// Event type tag, e.g. `"item-added"`.
    pub kind: String,
    /// Event body.
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl InventoryEvent {
    /// Builds an event for `room` with the given kind and payload.
    pub fn new(
        room: impl Into<RoomName>,
        kind: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            room: room.into(),
            kind: kind.into(),
            payload,
        }
    }
}

// ---------------------------------------------------------------------------
// SystemMessage: connection and room control
// ---------------------------------------------------------------------------

/// Control messages exchanged on the real-time channel.
///
/// `#[serde(tag = "type")]` gives internally tagged JSON:
///   `{ "type": "JoinRoom", "room": "inventory-updates" }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SystemMessage {
    // -- Connection lifecycle --

    /// Client → Server: first frame on every connection.
    /// `token` is the browser's session token, if it has one.
    Handshake {
        version: u32,
        #[serde(default)]
        token: Option<String>,
    },

    /// Server → Client: handshake accepted.
    HandshakeAck {
        connection_id: u64,
        server_time: u64,
    },

    /// Either direction: "I'm disconnecting."
    Disconnect { reason: String },

    // -- Heartbeat (keep-alive) --

    /// Client → Server: "I'm still here."
    Heartbeat { client_time: u64 },

    /// Server → Client: echo of the client's heartbeat.
    HeartbeatAck {
        client_time: u64,
        server_time: u64,
    },

    // -- Room membership --

    /// Client → Server: subscribe to a room's events.
    JoinRoom { room: RoomName },

    /// Server → Client: subscription confirmed.
    RoomJoined { room: RoomName },

    /// Client → Server: unsubscribe from a room.
    LeaveRoom { room: RoomName },

    /// Server → Client: unsubscription confirmed.
    RoomLeft { room: RoomName },

    // -- Errors --

    /// Server → Client: "Something went wrong."
    /// `code` follows HTTP conventions (400 bad request, 401 unauthorized).
    Error { code: u16, message: String },
}

// ---------------------------------------------------------------------------
// Payload / Envelope
// ---------------------------------------------------------------------------

/// The content of an envelope: a control message or an inventory event.
///
/// Adjacently tagged:
///   `{ "type": "Event", "data": { "room": "...", "kind": "...", "payload": {...} } }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Payload {
    /// Connection or room control.
    System(SystemMessage),

    /// An inventory change pushed by the server.
    Event(InventoryEvent),
}

/// The top-level wire frame. Every message on the socket is an `Envelope`.
///
/// `seq` and `timestamp` are filled in by the server on outbound frames;
/// browsers may omit them on the frames they send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Per-connection sequence number of server frames.
    #[serde(default)]
    pub seq: u64,

    /// Milliseconds since the connection was accepted.
    #[serde(default)]
    pub timestamp: u64,

    /// The message itself.
    pub payload: Payload,
}

impl Envelope {
    /// Wraps a control message.
    pub fn system(seq: u64, timestamp: u64, msg: SystemMessage) -> Self {
        Self {
            seq,
            timestamp,
            payload: Payload::System(msg),
        }
    }

    /// Wraps an inventory event.
    pub fn event(seq: u64, timestamp: u64, event: InventoryEvent) -> Self {
        Self {
            seq,
            timestamp,
            payload: Payload::Event(event),
        }
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_room_name_serializes_as_bare_string() {
        let room = RoomName::new("inventory-updates");
        let json = serde_json::to_value(&room).unwrap();
        assert_eq!(json, json!("inventory-updates"));
        assert_eq!(room.to_string(), "inventory-updates");
    }

    #[test]
    fn test_join_room_json_format() {
        let msg = SystemMessage::JoinRoom {
            room: "updates".into(),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json, json!({ "type": "JoinRoom", "room": "updates" }));
    }

    #[test]
    fn test_handshake_token_optional_in_json() {
        let msg: SystemMessage =
            serde_json::from_str(r#"{ "type": "Handshake", "version": 1 }"#)
                .unwrap();
        assert_eq!(
            msg,
            SystemMessage::Handshake {
                version: 1,
                token: None
            }
        );
    }

    #[test]
    fn test_error_json_format() {
        let msg = SystemMessage::Error {
            code: 401,
            message: "unauthorized".into(),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "Error");
        assert_eq!(json["code"], 401);
    }

    #[test]
    fn test_event_envelope_json_format() {
        let env = Envelope::event(
            3,
            120,
            InventoryEvent::new(
                "inventory-updates",
                "item-added",
                json!({ "id": 7 }),
            ),
        );
        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(json["seq"], 3);
        assert_eq!(json["payload"]["type"], "Event");
        assert_eq!(json["payload"]["data"]["room"], "inventory-updates");
        assert_eq!(json["payload"]["data"]["kind"], "item-added");
        assert_eq!(json["payload"]["data"]["payload"]["id"], 7);
    }

    #[test]
    fn test_envelope_seq_and_timestamp_default_when_missing() {
        // What a browser typically sends.
        let raw = r#"{
            "payload": { "type": "System", "data": { "type": "JoinRoom", "room": "a" } }
        }"#;
        let env: Envelope = serde_json::from_str(raw).unwrap();
        assert_eq!(env.seq, 0);
        assert_eq!(env.timestamp, 0);
        assert_eq!(
            env.payload,
            Payload::System(SystemMessage::JoinRoom { room: "a".into() })
        );
    }

    #[test]
    fn test_event_payload_defaults_to_null() {
        let raw = r#"{ "room": "a", "kind": "ping" }"#;
        let event: InventoryEvent = serde_json::from_str(raw).unwrap();
        assert!(event.payload.is_null());
    }

    #[test]
    fn test_decode_unknown_system_message_type_returns_error() {
        let unknown = r#"{"type": "Subscribe", "topic": "x"}"#;
        let result: Result<SystemMessage, _> = serde_json::from_str(unknown);
        assert!(result.is_err());
    }

    #[test]
    fn test_decode_envelope_without_payload_returns_error() {
        let result: Result<Envelope, _> =
            serde_json::from_str(r#"{"seq": 1}"#);
        assert!(result.is_err());
    }
}
