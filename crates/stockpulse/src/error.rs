//! Unified error type for the Stockpulse server.

use stockpulse_protocol::ProtocolError;
use stockpulse_room::RoomError;
use stockpulse_session::SessionError;
use stockpulse_transport::TransportError;

use crate::inventory::InventoryError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attributes let `?` convert sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum StockpulseError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid message).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error (bad credentials, store exhausted).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A room-level error (invalid name, membership limit).
    #[error(transparent)]
    Room(#[from] RoomError),

    /// The inventory store failed.
    #[error(transparent)]
    Inventory(#[from] InventoryError),

    /// A real-time handshake presented a session token that does not
    /// resolve, or none when one is required.
    #[error("unauthenticated")]
    Unauthenticated,

    /// Binding or serving the HTTP listener failed.
    #[error("http server error: {0}")]
    Http(#[source] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::ConnectionClosed("gone".into());
        let err: StockpulseError = err.into();
        assert!(matches!(err, StockpulseError::Transport(_)));
        assert!(err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::InvalidMessage("bad".into());
        let err: StockpulseError = err.into();
        assert!(matches!(err, StockpulseError::Protocol(_)));
    }

    #[test]
    fn test_from_session_error() {
        let err: StockpulseError = SessionError::StoreExhausted(3).into();
        assert!(matches!(err, StockpulseError::Session(_)));
        assert!(err.to_string().contains("exhausted"));
    }

    #[test]
    fn test_from_room_error() {
        let err = RoomError::InvalidName("".into());
        let err: StockpulseError = err.into();
        assert!(matches!(err, StockpulseError::Room(_)));
    }

    #[test]
    fn test_from_inventory_error() {
        let err = InventoryError::Unavailable("db down".into());
        let err: StockpulseError = err.into();
        assert!(matches!(err, StockpulseError::Inventory(_)));
    }
}
