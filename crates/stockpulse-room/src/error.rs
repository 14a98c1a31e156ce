//! Error types for the room layer.
//!
//! Membership bookkeeping itself never fails: joining twice, leaving a room
//! you are not in, or leaving a room that does not exist are all no-ops.
//! The only errors are limits on what a client may ask for.

use stockpulse_protocol::RoomName;
use stockpulse_transport::ConnectionId;

/// Errors that can occur during room operations.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The room name is empty or longer than the configured limit.
    #[error("invalid room name {0:?}")]
    InvalidName(RoomName),

    /// The connection already belongs to the maximum number of rooms.
    #[error("{0} is already in {1} rooms")]
    TooManyRooms(ConnectionId, usize),
}
