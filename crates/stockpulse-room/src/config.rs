//! Room registry limits.

/// Limits applied when a connection asks to join a room.
///
/// Room names come straight from browsers, so both the length of a name and
/// the number of rooms one socket may hold are capped.
#[derive(Debug, Clone)]
pub struct RoomConfig {
    /// Longest accepted room name, in bytes.
    pub max_name_len: usize,

    /// Maximum rooms a single connection may be a member of.
    pub max_rooms_per_connection: usize,

    /// Events queued per connection before further broadcasts to it are
    /// dropped.
    pub outbound_capacity: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            max_name_len: 128,
            max_rooms_per_connection: 32,
            outbound_capacity: 256,
        }
    }
}
