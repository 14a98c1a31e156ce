//! Room registry: which connections are subscribed to which rooms.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use stockpulse_protocol::RoomName;
use stockpulse_transport::ConnectionId;
use tokio::sync::Mutex;

use crate::{RoomConfig, RoomError};

/// The registry as the server shares it between connection tasks and the
/// broadcaster.
pub type SharedRegistry = Arc<Mutex<RoomRegistry>>;

/// Tracks room membership in both directions.
///
/// `rooms` answers "who is in this room?" for broadcasts; `memberships`
/// answers "which rooms is this connection in?" so `leave_all` on
/// disconnect does not have to scan every room. The two maps are always
/// updated together.
///
/// Rooms exist only while they have members: the first join creates the
/// entry and the last leave removes it.
pub struct RoomRegistry {
    rooms: HashMap<RoomName, HashSet<ConnectionId>>,
    memberships: HashMap<ConnectionId, HashSet<RoomName>>,
    config: RoomConfig,
}

impl RoomRegistry {
    /// Creates an empty registry.
    pub fn new(config: RoomConfig) -> Self {
        Self {
            rooms: HashMap::new(),
            memberships: HashMap::new(),
            config,
        }
    }

    /// Wraps a new registry for sharing across tasks.
    pub fn shared(config: RoomConfig) -> SharedRegistry {
        Arc::new(Mutex::new(Self::new(config)))
    }

    /// Adds `connection` to `room`, creating the room if needed.
    ///
    /// Idempotent. Returns `Ok(true)` if membership changed, `Ok(false)` if
    /// the connection was already a member.
    ///
    /// # Errors
    /// - [`RoomError::InvalidName`]: empty or over-long room name
    /// - [`RoomError::TooManyRooms`]: connection is at its room limit
    pub fn join(
        &mut self,
        connection: ConnectionId,
        room: &RoomName,
    ) -> Result<bool, RoomError> {
        let name = room.as_str();
        if name.is_empty() || name.len() > self.config.max_name_len {
            return Err(RoomError::InvalidName(room.clone()));
        }

        let joined = self.memberships.get(&connection);
        if joined.is_some_and(|rooms| rooms.contains(room)) {
            return Ok(false);
        }
        let count = joined.map_or(0, HashSet::len);
        if count >= self.config.max_rooms_per_connection {
            return Err(RoomError::TooManyRooms(connection, count));
        }

        self.memberships
            .entry(connection)
            .or_default()
            .insert(room.clone());
        let members = self.rooms.entry(room.clone()).or_default();
        members.insert(connection);

        tracing::info!(
            %connection,
            %room,
            members = members.len(),
            "joined room"
        );
        Ok(true)
    }

    /// Removes `connection` from `room`.
    ///
    /// No-op if the connection is not a member or the room does not exist.
    /// Returns `true` if membership changed. An emptied room is pruned.
    pub fn leave(&mut self, connection: ConnectionId, room: &RoomName) -> bool {
        let Some(joined) = self.memberships.get_mut(&connection) else {
            return false;
        };
        if !joined.remove(room) {
            return false;
        }
        if joined.is_empty() {
            self.memberships.remove(&connection);
        }

        self.remove_member(connection, room);
        tracing::info!(%connection, %room, "left room");
        true
    }

    /// Removes `connection` from every room it belongs to.
    ///
    /// Called once when a connection closes. Returns the rooms it left.
    pub fn leave_all(&mut self, connection: ConnectionId) -> Vec<RoomName> {
        let Some(joined) = self.memberships.remove(&connection) else {
            return Vec::new();
        };

        let mut left: Vec<RoomName> = joined.into_iter().collect();
        left.sort();
        for room in &left {
            self.remove_member(connection, room);
        }

        tracing::debug!(%connection, rooms = left.len(), "left all rooms");
        left
    }

    /// Snapshot of the members of `room`. Empty if the room does not exist.
    pub fn members_of(&self, room: &RoomName) -> HashSet<ConnectionId> {
        self.rooms.get(room).cloned().unwrap_or_default()
    }

    /// Rooms `connection` currently belongs to.
    pub fn rooms_of(&self, connection: ConnectionId) -> HashSet<RoomName> {
        self.memberships
            .get(&connection)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of non-empty rooms.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Names of all non-empty rooms, sorted.
    pub fn room_names(&self) -> Vec<RoomName> {
        let mut names: Vec<RoomName> = self.rooms.keys().cloned().collect();
        names.sort();
        names
    }

    fn remove_member(&mut self, connection: ConnectionId, room: &RoomName) {
        if let Some(members) = self.rooms.get_mut(room) {
            members.remove(&connection);
            if members.is_empty() {
                self.rooms.remove(room);
                tracing::debug!(%room, "room emptied");
            }
        }
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new(RoomConfig::default())
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn cid(id: u64) -> ConnectionId {
        ConnectionId::new(id)
    }

    fn room(name: &str) -> RoomName {
        RoomName::new(name)
    }

    // =====================================================================
    // join()
    // =====================================================================

    #[test]
    fn test_join_then_members_of_contains_connection() {
        let mut reg = RoomRegistry::default();

        assert!(reg.join(cid(1), &room("updates")).unwrap());

        assert!(reg.members_of(&room("updates")).contains(&cid(1)));
        assert_eq!(reg.room_count(), 1);
    }

    #[test]
    fn test_join_twice_is_idempotent() {
        let mut reg = RoomRegistry::default();

        reg.join(cid(1), &room("updates")).unwrap();
        let changed = reg.join(cid(1), &room("updates")).unwrap();

        assert!(!changed);
        assert_eq!(reg.members_of(&room("updates")).len(), 1);
        assert_eq!(reg.rooms_of(cid(1)).len(), 1);
    }

    #[test]
    fn test_join_empty_name_rejected() {
        let mut reg = RoomRegistry::default();

        let result = reg.join(cid(1), &room(""));

        assert!(matches!(result, Err(RoomError::InvalidName(_))));
        assert_eq!(reg.room_count(), 0);
        assert!(reg.rooms_of(cid(1)).is_empty());
    }

    #[test]
    fn test_join_overlong_name_rejected() {
        let mut reg = RoomRegistry::new(RoomConfig {
            max_name_len: 4,
            ..RoomConfig::default()
        });

        assert!(reg.join(cid(1), &room("abcd")).is_ok());
        assert!(matches!(
            reg.join(cid(1), &room("abcde")),
            Err(RoomError::InvalidName(_))
        ));
    }

    #[test]
    fn test_join_beyond_room_limit_rejected() {
        let mut reg = RoomRegistry::new(RoomConfig {
            max_rooms_per_connection: 2,
            ..RoomConfig::default()
        });
        reg.join(cid(1), &room("a")).unwrap();
        reg.join(cid(1), &room("b")).unwrap();

        let result = reg.join(cid(1), &room("c"));

        assert!(matches!(result, Err(RoomError::TooManyRooms(_, 2))));
        // Re-joining a room it already holds is still fine.
        assert!(reg.join(cid(1), &room("a")).is_ok());
        assert!(reg.members_of(&room("c")).is_empty());
    }

    // =====================================================================
    // leave()
    // =====================================================================

    #[test]
    fn test_leave_removes_membership_and_prunes_room() {
        let mut reg = RoomRegistry::default();
        reg.join(cid(1), &room("updates")).unwrap();

        assert!(reg.leave(cid(1), &room("updates")));

        assert!(reg.members_of(&room("updates")).is_empty());
        assert_eq!(reg.room_count(), 0);
        assert!(reg.rooms_of(cid(1)).is_empty());
    }

    #[test]
    fn test_leave_non_member_is_noop() {
        let mut reg = RoomRegistry::default();
        reg.join(cid(1), &room("updates")).unwrap();

        assert!(!reg.leave(cid(2), &room("updates")));
        assert!(!reg.leave(cid(1), &room("missing")));

        assert_eq!(reg.members_of(&room("updates")).len(), 1);
    }

    #[test]
    fn test_leave_keeps_room_with_other_members() {
        let mut reg = RoomRegistry::default();
        reg.join(cid(1), &room("updates")).unwrap();
        reg.join(cid(2), &room("updates")).unwrap();

        reg.leave(cid(1), &room("updates"));

        let members = reg.members_of(&room("updates"));
        assert_eq!(members.len(), 1);
        assert!(members.contains(&cid(2)));
    }

    // =====================================================================
    // leave_all()
    // =====================================================================

    #[test]
    fn test_leave_all_removes_from_every_room() {
        let mut reg = RoomRegistry::default();
        for name in ["r1", "r2", "r3"] {
            reg.join(cid(1), &room(name)).unwrap();
        }
        reg.join(cid(2), &room("r2")).unwrap();

        let left = reg.leave_all(cid(1));

        assert_eq!(left, vec![room("r1"), room("r2"), room("r3")]);
        for name in ["r1", "r2", "r3"] {
            assert!(!reg.members_of(&room(name)).contains(&cid(1)));
        }
        assert_eq!(reg.room_names(), vec![room("r2")]);
    }

    #[test]
    fn test_leave_all_unknown_connection_returns_empty() {
        let mut reg = RoomRegistry::default();
        assert!(reg.leave_all(cid(9)).is_empty());
    }

    #[test]
    fn test_leave_all_twice_is_noop() {
        let mut reg = RoomRegistry::default();
        reg.join(cid(1), &room("a")).unwrap();

        reg.leave_all(cid(1));
        assert!(reg.leave_all(cid(1)).is_empty());
        assert_eq!(reg.room_count(), 0);
    }

    // =====================================================================
    // members_of()
    // =====================================================================

    #[test]
    fn test_members_of_is_a_snapshot() {
        let mut reg = RoomRegistry::default();
        reg.join(cid(1), &room("a")).unwrap();

        let snapshot = reg.members_of(&room("a"));
        reg.join(cid(2), &room("a")).unwrap();

        assert_eq!(snapshot.len(), 1);
        assert_eq!(reg.members_of(&room("a")).len(), 2);
    }

    #[test]
    fn test_members_of_unknown_room_is_empty() {
        let reg = RoomRegistry::default();
        assert!(reg.members_of(&room("nobody-here")).is_empty());
    }
}
