//! Room membership and event broadcast for Stockpulse.
//!
//! # Key types
//!
//! - [`RoomRegistry`]: room ⇄ connection membership, shared as
//!   [`SharedRegistry`]
//! - [`Broadcaster`]: delivers an [`InventoryEvent`] to a room's members
//! - [`RoomConfig`]: limits on room names and memberships
//!
//! [`InventoryEvent`]: stockpulse_protocol::InventoryEvent

mod broadcast;
mod config;
mod error;
mod registry;

pub use broadcast::{Broadcaster, ClientReceiver, ClientSender};
pub use config::RoomConfig;
pub use error::RoomError;
pub use registry::{RoomRegistry, SharedRegistry};
