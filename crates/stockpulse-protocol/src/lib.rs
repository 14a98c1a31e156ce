//! Wire protocol for the Stockpulse real-time channel.
//!
//! - **Types** ([`Envelope`], [`Payload`], [`SystemMessage`],
//!   [`InventoryEvent`], [`RoomName`]): what travels on the socket.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how those values become
//!   bytes.
//! - **Errors** ([`ProtocolError`]).
//!
//! ```text
//! Transport (bytes) → Protocol (Envelope) → Lifecycle manager (rooms)
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{Envelope, InventoryEvent, Payload, RoomName, SystemMessage};

/// Protocol version clients must present in their handshake.
pub const PROTOCOL_VERSION: u32 = 1;
