//! # Stockpulse
//!
//! Inventory web server with live updates.
//!
//! Stockpulse serves login-protected pages and a JSON inventory API over
//! HTTP, and pushes every inventory change to subscribed browsers over a
//! WebSocket channel. The two halves share one session store, so a browser
//! that logged in over HTTP can present the same token on its socket.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use stockpulse::prelude::*;
//!
//! # async fn start() -> Result<(), StockpulseError> {
//! let accounts = StaticCredentials::new()
//!     .with_account(Identity::new("admin").with_first_name("Ada"), "changeme");
//!
//! let server = StockpulseServer::builder()
//!     .bind("0.0.0.0:3000")
//!     .bind_realtime("0.0.0.0:3001")
//!     .build(accounts, MemoryInventory::new())
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod http;
mod inventory;
mod server;

pub use config::{
    Environment, RealtimeConfig, ServerConfig, DEFAULT_COOKIE_NAME, DEFAULT_INVENTORY_ROOM,
};
pub use error::StockpulseError;
pub use handler::ConnectionState;
pub use http::{AppError, CurrentUser, LOGIN_PATH};
pub use inventory::{
    item_event, InventoryError, InventoryStore, Item, ItemDraft, MemoryInventory, ITEM_ADDED,
    ITEM_REMOVED, ITEM_UPDATED,
};
pub use server::{StockpulseServer, StockpulseServerBuilder};

/// Everything needed to configure and run a server.
pub mod prelude {
    pub use crate::{
        Environment, InventoryStore, Item, ItemDraft, MemoryInventory, RealtimeConfig,
        ServerConfig, StockpulseError, StockpulseServer, StockpulseServerBuilder,
    };
    pub use stockpulse_protocol::{
        Codec, Envelope, InventoryEvent, JsonCodec, Payload, RoomName, SystemMessage,
        PROTOCOL_VERSION,
    };
    pub use stockpulse_room::{Broadcaster, RoomConfig, RoomRegistry};
    pub use stockpulse_session::{
        AuthGate, CredentialVerifier, GateDecision, Identity, SessionConfig, SessionStore,
        SharedSessions, StaticCredentials,
    };
}
