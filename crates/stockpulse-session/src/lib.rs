//! Login sessions and request authorization for Stockpulse.
//!
//! 1. **Credentials**: checking a username/password at login
//!    ([`CredentialVerifier`] trait, [`StaticCredentials`])
//! 2. **Session tracking**: token → identity, with a maximum age
//!    ([`SessionStore`])
//! 3. **Authorization**: the proceed/redirect decision for protected
//!    requests ([`AuthGate`])
//!
//! # How it fits in the stack
//!
//! ```text
//! HTTP layer (above)  ← asks the gate before running protected handlers
//!     ↕
//! Session layer (this crate)  ← owns tokens and identities
//! ```

#![allow(async_fn_in_trait)]

mod auth;
mod error;
mod gate;
mod session;
mod store;

pub use auth::{CredentialVerifier, StaticCredentials};
pub use error::SessionError;
pub use gate::{AuthGate, GateDecision};
pub use session::{Identity, Session, SessionConfig};
pub use store::{SessionStore, SharedSessions};
