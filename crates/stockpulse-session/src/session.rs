//! Session types: who is logged in, since when, and for how long.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Configuration for session behavior.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Maximum age of a session in seconds, measured from login.
    ///
    /// Default: 24 hours, matching the login cookie's lifetime.
    pub max_age_secs: u64,

    /// Upper bound on live sessions held in memory. `create` fails with
    /// [`SessionError::StoreExhausted`](crate::SessionError::StoreExhausted)
    /// once this many unexpired sessions exist.
    pub max_sessions: usize,
}

impl SessionConfig {
    /// The maximum age as a `Duration`.
    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_secs)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_age_secs: 24 * 60 * 60,
            max_sessions: 100_000,
        }
    }
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// The user a session belongs to.
///
/// This is what protected handlers see once the auth gate lets a request
/// through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Login name. Unique per user.
    pub username: String,

    /// Optional first name used for greetings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
}

impl Identity {
    /// Creates an identity with no first name.
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            first_name: None,
        }
    }

    /// Sets the first name.
    pub fn with_first_name(mut self, first_name: impl Into<String>) -> Self {
        self.first_name = Some(first_name.into());
        self
    }

    /// The name to greet the user with: first name if known, else username.
    pub fn display_name(&self) -> &str {
        self.first_name.as_deref().unwrap_or(&self.username)
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// A single login session.
#[derive(Debug, Clone)]
pub struct Session {
    /// The opaque token handed to the browser (32 hex chars, 128 bits).
    pub token: String,

    /// Who logged in.
    pub identity: Identity,

    /// When the session was created. `Instant` is monotonic, so wall-clock
    /// adjustments cannot extend or shorten a session.
    pub created_at: Instant,
}

impl Session {
    /// Returns `true` if the session is older than `max_age` at `now`.
    pub fn is_expired_at(&self, now: Instant, max_age: Duration) -> bool {
        now.saturating_duration_since(self.created_at) > max_age
    }
}
