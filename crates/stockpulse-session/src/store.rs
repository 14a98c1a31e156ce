//! The session store: maps opaque tokens to logged-in identities.
//!
//! Responsibilities:
//! - Issuing a fresh token on login
//! - Resolving a token back to an identity on every protected request
//! - Destroying sessions on logout
//! - Evicting sessions older than the configured maximum age
//!
//! # Concurrency note
//!
//! `SessionStore` is a plain `HashMap` with `&mut self` methods. The server
//! shares one instance behind a `tokio::sync::Mutex` ([`SharedSessions`]) and
//! locks it for exactly one operation at a time.
//!
//! # Expiry
//!
//! There is no background sweep. Age is checked when a token is resolved,
//! and an expired entry is removed right there (lazy eviction).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use rand::Rng;
use tokio::sync::Mutex;

use crate::{Identity, Session, SessionConfig, SessionError};

/// The store as the server shares it between the auth gate, the login
/// handlers, and the real-time handshake.
pub type SharedSessions = Arc<Mutex<SessionStore>>;

/// In-memory session store.
///
/// ```text
/// create() ──→ [live] ──resolve() past max age──→ evicted
///                 │
///                 └──destroy()──→ gone (never resolves again)
/// ```
pub struct SessionStore {
    /// Live sessions keyed by token.
    sessions: HashMap<String, Session>,

    config: SessionConfig,
}

impl SessionStore {
    /// Creates a new, empty store with the given config.
    pub fn new(config: SessionConfig) -> Self {
        Self {
            sessions: HashMap::new(),
            config,
        }
    }

    /// Wraps a new store for sharing across tasks.
    pub fn shared(config: SessionConfig) -> SharedSessions {
        Arc::new(Mutex::new(Self::new(config)))
    }

    /// Returns the store's configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Creates a session for `identity` and returns its token.
    ///
    /// # Errors
    /// Returns [`SessionError::StoreExhausted`] if `max_sessions` unexpired
    /// sessions already exist. Expired entries are purged first, so only
    /// live sessions count against the limit.
    pub fn create(&mut self, identity: Identity) -> Result<String, SessionError> {
        self.create_at(identity, Instant::now())
    }

    /// [`create`](Self::create) with an explicit clock.
    pub fn create_at(
        &mut self,
        identity: Identity,
        now: Instant,
    ) -> Result<String, SessionError> {
        if self.sessions.len() >= self.config.max_sessions {
            self.purge_expired(now);
            if self.sessions.len() >= self.config.max_sessions {
                tracing::warn!(
                    live = self.sessions.len(),
                    "session store exhausted"
                );
                return Err(SessionError::StoreExhausted(self.sessions.len()));
            }
        }

        // 128 random bits make a collision practically impossible, but a
        // reused token would hand one user another user's session.
        let mut token = generate_token();
        while self.sessions.contains_key(&token) {
            token = generate_token();
        }

        tracing::info!(username = %identity.username, "session created");
        self.sessions.insert(
            token.clone(),
            Session {
                token: token.clone(),
                identity,
                created_at: now,
            },
        );
        Ok(token)
    }

    /// Resolves a token to its identity.
    ///
    /// Returns `None` for tokens that were never issued, were destroyed, or
    /// have outlived `max_age`. In the last case the entry is removed as a
    /// side effect.
    pub fn resolve(&mut self, token: &str) -> Option<Identity> {
        self.resolve_at(token, Instant::now())
    }

    /// [`resolve`](Self::resolve) with an explicit clock.
    pub fn resolve_at(&mut self, token: &str, now: Instant) -> Option<Identity> {
        let max_age = self.config.max_age();
        let session = self.sessions.get(token)?;

        if session.is_expired_at(now, max_age) {
            let session = self.sessions.remove(token)?;
            tracing::info!(
                username = %session.identity.username,
                "session expired"
            );
            return None;
        }

        Some(session.identity.clone())
    }

    /// Destroys a session. Destroying an unknown token is a no-op.
    ///
    /// Returns `true` if a session was actually removed.
    pub fn destroy(&mut self, token: &str) -> bool {
        match self.sessions.remove(token) {
            Some(session) => {
                tracing::info!(
                    username = %session.identity.username,
                    "session destroyed"
                );
                true
            }
            None => false,
        }
    }

    /// Removes every session older than `max_age` at `now`.
    ///
    /// Returns how many were removed.
    pub fn purge_expired(&mut self, now: Instant) -> usize {
        let max_age = self.config.max_age();
        let before = self.sessions.len();
        self.sessions
            .retain(|_, session| !session.is_expired_at(now, max_age));
        let purged = before - self.sessions.len();
        if purged > 0 {
            tracing::debug!(purged, "purged expired sessions");
        }
        purged
    }

    /// Returns the number of stored sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns `true` if there are no sessions.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// Generates a random 32-character hex string (128 bits of entropy).
fn generate_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 16] = rng.random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

// =========================================================================
// Tests
// =========================================================================
