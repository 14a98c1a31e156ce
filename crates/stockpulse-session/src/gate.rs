//! The auth gate: the yes/no decision in front of every protected request.
//!
//! The gate only decides. Turning [`GateDecision::Redirect`] into an HTTP
//! redirect, and attaching the identity to the request, is the web layer's
//! job.

use std::sync::Arc;

use crate::{Identity, SharedSessions};

/// Outcome of checking a request's session token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// The token resolved; the protected handler may run as this user.
    Proceed(Identity),
    /// No token, unknown token, or expired session. The caller must send the
    /// client to the login entry point and must not run the handler.
    Redirect,
}

impl GateDecision {
    /// Returns the identity if the request may proceed.
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Self::Proceed(identity) => Some(identity),
            Self::Redirect => None,
        }
    }
}

/// Checks session tokens against the shared store.
///
/// Cheap to clone; every clone points at the same store.
#[derive(Clone)]
pub struct AuthGate {
    sessions: SharedSessions,
}

impl AuthGate {
    /// Creates a gate over the given store.
    pub fn new(sessions: SharedSessions) -> Self {
        Self { sessions }
    }

    /// Decides whether a request carrying `token` may proceed.
    ///
    /// Safe to call on every request in any order. The only side effect is
    /// the lazy eviction of an expired session inside `resolve`.
    pub async fn check(&self, token: Option<&str>) -> GateDecision {
        let Some(token) = token else {
            return GateDecision::Redirect;
        };

        // Lock for the single lookup only.
        let resolved = self.sessions.lock().await.resolve(token);
        match resolved {
            Some(identity) => GateDecision::Proceed(identity),
            None => {
                tracing::debug!("unauthenticated request redirected");
                GateDecision::Redirect
            }
        }
    }

    /// The store this gate reads.
    pub fn sessions(&self) -> SharedSessions {
        Arc::clone(&self.sessions)
    }
}
