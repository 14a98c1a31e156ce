//! Error types for the session layer.

/// Errors that can occur during login and session management.
///
/// Note what is *not* here: an unknown or expired token is not an error.
/// `resolve` answers `None` for those and the auth gate turns that into a
/// redirect.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Credentials were rejected by the
    /// [`CredentialVerifier`](crate::CredentialVerifier).
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The store already holds `max_sessions` live sessions.
    #[error("session store exhausted ({0} live sessions)")]
    StoreExhausted(usize),
}
