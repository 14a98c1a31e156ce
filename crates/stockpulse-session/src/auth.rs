//! Credential verification hook used by the login form.
//!
//! Stockpulse does not own a user database. The login handler calls a
//! [`CredentialVerifier`] with the submitted username and password and gets
//! back the [`Identity`] to store in the new session. Production deployments
//! plug in their user store here; [`StaticCredentials`] covers demos and
//! tests.

use std::collections::HashMap;

use crate::{Identity, SessionError};

/// Checks a username/password pair and returns who it belongs to.
///
/// `Send + Sync + 'static` because one verifier is shared by every request
/// for the life of the server.
///
/// # Example
///
/// ```rust
/// use stockpulse_session::{CredentialVerifier, Identity, SessionError};
///
/// /// Lets anyone in under the name they typed. Development only.
/// struct OpenDoor;
///
/// impl CredentialVerifier for OpenDoor {
///     async fn verify(
///         &self,
///         username: &str,
///         _password: &str,
///     ) -> Result<Identity, SessionError> {
///         if username.is_empty() {
///             return Err(SessionError::AuthFailed("username required".into()));
///         }
///         Ok(Identity::new(username))
///     }
/// }
/// ```
pub trait CredentialVerifier: Send + Sync + 'static {
    /// Validates the credentials.
    ///
    /// # Returns
    /// - `Ok(Identity)`: credentials accepted
    /// - `Err(SessionError::AuthFailed)`: rejected
    fn verify(
        &self,
        username: &str,
        password: &str,
    ) -> impl std::future::Future<Output = Result<Identity, SessionError>> + Send;
}

/// A fixed, in-memory list of accounts.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    accounts: HashMap<String, (String, Identity)>,
}

impl StaticCredentials {
    /// Creates an empty credential list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an account, replacing any previous one with the same username.
    pub fn with_account(
        mut self,
        identity: Identity,
        password: impl Into<String>,
    ) -> Self {
        self.accounts
            .insert(identity.username.clone(), (password.into(), identity));
        self
    }

    /// Number of configured accounts.
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// Returns `true` if no accounts are configured.
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

impl CredentialVerifier for StaticCredentials {
    async fn verify(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Identity, SessionError> {
        match self.accounts.get(username) {
            Some((expected, identity)) if expected == password => {
                Ok(identity.clone())
            }
            // Same message for unknown user and wrong password.
            _ => Err(SessionError::AuthFailed(
                "invalid username or password".into(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds() -> StaticCredentials {
        StaticCredentials::new()
            .with_account(Identity::new("alice").with_first_name("Alice"), "s3cret")
    }

    #[tokio::test]
    async fn test_verify_correct_password_returns_identity() {
        let identity = creds().verify("alice", "s3cret").await.unwrap();
        assert_eq!(identity.username, "alice");
        assert_eq!(identity.display_name(), "Alice");
    }

    #[tokio::test]
    async fn test_verify_wrong_password_fails() {
        let result = creds().verify("alice", "guess").await;
        assert!(matches!(result, Err(SessionError::AuthFailed(_))));
    }

    #[tokio::test]
    async fn test_verify_unknown_user_fails_with_same_message() {
        let unknown = creds().verify("mallory", "s3cret").await.unwrap_err();
        let wrong = creds().verify("alice", "nope").await.unwrap_err();
        assert_eq!(unknown.to_string(), wrong.to_string());
    }

    #[test]
    fn test_with_account_replaces_existing_username() {
        let creds = creds().with_account(Identity::new("alice"), "new");
        assert_eq!(creds.len(), 1);
    }
}
