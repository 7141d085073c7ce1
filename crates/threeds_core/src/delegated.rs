//! Delegated authentication: letting a prior-trusted device skip the
//! interactive challenge.
//!
//! The collaborator is optional. Delegated failures never fail the 3DS2
//! flow; they only drop the attempt back to the interactive path.

/// Failures of the delegated authentication collaborator.
#[derive(Debug, thiserror::Error)]
pub enum DelegatedAuthenticationError {
    /// The device could not produce a delegated authentication output.
    #[error("delegated authentication failed: {0}")]
    AuthenticationFailed(String),
    /// The device could not be registered for future delegated attempts.
    #[error("delegated registration failed: {0}")]
    RegistrationFailed(String),
}

/// An on-device authenticator that can vouch for the shopper without an
/// interactive challenge.
#[async_trait::async_trait]
pub trait DelegatedAuthenticator: Send + Sync {
    /// Authenticates against the SDK input carried on the fingerprint token
    /// and returns the SDK output for the backend.
    async fn authenticate(&self, sdk_input: &str) -> Result<String, DelegatedAuthenticationError>;

    /// Registers this device for future delegated attempts and returns the
    /// SDK output for the backend.
    async fn register(&self, sdk_input: &str) -> Result<String, DelegatedAuthenticationError>;
}
