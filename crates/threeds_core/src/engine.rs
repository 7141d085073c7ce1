//! The seam where a native 3DS2 cryptographic engine binds.
//!
//! Concrete implementations wrap a vendor SDK (or a test double). The engine
//! owns transaction initialization and challenge presentation; everything
//! above this trait is engine-agnostic.

use serde::Serialize;
use threeds_models::fingerprint::AuthenticationRequestParameters;
use url::Url;

/// Parameters for initializing an engine transaction, lifted from the
/// fingerprint token.
#[derive(Debug, Clone)]
pub struct EngineServiceParameters {
    /// Identifier of the directory server routing this attempt.
    pub directory_server_identifier: String,
    /// Public key of the directory server.
    pub directory_server_public_key: String,
    /// Root certificate bundle for ACS content validation.
    pub directory_server_root_certificates: String,
    /// Protocol message version to initialize the transaction with.
    pub message_version: String,
}

/// Parameters for presenting a challenge, lifted from the challenge token.
#[derive(Debug, Clone)]
pub struct EngineChallengeParameters {
    /// Transaction identifier assigned by the 3DS server.
    pub server_transaction_identifier: String,
    /// Transaction identifier assigned by the ACS.
    pub acs_transaction_identifier: String,
    /// Reference number of the ACS.
    pub acs_reference_number: String,
    /// Signed content produced by the ACS.
    pub acs_signed_content: String,
    /// Callback URL for out-of-band challenges.
    pub requestor_app_url: Option<Url>,
}

/// A live engine transaction, created during fingerprinting and consumed by
/// the paired challenge.
#[derive(Debug, Clone)]
pub struct EngineTransaction {
    /// Engine-assigned transaction identifier.
    pub transaction_identifier: String,
    /// Parameters produced at initialization, serialized into the
    /// fingerprint payload.
    pub authentication_request_parameters: AuthenticationRequestParameters,
}

/// Outcome of a completed challenge.
#[derive(Debug, Clone)]
pub struct EngineChallengeResult {
    /// Transaction status reported by the engine (`"Y"`, `"N"`, ...).
    pub transaction_status: String,
}

/// A native-style engine error.
///
/// Mirrors how platform SDKs report failures: an error domain, a numeric
/// code within it, and a human-readable message. Domain/code matching drives
/// cancellation classification and opaque encoding in the service layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("engine error {code} in {domain}: {message}")]
pub struct EngineError {
    /// Error domain, identifying the reporting engine subsystem.
    pub domain: String,
    /// Numeric code within the domain.
    pub code: i64,
    /// Human-readable description.
    pub message: String,
}

/// A native 3DS2 cryptographic engine.
#[async_trait::async_trait]
pub trait ThreeDs2Engine: Send + Sync {
    /// Initializes a transaction from directory-server parameters and
    /// produces the authentication request parameters for it.
    async fn create_transaction(
        &self,
        parameters: EngineServiceParameters,
    ) -> Result<EngineTransaction, EngineError>;

    /// Presents the challenge for a previously created transaction and
    /// reports its outcome. May suspend for an externally-bounded duration
    /// while the cardholder completes the challenge.
    async fn perform_challenge(
        &self,
        transaction: &EngineTransaction,
        parameters: EngineChallengeParameters,
    ) -> Result<EngineChallengeResult, EngineError>;
}
