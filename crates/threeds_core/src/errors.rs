//! Error taxonomy surfaced to callers.
//!
//! No retries happen anywhere in this crate; every failure is terminal for
//! the action that produced it. A caller that wants to retry must start a
//! brand-new fingerprint/challenge cycle.

pub use threeds_models::CustomResult;

use crate::engine::EngineError;

/// Failures of the authentication service capability.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// A challenge was requested while no engine transaction is held.
    #[error("no engine transaction has been initialized")]
    TransactionNotInitialized,
    /// The engine behaved outside its contract.
    #[error("unexpected engine behaviour: {0}")]
    Unknown(String),
    /// The engine reported a challenge failure.
    #[error("the engine reported a challenge failure")]
    Challenge(#[source] EngineError),
}

/// Failures surfaced by the phase handlers.
#[derive(Debug, thiserror::Error)]
pub enum ThreeDs2Error {
    /// A challenge action was handled while no transaction was active. This
    /// is caller misuse: the challenge was handled before a fingerprint, or
    /// after the previous challenge already completed.
    #[error("no active 3-D Secure 2 transaction, a fingerprint must complete first")]
    MissingTransaction,
    /// The engine behaved outside its contract.
    #[error("unexpected engine behaviour: {0}")]
    Unknown(String),
    /// Transaction initialization failed with an engine error that could not
    /// be opaque-encoded for the backend.
    #[error("the engine could not produce authentication parameters")]
    Authentication(#[source] EngineError),
    /// The shopper cancelled the challenge. Distinguished from generic
    /// failure so the caller can skip its error surface.
    #[error("the challenge was cancelled by the shopper")]
    ChallengeCancelled(#[source] EngineError),
    /// The challenge failed with an engine error that is neither a
    /// cancellation nor opaque-encodable.
    #[error("the engine reported a challenge failure")]
    Challenge(#[source] EngineError),
    /// An inbound token could not be decoded.
    #[error("the action token could not be decoded")]
    TokenDecoding,
    /// An outbound payload could not be encoded.
    #[error("the result payload could not be encoded")]
    PayloadEncoding,
}

impl ThreeDs2Error {
    /// Whether this failure represents a shopper-initiated cancellation.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::ChallengeCancelled(_))
    }
}
