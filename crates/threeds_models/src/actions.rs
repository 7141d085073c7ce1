//! Actions received from the backend in response to a payment submission.

use serde::{Deserialize, Serialize};

/// Instructs the SDK to run the fingerprint phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreeDs2FingerprintAction {
    /// The transport-encoded fingerprint token.
    pub fingerprint_token: String,
    /// Token authorising the eventual result submission; passed through to
    /// the final result untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorisation_token: Option<String>,
    /// Opaque payment session data echoed back to the backend by the caller.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_data: Option<String>,
}

/// Instructs the SDK to run the challenge phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreeDs2ChallengeAction {
    /// The transport-encoded challenge token.
    pub challenge_token: String,
    /// Token authorising the eventual result submission; passed through to
    /// the final result untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorisation_token: Option<String>,
}
