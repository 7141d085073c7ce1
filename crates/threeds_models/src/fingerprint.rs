//! The outbound fingerprint payload.

use serde::{Deserialize, Serialize};

/// Ephemeral public key produced by the engine for this transaction, in JWK
/// form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EphemeralPublicKey {
    /// Key type.
    #[serde(rename = "kty")]
    pub key_type: String,
    /// Curve identifier.
    #[serde(rename = "crv")]
    pub curve: String,
    /// X coordinate.
    pub x: String,
    /// Y coordinate.
    pub y: String,
}

/// Parameters produced by the engine when a transaction is initialized.
///
/// Opaque to this SDK apart from serialization; the backend needs them to
/// route the challenge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationRequestParameters {
    /// Encrypted device data collected by the engine.
    pub device_information: String,
    /// Identifier of the embedding application, as registered with the
    /// engine.
    pub sdk_application_id: String,
    /// Engine-assigned transaction identifier.
    pub sdk_transaction_id: String,
    /// Reference number of the engine implementation.
    pub sdk_reference_number: String,
    /// Ephemeral key for the challenge key agreement.
    pub sdk_ephemeral_public_key: EphemeralPublicKey,
    /// Protocol message version the transaction was initialized with.
    pub message_version: String,
}

/// The fingerprint result submitted to the backend.
///
/// A genuine sum type: an attempt either produced authentication request
/// parameters or it completed with an engine error that was opaque-encoded
/// for server-side reporting. The two never coexist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Fingerprint {
    /// The engine initialized a transaction and produced authentication
    /// request parameters.
    #[serde(rename_all = "camelCase")]
    AuthenticationData {
        /// Engine-produced parameters the backend routes the challenge with.
        authentication_request_parameters: AuthenticationRequestParameters,
        /// Output of a successful delegated authentication, when the device
        /// was eligible to skip the interactive challenge.
        #[serde(
            rename = "delegatedAuthenticationSDKOutput",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        delegated_authentication_sdk_output: Option<String>,
    },
    /// The engine failed in a way that must still reach the backend as a
    /// completed (if failed) attempt.
    SdkError {
        /// Opaque encoding of the engine-internal error.
        #[serde(rename = "threeDS2SDKError")]
        sdk_error: String,
    },
}
