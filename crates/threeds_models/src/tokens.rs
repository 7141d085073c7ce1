//! Inbound protocol tokens.
//!
//! Both tokens arrive from the backend as base64-of-JSON transport strings
//! (see [`crate::coder`]) and are decoded exactly once per phase. Wire key
//! names are pinned for backend compatibility and sometimes differ from the
//! in-memory field names.

use serde::{Deserialize, Serialize};
use url::Url;

/// Discriminator for which native 3DS2 engine should serve the attempt.
///
/// Carried on the fingerprint token as a hint; the actual selection also
/// takes the platform capability check into account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdkVariant {
    /// The current engine generation.
    #[default]
    Current,
    /// The legacy engine kept for directory servers that have not migrated.
    Legacy,
}

/// The token initiating the fingerprint phase.
///
/// Immutable; consumed once. Everything needed to initialize an engine
/// transaction against the directory server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FingerprintToken {
    /// Identifier of the directory server routing this attempt.
    #[serde(rename = "directoryServerId")]
    pub directory_server_identifier: String,
    /// Public key of the directory server, used by the engine to encrypt
    /// device data.
    pub directory_server_public_key: String,
    /// Root certificate bundle the engine validates the ACS signed content
    /// against.
    pub directory_server_root_certificates: String,
    /// Protocol message version negotiated by the backend.
    #[serde(rename = "threeDSMessageVersion")]
    pub message_version: String,
    /// Which engine variant the backend expects to serve this attempt.
    #[serde(rename = "sdkToUse", default, skip_serializing_if = "Option::is_none")]
    pub sdk_variant: Option<SdkVariant>,
    /// Input for the delegated authentication flow, when the device is
    /// eligible to skip the interactive challenge.
    #[serde(
        rename = "delegatedAuthenticationSDKInput",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub delegated_authentication_sdk_input: Option<String>,
}

impl FingerprintToken {
    /// The engine variant to use, falling back to the current engine when the
    /// backend sent no hint.
    pub fn sdk_variant(&self) -> SdkVariant {
        self.sdk_variant.unwrap_or_default()
    }
}

/// The token initiating the challenge phase.
///
/// Immutable; decoded once. Identifies the transaction on the ACS side and
/// carries the signed content the engine verifies before presenting the
/// challenge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeToken {
    /// Transaction identifier assigned by the 3DS server.
    #[serde(rename = "serverTransactionId")]
    pub server_transaction_identifier: String,
    /// Transaction identifier assigned by the ACS.
    #[serde(rename = "acsTransactionId")]
    pub acs_transaction_identifier: String,
    /// Reference number of the ACS.
    pub acs_reference_number: String,
    /// Signed content produced by the ACS.
    pub acs_signed_content: String,
    /// Callback URL for out-of-band challenges returning to the requestor
    /// app. A handler-level override takes precedence over this value.
    #[serde(
        rename = "threeDSRequestorAppURL",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub requestor_app_url: Option<Url>,
    /// Input for delegated-authentication device registration.
    #[serde(
        rename = "delegatedAuthenticationSDKInput",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub delegated_authentication_sdk_input: Option<String>,
}
