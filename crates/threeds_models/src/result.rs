//! The final authentication result submitted to the backend.

use serde::{Deserialize, Serialize};

/// Transaction status reported when an engine-level error was folded into a
/// completed attempt.
pub const TRANSACTION_STATUS_UNKNOWN: &str = "U";

/// Terminal outcome of a 3-D Secure 2 attempt.
///
/// Produced exactly once per challenge; the owning transaction is discarded
/// afterwards. Fields are private and decoding runs through a checked
/// conversion, so the sentinel invariant holds on every path: a populated
/// `threeDS2SDKError` always comes with transaction status `"U"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "ThreeDsResultWire")]
pub struct ThreeDsResult {
    trans_status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    authorisation_token: Option<String>,
    #[serde(
        rename = "threeDS2SDKError",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    sdk_error: Option<String>,
    #[serde(
        rename = "delegatedAuthenticationSDKOutput",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    delegated_authentication_sdk_output: Option<String>,
}

impl ThreeDsResult {
    /// A completed authentication carrying the engine-reported status.
    ///
    /// The authorisation token is passed through from the challenge action
    /// unchanged.
    pub fn authenticated(
        trans_status: impl Into<String>,
        authorisation_token: Option<String>,
        delegated_authentication_sdk_output: Option<String>,
    ) -> Self {
        Self {
            trans_status: trans_status.into(),
            authorisation_token,
            sdk_error: None,
            delegated_authentication_sdk_output,
        }
    }

    /// A completed-with-error attempt: the engine failed, the failure was
    /// opaque-encoded, and the transaction status is forced to the `"U"`
    /// sentinel.
    pub fn from_sdk_error(sdk_error: impl Into<String>, authorisation_token: Option<String>) -> Self {
        Self {
            trans_status: TRANSACTION_STATUS_UNKNOWN.to_string(),
            authorisation_token,
            sdk_error: Some(sdk_error.into()),
            delegated_authentication_sdk_output: None,
        }
    }

    /// The transaction status reported by the engine, or `"U"` for a
    /// completed-with-error attempt.
    pub fn trans_status(&self) -> &str {
        &self.trans_status
    }

    /// The authorisation token carried over from the challenge action.
    pub fn authorisation_token(&self) -> Option<&str> {
        self.authorisation_token.as_deref()
    }

    /// The opaque engine error, for completed-with-error attempts.
    pub fn sdk_error(&self) -> Option<&str> {
        self.sdk_error.as_deref()
    }

    /// Output of a delegated-authentication registration, when one ran.
    pub fn delegated_authentication_sdk_output(&self) -> Option<&str> {
        self.delegated_authentication_sdk_output.as_deref()
    }
}

/// Raw wire shape of [`ThreeDsResult`], converted through the sentinel
/// check before it becomes a value.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThreeDsResultWire {
    trans_status: String,
    #[serde(default)]
    authorisation_token: Option<String>,
    #[serde(rename = "threeDS2SDKError", default)]
    sdk_error: Option<String>,
    #[serde(rename = "delegatedAuthenticationSDKOutput", default)]
    delegated_authentication_sdk_output: Option<String>,
}

/// A decoded result document paired an SDK error with a transaction status
/// other than the `"U"` sentinel.
#[derive(Debug, thiserror::Error)]
#[error("a populated threeDS2SDKError requires transaction status \"U\", got {status:?}")]
pub struct SentinelViolation {
    status: String,
}

impl TryFrom<ThreeDsResultWire> for ThreeDsResult {
    type Error = SentinelViolation;

    fn try_from(wire: ThreeDsResultWire) -> Result<Self, Self::Error> {
        if wire.sdk_error.is_some() && wire.trans_status != TRANSACTION_STATUS_UNKNOWN {
            return Err(SentinelViolation {
                status: wire.trans_status,
            });
        }
        Ok(Self {
            trans_status: wire.trans_status,
            authorisation_token: wire.authorisation_token,
            sdk_error: wire.sdk_error,
            delegated_authentication_sdk_output: wire.delegated_authentication_sdk_output,
        })
    }
}
