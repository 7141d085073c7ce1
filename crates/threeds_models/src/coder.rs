//! The base64-of-JSON transport codec.
//!
//! Every token and payload crossing the backend boundary travels as a base64
//! encoding of a JSON document. Both transforms are pure; all failure detail
//! (offending field, unrecognized discriminator value) is attached to the
//! returned report.

use base64::Engine;
use error_stack::{report, ResultExt};
use serde::{de::DeserializeOwned, Serialize};

use crate::CustomResult;

/// Errors raised while decoding a transport string into a token or payload.
#[derive(Debug, thiserror::Error)]
pub enum DecodingError {
    /// The transport string is not valid base64.
    #[error("transport string is not valid base64")]
    Base64,
    /// The base64 content is not valid UTF-8.
    #[error("transport payload is not valid UTF-8")]
    Utf8,
    /// The JSON document does not match the expected token shape.
    #[error("transport payload is not a valid JSON document for the expected type")]
    Json,
}

/// Errors raised while encoding a payload into a transport string.
#[derive(Debug, thiserror::Error)]
pub enum EncodingError {
    /// The payload could not be serialized to JSON.
    #[error("payload could not be serialized to JSON")]
    Json,
}

/// Decodes a base64 transport string into a token or payload.
pub fn decode_base64<T: DeserializeOwned>(transport: &str) -> CustomResult<T, DecodingError> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(transport)
        .map_err(|error| report!(DecodingError::Base64).attach_printable(error.to_string()))?;
    let document = String::from_utf8(bytes)
        .map_err(|error| report!(DecodingError::Utf8).attach_printable(error.to_string()))?;
    serde_json::from_str(&document)
        .map_err(|error| report!(DecodingError::Json).attach_printable(error.to_string()))
}

/// Encodes a payload into a base64 transport string.
pub fn encode_base64<T: Serialize>(payload: &T) -> CustomResult<String, EncodingError> {
    let document = serde_json::to_string(payload).change_context(EncodingError::Json)?;
    Ok(base64::engine::general_purpose::STANDARD.encode(document))
}
