//! The authentication service capability and its two engine-specific
//! variants.
//!
//! A service wraps one native engine, holds the transaction created during
//! fingerprinting for the paired challenge, and knows how its engine reports
//! cancellation and which of its errors may be opaque-encoded for the
//! backend.

use threeds_models::{coder, fingerprint::AuthenticationRequestParameters};
use tokio::sync::Mutex;

use crate::{
    engine::{
        EngineChallengeParameters, EngineChallengeResult, EngineError, EngineServiceParameters,
        ThreeDs2Engine,
    },
    errors::ServiceError,
};

use std::sync::Arc;

/// Cancellation signature of the current engine generation.
const CURRENT_ENGINE_CHALLENGE_DOMAIN: &str = "com.threeds2.engine.challenge";
const CURRENT_ENGINE_CANCELLATION_CODE: i64 = 1001;

/// Cancellation signature of the legacy engine.
const LEGACY_ENGINE_DOMAIN: &str = "com.threeds2.legacy";
const LEGACY_ENGINE_CANCELLATION_CODE: i64 = 5;

/// Error domains the current engine owns; errors outside them cannot be
/// opaque-encoded by the standard service.
const CURRENT_ENGINE_DOMAINS: &[&str] = &[
    CURRENT_ENGINE_CHALLENGE_DOMAIN,
    "com.threeds2.engine.service",
];

/// A capability interface over one native engine, serving exactly one
/// in-flight attempt at a time.
#[async_trait::async_trait]
pub trait AuthenticationService: Send + Sync {
    /// Initializes an engine transaction and returns its authentication
    /// request parameters. On success the transaction is stored for the
    /// paired challenge call. Failures are the engine's native error,
    /// untranslated.
    async fn authentication_parameters(
        &self,
        parameters: EngineServiceParameters,
    ) -> Result<AuthenticationRequestParameters, EngineError>;

    /// Presents the challenge for the stored transaction.
    async fn perform_challenge(
        &self,
        parameters: EngineChallengeParameters,
    ) -> Result<EngineChallengeResult, ServiceError>;

    /// Whether the engine error represents a shopper-initiated cancellation.
    fn is_cancelled(&self, error: &EngineError) -> bool;

    /// Serializes an engine-internal error into a transport-safe opaque
    /// string for backend reporting, or `None` when the error did not
    /// originate in this service's engine and cannot be represented.
    fn opaque_error_object(&self, error: &EngineError) -> Option<String>;

    /// Releases the held transaction. Idempotent; called on every terminal
    /// path of the challenge phase.
    async fn reset_transaction(&self);
}

/// Shared transaction slot plumbing for both variants.
///
/// The mutex is what preserves the single-writer invariant on a
/// multi-threaded runtime.
#[derive(Debug)]
struct TransactionSlot {
    inner: Mutex<Option<crate::engine::EngineTransaction>>,
}

impl TransactionSlot {
    fn new() -> Self {
        Self {
            inner: Mutex::new(None),
        }
    }

    async fn store(&self, transaction: crate::engine::EngineTransaction) {
        *self.inner.lock().await = Some(transaction);
    }

    async fn clear(&self) {
        *self.inner.lock().await = None;
    }
}

/// Service variant wrapping the current engine generation.
pub struct StandardAuthenticationService {
    engine: Arc<dyn ThreeDs2Engine>,
    transaction: TransactionSlot,
}

impl std::fmt::Debug for StandardAuthenticationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StandardAuthenticationService")
            .field("transaction", &self.transaction)
            .finish_non_exhaustive()
    }
}

impl StandardAuthenticationService {
    /// Wraps the given current-generation engine.
    pub fn new(engine: Arc<dyn ThreeDs2Engine>) -> Self {
        Self {
            engine,
            transaction: TransactionSlot::new(),
        }
    }
}

#[async_trait::async_trait]
impl AuthenticationService for StandardAuthenticationService {
    async fn authentication_parameters(
        &self,
        parameters: EngineServiceParameters,
    ) -> Result<AuthenticationRequestParameters, EngineError> {
        let transaction = self.engine.create_transaction(parameters).await?;
        let authentication_parameters = transaction.authentication_request_parameters.clone();
        self.transaction.store(transaction).await;
        Ok(authentication_parameters)
    }

    async fn perform_challenge(
        &self,
        parameters: EngineChallengeParameters,
    ) -> Result<EngineChallengeResult, ServiceError> {
        let guard = self.transaction.inner.lock().await;
        let transaction = guard
            .as_ref()
            .ok_or(ServiceError::TransactionNotInitialized)?;
        self.engine
            .perform_challenge(transaction, parameters)
            .await
            .map_err(ServiceError::Challenge)
    }

    fn is_cancelled(&self, error: &EngineError) -> bool {
        error.domain == CURRENT_ENGINE_CHALLENGE_DOMAIN
            && error.code == CURRENT_ENGINE_CANCELLATION_CODE
    }

    fn opaque_error_object(&self, error: &EngineError) -> Option<String> {
        if !CURRENT_ENGINE_DOMAINS.contains(&error.domain.as_str()) {
            return None;
        }
        coder::encode_base64(error).ok()
    }

    async fn reset_transaction(&self) {
        self.transaction.clear().await;
    }
}

/// Service variant wrapping the legacy engine, kept for directory servers
/// that have not migrated to the current generation.
pub struct LegacyAuthenticationService {
    engine: Arc<dyn ThreeDs2Engine>,
    transaction: TransactionSlot,
}

impl std::fmt::Debug for LegacyAuthenticationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LegacyAuthenticationService")
            .field("transaction", &self.transaction)
            .finish_non_exhaustive()
    }
}

impl LegacyAuthenticationService {
    /// Wraps the given legacy engine.
    pub fn new(engine: Arc<dyn ThreeDs2Engine>) -> Self {
        Self {
            engine,
            transaction: TransactionSlot::new(),
        }
    }
}

#[async_trait::async_trait]
impl AuthenticationService for LegacyAuthenticationService {
    async fn authentication_parameters(
        &self,
        parameters: EngineServiceParameters,
    ) -> Result<AuthenticationRequestParameters, EngineError> {
        let transaction = self.engine.create_transaction(parameters).await?;
        let authentication_parameters = transaction.authentication_request_parameters.clone();
        self.transaction.store(transaction).await;
        Ok(authentication_parameters)
    }

    async fn perform_challenge(
        &self,
        parameters: EngineChallengeParameters,
    ) -> Result<EngineChallengeResult, ServiceError> {
        let guard = self.transaction.inner.lock().await;
        let transaction = guard
            .as_ref()
            .ok_or(ServiceError::TransactionNotInitialized)?;
        self.engine
            .perform_challenge(transaction, parameters)
            .await
            .map_err(ServiceError::Challenge)
    }

    fn is_cancelled(&self, error: &EngineError) -> bool {
        error.domain == LEGACY_ENGINE_DOMAIN && error.code == LEGACY_ENGINE_CANCELLATION_CODE
    }

    fn opaque_error_object(&self, error: &EngineError) -> Option<String> {
        if error.domain != LEGACY_ENGINE_DOMAIN {
            return None;
        }
        coder::encode_base64(error).ok()
    }

    async fn reset_transaction(&self) {
        self.transaction.clear().await;
    }
}
