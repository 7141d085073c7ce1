//! Engine-variant selection.
//!
//! The variant is chosen exactly once per attempt, at fingerprint time, from
//! the token hint combined with a platform capability check. After selection
//! the handlers only ever talk to [`AuthenticationService`].

use threeds_models::tokens::{FingerprintToken, SdkVariant};

use crate::{
    engine::ThreeDs2Engine,
    service::{AuthenticationService, LegacyAuthenticationService, StandardAuthenticationService},
};

use std::sync::Arc;

/// Runtime capabilities of the embedding platform.
#[derive(Debug, Clone, Copy)]
pub struct PlatformCapabilities {
    /// Whether the current engine generation is available at runtime.
    pub supports_current_engine: bool,
}

impl Default for PlatformCapabilities {
    fn default() -> Self {
        Self {
            supports_current_engine: true,
        }
    }
}

/// The engine handles available to this SDK instance, one per generation.
#[derive(Clone)]
pub struct EngineSet {
    /// The current engine generation.
    pub current: Arc<dyn ThreeDs2Engine>,
    /// The legacy engine.
    pub legacy: Arc<dyn ThreeDs2Engine>,
}

impl std::fmt::Debug for EngineSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineSet").finish_non_exhaustive()
    }
}

/// Resolves the service variant for an attempt.
///
/// The legacy variant serves attempts the token pins to it, and attempts on
/// platforms where the current engine is unavailable. Everything else gets
/// the standard variant.
pub fn select_service(
    token: &FingerprintToken,
    capabilities: &PlatformCapabilities,
    engines: &EngineSet,
) -> Arc<dyn AuthenticationService> {
    let variant = if capabilities.supports_current_engine {
        token.sdk_variant()
    } else {
        SdkVariant::Legacy
    };

    tracing::debug!(?variant, "resolved authentication service variant");

    match variant {
        SdkVariant::Current => Arc::new(StandardAuthenticationService::new(Arc::clone(
            &engines.current,
        ))),
        SdkVariant::Legacy => Arc::new(LegacyAuthenticationService::new(Arc::clone(
            &engines.legacy,
        ))),
    }
}
