//! The fingerprint and challenge phase handlers.
//!
//! One handler instance serves exactly one in-flight 3DS2 attempt: the
//! fingerprint phase selects and stores the authentication service, the
//! paired challenge phase consumes it. The active-service slot is written
//! only at the end of a successful fingerprint and cleared on every terminal
//! path of the challenge.

use error_stack::{report, ResultExt};
use threeds_models::{
    actions::{ThreeDs2ChallengeAction, ThreeDs2FingerprintAction},
    coder,
    fingerprint::Fingerprint,
    result::ThreeDsResult,
    tokens::{ChallengeToken, FingerprintToken},
};
use url::Url;

use crate::{
    delegated::DelegatedAuthenticator,
    engine::{EngineChallengeParameters, EngineServiceParameters},
    errors::{CustomResult, ServiceError, ThreeDs2Error},
    events::{Event, EventKind, EventSink},
    selection::{self, EngineSet, PlatformCapabilities},
    service::AuthenticationService,
};

use std::sync::Arc;

/// Classified outcome of a challenge.
///
/// An opaque-encodable engine failure is not a failure of the flow: the
/// backend still needs the authorisation token path closed out, so it is a
/// distinct successful outcome rather than an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChallengeOutcome {
    /// The cardholder completed the challenge; the engine reported a status.
    Authenticated {
        /// Engine-reported transaction status.
        transaction_status: String,
    },
    /// The engine failed, but the failure was opaque-encoded for the
    /// backend and the attempt counts as completed.
    CompletedWithEngineError {
        /// Opaque encoding of the engine error.
        sdk_error: String,
    },
}

/// Handles the 3-D Secure 2 fingerprint and challenge actions.
pub struct ThreeDs2ActionHandler {
    engines: EngineSet,
    capabilities: PlatformCapabilities,
    service_override: Option<Arc<dyn AuthenticationService>>,
    active_service: Option<Arc<dyn AuthenticationService>>,
    requestor_app_url: Option<Url>,
    delegated_authenticator: Option<Arc<dyn DelegatedAuthenticator>>,
    registration_pending: bool,
    analytics: Arc<dyn EventSink>,
}

impl std::fmt::Debug for ThreeDs2ActionHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreeDs2ActionHandler")
            .field("capabilities", &self.capabilities)
            .field("has_active_service", &self.active_service.is_some())
            .field("requestor_app_url", &self.requestor_app_url)
            .finish_non_exhaustive()
    }
}

impl ThreeDs2ActionHandler {
    /// A handler over the given engines, reporting to the given analytics
    /// sink.
    pub fn new(engines: EngineSet, analytics: Arc<dyn EventSink>) -> Self {
        Self {
            engines,
            capabilities: PlatformCapabilities::default(),
            service_override: None,
            active_service: None,
            requestor_app_url: None,
            delegated_authenticator: None,
            registration_pending: false,
            analytics,
        }
    }

    /// Overrides the platform capability check.
    pub fn with_capabilities(mut self, capabilities: PlatformCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Injects a service, bypassing the token-hint selection policy.
    pub fn with_service_override(mut self, service: Arc<dyn AuthenticationService>) -> Self {
        self.service_override = Some(service);
        self
    }

    /// Requestor-app callback URL for out-of-band challenges. Takes
    /// precedence over the URL carried on the challenge token.
    pub fn with_requestor_app_url(mut self, url: Url) -> Self {
        self.requestor_app_url = Some(url);
        self
    }

    /// Enables the delegated authentication flow.
    pub fn with_delegated_authenticator(
        mut self,
        authenticator: Arc<dyn DelegatedAuthenticator>,
    ) -> Self {
        self.delegated_authenticator = Some(authenticator);
        self
    }

    /// Handles the fingerprint action: decodes the token, selects the
    /// service variant, obtains authentication parameters from the engine
    /// and returns the transport-encoded fingerprint payload.
    ///
    /// An engine failure the service can opaque-encode is returned as a
    /// *successful* `sdkError` payload so the backend records a
    /// failed-but-completed attempt; any other failure is terminal.
    #[tracing::instrument(skip_all)]
    pub async fn handle_fingerprint(
        &mut self,
        action: &ThreeDs2FingerprintAction,
    ) -> CustomResult<String, ThreeDs2Error> {
        self.analytics.add(Event::new(EventKind::FingerprintSent));
        self.registration_pending = false;

        let token: FingerprintToken = coder::decode_base64(&action.fingerprint_token)
            .change_context(ThreeDs2Error::TokenDecoding)?;

        let service = match &self.service_override {
            Some(service) => Arc::clone(service),
            None => selection::select_service(&token, &self.capabilities, &self.engines),
        };

        let parameters = EngineServiceParameters {
            directory_server_identifier: token.directory_server_identifier.clone(),
            directory_server_public_key: token.directory_server_public_key.clone(),
            directory_server_root_certificates: token.directory_server_root_certificates.clone(),
            message_version: token.message_version.clone(),
        };

        let mut transaction_opened = false;
        let mut pending_registration = false;
        let fingerprint = match service.authentication_parameters(parameters).await {
            Ok(authentication_request_parameters) => {
                let delegated_authentication_sdk_output =
                    self.delegated_authentication(&token).await;
                pending_registration = self.delegated_authenticator.is_some()
                    && delegated_authentication_sdk_output.is_none();
                transaction_opened = true;
                Fingerprint::AuthenticationData {
                    authentication_request_parameters,
                    delegated_authentication_sdk_output,
                }
            }
            Err(engine_error) => match service.opaque_error_object(&engine_error) {
                Some(sdk_error) => {
                    tracing::warn!(
                        %engine_error,
                        "engine failure opaque-encoded into the fingerprint payload"
                    );
                    Fingerprint::SdkError { sdk_error }
                }
                None => return Err(report!(ThreeDs2Error::Authentication(engine_error))),
            },
        };

        // The slot is written only once the payload the backend pairs the
        // challenge with actually exists; an encoding failure must not leave
        // a live transaction behind.
        let encoded = coder::encode_base64(&fingerprint)
            .change_context(ThreeDs2Error::PayloadEncoding)?;
        if transaction_opened {
            self.active_service = Some(service);
            self.registration_pending = pending_registration;
        }
        self.analytics
            .add(Event::new(EventKind::FingerprintComplete));
        Ok(encoded)
    }

    /// Handles the challenge action: decodes the token, presents the
    /// challenge through the service stored by the paired fingerprint call,
    /// classifies the outcome and returns the final result.
    ///
    /// The stored transaction is reset on every terminal path, success,
    /// cancellation and failure alike.
    #[tracing::instrument(skip_all)]
    pub async fn handle_challenge(
        &mut self,
        action: &ThreeDs2ChallengeAction,
    ) -> CustomResult<ThreeDsResult, ThreeDs2Error> {
        let service = self
            .active_service
            .clone()
            .ok_or_else(|| report!(ThreeDs2Error::MissingTransaction))?;

        self.analytics.add(Event::new(EventKind::ChallengeSent));

        let token: ChallengeToken = match coder::decode_base64(&action.challenge_token) {
            Ok(token) => token,
            Err(error) => {
                self.finish(&service).await;
                return Err(error.change_context(ThreeDs2Error::TokenDecoding));
            }
        };

        let parameters = EngineChallengeParameters {
            server_transaction_identifier: token.server_transaction_identifier.clone(),
            acs_transaction_identifier: token.acs_transaction_identifier.clone(),
            acs_reference_number: token.acs_reference_number.clone(),
            acs_signed_content: token.acs_signed_content.clone(),
            requestor_app_url: self
                .requestor_app_url
                .clone()
                .or_else(|| token.requestor_app_url.clone()),
        };

        self.analytics.add(Event::new(EventKind::ChallengeDisplayed));

        let outcome = match service.perform_challenge(parameters).await {
            Ok(challenge_result) => ChallengeOutcome::Authenticated {
                transaction_status: challenge_result.transaction_status,
            },
            Err(ServiceError::TransactionNotInitialized) => {
                self.finish(&service).await;
                return Err(report!(ThreeDs2Error::MissingTransaction));
            }
            Err(ServiceError::Unknown(detail)) => {
                self.finish(&service).await;
                return Err(report!(ThreeDs2Error::Unknown(detail)));
            }
            Err(ServiceError::Challenge(engine_error)) => {
                if service.is_cancelled(&engine_error) {
                    tracing::debug!("challenge cancelled by the shopper");
                    self.finish(&service).await;
                    return Err(report!(ThreeDs2Error::ChallengeCancelled(engine_error)));
                }
                match service.opaque_error_object(&engine_error) {
                    Some(sdk_error) => {
                        tracing::warn!(
                            %engine_error,
                            "engine failure opaque-encoded into the challenge result"
                        );
                        ChallengeOutcome::CompletedWithEngineError { sdk_error }
                    }
                    None => {
                        self.finish(&service).await;
                        return Err(report!(ThreeDs2Error::Challenge(engine_error)));
                    }
                }
            }
        };

        let result = match outcome {
            ChallengeOutcome::Authenticated { transaction_status } => {
                let delegated_authentication_sdk_output =
                    self.delegated_registration(&token).await;
                ThreeDsResult::authenticated(
                    transaction_status,
                    action.authorisation_token.clone(),
                    delegated_authentication_sdk_output,
                )
            }
            ChallengeOutcome::CompletedWithEngineError { sdk_error } => {
                ThreeDsResult::from_sdk_error(sdk_error, action.authorisation_token.clone())
            }
        };

        self.finish(&service).await;
        Ok(result)
    }

    /// Attempts delegated authentication during fingerprinting. Never fails
    /// the flow.
    async fn delegated_authentication(&self, token: &FingerprintToken) -> Option<String> {
        let authenticator = self.delegated_authenticator.as_ref()?;
        let sdk_input = token.delegated_authentication_sdk_input.as_ref()?;
        match authenticator.authenticate(sdk_input).await {
            Ok(output) => Some(output),
            Err(error) => {
                tracing::debug!(%error, "delegated authentication unavailable, continuing interactively");
                None
            }
        }
    }

    /// Attempts delegated device registration after a successful challenge
    /// in a registration flow. Never fails the flow.
    async fn delegated_registration(&self, token: &ChallengeToken) -> Option<String> {
        if !self.registration_pending {
            return None;
        }
        let authenticator = self.delegated_authenticator.as_ref()?;
        let sdk_input = token.delegated_authentication_sdk_input.as_ref()?;
        match authenticator.register(sdk_input).await {
            Ok(output) => Some(output),
            Err(error) => {
                tracing::debug!(%error, "delegated registration failed, result submitted without it");
                None
            }
        }
    }

    /// Terminal-path cleanup for the challenge phase: resets the engine
    /// transaction, clears the active-service slot and reports completion.
    async fn finish(&mut self, service: &Arc<dyn AuthenticationService>) {
        service.reset_transaction().await;
        self.active_service = None;
        self.registration_pending = false;
        self.analytics.add(Event::new(EventKind::ChallengeComplete));
    }
}
