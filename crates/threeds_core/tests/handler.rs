#![allow(clippy::unwrap_used)]

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use threeds_core::{
    delegated::{DelegatedAuthenticationError, DelegatedAuthenticator},
    engine::{
        EngineChallengeParameters, EngineChallengeResult, EngineError, EngineServiceParameters,
        EngineTransaction, ThreeDs2Engine,
    },
    errors::ServiceError,
    events::{Event, EventKind, EventSink},
    handler::ThreeDs2ActionHandler,
    selection::{EngineSet, PlatformCapabilities},
    service::AuthenticationService,
    ThreeDs2Error,
};
use threeds_models::{
    actions::{ThreeDs2ChallengeAction, ThreeDs2FingerprintAction},
    coder,
    fingerprint::{AuthenticationRequestParameters, EphemeralPublicKey, Fingerprint},
    tokens::{ChallengeToken, FingerprintToken, SdkVariant},
};

fn authentication_parameters() -> AuthenticationRequestParameters {
    AuthenticationRequestParameters {
        device_information: "device-data".to_string(),
        sdk_application_id: "app-id".to_string(),
        sdk_transaction_id: "T1".to_string(),
        sdk_reference_number: "ref".to_string(),
        sdk_ephemeral_public_key: EphemeralPublicKey {
            key_type: "EC".to_string(),
            curve: "P-256".to_string(),
            x: "x-coordinate".to_string(),
            y: "y-coordinate".to_string(),
        },
        message_version: "2.2.0".to_string(),
    }
}

/// Engine double with scriptable transaction creation and challenge
/// outcomes.
#[derive(Default)]
struct MockEngine {
    create_error: Mutex<Option<EngineError>>,
    challenge_response: Mutex<Option<Result<EngineChallengeResult, EngineError>>>,
    create_calls: AtomicUsize,
    last_requestor_app_url: Mutex<Option<String>>,
}

impl MockEngine {
    fn failing_creation(error: EngineError) -> Self {
        Self {
            create_error: Mutex::new(Some(error)),
            ..Self::default()
        }
    }

    fn with_challenge_error(error: EngineError) -> Self {
        Self {
            challenge_response: Mutex::new(Some(Err(error))),
            ..Self::default()
        }
    }
}

#[async_trait::async_trait]
impl ThreeDs2Engine for MockEngine {
    async fn create_transaction(
        &self,
        parameters: EngineServiceParameters,
    ) -> Result<EngineTransaction, EngineError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.create_error.lock().unwrap().clone() {
            return Err(error);
        }
        Ok(EngineTransaction {
            transaction_identifier: "engine-tx".to_string(),
            authentication_request_parameters: AuthenticationRequestParameters {
                message_version: parameters.message_version,
                ..authentication_parameters()
            },
        })
    }

    async fn perform_challenge(
        &self,
        _transaction: &EngineTransaction,
        parameters: EngineChallengeParameters,
    ) -> Result<EngineChallengeResult, EngineError> {
        *self.last_requestor_app_url.lock().unwrap() = parameters
            .requestor_app_url
            .map(|url| url.as_str().to_string());
        self.challenge_response
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| {
                Ok(EngineChallengeResult {
                    transaction_status: "Y".to_string(),
                })
            })
    }
}

#[derive(Default)]
struct RecordingSink {
    events: Mutex<Vec<EventKind>>,
}

impl EventSink for RecordingSink {
    fn add(&self, event: Event) {
        self.events.lock().unwrap().push(event.kind);
    }
}

struct DelegatedAuthenticatorStub {
    authenticate_response: Result<String, DelegatedAuthenticationError>,
}

#[async_trait::async_trait]
impl DelegatedAuthenticator for DelegatedAuthenticatorStub {
    async fn authenticate(&self, _sdk_input: &str) -> Result<String, DelegatedAuthenticationError> {
        match &self.authenticate_response {
            Ok(output) => Ok(output.clone()),
            Err(_) => Err(DelegatedAuthenticationError::AuthenticationFailed(
                "no credential".to_string(),
            )),
        }
    }

    async fn register(&self, sdk_input: &str) -> Result<String, DelegatedAuthenticationError> {
        Ok(format!("registered:{sdk_input}"))
    }
}

fn fingerprint_token(sdk_variant: Option<SdkVariant>) -> FingerprintToken {
    FingerprintToken {
        directory_server_identifier: "D1".to_string(),
        directory_server_public_key: "key".to_string(),
        directory_server_root_certificates: "certs".to_string(),
        message_version: "2.2.0".to_string(),
        sdk_variant,
        delegated_authentication_sdk_input: None,
    }
}

fn fingerprint_action(token: &FingerprintToken) -> ThreeDs2FingerprintAction {
    ThreeDs2FingerprintAction {
        fingerprint_token: coder::encode_base64(token).unwrap(),
        authorisation_token: Some("auth-token".to_string()),
        payment_data: None,
    }
}

fn challenge_token() -> ChallengeToken {
    ChallengeToken {
        server_transaction_identifier: "server-tx".to_string(),
        acs_transaction_identifier: "acs-tx".to_string(),
        acs_reference_number: "acs-ref".to_string(),
        acs_signed_content: "signed".to_string(),
        requestor_app_url: None,
        delegated_authentication_sdk_input: None,
    }
}

fn challenge_action(token: &ChallengeToken) -> ThreeDs2ChallengeAction {
    ThreeDs2ChallengeAction {
        challenge_token: coder::encode_base64(token).unwrap(),
        authorisation_token: Some("auth-token".to_string()),
    }
}

fn engine_set(current: Arc<MockEngine>, legacy: Arc<MockEngine>) -> EngineSet {
    EngineSet { current, legacy }
}

fn handler(engines: EngineSet) -> ThreeDs2ActionHandler {
    ThreeDs2ActionHandler::new(engines, Arc::new(RecordingSink::default()))
}

fn current_engine_error(code: i64) -> EngineError {
    EngineError {
        domain: "com.threeds2.engine.challenge".to_string(),
        code,
        message: "engine failure".to_string(),
    }
}

#[tokio::test]
async fn challenge_before_fingerprint_yields_missing_transaction() {
    let mut sut = handler(engine_set(Arc::default(), Arc::default()));

    let error = sut
        .handle_challenge(&challenge_action(&challenge_token()))
        .await
        .unwrap_err();
    assert!(matches!(
        error.current_context(),
        ThreeDs2Error::MissingTransaction
    ));
}

#[tokio::test]
async fn legacy_hint_selects_the_legacy_engine() {
    let current = Arc::new(MockEngine::default());
    let legacy = Arc::new(MockEngine::default());
    let mut sut = handler(engine_set(Arc::clone(&current), Arc::clone(&legacy)));

    let token = fingerprint_token(Some(SdkVariant::Legacy));
    sut.handle_fingerprint(&fingerprint_action(&token))
        .await
        .unwrap();

    assert_eq!(legacy.create_calls.load(Ordering::SeqCst), 1);
    assert_eq!(current.create_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn missing_current_engine_capability_forces_the_legacy_variant() {
    let current = Arc::new(MockEngine::default());
    let legacy = Arc::new(MockEngine::default());
    let mut sut = handler(engine_set(Arc::clone(&current), Arc::clone(&legacy)))
        .with_capabilities(PlatformCapabilities {
            supports_current_engine: false,
        });

    let token = fingerprint_token(None);
    sut.handle_fingerprint(&fingerprint_action(&token))
        .await
        .unwrap();

    assert_eq!(legacy.create_calls.load(Ordering::SeqCst), 1);
    assert_eq!(current.create_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn fingerprint_success_round_trips_the_engine_parameters() {
    let mut sut = handler(engine_set(Arc::default(), Arc::default()));

    let encoded = sut
        .handle_fingerprint(&fingerprint_action(&fingerprint_token(None)))
        .await
        .unwrap();

    let fingerprint: Fingerprint = coder::decode_base64(&encoded).unwrap();
    match fingerprint {
        Fingerprint::AuthenticationData {
            authentication_request_parameters,
            delegated_authentication_sdk_output,
        } => {
            assert_eq!(authentication_request_parameters.sdk_transaction_id, "T1");
            assert_eq!(authentication_request_parameters.message_version, "2.2.0");
            assert!(delegated_authentication_sdk_output.is_none());
        }
        Fingerprint::SdkError { .. } => panic!("expected authentication data"),
    }
}

#[tokio::test]
async fn invalid_fingerprint_token_fails_with_a_decode_error() {
    let mut sut = handler(engine_set(Arc::default(), Arc::default()));

    let action = ThreeDs2FingerprintAction {
        fingerprint_token: "not-a-token".to_string(),
        authorisation_token: None,
        payment_data: None,
    };

    let error = sut.handle_fingerprint(&action).await.unwrap_err();
    assert!(matches!(
        error.current_context(),
        ThreeDs2Error::TokenDecoding
    ));
}

#[tokio::test]
async fn opaque_encodable_creation_failure_becomes_an_sdk_error_payload() {
    let current = Arc::new(MockEngine::failing_creation(EngineError {
        domain: "com.threeds2.engine.service".to_string(),
        code: 42,
        message: "certificate bundle rejected".to_string(),
    }));
    let mut sut = handler(engine_set(current, Arc::default()));

    let encoded = sut
        .handle_fingerprint(&fingerprint_action(&fingerprint_token(None)))
        .await
        .unwrap();

    let fingerprint: Fingerprint = coder::decode_base64(&encoded).unwrap();
    assert!(matches!(fingerprint, Fingerprint::SdkError { .. }));

    // No transaction was opened, so a follow-up challenge is caller misuse.
    let error = sut
        .handle_challenge(&challenge_action(&challenge_token()))
        .await
        .unwrap_err();
    assert!(matches!(
        error.current_context(),
        ThreeDs2Error::MissingTransaction
    ));
}

#[tokio::test]
async fn transaction_is_stored_only_alongside_an_authentication_payload() {
    // A stored transaction must always be paired with an authentication-data
    // payload the backend received; an sdkError payload opens nothing.
    let mut sut = handler(engine_set(Arc::default(), Arc::default()));
    let encoded = sut
        .handle_fingerprint(&fingerprint_action(&fingerprint_token(None)))
        .await
        .unwrap();
    let fingerprint: Fingerprint = coder::decode_base64(&encoded).unwrap();
    assert!(matches!(fingerprint, Fingerprint::AuthenticationData { .. }));
    sut.handle_challenge(&challenge_action(&challenge_token()))
        .await
        .unwrap();

    let failing = Arc::new(MockEngine::failing_creation(current_engine_error(7)));
    let mut sut = handler(engine_set(failing, Arc::default()));
    let encoded = sut
        .handle_fingerprint(&fingerprint_action(&fingerprint_token(None)))
        .await
        .unwrap();
    let fingerprint: Fingerprint = coder::decode_base64(&encoded).unwrap();
    assert!(matches!(fingerprint, Fingerprint::SdkError { .. }));
    let error = sut
        .handle_challenge(&challenge_action(&challenge_token()))
        .await
        .unwrap_err();
    assert!(matches!(
        error.current_context(),
        ThreeDs2Error::MissingTransaction
    ));
}

#[tokio::test]
async fn foreign_creation_failure_propagates_the_native_error() {
    let current = Arc::new(MockEngine::failing_creation(EngineError {
        domain: "com.platform.network".to_string(),
        code: -1009,
        message: "offline".to_string(),
    }));
    let mut sut = handler(engine_set(current, Arc::default()));

    let error = sut
        .handle_fingerprint(&fingerprint_action(&fingerprint_token(None)))
        .await
        .unwrap_err();
    assert!(matches!(
        error.current_context(),
        ThreeDs2Error::Authentication(native) if native.domain == "com.platform.network"
    ));
}

#[tokio::test]
async fn challenge_success_passes_the_authorisation_token_through() {
    let mut sut = handler(engine_set(Arc::default(), Arc::default()));
    sut.handle_fingerprint(&fingerprint_action(&fingerprint_token(None)))
        .await
        .unwrap();

    let result = sut
        .handle_challenge(&challenge_action(&challenge_token()))
        .await
        .unwrap();

    assert_eq!(result.trans_status(), "Y");
    assert_eq!(result.authorisation_token(), Some("auth-token"));
    assert!(result.sdk_error().is_none());
}

#[tokio::test]
async fn cancelled_challenge_fails_and_resets_the_transaction() {
    let current = Arc::new(MockEngine::with_challenge_error(current_engine_error(1001)));
    let mut sut = handler(engine_set(current, Arc::default()));
    sut.handle_fingerprint(&fingerprint_action(&fingerprint_token(None)))
        .await
        .unwrap();

    let error = sut
        .handle_challenge(&challenge_action(&challenge_token()))
        .await
        .unwrap_err();
    assert!(error.current_context().is_cancellation());

    let error = sut
        .handle_challenge(&challenge_action(&challenge_token()))
        .await
        .unwrap_err();
    assert!(matches!(
        error.current_context(),
        ThreeDs2Error::MissingTransaction
    ));
}

#[tokio::test]
async fn opaque_encodable_challenge_failure_completes_with_unknown_status() {
    let current = Arc::new(MockEngine::with_challenge_error(current_engine_error(7)));
    let mut sut = handler(engine_set(current, Arc::default()));
    sut.handle_fingerprint(&fingerprint_action(&fingerprint_token(None)))
        .await
        .unwrap();

    let result = sut
        .handle_challenge(&challenge_action(&challenge_token()))
        .await
        .unwrap();

    assert_eq!(result.trans_status(), "U");
    assert_eq!(result.authorisation_token(), Some("auth-token"));
    let opaque = result.sdk_error().unwrap();
    let native: serde_json::Value = coder::decode_base64(opaque).unwrap();
    assert_eq!(native["domain"], "com.threeds2.engine.challenge");
    assert_eq!(native["code"], 7);
}

#[tokio::test]
async fn unencodable_challenge_failure_propagates_the_native_error() {
    let current = Arc::new(MockEngine::with_challenge_error(EngineError {
        domain: "com.platform.network".to_string(),
        code: -1001,
        message: "timed out".to_string(),
    }));
    let mut sut = handler(engine_set(current, Arc::default()));
    sut.handle_fingerprint(&fingerprint_action(&fingerprint_token(None)))
        .await
        .unwrap();

    let error = sut
        .handle_challenge(&challenge_action(&challenge_token()))
        .await
        .unwrap_err();
    assert!(matches!(
        error.current_context(),
        ThreeDs2Error::Challenge(native) if native.code == -1001
    ));
}

#[tokio::test]
async fn handler_requestor_app_url_overrides_the_token_url() {
    let current = Arc::new(MockEngine::default());
    let mut sut = handler(engine_set(Arc::clone(&current), Arc::default()))
        .with_requestor_app_url("https://merchant.example/override".parse().unwrap());
    sut.handle_fingerprint(&fingerprint_action(&fingerprint_token(None)))
        .await
        .unwrap();

    let mut token = challenge_token();
    token.requestor_app_url = Some("https://merchant.example/from-token".parse().unwrap());
    sut.handle_challenge(&challenge_action(&token))
        .await
        .unwrap();

    assert_eq!(
        current.last_requestor_app_url.lock().unwrap().as_deref(),
        Some("https://merchant.example/override")
    );
}

#[tokio::test]
async fn invalid_challenge_token_fails_and_still_resets() {
    let mut sut = handler(engine_set(Arc::default(), Arc::default()));
    sut.handle_fingerprint(&fingerprint_action(&fingerprint_token(None)))
        .await
        .unwrap();

    let action = ThreeDs2ChallengeAction {
        challenge_token: "garbage".to_string(),
        authorisation_token: None,
    };
    let error = sut.handle_challenge(&action).await.unwrap_err();
    assert!(matches!(
        error.current_context(),
        ThreeDs2Error::TokenDecoding
    ));

    let error = sut
        .handle_challenge(&challenge_action(&challenge_token()))
        .await
        .unwrap_err();
    assert!(matches!(
        error.current_context(),
        ThreeDs2Error::MissingTransaction
    ));
}

#[tokio::test]
async fn full_flow_emits_the_analytics_sequence() {
    let sink = Arc::new(RecordingSink::default());
    let mut sut = ThreeDs2ActionHandler::new(
        engine_set(Arc::default(), Arc::default()),
        Arc::clone(&sink) as Arc<dyn EventSink>,
    );

    sut.handle_fingerprint(&fingerprint_action(&fingerprint_token(None)))
        .await
        .unwrap();
    sut.handle_challenge(&challenge_action(&challenge_token()))
        .await
        .unwrap();

    assert_eq!(
        *sink.events.lock().unwrap(),
        vec![
            EventKind::FingerprintSent,
            EventKind::FingerprintComplete,
            EventKind::ChallengeSent,
            EventKind::ChallengeDisplayed,
            EventKind::ChallengeComplete,
        ]
    );
}

#[tokio::test]
async fn delegated_authentication_output_is_threaded_into_the_fingerprint() {
    let mut sut = handler(engine_set(Arc::default(), Arc::default()))
        .with_delegated_authenticator(Arc::new(DelegatedAuthenticatorStub {
            authenticate_response: Ok("da-output".to_string()),
        }));

    let mut token = fingerprint_token(None);
    token.delegated_authentication_sdk_input = Some("da-input".to_string());

    let encoded = sut
        .handle_fingerprint(&fingerprint_action(&token))
        .await
        .unwrap();

    let fingerprint: Fingerprint = coder::decode_base64(&encoded).unwrap();
    assert!(matches!(
        fingerprint,
        Fingerprint::AuthenticationData {
            delegated_authentication_sdk_output: Some(output),
            ..
        } if output == "da-output"
    ));
}

#[tokio::test]
async fn failed_delegated_authentication_registers_after_the_challenge() {
    let mut sut = handler(engine_set(Arc::default(), Arc::default()))
        .with_delegated_authenticator(Arc::new(DelegatedAuthenticatorStub {
            authenticate_response: Err(DelegatedAuthenticationError::AuthenticationFailed(
                "no credential".to_string(),
            )),
        }));

    let mut token = fingerprint_token(None);
    token.delegated_authentication_sdk_input = Some("da-input".to_string());
    let encoded = sut
        .handle_fingerprint(&fingerprint_action(&token))
        .await
        .unwrap();
    let fingerprint: Fingerprint = coder::decode_base64(&encoded).unwrap();
    assert!(matches!(
        fingerprint,
        Fingerprint::AuthenticationData {
            delegated_authentication_sdk_output: None,
            ..
        }
    ));

    let mut token = challenge_token();
    token.delegated_authentication_sdk_input = Some("registration-input".to_string());
    let result = sut
        .handle_challenge(&challenge_action(&token))
        .await
        .unwrap();

    assert_eq!(
        result.delegated_authentication_sdk_output(),
        Some("registered:registration-input")
    );
}

/// Service double for exercising the `Unknown` passthrough and the override
/// injection point.
struct UnknownErrorService;

#[async_trait::async_trait]
impl AuthenticationService for UnknownErrorService {
    async fn authentication_parameters(
        &self,
        _parameters: EngineServiceParameters,
    ) -> Result<AuthenticationRequestParameters, EngineError> {
        Ok(authentication_parameters())
    }

    async fn perform_challenge(
        &self,
        _parameters: EngineChallengeParameters,
    ) -> Result<EngineChallengeResult, ServiceError> {
        Err(ServiceError::Unknown(
            "both result and error were empty".to_string(),
        ))
    }

    fn is_cancelled(&self, _error: &EngineError) -> bool {
        false
    }

    fn opaque_error_object(&self, _error: &EngineError) -> Option<String> {
        None
    }

    async fn reset_transaction(&self) {}
}

#[tokio::test]
async fn unknown_service_errors_pass_through() {
    let mut sut = handler(engine_set(Arc::default(), Arc::default()))
        .with_service_override(Arc::new(UnknownErrorService));
    sut.handle_fingerprint(&fingerprint_action(&fingerprint_token(None)))
        .await
        .unwrap();

    let error = sut
        .handle_challenge(&challenge_action(&challenge_token()))
        .await
        .unwrap_err();
    assert!(matches!(
        error.current_context(),
        ThreeDs2Error::Unknown(detail) if detail.contains("empty")
    ));
}
