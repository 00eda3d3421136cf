//! Integration tests for the possession-based mobile token method and the
//! SCA login presentation override.

use stepflow_engine::{
    mocks::{MockAntiFraud, MockDataAdapter, MockEnablementStore, MockSignatureVerifier},
    providers::SignatureType,
    ApplicationContext, AuthMethod, AuthOutcome, AuthStep, AuthenticationResult, EngineConfig,
    FormData, InMemoryOperationStore, MethodAuthenticator, OperationTemplate, Orchestrator,
    OrganizationId, RequestContext, ResolvedIdentity, Result, RoutingPolicy, ScaConfig,
    SignatureVerifier,
};

type TestOrchestrator = Orchestrator<
    InMemoryOperationStore,
    MockDataAdapter,
    MockAntiFraud,
    RoutingPolicy,
    MockEnablementStore,
>;

/// QR-code approval authenticator backed by the offline signature verifier.
struct MobileTokenAuthenticator {
    verifier: MockSignatureVerifier,
    organization_id: OrganizationId,
}

struct MobileTokenRequest {
    activation_id: String,
    operation_data: String,
    auth_code: String,
}

impl MethodAuthenticator for MobileTokenAuthenticator {
    type Request = MobileTokenRequest;

    fn method(&self) -> AuthMethod {
        AuthMethod::MobileToken
    }

    async fn authenticate(
        &self,
        request: &MobileTokenRequest,
        _ctx: &RequestContext,
    ) -> Result<AuthenticationResult> {
        let verification = self
            .verifier
            .verify_offline_signature(
                &request.activation_id,
                &request.operation_data,
                &request.auth_code,
                SignatureType::PossessionKnowledge,
            )
            .await?;

        match verification.user_id {
            Some(user_id) if verification.valid => Ok(AuthenticationResult::Authenticated(
                ResolvedIdentity::new(user_id, self.organization_id.clone()),
            )),
            _ => Ok(AuthenticationResult::Rejected {
                remaining_attempts: None,
            }),
        }
    }
}

fn create_test_orchestrator() -> TestOrchestrator {
    let policy = RoutingPolicy::new()
        .with_template(
            OperationTemplate::new("authorize_payment")
                .phase(vec![AuthStep::new(AuthMethod::MobileToken)]),
        )
        .with_template(
            OperationTemplate::new("approve_transfer")
                .phase(vec![AuthStep::new(AuthMethod::ScaLogin)])
                .phase(vec![AuthStep::new(AuthMethod::ScaApproval)]),
        );
    Orchestrator::new(
        InMemoryOperationStore::new(),
        MockDataAdapter::new(),
        MockAntiFraud::new(),
        policy,
        MockEnablementStore::new(),
        EngineConfig::default(),
        ScaConfig::default(),
    )
}

#[tokio::test]
async fn test_qr_code_approval_completes_operation() {
    let orchestrator = create_test_orchestrator();
    let verifier = MockSignatureVerifier::new();
    verifier.register_activation("activation-1", &"user-1".into(), "1234-5678");
    let authenticator = MobileTokenAuthenticator {
        verifier,
        organization_id: "RETAIL".into(),
    };
    let ctx = RequestContext::new("session-1".into());

    orchestrator
        .initiate(
            "authorize_payment",
            "A1*A100CZK",
            FormData::default(),
            ApplicationContext::default(),
            &ctx,
        )
        .await
        .expect("initiate");

    let outcome = orchestrator
        .build_authorization_response(
            &MobileTokenRequest {
                activation_id: "activation-1".to_string(),
                operation_data: "A1*A100CZK".to_string(),
                auth_code: "1234-5678".to_string(),
            },
            &authenticator,
            &ctx,
        )
        .await
        .expect("authenticate");

    assert_eq!(
        outcome,
        AuthOutcome::Done {
            user_id: Some("user-1".into()),
        }
    );
}

#[tokio::test]
async fn test_invalid_auth_code_is_a_failed_attempt() {
    let orchestrator = create_test_orchestrator();
    let verifier = MockSignatureVerifier::new();
    verifier.register_activation("activation-1", &"user-1".into(), "1234-5678");
    let authenticator = MobileTokenAuthenticator {
        verifier,
        organization_id: "RETAIL".into(),
    };
    let ctx = RequestContext::new("session-1".into());

    orchestrator
        .initiate(
            "authorize_payment",
            "A1*A100CZK",
            FormData::default(),
            ApplicationContext::default(),
            &ctx,
        )
        .await
        .expect("initiate");

    let outcome = orchestrator
        .build_authorization_response(
            &MobileTokenRequest {
                activation_id: "activation-1".to_string(),
                operation_data: "A1*A100CZK".to_string(),
                auth_code: "0000-0000".to_string(),
            },
            &authenticator,
            &ctx,
        )
        .await
        .expect("fail path");

    assert!(matches!(outcome, AuthOutcome::Failed { terminal: false, .. }));
}

#[tokio::test]
async fn test_sca_login_projection_reshapes_displayed_operation() {
    let orchestrator = create_test_orchestrator();
    let ctx = RequestContext::new("session-1".into());

    let form_data = FormData::with_messages(
        "transfer.title",
        "transfer.greeting",
        "transfer.summary",
    );
    let update = orchestrator
        .initiate(
            "approve_transfer",
            "A1*A500CZK",
            form_data,
            ApplicationContext::default(),
            &ctx,
        )
        .await
        .expect("initiate");

    // While the SCA login step is pending, the operation is displayed as a
    // login rather than the underlying approval.
    let viewed = orchestrator
        .get_operation(update.operation_id, AuthMethod::Password, &ctx)
        .await
        .expect("view");
    assert_eq!(viewed.operation_name, "login");
    assert_eq!(viewed.operation_data, "A2");
    assert_eq!(viewed.form_data.title.as_deref(), Some("login.title"));

    // Once the login phase completes, the real operation shows through.
    orchestrator
        .authorize(
            update.operation_id,
            AuthMethod::ScaLogin,
            Some((&"user-1".into(), &"RETAIL".into())),
            &ctx,
        )
        .await
        .expect("sca login");
    let viewed = orchestrator
        .get_operation(update.operation_id, AuthMethod::ScaApproval, &ctx)
        .await
        .expect("view");
    assert_eq!(viewed.operation_name, "approve_transfer");
    assert_eq!(viewed.operation_data, "A1*A500CZK");
    assert_eq!(viewed.form_data.title.as_deref(), Some("transfer.title"));

    // The stored aggregate was never reshaped.
    let pending = orchestrator
        .pending_operations(&"user-1".into())
        .await
        .expect("pending");
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].operation_name, "approve_transfer");
}
