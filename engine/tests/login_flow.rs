//! Integration tests for the single-step login flow driven through a
//! password authenticator.

use stepflow_engine::{
    mocks::{MockAntiFraud, MockDataAdapter, MockEnablementStore},
    providers::{AccountStatus, AuthenticationContext, CredentialProtection, UserDetail},
    ApplicationContext, AuthMethod, AuthOutcome, AuthStep, AuthStepError, AuthStepResult,
    AuthenticationResult, DataAdapter, EngineConfig, FormData, InMemoryOperationStore,
    MethodAuthenticator,
    OperationChange, OperationContext, OperationTemplate, Orchestrator, OrganizationId,
    RequestContext, ResolvedIdentity, Result, RoutingPolicy, ScaConfig, TerminationReason,
};

type TestOrchestrator = Orchestrator<
    InMemoryOperationStore,
    MockDataAdapter,
    MockAntiFraud,
    RoutingPolicy,
    MockEnablementStore,
>;

/// Password authenticator backed by the Data Adapter, the way a form login
/// controller would implement it.
struct PasswordAuthenticator {
    data_adapter: MockDataAdapter,
    organization_id: OrganizationId,
}

struct PasswordRequest {
    username: String,
    password: String,
    operation_context: OperationContext,
}

impl MethodAuthenticator for PasswordAuthenticator {
    type Request = PasswordRequest;

    fn method(&self) -> AuthMethod {
        AuthMethod::Password
    }

    async fn authenticate(
        &self,
        request: &PasswordRequest,
        _ctx: &RequestContext,
    ) -> Result<AuthenticationResult> {
        let detail = match self
            .data_adapter
            .lookup_user(
                &request.username,
                &self.organization_id,
                &request.operation_context,
            )
            .await
        {
            Ok(detail) => detail,
            Err(AuthStepError::AuthenticationFailed { remaining_attempts }) => {
                return Ok(AuthenticationResult::Rejected { remaining_attempts });
            }
            Err(err) => return Err(err),
        };

        let verification = self
            .data_adapter
            .authenticate_user(
                &detail.user_id,
                &detail.organization_id,
                &request.password,
                &AuthenticationContext {
                    protection: CredentialProtection::Plaintext,
                },
                &request.operation_context,
            )
            .await?;

        if verification.verified {
            Ok(AuthenticationResult::Authenticated(ResolvedIdentity::new(
                detail.user_id,
                detail.organization_id,
            )))
        } else {
            Ok(AuthenticationResult::Rejected {
                remaining_attempts: verification.remaining_attempts,
            })
        }
    }
}

fn create_test_orchestrator(
    max_failures: u32,
) -> (TestOrchestrator, MockDataAdapter, MockAntiFraud) {
    let data_adapter = MockDataAdapter::new();
    let anti_fraud = MockAntiFraud::new();
    let policy = RoutingPolicy::new().with_template(
        OperationTemplate::new("login")
            .phase(vec![AuthStep::new(AuthMethod::Password)])
            .with_max_failures(max_failures),
    );
    let orchestrator = Orchestrator::new(
        InMemoryOperationStore::new(),
        data_adapter.clone(),
        anti_fraud.clone(),
        policy,
        MockEnablementStore::new(),
        EngineConfig::default(),
        ScaConfig::default(),
    );
    (orchestrator, data_adapter, anti_fraud)
}

fn register_alice(data_adapter: &MockDataAdapter) {
    data_adapter.register_user(
        "alice",
        UserDetail {
            user_id: "user-alice".into(),
            organization_id: "RETAIL".into(),
            account_status: AccountStatus::Active,
        },
    );
    data_adapter.set_credential(&"user-alice".into(), "s3cret");
}

fn authenticator(data_adapter: &MockDataAdapter) -> PasswordAuthenticator {
    PasswordAuthenticator {
        data_adapter: data_adapter.clone(),
        organization_id: "RETAIL".into(),
    }
}

fn password_request(
    orchestrator: &TestOrchestrator,
    ctx: &RequestContext,
    username: &str,
    password: &str,
) -> PasswordRequest {
    let operation_id = orchestrator
        .registry()
        .operation_for_session(&ctx.session_id)
        .expect("registry")
        .expect("bound operation");
    PasswordRequest {
        username: username.to_string(),
        password: password.to_string(),
        operation_context: OperationContext {
            operation_id,
            operation_name: "login".to_string(),
            operation_data: "A2".to_string(),
            form_data: FormData::default(),
            application_context: ApplicationContext::default(),
        },
    }
}

#[tokio::test]
async fn test_successful_login_completes_operation() {
    let (orchestrator, data_adapter, anti_fraud) = create_test_orchestrator(5);
    register_alice(&data_adapter);
    let ctx = RequestContext::new("session-1".into());

    let update = orchestrator
        .initiate(
            "login",
            "A2",
            FormData::default(),
            ApplicationContext::default(),
            &ctx,
        )
        .await
        .expect("initiate");

    let outcome = orchestrator
        .build_authorization_response(
            &password_request(&orchestrator, &ctx, "alice", "s3cret"),
            &authenticator(&data_adapter),
            &ctx,
        )
        .await
        .expect("authenticate");

    assert_eq!(
        outcome,
        AuthOutcome::Done {
            user_id: Some("user-alice".into()),
        }
    );

    // One Init entry plus one confirmed password step.
    let viewed = orchestrator
        .get_operation(update.operation_id, AuthMethod::OperationReview, &ctx)
        .await
        .expect("view finished operation");
    assert_eq!(viewed.history.len(), 2);
    assert_eq!(viewed.history[0].auth_method, AuthMethod::Init);
    assert_eq!(viewed.history[1].auth_method, AuthMethod::Password);
    assert_eq!(viewed.history[1].step_result, AuthStepResult::Confirmed);

    // Completion notifications fire exactly once.
    assert_eq!(
        data_adapter.operation_changes(),
        vec![(update.operation_id, OperationChange::Done)]
    );
    assert_eq!(
        anti_fraud.logout_calls(),
        vec![(update.operation_id, TerminationReason::Done)]
    );
}

#[tokio::test]
async fn test_completed_operation_rejects_further_steps() {
    let (orchestrator, data_adapter, _) = create_test_orchestrator(5);
    register_alice(&data_adapter);
    let ctx = RequestContext::new("session-1".into());

    orchestrator
        .initiate(
            "login",
            "A2",
            FormData::default(),
            ApplicationContext::default(),
            &ctx,
        )
        .await
        .expect("initiate");
    let request = password_request(&orchestrator, &ctx, "alice", "s3cret");
    orchestrator
        .build_authorization_response(&request, &authenticator(&data_adapter), &ctx)
        .await
        .expect("authenticate");

    let repeat = orchestrator
        .build_authorization_response(&request, &authenticator(&data_adapter), &ctx)
        .await;
    assert_eq!(repeat, Err(AuthStepError::OperationAlreadyFinished));
}

#[tokio::test]
async fn test_failed_credential_reconciles_remaining_attempts() {
    let (orchestrator, data_adapter, _) = create_test_orchestrator(5);
    register_alice(&data_adapter);
    // Verifier-side counter is stricter than the policy budget.
    data_adapter.set_remaining_attempts(&"user-alice".into(), 2);
    let ctx = RequestContext::new("session-1".into());

    orchestrator
        .initiate(
            "login",
            "A2",
            FormData::default(),
            ApplicationContext::default(),
            &ctx,
        )
        .await
        .expect("initiate");

    let outcome = orchestrator
        .build_authorization_response(
            &password_request(&orchestrator, &ctx, "alice", "wrong"),
            &authenticator(&data_adapter),
            &ctx,
        )
        .await
        .expect("fail path");

    // Policy has 4 attempts left, verifier reports 1; the stricter wins.
    assert_eq!(
        outcome,
        AuthOutcome::Failed {
            remaining_attempts: Some(1),
            terminal: false,
        }
    );
}

#[tokio::test]
async fn test_exhausted_attempts_fail_operation() {
    let (orchestrator, data_adapter, anti_fraud) = create_test_orchestrator(2);
    register_alice(&data_adapter);
    let ctx = RequestContext::new("session-1".into());

    let update = orchestrator
        .initiate(
            "login",
            "A2",
            FormData::default(),
            ApplicationContext::default(),
            &ctx,
        )
        .await
        .expect("initiate");
    let request = password_request(&orchestrator, &ctx, "alice", "wrong");

    let first = orchestrator
        .build_authorization_response(&request, &authenticator(&data_adapter), &ctx)
        .await
        .expect("first failure");
    assert_eq!(
        first,
        AuthOutcome::Failed {
            remaining_attempts: Some(1),
            terminal: false,
        }
    );

    let second = orchestrator
        .build_authorization_response(&request, &authenticator(&data_adapter), &ctx)
        .await
        .expect("second failure");
    assert_eq!(
        second,
        AuthOutcome::Failed {
            remaining_attempts: Some(0),
            terminal: true,
        }
    );

    assert_eq!(
        data_adapter.operation_changes(),
        vec![(update.operation_id, OperationChange::Failed)]
    );
    assert_eq!(
        anti_fraud.logout_calls(),
        vec![(update.operation_id, TerminationReason::Failed)]
    );

    // Hard-failed operations are not viewable.
    let view = orchestrator
        .get_operation(update.operation_id, AuthMethod::OperationReview, &ctx)
        .await;
    assert_eq!(view, Err(AuthStepError::OperationAlreadyFailed));
}

#[tokio::test]
async fn test_unknown_user_is_a_failed_attempt() {
    let (orchestrator, data_adapter, _) = create_test_orchestrator(5);
    let ctx = RequestContext::new("session-1".into());

    orchestrator
        .initiate(
            "login",
            "A2",
            FormData::default(),
            ApplicationContext::default(),
            &ctx,
        )
        .await
        .expect("initiate");

    let outcome = orchestrator
        .build_authorization_response(
            &password_request(&orchestrator, &ctx, "mallory", "whatever"),
            &authenticator(&data_adapter),
            &ctx,
        )
        .await
        .expect("fail path");
    assert!(matches!(outcome, AuthOutcome::Failed { terminal: false, .. }));
}
