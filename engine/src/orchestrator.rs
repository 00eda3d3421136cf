//! The operation orchestrator.
//!
//! Single entry point for every operation lifecycle transition: creation,
//! step authorization, failure recording, cancellation, session continuation
//! and form-data updates. Concrete authentication methods plug in through
//! [`MethodAuthenticator`] and must drive all state changes through
//! [`Orchestrator::build_authorization_response`] rather than touching the
//! store directly.

use crate::attempts::resolve_remaining_attempts;
use crate::cancellation::CancellationService;
use crate::config::{EngineConfig, ScaConfig};
use crate::context::RequestContext;
use crate::enablement::MethodEnablementResolver;
use crate::error::{AuthStepError, Result};
use crate::policy::{OperationTemplate, StepPolicy};
use crate::providers::{
    AntiFraudService, AuthenticationResult, DataAdapter, EnablementStore, MethodAuthenticator,
    OperationStore,
};
use crate::session::SessionBindingRegistry;
use crate::state::{
    ApplicationContext, AuthMethod, AuthResult, AuthStep, AuthStepResult, CancelReason, FormData,
    FormDataChange, Operation, OperationChange, OperationHistoryEntry, OperationId, OrganizationId,
    TerminationReason, UserId,
};
use chrono::Utc;
use tracing::{error, info};

/// Methods strong enough to confirm an operation after its detail has been
/// displayed for review.
const STRONGER_METHODS: [AuthMethod; 3] = [
    AuthMethod::SmsOtp,
    AuthMethod::MobileToken,
    AuthMethod::ScaLogin,
];

// ═══════════════════════════════════════════════════════════════════════
// Responses
// ═══════════════════════════════════════════════════════════════════════

/// Snapshot of an operation returned after a lifecycle transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationUpdate {
    /// Operation that was updated.
    pub operation_id: OperationId,

    /// User bound to the operation, once known.
    pub user_id: Option<UserId>,

    /// Overall result after the transition.
    pub result: AuthResult,

    /// Candidate next steps, already filtered by method enablement.
    pub steps: Vec<AuthStep>,

    /// Reconciled remaining failure budget, `None` for no limit.
    pub remaining_attempts: Option<u32>,
}

/// Outcome of one authentication attempt driven through
/// [`Orchestrator::build_authorization_response`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    /// The operation completed successfully.
    Done {
        /// User that completed the operation.
        user_id: Option<UserId>,
    },

    /// The step was confirmed but further steps are required.
    Continue {
        /// Operation being authenticated.
        operation_id: OperationId,

        /// User bound to the operation, once known.
        user_id: Option<UserId>,

        /// Candidate next steps.
        steps: Vec<AuthStep>,
    },

    /// The credential was rejected.
    Failed {
        /// Reconciled remaining attempts, `None` for no limit.
        remaining_attempts: Option<u32>,

        /// `true` when the failure budget is exhausted and the operation
        /// itself failed.
        terminal: bool,
    },
}

// ═══════════════════════════════════════════════════════════════════════
// Orchestrator
// ═══════════════════════════════════════════════════════════════════════

/// Orchestrates multi-step authentication operations.
///
/// Cheaply cloneable; clones share the same stores and registry.
#[derive(Debug, Clone)]
pub struct Orchestrator<S, D, A, P, E>
where
    S: OperationStore + Clone,
    D: DataAdapter + Clone,
    A: AntiFraudService + Clone,
    P: StepPolicy + Clone,
    E: EnablementStore + Clone,
{
    store: S,
    data_adapter: D,
    anti_fraud: A,
    policy: P,
    enablement: MethodEnablementResolver<E>,
    cancellation: CancellationService<S, D, A, P>,
    registry: SessionBindingRegistry,
    config: EngineConfig,
}

impl<S, D, A, P, E> Orchestrator<S, D, A, P, E>
where
    S: OperationStore + Clone,
    D: DataAdapter + Clone,
    A: AntiFraudService + Clone,
    P: StepPolicy + Clone,
    E: EnablementStore + Clone,
{
    /// Create an orchestrator over the given collaborators.
    #[must_use]
    pub fn new(
        store: S,
        data_adapter: D,
        anti_fraud: A,
        policy: P,
        enablement_store: E,
        config: EngineConfig,
        sca: ScaConfig,
    ) -> Self {
        let registry = SessionBindingRegistry::new();
        let cancellation = CancellationService::new(
            store.clone(),
            data_adapter.clone(),
            anti_fraud.clone(),
            policy.clone(),
            registry.clone(),
        );
        Self {
            store,
            data_adapter,
            anti_fraud,
            policy,
            enablement: MethodEnablementResolver::new(enablement_store, sca),
            cancellation,
            registry,
            config,
        }
    }

    /// Session binding registry shared by this orchestrator.
    #[must_use]
    pub const fn registry(&self) -> &SessionBindingRegistry {
        &self.registry
    }

    // ═══════════════════════════════════════════════════════════════════
    // Lifecycle Operations
    // ═══════════════════════════════════════════════════════════════════

    /// Create a new operation and bind it to the caller's session.
    ///
    /// Unfinished operations still bound to the session are canceled first
    /// with an "interrupted" reason, so each session only ever drives one
    /// operation at a time.
    ///
    /// # Errors
    ///
    /// Returns [`AuthStepError::OperationConfigNotFound`] for an unknown
    /// operation type, or a store/registry error.
    pub async fn initiate(
        &self,
        operation_name: &str,
        operation_data: &str,
        form_data: FormData,
        application_context: ApplicationContext,
        ctx: &RequestContext,
    ) -> Result<OperationUpdate> {
        for stale_id in self.registry.stale_operations(&ctx.session_id)? {
            let stale = self.store.get(stale_id).await?;
            self.cancellation
                .cancel_operation(
                    stale_id,
                    nominal_method(&stale),
                    CancelReason::InterruptedOperation,
                )
                .await?;
        }

        let decision = self.policy.initial_decision(operation_name)?;
        let now = Utc::now();
        let operation = Operation {
            operation_id: OperationId::new(),
            operation_name: operation_name.to_string(),
            operation_data: operation_data.to_string(),
            form_data,
            application_context,
            organization_id: None,
            user_id: None,
            chosen_auth_method: None,
            result: decision.result,
            steps: decision.steps,
            history: vec![OperationHistoryEntry {
                auth_method: AuthMethod::Init,
                step_result: AuthStepResult::Confirmed,
                cancel_reason: None,
                timestamp: now,
            }],
            created_at: now,
            expires_at: now + self.config.operation_timeout,
            version: 0,
        };

        // Bind before persisting: a binding failure then creates nothing,
        // and a persistence failure leaves no active binding behind.
        let operation_id = operation.operation_id;
        self.registry
            .bind(&ctx.session_id, operation_id, operation.result)?;
        let operation = match self.store.create(operation).await {
            Ok(operation) => operation,
            Err(err) => {
                self.registry.record_result(operation_id, AuthResult::Failed)?;
                return Err(err);
            }
        };

        info!(
            operation_id = %operation.operation_id,
            operation_name,
            "operation initiated"
        );

        let mut steps = operation.steps.clone();
        self.enablement.filter_steps(&mut steps, None).await?;
        Ok(OperationUpdate {
            operation_id: operation.operation_id,
            user_id: None,
            result: operation.result,
            steps,
            remaining_attempts: decision.remaining_attempts,
        })
    }

    /// Fetch and validate an operation for display by the given method.
    ///
    /// The returned snapshot has the SCA login projection applied and its
    /// candidate steps filtered by method enablement.
    ///
    /// # Errors
    ///
    /// Returns the validation error for an operation that cannot be worked
    /// on: timed out (after an implicit cancellation), interrupted by a
    /// newer client, already terminal, corrupt, or carrying a method choice
    /// that is no longer among the enabled candidate steps.
    pub async fn get_operation(
        &self,
        operation_id: OperationId,
        auth_method: AuthMethod,
        ctx: &RequestContext,
    ) -> Result<Operation> {
        let mut operation = self
            .validated_operation(operation_id, auth_method, ctx)
            .await?;
        self.enablement
            .filter_steps(&mut operation.steps, operation.user_id.clone().as_ref())
            .await?;
        // A recorded method choice must also survive enablement filtering.
        if operation.result == AuthResult::Continue {
            if let Some(chosen) = operation.chosen_auth_method {
                if !operation.is_auth_method_available(chosen) {
                    return Err(AuthStepError::InvalidChosenMethod);
                }
            }
        }
        self.enablement
            .apply_sca_projection(&mut operation, auth_method);
        Ok(operation)
    }

    /// Record a confirmed authentication step.
    ///
    /// Appends a confirmed history entry for the effective method, binds the
    /// resolved identity to the operation, and re-derives result and steps
    /// through the step policy. Completion notifications fire exactly once,
    /// on the single transition into the done state.
    ///
    /// # Errors
    ///
    /// Returns a validation error when the operation cannot accept the step,
    /// [`AuthStepError::AuthMethodNotAvailable`] when the method is not a
    /// candidate, or [`AuthStepError::InvalidChosenMethod`] when it
    /// contradicts the client's recorded method choice.
    pub async fn authorize(
        &self,
        operation_id: OperationId,
        auth_method: AuthMethod,
        identity: Option<(&UserId, &OrganizationId)>,
        ctx: &RequestContext,
    ) -> Result<OperationUpdate> {
        let operation = self
            .validated_operation(operation_id, auth_method, ctx)
            .await?;
        let effective = self
            .enablement
            .resolve_effective_method(&operation, auth_method);

        if !self
            .enablement
            .is_enabled(effective, operation.user_id.as_ref())
            .await?
        {
            return Err(AuthStepError::AuthMethodNotAvailable);
        }

        let policy = self.policy.clone();
        let identity = identity.map(|(user, org)| (user.clone(), org.clone()));
        let updated = self
            .store
            .update(operation_id, move |operation| {
                if operation.is_terminal() {
                    return Err(terminal_error(operation));
                }
                if !operation.is_auth_method_available(effective) {
                    return Err(AuthStepError::AuthMethodNotAvailable);
                }
                if let Some(chosen) = operation.chosen_auth_method {
                    if chosen != effective {
                        return Err(AuthStepError::InvalidChosenMethod);
                    }
                }

                operation.record_step(effective, AuthStepResult::Confirmed, None, Utc::now());
                if let Some((user_id, organization_id)) = identity {
                    operation.user_id = Some(user_id);
                    operation.organization_id = Some(organization_id);
                }

                let decision = policy.decide(operation, AuthStepResult::Confirmed)?;
                operation.result = decision.result;
                operation.steps = decision.steps;
                // The method choice applied to the finished phase only.
                operation.chosen_auth_method = None;
                Ok(())
            })
            .await?;

        self.registry.record_result(operation_id, updated.result)?;

        info!(
            operation_id = %operation_id,
            auth_method = %effective,
            result = ?updated.result,
            "authentication step confirmed"
        );

        if updated.result == AuthResult::Done {
            self.notify_terminal(&updated, OperationChange::Done, TerminationReason::Done)
                .await;
        }

        self.operation_update(&updated).await
    }

    /// Record a failed authentication attempt.
    ///
    /// `verifier_remaining` is the remaining-attempt counter reported by the
    /// credential verifier, reconciled against the step policy's budget; the
    /// stricter of the two is surfaced.
    ///
    /// # Errors
    ///
    /// Returns an already-terminal error when the operation finished in the
    /// meantime, or a store/policy error.
    pub async fn fail(
        &self,
        operation_id: OperationId,
        auth_method: AuthMethod,
        verifier_remaining: Option<u32>,
    ) -> Result<OperationUpdate> {
        let policy = self.policy.clone();
        let updated = self
            .store
            .update(operation_id, move |operation| {
                if operation.is_terminal() {
                    return Err(terminal_error(operation));
                }
                operation.record_step(auth_method, AuthStepResult::AuthFailed, None, Utc::now());
                let decision = policy.decide(operation, AuthStepResult::AuthFailed)?;
                operation.result = decision.result;
                operation.steps = decision.steps;
                Ok(())
            })
            .await?;

        self.registry.record_result(operation_id, updated.result)?;

        info!(
            operation_id = %operation_id,
            auth_method = %auth_method,
            result = ?updated.result,
            "authentication step failed"
        );

        if updated.result == AuthResult::Failed {
            self.notify_terminal(&updated, OperationChange::Failed, TerminationReason::Failed)
                .await;
        }

        let mut update = self.operation_update(&updated).await?;
        update.remaining_attempts =
            resolve_remaining_attempts(update.remaining_attempts, verifier_remaining);
        Ok(update)
    }

    /// Cancel an operation with a typed reason.
    ///
    /// Idempotent: cancelling an already-terminal operation returns
    /// `Ok(None)` without appending history.
    ///
    /// # Errors
    ///
    /// Returns [`AuthStepError::OperationNotFound`] for an unknown
    /// operation, or a store/policy error.
    pub async fn cancel(
        &self,
        operation_id: OperationId,
        auth_method: AuthMethod,
        reason: CancelReason,
    ) -> Result<Option<OperationUpdate>> {
        match self
            .cancellation
            .cancel_operation(operation_id, auth_method, reason)
            .await?
        {
            Some(operation) => Ok(Some(self.operation_update(&operation).await?)),
            None => Ok(None),
        }
    }

    /// Continue an existing operation from a new or returning session.
    ///
    /// Used when the client navigates back to an operation it initiated
    /// earlier (e.g. after an OAuth redirect). The operation is re-bound to
    /// the caller's session; an operation bound to a *different* session
    /// cannot be taken over.
    ///
    /// # Errors
    ///
    /// Returns [`AuthStepError::SessionConflict`] when the operation belongs
    /// to another session, or a validation error.
    pub async fn continue_operation(
        &self,
        operation_id: OperationId,
        ctx: &RequestContext,
    ) -> Result<Operation> {
        let operation = self.store.get(operation_id).await?;
        self.registry
            .bind(&ctx.session_id, operation_id, operation.result)?;
        self.get_operation(operation_id, nominal_method(&operation), ctx)
            .await
    }

    /// Drive one authentication attempt end to end.
    ///
    /// Resolves the session's bound operation, runs the authenticator, and
    /// records the attempt as a confirmed or failed step. This is the only
    /// supported path for method controllers to mutate operation state.
    ///
    /// # Errors
    ///
    /// Returns [`AuthStepError::OperationNotAvailable`] when the session has
    /// no bound operation, the authenticator's own error, or a transition
    /// error.
    pub async fn build_authorization_response<M>(
        &self,
        request: &M::Request,
        authenticator: &M,
        ctx: &RequestContext,
    ) -> Result<AuthOutcome>
    where
        M: MethodAuthenticator,
    {
        let operation_id = self
            .registry
            .operation_for_session(&ctx.session_id)?
            .ok_or(AuthStepError::OperationNotAvailable)?;
        let method = authenticator.method();

        match authenticator.authenticate(request, ctx).await? {
            AuthenticationResult::Authenticated(identity) => {
                let update = self
                    .authorize(
                        operation_id,
                        method,
                        Some((&identity.user_id, &identity.organization_id)),
                        ctx,
                    )
                    .await?;
                Ok(match update.result {
                    AuthResult::Done => AuthOutcome::Done {
                        user_id: update.user_id,
                    },
                    AuthResult::Continue => AuthOutcome::Continue {
                        operation_id: update.operation_id,
                        user_id: update.user_id,
                        steps: update.steps,
                    },
                    AuthResult::Failed => AuthOutcome::Failed {
                        remaining_attempts: update.remaining_attempts,
                        terminal: true,
                    },
                })
            }
            AuthenticationResult::Rejected { remaining_attempts } => {
                let update = self.fail(operation_id, method, remaining_attempts).await?;
                Ok(AuthOutcome::Failed {
                    remaining_attempts: update.remaining_attempts,
                    terminal: update.result == AuthResult::Failed,
                })
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Client Choices & Queries
    // ═══════════════════════════════════════════════════════════════════

    /// Record the client's choice of authentication method for the current
    /// phase.
    ///
    /// # Errors
    ///
    /// Returns [`AuthStepError::InvalidChosenMethod`] when the chosen method
    /// is not among the candidate steps, or a validation error.
    pub async fn choose_auth_method(
        &self,
        operation_id: OperationId,
        chosen: AuthMethod,
        ctx: &RequestContext,
    ) -> Result<OperationUpdate> {
        self.validated_operation(operation_id, chosen, ctx).await?;

        let updated = self
            .store
            .update(operation_id, move |operation| {
                if operation.is_terminal() {
                    return Err(terminal_error(operation));
                }
                if !operation.is_auth_method_available(chosen) {
                    return Err(AuthStepError::InvalidChosenMethod);
                }
                operation.chosen_auth_method = Some(chosen);
                Ok(())
            })
            .await?;

        self.registry.record_result(operation_id, updated.result)?;
        self.notify_form_data(&updated, &FormDataChange::AuthMethodChoice {
            chosen_method: chosen,
        })
        .await;

        self.operation_update(&updated).await
    }

    /// Record a user-made form data change (e.g. a chosen bank account) and
    /// notify the Data Adapter.
    ///
    /// # Errors
    ///
    /// Returns an already-terminal error when the operation finished, or a
    /// store error.
    pub async fn notify_form_data_change(
        &self,
        operation_id: OperationId,
        change: FormDataChange,
    ) -> Result<()> {
        let recorded = change.clone();
        let updated = self
            .store
            .update(operation_id, move |operation| {
                if operation.is_terminal() {
                    return Err(terminal_error(operation));
                }
                let (key, value) = match &recorded {
                    FormDataChange::BankAccountChoice { chosen_account } => {
                        ("operation.bankAccountChoice", chosen_account.clone())
                    }
                    FormDataChange::AuthMethodChoice { chosen_method } => (
                        "operation.authMethodChoice",
                        chosen_method.as_str().to_string(),
                    ),
                };
                operation
                    .form_data
                    .user_input
                    .insert(key.to_string(), value);
                Ok(())
            })
            .await?;

        self.registry.record_result(operation_id, updated.result)?;
        self.notify_form_data(&updated, &change).await;
        Ok(())
    }

    /// Step routing configured for the operation type.
    ///
    /// # Errors
    ///
    /// Returns [`AuthStepError::OperationConfigNotFound`] when no routing is
    /// configured for the type.
    pub fn get_operation_config(&self, operation_name: &str) -> Result<OperationTemplate> {
        self.policy.operation_config(operation_name).ok_or_else(|| {
            AuthStepError::OperationConfigNotFound {
                operation_name: operation_name.to_string(),
            }
        })
    }

    /// Unfinished operations of a user, for display in a pending list.
    ///
    /// Each snapshot has the SCA projection applied and its steps filtered,
    /// the same shape [`Orchestrator::get_operation`] returns.
    ///
    /// # Errors
    ///
    /// Returns error if a store or collaborator is unreachable.
    pub async fn pending_operations(&self, user_id: &UserId) -> Result<Vec<Operation>> {
        let mut operations = self.store.list_pending(user_id).await?;
        for operation in &mut operations {
            self.enablement
                .filter_steps(&mut operation.steps, Some(user_id))
                .await?;
            let nominal = nominal_method(operation);
            self.enablement.apply_sca_projection(operation, nominal);
        }
        Ok(operations)
    }

    // ═══════════════════════════════════════════════════════════════════
    // Internal
    // ═══════════════════════════════════════════════════════════════════

    /// Fetch an operation and validate it can be worked on by the method.
    ///
    /// Expired unfinished operations are implicitly canceled here, so the
    /// timeout surfaces as a proper canceled operation rather than a silent
    /// dead end. Hard-failed operations are rejected outright; canceled and
    /// completed ones pass validation and stay viewable (a mobile app may
    /// cancel what the web UI still displays) — mutating them is stopped by
    /// the store-side terminal guard instead.
    async fn validated_operation(
        &self,
        operation_id: OperationId,
        auth_method: AuthMethod,
        ctx: &RequestContext,
    ) -> Result<Operation> {
        let operation = self.store.get(operation_id).await?;
        if operation.history.is_empty() {
            return Err(AuthStepError::OperationMissingHistory);
        }
        if operation.result == AuthResult::Failed && !operation.is_canceled() {
            return Err(AuthStepError::OperationAlreadyFailed);
        }

        if operation.result == AuthResult::Continue {
            if operation.is_expired(Utc::now()) {
                // Best effort: the caller gets the timeout either way.
                if let Err(err) = self
                    .cancellation
                    .cancel_operation(operation_id, auth_method, CancelReason::TimedOutOperation)
                    .await
                {
                    error!(
                        operation_id = %operation_id,
                        %err,
                        "implicit timeout cancellation failed"
                    );
                }
                return Err(AuthStepError::OperationTimeout);
            }
            if let Some(client_hash) = &ctx.operation_hash {
                let current = self.registry.operation_hash(operation_id)?;
                if current.as_deref() != Some(client_hash.as_str()) {
                    return Err(AuthStepError::OperationInterrupted);
                }
            }
            if let Some(chosen) = operation.chosen_auth_method {
                if !operation.is_auth_method_available(chosen) {
                    return Err(AuthStepError::InvalidChosenMethod);
                }
            }
            // Operation detail display only makes sense while a stronger
            // confirmation step can still follow it.
            if auth_method == AuthMethod::OperationReview
                && !STRONGER_METHODS
                    .iter()
                    .any(|method| operation.is_auth_method_available(*method))
            {
                return Err(AuthStepError::AuthMethodNotAvailable);
            }
        }

        Ok(operation)
    }

    /// Assemble the update snapshot returned to callers, with enablement
    /// filtering applied to the candidate steps.
    async fn operation_update(&self, operation: &Operation) -> Result<OperationUpdate> {
        let mut steps = operation.steps.clone();
        self.enablement
            .filter_steps(&mut steps, operation.user_id.as_ref())
            .await?;
        Ok(OperationUpdate {
            operation_id: operation.operation_id,
            user_id: operation.user_id.clone(),
            result: operation.result,
            steps,
            remaining_attempts: self.policy.remaining_attempts(operation),
        })
    }

    /// Fire the best-effort termination notifications.
    async fn notify_terminal(
        &self,
        operation: &Operation,
        change: OperationChange,
        reason: TerminationReason,
    ) {
        if let Err(err) = self
            .data_adapter
            .operation_changed_notification(
                change,
                operation.user_id.as_ref(),
                operation.organization_id.as_ref(),
                &operation.operation_context(),
            )
            .await
        {
            error!(
                operation_id = %operation.operation_id,
                %err,
                "operation-changed notification failed"
            );
        }

        if let Err(err) = self
            .anti_fraud
            .execute_logout_action(operation.operation_id, reason)
            .await
        {
            error!(
                operation_id = %operation.operation_id,
                %err,
                "anti-fraud logout action failed"
            );
        }
    }

    /// Fire the best-effort form-data-changed notification.
    async fn notify_form_data(&self, operation: &Operation, change: &FormDataChange) {
        if let Err(err) = self
            .data_adapter
            .form_data_changed_notification(
                change,
                operation.user_id.as_ref(),
                operation.operation_id,
            )
            .await
        {
            error!(
                operation_id = %operation.operation_id,
                %err,
                "form-data-changed notification failed"
            );
        }
    }
}

/// Method attributed to generic transitions on an operation: the client's
/// chosen method when one is recorded, otherwise the first candidate step.
fn nominal_method(operation: &Operation) -> AuthMethod {
    operation
        .chosen_auth_method
        .or_else(|| operation.steps.first().map(|step| step.auth_method))
        .unwrap_or(AuthMethod::Init)
}

fn terminal_error(operation: &Operation) -> AuthStepError {
    if operation.is_canceled() {
        AuthStepError::OperationAlreadyCanceled
    } else if operation.result == AuthResult::Done {
        AuthStepError::OperationAlreadyFinished
    } else {
        AuthStepError::OperationAlreadyFailed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::{MockAntiFraud, MockDataAdapter, MockEnablementStore};
    use crate::policy::RoutingPolicy;
    use crate::stores::InMemoryOperationStore;

    type TestOrchestrator = Orchestrator<
        InMemoryOperationStore,
        MockDataAdapter,
        MockAntiFraud,
        RoutingPolicy,
        MockEnablementStore,
    >;

    fn orchestrator(policy: RoutingPolicy) -> TestOrchestrator {
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

    fn login_policy() -> RoutingPolicy {
        RoutingPolicy::new().with_template(
            OperationTemplate::new("login").phase(vec![AuthStep::new(AuthMethod::Password)]),
        )
    }

    #[tokio::test]
    async fn test_initiate_offers_first_phase() {
        let orchestrator = orchestrator(login_policy());
        let ctx = RequestContext::new("s1".into());

        let update = orchestrator
            .initiate("login", "A2", FormData::default(), ApplicationContext::default(), &ctx)
            .await
            .expect("initiate");

        assert_eq!(update.result, AuthResult::Continue);
        assert_eq!(update.steps, vec![AuthStep::new(AuthMethod::Password)]);
        assert_eq!(
            orchestrator
                .registry()
                .operation_for_session(&ctx.session_id)
                .expect("lookup"),
            Some(update.operation_id)
        );
    }

    #[tokio::test]
    async fn test_initiate_rejects_unknown_operation_type() {
        let orchestrator = orchestrator(login_policy());
        let ctx = RequestContext::new("s1".into());

        let result = orchestrator
            .initiate(
                "transfer",
                "A1",
                FormData::default(),
                ApplicationContext::default(),
                &ctx,
            )
            .await;
        assert!(matches!(
            result,
            Err(AuthStepError::OperationConfigNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_authorize_unavailable_method() {
        let orchestrator = orchestrator(login_policy());
        let ctx = RequestContext::new("s1".into());
        let update = orchestrator
            .initiate("login", "A2", FormData::default(), ApplicationContext::default(), &ctx)
            .await
            .expect("initiate");

        let result = orchestrator
            .authorize(update.operation_id, AuthMethod::SmsOtp, None, &ctx)
            .await;
        assert_eq!(result, Err(AuthStepError::AuthMethodNotAvailable));
    }

    /// Store that rejects every call, as when the backing database is down.
    #[derive(Debug, Clone)]
    struct UnreachableStore;

    impl OperationStore for UnreachableStore {
        async fn create(&self, _operation: Operation) -> Result<Operation> {
            Err(AuthStepError::CommunicationFailed {
                context: "operation store unreachable".to_string(),
            })
        }

        async fn get(&self, _operation_id: OperationId) -> Result<Operation> {
            Err(AuthStepError::OperationNotFound)
        }

        async fn update<F>(&self, _operation_id: OperationId, _mutate: F) -> Result<Operation>
        where
            F: FnOnce(&mut Operation) -> Result<()> + Send,
        {
            Err(AuthStepError::OperationNotFound)
        }

        async fn list_pending(&self, _user_id: &UserId) -> Result<Vec<Operation>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_failed_persistence_leaves_no_active_binding() {
        let orchestrator = Orchestrator::new(
            UnreachableStore,
            MockDataAdapter::new(),
            MockAntiFraud::new(),
            login_policy(),
            MockEnablementStore::new(),
            EngineConfig::default(),
            ScaConfig::default(),
        );
        let ctx = RequestContext::new("s1".into());

        let result = orchestrator
            .initiate("login", "A2", FormData::default(), ApplicationContext::default(), &ctx)
            .await;
        assert!(matches!(
            result,
            Err(AuthStepError::CommunicationFailed { .. })
        ));

        // The binding made for the unpersisted operation was marked
        // terminal, so the session is not wedged: a retry hits the store
        // error again instead of a session conflict.
        assert_eq!(
            orchestrator
                .registry()
                .stale_operations(&ctx.session_id)
                .expect("registry"),
            vec![]
        );
        let retry = orchestrator
            .initiate("login", "A2", FormData::default(), ApplicationContext::default(), &ctx)
            .await;
        assert!(matches!(
            retry,
            Err(AuthStepError::CommunicationFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_operation_config_lookup() {
        let orchestrator = orchestrator(login_policy());
        let template = orchestrator
            .get_operation_config("login")
            .expect("configured");
        assert_eq!(template.operation_name, "login");
        assert!(matches!(
            orchestrator.get_operation_config("transfer"),
            Err(AuthStepError::OperationConfigNotFound { .. })
        ));
    }
}
