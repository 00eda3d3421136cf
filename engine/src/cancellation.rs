//! Typed, idempotent operation cancellation.
//!
//! Cancellation is the one transition shared by several triggers: explicit
//! user cancel, operation expiry, and session interruption when a newer
//! operation supersedes a stale one. All of them funnel through
//! [`CancellationService::cancel_operation`] so the terminal encoding, the
//! registry bump and the best-effort notifications stay uniform.

use crate::error::Result;
use crate::policy::StepPolicy;
use crate::providers::{AntiFraudService, DataAdapter, OperationStore};
use crate::session::SessionBindingRegistry;
use crate::state::{
    AuthMethod, AuthStepResult, CancelReason, Operation, OperationChange, OperationId,
    TerminationReason,
};
use chrono::Utc;
use tracing::{error, info};

/// Cancels operations on behalf of the orchestrator.
///
/// Cheaply cloneable; clones share the underlying collaborators.
#[derive(Debug, Clone)]
pub struct CancellationService<S, D, A, P>
where
    S: OperationStore + Clone,
    D: DataAdapter + Clone,
    A: AntiFraudService + Clone,
    P: StepPolicy + Clone,
{
    store: S,
    data_adapter: D,
    anti_fraud: A,
    policy: P,
    registry: SessionBindingRegistry,
}

impl<S, D, A, P> CancellationService<S, D, A, P>
where
    S: OperationStore + Clone,
    D: DataAdapter + Clone,
    A: AntiFraudService + Clone,
    P: StepPolicy + Clone,
{
    /// Create a cancellation service over the given collaborators.
    #[must_use]
    pub const fn new(
        store: S,
        data_adapter: D,
        anti_fraud: A,
        policy: P,
        registry: SessionBindingRegistry,
    ) -> Self {
        Self {
            store,
            data_adapter,
            anti_fraud,
            policy,
            registry,
        }
    }

    /// Cancel an operation with a typed reason.
    ///
    /// Appends a canceled history entry attributed to `auth_method`, fails
    /// the operation through the step policy and records the result in the
    /// session registry. Collaborator notifications are best-effort: their
    /// failures are logged and never roll back the transition.
    ///
    /// Idempotent: cancelling an operation that is already terminal returns
    /// `Ok(None)` without touching history.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::AuthStepError::OperationNotFound`] for an
    /// unknown operation, or a store/policy error.
    pub async fn cancel_operation(
        &self,
        operation_id: OperationId,
        auth_method: AuthMethod,
        reason: CancelReason,
    ) -> Result<Option<Operation>> {
        let snapshot = self.store.get(operation_id).await?;
        if snapshot.is_terminal() {
            info!(
                operation_id = %operation_id,
                "cancellation skipped, operation already terminal"
            );
            return Ok(None);
        }

        let policy = self.policy.clone();
        let updated = self
            .store
            .update(operation_id, move |operation| {
                if operation.is_terminal() {
                    // Lost the race against another terminal transition.
                    return Err(terminal_error(operation));
                }
                operation.record_step(
                    auth_method,
                    AuthStepResult::Canceled,
                    Some(reason),
                    Utc::now(),
                );
                let decision = policy.decide(operation, AuthStepResult::Canceled)?;
                operation.result = decision.result;
                operation.steps = decision.steps;
                Ok(())
            })
            .await;

        let updated = match updated {
            Ok(operation) => operation,
            Err(err) if err.is_terminal_state() => return Ok(None),
            Err(err) => return Err(err),
        };

        self.registry.record_result(operation_id, updated.result)?;

        info!(
            operation_id = %operation_id,
            auth_method = %auth_method,
            ?reason,
            "operation canceled"
        );

        self.notify_canceled(&updated, reason).await;
        Ok(Some(updated))
    }

    /// Fire the best-effort termination notifications for a cancellation.
    async fn notify_canceled(&self, operation: &Operation, reason: CancelReason) {
        if let Err(err) = self
            .data_adapter
            .operation_changed_notification(
                OperationChange::Canceled { reason },
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
            .execute_logout_action(operation.operation_id, TerminationReason::Canceled)
            .await
        {
            error!(
                operation_id = %operation.operation_id,
                %err,
                "anti-fraud logout action failed"
            );
        }
    }
}

fn terminal_error(operation: &Operation) -> crate::error::AuthStepError {
    use crate::error::AuthStepError;
    use crate::state::AuthResult;

    if operation.is_canceled() {
        AuthStepError::OperationAlreadyCanceled
    } else if operation.result == AuthResult::Done {
        AuthStepError::OperationAlreadyFinished
    } else {
        AuthStepError::OperationAlreadyFailed
    }
}
