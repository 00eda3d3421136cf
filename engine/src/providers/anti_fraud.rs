//! Anti-fraud / session-tracking service trait.

use crate::error::Result;
use crate::state::{OperationId, TerminationReason};

/// External anti-fraud system notified when an operation terminates so it
/// can close its own session tracking.
pub trait AntiFraudService: Send + Sync {
    /// Trigger a logout action for the terminated operation.
    ///
    /// Invoked best-effort, off the critical path of the state transition.
    ///
    /// # Errors
    ///
    /// Returns error if the collaborator is unreachable; the engine logs and
    /// ignores such failures.
    fn execute_logout_action(
        &self,
        operation_id: OperationId,
        reason: TerminationReason,
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}
