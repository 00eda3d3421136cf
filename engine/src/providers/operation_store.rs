//! Operation store trait.

use crate::error::Result;
use crate::state::{Operation, OperationId, UserId};

/// Persistence of [`Operation`] aggregates.
///
/// # Concurrency Contract
///
/// `update` must serialize mutations **per operation id**: concurrent
/// updates of the same operation never interleave their
/// history-append + state-transition, and an update of one operation never
/// blocks waiting on another operation's lock. The store bumps the
/// aggregate's `version` on every successful update.
pub trait OperationStore: Send + Sync {
    /// Persist a freshly created operation.
    ///
    /// # Errors
    ///
    /// Returns error if an operation with the same id already exists or the
    /// store is unreachable.
    fn create(
        &self,
        operation: Operation,
    ) -> impl std::future::Future<Output = Result<Operation>> + Send;

    /// Fetch the current snapshot of an operation.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::AuthStepError::OperationNotFound`] for an
    /// unknown id.
    fn get(
        &self,
        operation_id: OperationId,
    ) -> impl std::future::Future<Output = Result<Operation>> + Send;

    /// Mutate an operation inside its per-id critical section.
    ///
    /// The closure either mutates the aggregate and returns `Ok(())`, or
    /// rejects the transition with a typed error, leaving the aggregate
    /// untouched. On success the store bumps `version` and returns the
    /// updated snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::AuthStepError::OperationNotFound`] for an
    /// unknown id, or the closure's rejection error.
    fn update<F>(
        &self,
        operation_id: OperationId,
        mutate: F,
    ) -> impl std::future::Future<Output = Result<Operation>> + Send
    where
        F: FnOnce(&mut Operation) -> Result<()> + Send;

    /// List a user's unfinished operations.
    ///
    /// # Errors
    ///
    /// Returns error if the store is unreachable.
    fn list_pending(
        &self,
        user_id: &UserId,
    ) -> impl std::future::Future<Output = Result<Vec<Operation>>> + Send;
}
