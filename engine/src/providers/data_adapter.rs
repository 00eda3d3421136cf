//! Data Adapter trait.
//!
//! The Data Adapter is the external collaborator that performs actual
//! credential verification and receives operation lifecycle notifications.
//! The engine only ever talks to it through this trait.

use super::{AuthenticationContext, CredentialVerification, UserDetail};
use crate::error::Result;
use crate::state::{
    FormDataChange, OperationChange, OperationContext, OperationId, OrganizationId, UserId,
};

/// External credential verification and lifecycle notification service.
///
/// # Implementation Notes
///
/// - Lookup and verification calls are on the request's critical path and
///   should fail with `CommunicationFailed` when unreachable.
/// - The two notification methods are invoked best-effort by the engine:
///   their errors are logged by the caller and never roll back a state
///   transition.
pub trait DataAdapter: Send + Sync {
    /// Look up a user by login identifier.
    ///
    /// # Errors
    ///
    /// Returns error if the user is unknown or the collaborator is
    /// unreachable.
    fn lookup_user(
        &self,
        username: &str,
        organization_id: &OrganizationId,
        operation_context: &OperationContext,
    ) -> impl std::future::Future<Output = Result<UserDetail>> + Send;

    /// Verify a user's credential.
    ///
    /// A failed credential is **not** an error — it is a successful call
    /// returning `verified: false` with the verifier's remaining-attempt
    /// counter.
    ///
    /// # Errors
    ///
    /// Returns error if the collaborator is unreachable.
    fn authenticate_user(
        &self,
        user_id: &UserId,
        organization_id: &OrganizationId,
        credential: &str,
        auth_context: &AuthenticationContext,
        operation_context: &OperationContext,
    ) -> impl std::future::Future<Output = Result<CredentialVerification>> + Send;

    /// Notify the adapter that an operation reached a terminal state.
    ///
    /// # Errors
    ///
    /// Returns error if the collaborator is unreachable; the engine logs and
    /// ignores such failures.
    fn operation_changed_notification(
        &self,
        change: OperationChange,
        user_id: Option<&UserId>,
        organization_id: Option<&OrganizationId>,
        operation_context: &OperationContext,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Notify the adapter that the user changed the operation's form data
    /// (e.g. picked a bank account).
    ///
    /// # Errors
    ///
    /// Returns error if the collaborator is unreachable; the engine logs and
    /// ignores such failures.
    fn form_data_changed_notification(
        &self,
        change: &FormDataChange,
        user_id: Option<&UserId>,
        operation_id: OperationId,
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}
