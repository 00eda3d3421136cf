//! Method authenticator capability interface.
//!
//! Every concrete authentication method (form login, QR code, SMS OTP,
//! operation review, SCA login) integrates with the engine through this one
//! interface: attempt local credential verification for a request, and
//! report either a resolved identity or a rejection. The engine's
//! `build_authorization_response` drives the rest — it must never be
//! bypassed.

use crate::context::RequestContext;
use crate::error::Result;
use crate::state::{AuthMethod, OrganizationId, UserId};

/// Identity resolved by a successful authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedIdentity {
    /// Authenticated user.
    pub user_id: UserId,

    /// Organization the authentication was performed against.
    pub organization_id: OrganizationId,
}

impl ResolvedIdentity {
    /// Create a resolved identity.
    #[must_use]
    pub const fn new(user_id: UserId, organization_id: OrganizationId) -> Self {
        Self {
            user_id,
            organization_id,
        }
    }
}

/// Outcome of a single credential verification attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthenticationResult {
    /// The credential verified; the step may be confirmed.
    Authenticated(ResolvedIdentity),

    /// The credential was rejected; the attempt is recorded as a failed
    /// step. Carries the verifier-side remaining-attempt counter so it can
    /// be reconciled with the step policy's budget.
    Rejected {
        /// Remaining attempts reported by the credential verifier, `None`
        /// when the verifier does not expose a counter.
        remaining_attempts: Option<u32>,
    },
}

/// One concrete authentication method.
///
/// Implementations typically call the Data Adapter or signature verifier to
/// check the credential carried by `Request`, and map "credential rejected"
/// to [`AuthenticationResult::Rejected`] rather than an error — the engine
/// then records the failed step through its `fail` path.
pub trait MethodAuthenticator: Send + Sync {
    /// Method-specific request payload.
    type Request: Send + Sync;

    /// Nominal authentication method this authenticator implements.
    fn method(&self) -> AuthMethod;

    /// Attempt to authenticate the request.
    ///
    /// # Errors
    ///
    /// Returns error only for faults that should abort the request
    /// entirely (collaborator unreachable, malformed request).
    fn authenticate(
        &self,
        request: &Self::Request,
        ctx: &RequestContext,
    ) -> impl std::future::Future<Output = Result<AuthenticationResult>> + Send;
}
