//! Method enablement store trait.

use super::EnablementRecord;
use crate::error::Result;
use crate::state::UserId;

/// Read-only source of per-user authentication method enablement.
///
/// Owned by an external configuration store; the engine only queries it.
pub trait EnablementStore: Send + Sync {
    /// Enablement record for the given user, or the anonymous default set
    /// when the user is not yet known.
    ///
    /// # Errors
    ///
    /// Returns error if the configuration store is unreachable.
    fn enablement(
        &self,
        user_id: Option<&UserId>,
    ) -> impl std::future::Future<Output = Result<EnablementRecord>> + Send;
}
