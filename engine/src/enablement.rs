//! Method enablement resolution and the SCA login override.
//!
//! Two concerns live here. Enablement filtering drops candidate steps whose
//! method is currently disabled for the resolved user (or for the anonymous
//! default set), and runs after every create/read/update so stale candidates
//! never leak to callers. The SCA override substitutes the SCA login method
//! for the nominal one and reshapes the *displayed* operation to a login
//! presentation — strictly a read-time projection, the stored aggregate is
//! never touched.

use crate::config::ScaConfig;
use crate::error::Result;
use crate::providers::EnablementStore;
use crate::state::{AuthMethod, AuthStep, FormData, Operation, UserId};

/// Resolves effective authentication methods and filters candidate steps by
/// enablement.
#[derive(Debug, Clone)]
pub struct MethodEnablementResolver<E>
where
    E: EnablementStore + Clone,
{
    store: E,
    sca: ScaConfig,
}

impl<E> MethodEnablementResolver<E>
where
    E: EnablementStore + Clone,
{
    /// Create a resolver over the given enablement store.
    #[must_use]
    pub const fn new(store: E, sca: ScaConfig) -> Self {
        Self { store, sca }
    }

    /// Drop every step whose method is disabled for the user.
    ///
    /// # Errors
    ///
    /// Returns error if the enablement store is unreachable.
    pub async fn filter_steps(
        &self,
        steps: &mut Vec<AuthStep>,
        user_id: Option<&UserId>,
    ) -> Result<()> {
        if steps.is_empty() {
            return Ok(());
        }
        let record = self.store.enablement(user_id).await?;
        steps.retain(|step| record.is_enabled(step.auth_method));
        Ok(())
    }

    /// Whether a single method is currently enabled for the user.
    ///
    /// # Errors
    ///
    /// Returns error if the enablement store is unreachable.
    pub async fn is_enabled(&self, method: AuthMethod, user_id: Option<&UserId>) -> Result<bool> {
        let record = self.store.enablement(user_id).await?;
        Ok(record.is_enabled(method))
    }

    /// Resolve the effective method for an operation.
    ///
    /// The SCA override applies when the operation is an approval operation
    /// (not already presented as a login) whose candidate steps still
    /// include the SCA login step: the nominal method is then replaced by
    /// [`AuthMethod::ScaLogin`].
    #[must_use]
    pub fn resolve_effective_method(
        &self,
        operation: &Operation,
        nominal: AuthMethod,
    ) -> AuthMethod {
        if nominal != AuthMethod::ScaLogin
            && operation.operation_name != self.sca.login_operation_name
            && operation.is_auth_method_available(AuthMethod::ScaLogin)
        {
            return AuthMethod::ScaLogin;
        }
        nominal
    }

    /// Apply the SCA login display projection when the effective method for
    /// the operation is the SCA login.
    ///
    /// Rewrites the displayed name, data and form messages to the login
    /// template while preserving the user's recorded inputs. Must only be
    /// called on read-time copies of the aggregate.
    pub fn apply_sca_projection(&self, operation: &mut Operation, nominal: AuthMethod) {
        if self.resolve_effective_method(operation, nominal) != AuthMethod::ScaLogin {
            return;
        }
        operation.operation_name = self.sca.login_operation_name.clone();
        operation.operation_data = self.sca.login_operation_data.clone();
        let mut form_data = FormData::with_messages(
            &self.sca.login_title,
            &self.sca.login_greeting,
            &self.sca.login_summary,
        );
        form_data.user_input = std::mem::take(&mut operation.form_data.user_input);
        operation.form_data = form_data;
    }
}
