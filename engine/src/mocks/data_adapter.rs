//! Mock Data Adapter for testing.

use crate::error::{AuthStepError, Result};
use crate::providers::{AuthenticationContext, CredentialVerification, DataAdapter, UserDetail};
use crate::state::{
    FormDataChange, OperationChange, OperationContext, OperationId, OrganizationId, UserId,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct AdapterState {
    users: HashMap<String, UserDetail>,
    credentials: HashMap<UserId, String>,
    remaining_attempts: HashMap<UserId, u32>,
    operation_changes: Vec<(OperationId, OperationChange)>,
    form_data_changes: Vec<(OperationId, FormDataChange)>,
    fail_notifications: bool,
    fail_calls: bool,
}

/// Mock Data Adapter with scripted users and credentials.
///
/// Records every notification it receives so tests can assert on exactly
/// which lifecycle changes were reported, and how many times.
///
/// **WARNING**: Do NOT use in production. This is for testing only!
#[derive(Clone)]
pub struct MockDataAdapter {
    state: Arc<Mutex<AdapterState>>,
}

impl MockDataAdapter {
    /// Create a new empty mock Data Adapter.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(AdapterState::default())),
        }
    }

    /// Register a user resolvable by login identifier.
    #[allow(clippy::unwrap_used)] // Test mock: mutex poisoning is a test failure
    pub fn register_user(&self, username: &str, detail: UserDetail) {
        self.state
            .lock()
            .unwrap()
            .users
            .insert(username.to_string(), detail);
    }

    /// Set the credential that verifies for a user.
    #[allow(clippy::unwrap_used)] // Test mock: mutex poisoning is a test failure
    pub fn set_credential(&self, user_id: &UserId, credential: &str) {
        self.state
            .lock()
            .unwrap()
            .credentials
            .insert(user_id.clone(), credential.to_string());
    }

    /// Set the verifier-side remaining-attempt counter for a user.
    ///
    /// The counter is decremented on every failed verification and reported
    /// in [`CredentialVerification::remaining_attempts`]. Users without a
    /// counter report `None`.
    #[allow(clippy::unwrap_used)] // Test mock: mutex poisoning is a test failure
    pub fn set_remaining_attempts(&self, user_id: &UserId, remaining: u32) {
        self.state
            .lock()
            .unwrap()
            .remaining_attempts
            .insert(user_id.clone(), remaining);
    }

    /// Make subsequent notification calls fail, simulating an outage.
    #[allow(clippy::unwrap_used)] // Test mock: mutex poisoning is a test failure
    pub fn fail_notifications(&self, fail: bool) {
        self.state.lock().unwrap().fail_notifications = fail;
    }

    /// Make subsequent lookup/verification calls fail, simulating an outage.
    #[allow(clippy::unwrap_used)] // Test mock: mutex poisoning is a test failure
    pub fn fail_calls(&self, fail: bool) {
        self.state.lock().unwrap().fail_calls = fail;
    }

    /// Operation lifecycle notifications recorded so far.
    #[must_use]
    #[allow(clippy::unwrap_used)] // Test mock: mutex poisoning is a test failure
    pub fn operation_changes(&self) -> Vec<(OperationId, OperationChange)> {
        self.state.lock().unwrap().operation_changes.clone()
    }

    /// Form data change notifications recorded so far.
    #[must_use]
    #[allow(clippy::unwrap_used)] // Test mock: mutex poisoning is a test failure
    pub fn form_data_changes(&self) -> Vec<(OperationId, FormDataChange)> {
        self.state.lock().unwrap().form_data_changes.clone()
    }
}

impl Default for MockDataAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl DataAdapter for MockDataAdapter {
    #[allow(clippy::unwrap_used)] // Test mock: mutex poisoning is a test failure
    async fn lookup_user(
        &self,
        username: &str,
        _organization_id: &OrganizationId,
        _operation_context: &OperationContext,
    ) -> Result<UserDetail> {
        let state = self.state.lock().unwrap();
        if state.fail_calls {
            return Err(AuthStepError::CommunicationFailed {
                context: "data adapter unreachable".to_string(),
            });
        }
        state
            .users
            .get(username)
            .cloned()
            .ok_or(AuthStepError::AuthenticationFailed {
                remaining_attempts: None,
            })
    }

    #[allow(clippy::unwrap_used)] // Test mock: mutex poisoning is a test failure
    async fn authenticate_user(
        &self,
        user_id: &UserId,
        _organization_id: &OrganizationId,
        credential: &str,
        _auth_context: &AuthenticationContext,
        _operation_context: &OperationContext,
    ) -> Result<CredentialVerification> {
        let mut state = self.state.lock().unwrap();
        if state.fail_calls {
            return Err(AuthStepError::CommunicationFailed {
                context: "data adapter unreachable".to_string(),
            });
        }

        let verified = state.credentials.get(user_id).map(String::as_str) == Some(credential);
        if verified {
            return Ok(CredentialVerification {
                verified: true,
                remaining_attempts: None,
                error_message: None,
            });
        }

        let remaining = state.remaining_attempts.get_mut(user_id).map(|counter| {
            *counter = counter.saturating_sub(1);
            *counter
        });
        Ok(CredentialVerification {
            verified: false,
            remaining_attempts: remaining,
            error_message: Some("login.authenticationFailed".to_string()),
        })
    }

    #[allow(clippy::unwrap_used)] // Test mock: mutex poisoning is a test failure
    async fn operation_changed_notification(
        &self,
        change: OperationChange,
        _user_id: Option<&UserId>,
        _organization_id: Option<&OrganizationId>,
        operation_context: &OperationContext,
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_notifications {
            return Err(AuthStepError::CommunicationFailed {
                context: "data adapter unreachable".to_string(),
            });
        }
        state
            .operation_changes
            .push((operation_context.operation_id, change));
        Ok(())
    }

    #[allow(clippy::unwrap_used)] // Test mock: mutex poisoning is a test failure
    async fn form_data_changed_notification(
        &self,
        change: &FormDataChange,
        _user_id: Option<&UserId>,
        operation_id: OperationId,
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_notifications {
            return Err(AuthStepError::CommunicationFailed {
                context: "data adapter unreachable".to_string(),
            });
        }
        state.form_data_changes.push((operation_id, change.clone()));
        Ok(())
    }
}
