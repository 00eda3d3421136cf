//! Session binding registry.
//!
//! Maps a client session to at most one *active* operation and maintains the
//! operation hash used for optimistic concurrency detection between browser
//! tabs. Binding a new operation while a different unfinished one is still
//! bound requires cancelling the stale one first; the registry exposes the
//! stale bindings, the cascade itself is driven by the orchestrator.

use crate::error::{AuthStepError, Result};
use crate::state::{AuthResult, OperationId, SessionId};
use base64::Engine;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Binding of a client session to an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionBinding {
    /// Client session.
    pub session_id: SessionId,

    /// Bound operation.
    pub operation_id: OperationId,

    /// Last known operation result.
    pub result: AuthResult,

    /// Monotonically increasing revision, bumped on every recorded state
    /// change. Input to the operation hash.
    pub revision: u64,
}

#[derive(Debug, Default)]
struct RegistryInner {
    by_session: HashMap<SessionId, SessionBinding>,
    by_operation: HashMap<OperationId, SessionId>,
}

/// Registry of session-to-operation bindings.
///
/// Cheaply cloneable; clones share the same underlying state.
#[derive(Debug, Clone, Default)]
pub struct SessionBindingRegistry {
    inner: Arc<Mutex<RegistryInner>>,
}

impl SessionBindingRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(RegistryInner::default())),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, RegistryInner>> {
        self.inner
            .lock()
            .map_err(|_| AuthStepError::Internal("session registry lock poisoned".to_string()))
    }

    /// Operations bound to the session that are still unfinished.
    ///
    /// The caller must cancel these (reason "interrupted") before binding a
    /// new operation to the session.
    ///
    /// # Errors
    ///
    /// Returns error if the registry lock is poisoned.
    pub fn stale_operations(&self, session_id: &SessionId) -> Result<Vec<OperationId>> {
        let inner = self.lock()?;
        Ok(inner
            .by_session
            .get(session_id)
            .filter(|binding| binding.result == AuthResult::Continue)
            .map(|binding| binding.operation_id)
            .into_iter()
            .collect())
    }

    /// Bind an operation to a session.
    ///
    /// A binding for the same session is superseded (and destroyed) only if
    /// it is no longer active; active bindings must be cancelled and
    /// recorded terminal first.
    ///
    /// # Errors
    ///
    /// Returns [`AuthStepError::SessionConflict`] when the operation is
    /// already bound to a different session, or when the session still has a
    /// different active operation bound.
    pub fn bind(
        &self,
        session_id: &SessionId,
        operation_id: OperationId,
        result: AuthResult,
    ) -> Result<()> {
        let mut inner = self.lock()?;

        if let Some(existing_session) = inner.by_operation.get(&operation_id) {
            if existing_session != session_id {
                return Err(AuthStepError::SessionConflict);
            }
        }
        let superseded = inner
            .by_session
            .get(session_id)
            .map(|binding| (binding.operation_id, binding.result));
        if let Some((old_operation, old_result)) = superseded {
            if old_operation != operation_id && old_result == AuthResult::Continue {
                return Err(AuthStepError::SessionConflict);
            }
            inner.by_operation.remove(&old_operation);
        }

        inner.by_operation.insert(operation_id, session_id.clone());
        inner.by_session.insert(
            session_id.clone(),
            SessionBinding {
                session_id: session_id.clone(),
                operation_id,
                result,
                revision: 0,
            },
        );
        Ok(())
    }

    /// Binding holding the given operation, when one exists.
    ///
    /// # Errors
    ///
    /// Returns error if the registry lock is poisoned.
    pub fn binding_for_operation(
        &self,
        operation_id: OperationId,
    ) -> Result<Option<SessionBinding>> {
        let inner = self.lock()?;
        Ok(inner
            .by_operation
            .get(&operation_id)
            .and_then(|session_id| inner.by_session.get(session_id))
            .cloned())
    }

    /// Operation currently bound to the session, when one exists.
    ///
    /// # Errors
    ///
    /// Returns error if the registry lock is poisoned.
    pub fn operation_for_session(&self, session_id: &SessionId) -> Result<Option<OperationId>> {
        let inner = self.lock()?;
        Ok(inner
            .by_session
            .get(session_id)
            .map(|binding| binding.operation_id))
    }

    /// Record an operation state change: updates the last known result and
    /// bumps the revision so stale clients fail the hash comparison.
    ///
    /// Unbound operations are ignored — non-browser integrations run
    /// without a session binding.
    ///
    /// # Errors
    ///
    /// Returns error if the registry lock is poisoned.
    pub fn record_result(&self, operation_id: OperationId, result: AuthResult) -> Result<()> {
        let mut inner = self.lock()?;
        let session_id = inner.by_operation.get(&operation_id).cloned();
        if let Some(session_id) = session_id {
            if let Some(binding) = inner.by_session.get_mut(&session_id) {
                binding.result = result;
                binding.revision += 1;
            }
        }
        Ok(())
    }

    /// Current operation hash for concurrency detection, `None` when the
    /// operation is not bound to any session.
    ///
    /// # Errors
    ///
    /// Returns error if the registry lock is poisoned.
    pub fn operation_hash(&self, operation_id: OperationId) -> Result<Option<String>> {
        Ok(self
            .binding_for_operation(operation_id)?
            .map(|binding| hash_revision(operation_id, binding.revision)))
    }
}

fn hash_revision(operation_id: OperationId, revision: u64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(operation_id.to_string().as_bytes());
    hasher.update(b":");
    hasher.update(revision.to_be_bytes());
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(name: &str) -> SessionId {
        SessionId::from(name)
    }

    #[test]
    fn test_bind_and_lookup() {
        let registry = SessionBindingRegistry::new();
        let op = OperationId::new();
        let s = session("s1");

        registry.bind(&s, op, AuthResult::Continue).expect("bind");
        assert_eq!(
            registry.operation_for_session(&s).expect("lookup"),
            Some(op)
        );
        let binding = registry
            .binding_for_operation(op)
            .expect("lookup")
            .expect("binding");
        assert_eq!(binding.session_id, s);
        assert_eq!(binding.revision, 0);
    }

    #[test]
    fn test_operation_bound_elsewhere_is_conflict() {
        let registry = SessionBindingRegistry::new();
        let op = OperationId::new();

        registry
            .bind(&session("s1"), op, AuthResult::Continue)
            .expect("bind");
        assert_eq!(
            registry.bind(&session("s2"), op, AuthResult::Continue),
            Err(AuthStepError::SessionConflict)
        );
    }

    #[test]
    fn test_active_binding_blocks_new_operation() {
        let registry = SessionBindingRegistry::new();
        let s = session("s1");
        let stale = OperationId::new();
        let fresh = OperationId::new();

        registry.bind(&s, stale, AuthResult::Continue).expect("bind");
        assert_eq!(
            registry.bind(&s, fresh, AuthResult::Continue),
            Err(AuthStepError::SessionConflict)
        );
        assert_eq!(registry.stale_operations(&s).expect("stale"), vec![stale]);

        // Once the stale operation is recorded terminal, rebinding succeeds
        // and the old binding is destroyed.
        registry
            .record_result(stale, AuthResult::Failed)
            .expect("record");
        registry.bind(&s, fresh, AuthResult::Continue).expect("bind");
        assert_eq!(registry.binding_for_operation(stale).expect("lookup"), None);
        assert_eq!(
            registry.operation_for_session(&s).expect("lookup"),
            Some(fresh)
        );
    }

    #[test]
    fn test_hash_changes_with_every_recorded_result() {
        let registry = SessionBindingRegistry::new();
        let op = OperationId::new();
        let s = session("s1");
        registry.bind(&s, op, AuthResult::Continue).expect("bind");

        let before = registry.operation_hash(op).expect("hash").expect("bound");
        registry
            .record_result(op, AuthResult::Continue)
            .expect("record");
        let after = registry.operation_hash(op).expect("hash").expect("bound");
        assert_ne!(before, after);
    }

    #[test]
    fn test_unbound_operation_has_no_hash() {
        let registry = SessionBindingRegistry::new();
        assert_eq!(registry.operation_hash(OperationId::new()).expect("hash"), None);
    }
}
