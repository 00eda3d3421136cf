//! In-memory operation store.
//!
//! Mutations are serialized per operation id: the outer map lock is held
//! only long enough to clone the per-id handle, and the actual transition
//! runs under that operation's own async mutex. Updating one operation never
//! blocks on another operation's lock.

use crate::error::{AuthStepError, Result};
use crate::providers::OperationStore;
use crate::state::{Operation, OperationId, UserId};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

type OperationHandle = Arc<tokio::sync::Mutex<Operation>>;

/// In-memory operation store with per-id write serialization.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOperationStore {
    operations: Arc<Mutex<HashMap<OperationId, OperationHandle>>>,
}

impl InMemoryOperationStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            operations: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn handle(&self, operation_id: OperationId) -> Result<OperationHandle> {
        self.operations
            .lock()
            .map_err(|_| AuthStepError::Internal("operation map lock poisoned".to_string()))?
            .get(&operation_id)
            .cloned()
            .ok_or(AuthStepError::OperationNotFound)
    }

    /// Number of stored operations (for tests).
    ///
    /// # Errors
    ///
    /// Returns error if the map lock is poisoned.
    pub fn operation_count(&self) -> Result<usize> {
        Ok(self
            .operations
            .lock()
            .map_err(|_| AuthStepError::Internal("operation map lock poisoned".to_string()))?
            .len())
    }
}

impl OperationStore for InMemoryOperationStore {
    fn create(&self, operation: Operation) -> impl Future<Output = Result<Operation>> + Send {
        let operations = Arc::clone(&self.operations);

        async move {
            let mut map = operations
                .lock()
                .map_err(|_| AuthStepError::Internal("operation map lock poisoned".to_string()))?;

            if map.contains_key(&operation.operation_id) {
                return Err(AuthStepError::Internal(
                    "operation id already exists".to_string(),
                ));
            }

            map.insert(
                operation.operation_id,
                Arc::new(tokio::sync::Mutex::new(operation.clone())),
            );
            Ok(operation)
        }
    }

    fn get(&self, operation_id: OperationId) -> impl Future<Output = Result<Operation>> + Send {
        let handle = self.handle(operation_id);

        async move {
            let handle = handle?;
            let operation = handle.lock().await;
            Ok(operation.clone())
        }
    }

    fn update<F>(
        &self,
        operation_id: OperationId,
        mutate: F,
    ) -> impl Future<Output = Result<Operation>> + Send
    where
        F: FnOnce(&mut Operation) -> Result<()> + Send,
    {
        let handle = self.handle(operation_id);

        async move {
            let handle = handle?;
            let mut current = handle.lock().await;

            // Mutate a draft so a rejected transition leaves the aggregate
            // untouched.
            let mut draft = current.clone();
            mutate(&mut draft)?;
            draft.version = current.version + 1;
            *current = draft.clone();
            Ok(draft)
        }
    }

    fn list_pending(
        &self,
        user_id: &UserId,
    ) -> impl Future<Output = Result<Vec<Operation>>> + Send {
        let operations = Arc::clone(&self.operations);
        let user_id = user_id.clone();

        async move {
            let handles: Vec<OperationHandle> = {
                let map = operations.lock().map_err(|_| {
                    AuthStepError::Internal("operation map lock poisoned".to_string())
                })?;
                map.values().cloned().collect()
            };

            let mut pending = Vec::new();
            for handle in handles {
                let operation = handle.lock().await;
                if operation.user_id.as_ref() == Some(&user_id) && !operation.is_terminal() {
                    pending.push(operation.clone());
                }
            }
            pending.sort_by_key(|operation| operation.created_at);
            Ok(pending)
        }
    }
}
