//! Mock method enablement store for testing.

use crate::error::Result;
use crate::providers::{EnablementRecord, EnablementStore};
use crate::state::{AuthMethod, UserId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Mock enablement store with per-user overrides.
///
/// Queries for a user without an explicit record fall back to the anonymous
/// default set; methods without any entry are enabled.
///
/// **WARNING**: Do NOT use in production. This is for testing only!
#[derive(Clone)]
pub struct MockEnablementStore {
    records: Arc<Mutex<HashMap<Option<UserId>, EnablementRecord>>>,
}

impl MockEnablementStore {
    /// Create a new mock enablement store with everything enabled.
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Set a method's enablement for a user, or for the anonymous default
    /// set when `user_id` is `None`.
    #[allow(clippy::unwrap_used)] // Test mock: mutex poisoning is a test failure
    pub fn set_enabled(&self, user_id: Option<&UserId>, method: AuthMethod, enabled: bool) {
        let mut records = self.records.lock().unwrap();
        records
            .entry(user_id.cloned())
            .or_default()
            .set_enabled(method, enabled);
    }
}

impl Default for MockEnablementStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EnablementStore for MockEnablementStore {
    #[allow(clippy::unwrap_used)] // Test mock: mutex poisoning is a test failure
    async fn enablement(&self, user_id: Option<&UserId>) -> Result<EnablementRecord> {
        let records = self.records.lock().unwrap();
        Ok(records
            .get(&user_id.cloned())
            .or_else(|| records.get(&None))
            .cloned()
            .unwrap_or_default())
    }
}
