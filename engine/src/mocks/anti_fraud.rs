//! Mock anti-fraud service for testing.

use crate::error::{AuthStepError, Result};
use crate::providers::AntiFraudService;
use crate::state::{OperationId, TerminationReason};
use std::sync::{Arc, Mutex};

/// Mock anti-fraud service recording every logout action.
///
/// **WARNING**: Do NOT use in production. This is for testing only!
#[derive(Clone)]
pub struct MockAntiFraud {
    calls: Arc<Mutex<Vec<(OperationId, TerminationReason)>>>,
    fail: Arc<Mutex<bool>>,
}

impl MockAntiFraud {
    /// Create a new mock anti-fraud service.
    #[must_use]
    pub fn new() -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            fail: Arc::new(Mutex::new(false)),
        }
    }

    /// Make subsequent logout actions fail, simulating an outage.
    #[allow(clippy::unwrap_used)] // Test mock: mutex poisoning is a test failure
    pub fn fail_logout(&self, fail: bool) {
        *self.fail.lock().unwrap() = fail;
    }

    /// Logout actions recorded so far.
    #[must_use]
    #[allow(clippy::unwrap_used)] // Test mock: mutex poisoning is a test failure
    pub fn logout_calls(&self) -> Vec<(OperationId, TerminationReason)> {
        self.calls.lock().unwrap().clone()
    }
}

impl Default for MockAntiFraud {
    fn default() -> Self {
        Self::new()
    }
}

impl AntiFraudService for MockAntiFraud {
    #[allow(clippy::unwrap_used)] // Test mock: mutex poisoning is a test failure
    async fn execute_logout_action(
        &self,
        operation_id: OperationId,
        reason: TerminationReason,
    ) -> Result<()> {
        if *self.fail.lock().unwrap() {
            return Err(AuthStepError::CommunicationFailed {
                context: "anti-fraud service unreachable".to_string(),
            });
        }
        self.calls.lock().unwrap().push((operation_id, reason));
        Ok(())
    }
}
