//! Mock offline signature verifier for testing.

use crate::error::{AuthStepError, Result};
use crate::providers::{SignatureType, SignatureVerification, SignatureVerifier};
use crate::state::UserId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Mock signature verifier with scripted activations.
///
/// An activation maps a device activation id to its owning user and the
/// auth code the device would produce. Any other code is an invalid
/// signature, not an error.
///
/// **WARNING**: Do NOT use in production. This is for testing only!
#[derive(Clone)]
pub struct MockSignatureVerifier {
    activations: Arc<Mutex<HashMap<String, (UserId, String)>>>,
    fail: Arc<Mutex<bool>>,
}

impl MockSignatureVerifier {
    /// Create a new mock signature verifier.
    #[must_use]
    pub fn new() -> Self {
        Self {
            activations: Arc::new(Mutex::new(HashMap::new())),
            fail: Arc::new(Mutex::new(false)),
        }
    }

    /// Register an activation with the auth code it will accept.
    #[allow(clippy::unwrap_used)] // Test mock: mutex poisoning is a test failure
    pub fn register_activation(&self, activation_id: &str, user_id: &UserId, auth_code: &str) {
        self.activations.lock().unwrap().insert(
            activation_id.to_string(),
            (user_id.clone(), auth_code.to_string()),
        );
    }

    /// Make subsequent verification calls fail, simulating an outage.
    #[allow(clippy::unwrap_used)] // Test mock: mutex poisoning is a test failure
    pub fn fail_calls(&self, fail: bool) {
        *self.fail.lock().unwrap() = fail;
    }
}

impl Default for MockSignatureVerifier {
    fn default() -> Self {
        Self::new()
    }
}

impl SignatureVerifier for MockSignatureVerifier {
    #[allow(clippy::unwrap_used)] // Test mock: mutex poisoning is a test failure
    async fn verify_offline_signature(
        &self,
        activation_id: &str,
        _payload: &str,
        auth_code: &str,
        _signature_type: SignatureType,
    ) -> Result<SignatureVerification> {
        if *self.fail.lock().unwrap() {
            return Err(AuthStepError::CommunicationFailed {
                context: "signature verifier unreachable".to_string(),
            });
        }

        let activations = self.activations.lock().unwrap();
        Ok(match activations.get(activation_id) {
            Some((user_id, expected)) if expected == auth_code => SignatureVerification {
                valid: true,
                user_id: Some(user_id.clone()),
            },
            _ => SignatureVerification {
                valid: false,
                user_id: None,
            },
        })
    }
}
