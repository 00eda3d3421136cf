//! Collaborator contracts.
//!
//! This module defines traits for all external dependencies the engine
//! orchestrates against. The traits are **interfaces**, not implementations:
//! the orchestrator depends on them, and the embedding application provides
//! concrete implementations (HTTP clients in production, the in-memory mocks
//! from [`crate::mocks`] in tests).
//!
//! Credential verification itself is always delegated — the engine never
//! sees raw secrets beyond passing opaque credential strings through to the
//! Data Adapter.

use crate::state::{AuthMethod, OrganizationId, UserId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub mod anti_fraud;
pub mod authenticator;
pub mod data_adapter;
pub mod enablement_store;
pub mod operation_store;
pub mod signature;

// Re-export collaborator traits
pub use anti_fraud::AntiFraudService;
pub use authenticator::{AuthenticationResult, MethodAuthenticator, ResolvedIdentity};
pub use data_adapter::DataAdapter;
pub use enablement_store::EnablementStore;
pub use operation_store::OperationStore;
pub use signature::SignatureVerifier;

/// Status of a user account as reported by the external credential system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountStatus {
    /// Account may authenticate.
    Active,
    /// Account is blocked, removed or otherwise unusable.
    NotActive,
}

/// User detail returned by a Data Adapter lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDetail {
    /// Resolved user identifier.
    pub user_id: UserId,

    /// Organization the user belongs to.
    pub organization_id: OrganizationId,

    /// Current account status.
    pub account_status: AccountStatus,
}

/// How the credential passed to the Data Adapter is protected in transit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CredentialProtection {
    /// Credential is passed as plain text.
    Plaintext,
    /// Credential is encrypted with the named cipher transformation.
    Encrypted {
        /// Cipher transformation identifier.
        cipher_transformation: String,
    },
}

/// Context describing the authentication request made to the Data Adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticationContext {
    /// Credential protection in effect.
    pub protection: CredentialProtection,
}

/// Result of a credential verification call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialVerification {
    /// Whether the credential was verified.
    pub verified: bool,

    /// Remaining attempts reported by the verifier, `None` for no limit or
    /// when the verifier does not expose its counter.
    pub remaining_attempts: Option<u32>,

    /// Verifier-supplied error message key, when verification failed.
    pub error_message: Option<String>,
}

/// Type of offline signature to verify for possession-based methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignatureType {
    /// Possession factor only.
    Possession,
    /// Possession and knowledge factors.
    PossessionKnowledge,
    /// Possession and biometry factors.
    PossessionBiometry,
}

/// Result of an offline signature verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureVerification {
    /// Whether the signature is valid.
    pub valid: bool,

    /// User that owns the signing activation, when the verifier knows it.
    pub user_id: Option<UserId>,
}

/// Per-method enablement entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodEnablement {
    /// Whether the method may currently be used.
    pub enabled: bool,

    /// Method-specific configuration values.
    pub config: BTreeMap<String, String>,
}

/// Per-user (or anonymous default) mapping of authentication method
/// enablement. Read-only from the engine's perspective.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnablementRecord {
    /// Enablement entries by method.
    pub methods: BTreeMap<String, MethodEnablement>,
}

impl EnablementRecord {
    /// Whether the method is enabled. Methods without an explicit entry are
    /// considered enabled.
    #[must_use]
    pub fn is_enabled(&self, method: AuthMethod) -> bool {
        self.methods
            .get(method.as_str())
            .is_none_or(|entry| entry.enabled)
    }

    /// Record an enablement entry for a method.
    pub fn set_enabled(&mut self, method: AuthMethod, enabled: bool) {
        self.methods.insert(
            method.as_str().to_string(),
            MethodEnablement {
                enabled,
                config: BTreeMap::new(),
            },
        );
    }
}
