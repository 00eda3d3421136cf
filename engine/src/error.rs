//! Error types for operation orchestration.

use thiserror::Error;

/// Result type alias for orchestration operations.
pub type Result<T> = std::result::Result<T, AuthStepError>;

/// Error taxonomy for the operation orchestration engine.
///
/// Variants are organized by category. Callers are expected to translate
/// these into their own transport format; none of them should be retried
/// blindly — the idempotency-race variants in particular represent distinct
/// user-facing states, not transient failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthStepError {
    // ═══════════════════════════════════════════════════════════
    // Lookup Errors
    // ═══════════════════════════════════════════════════════════

    /// Operation with the given ID does not exist.
    #[error("Operation not found")]
    OperationNotFound,

    /// No operation is bound to the current session.
    #[error("Operation is not available")]
    OperationNotAvailable,

    // ═══════════════════════════════════════════════════════════
    // Idempotency Races
    // ═══════════════════════════════════════════════════════════

    /// Operation already finished successfully.
    #[error("Operation is already finished")]
    OperationAlreadyFinished,

    /// Operation was already canceled.
    #[error("Operation is already canceled")]
    OperationAlreadyCanceled,

    /// Operation already failed.
    #[error("Operation has already failed")]
    OperationAlreadyFailed,

    // ═══════════════════════════════════════════════════════════
    // Validation Errors
    // ═══════════════════════════════════════════════════════════

    /// Operation expired; an implicit cancellation has been attempted.
    #[error("Operation has timed out")]
    OperationTimeout,

    /// Concurrency hash mismatch — a newer tab or client advanced the
    /// operation. The user must restart from the current state.
    #[error("Operation was interrupted")]
    OperationInterrupted,

    /// Operation has no history, which indicates a corrupt or incomplete
    /// aggregate.
    #[error("Operation is missing its history")]
    OperationMissingHistory,

    /// Client-chosen authentication method is not among the candidate steps.
    #[error("Invalid chosen authentication method")]
    InvalidChosenMethod,

    /// Requested authentication method is not available for this operation.
    #[error("Authentication method is not available")]
    AuthMethodNotAvailable,

    // ═══════════════════════════════════════════════════════════
    // Authentication Errors
    // ═══════════════════════════════════════════════════════════

    /// Credential verification failed; the operation may still continue.
    ///
    /// `remaining_attempts` is the reconciled count across the step policy
    /// and the credential verifier — callers must surface this value, never
    /// either raw counter.
    #[error("User authentication failed")]
    AuthenticationFailed {
        /// Reconciled number of remaining attempts, `None` for no limit.
        remaining_attempts: Option<u32>,
    },

    /// Maximum number of authentication attempts exceeded; the method has
    /// failed and the operation transitioned to a failed state.
    #[error("Maximum number of authentication attempts exceeded")]
    MaxAttemptsExceeded,

    // ═══════════════════════════════════════════════════════════
    // Session Errors
    // ═══════════════════════════════════════════════════════════

    /// Session binding was rejected (operation already bound elsewhere).
    #[error("Session binding failed")]
    SessionConflict,

    // ═══════════════════════════════════════════════════════════
    // System Errors
    // ═══════════════════════════════════════════════════════════

    /// Unknown operation type — no step routing is configured for it.
    #[error("Operation configuration not found: {operation_name}")]
    OperationConfigNotFound {
        /// Name of the unconfigured operation type.
        operation_name: String,
    },

    /// A collaborator (Data Adapter, signature verifier, ...) was
    /// unreachable or returned an invalid response.
    #[error("Communication with collaborator failed: {context}")]
    CommunicationFailed {
        /// Short description of the failing call.
        context: String,
    },

    /// Concurrent write detected by the optimistic version check.
    #[error("Operation update conflict")]
    WriteConflict,

    /// Internal error (should not be exposed to users).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthStepError {
    /// Returns `true` if this error describes an operation that is already
    /// in a terminal state.
    #[must_use]
    pub const fn is_terminal_state(&self) -> bool {
        matches!(
            self,
            Self::OperationAlreadyFinished
                | Self::OperationAlreadyCanceled
                | Self::OperationAlreadyFailed
        )
    }

    /// Returns `true` if this error is caused by caller desynchronization
    /// (stale client state) rather than a system fault.
    #[must_use]
    pub const fn is_client_desync(&self) -> bool {
        matches!(
            self,
            Self::OperationInterrupted | Self::InvalidChosenMethod | Self::AuthMethodNotAvailable
        )
    }
}
