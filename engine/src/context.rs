//! Explicit per-request context.
//!
//! The engine never reads ambient request state; everything a call needs
//! from the transport layer is threaded through [`RequestContext`].

use crate::state::SessionId;

/// Per-request context supplied by the calling controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    /// Client session identifier.
    pub session_id: SessionId,

    /// Operation hash the client last observed, when supplied.
    ///
    /// Browser clients send the hash so a stale tab racing a newer tab can
    /// be detected. Non-browser clients omit it; the concurrency check is
    /// opportunistic, not mandatory.
    pub operation_hash: Option<String>,
}

impl RequestContext {
    /// Create a context without a client-supplied operation hash.
    #[must_use]
    pub const fn new(session_id: SessionId) -> Self {
        Self {
            session_id,
            operation_hash: None,
        }
    }

    /// Attach the operation hash observed by the client.
    #[must_use]
    pub fn with_operation_hash(mut self, hash: &str) -> Self {
        self.operation_hash = Some(hash.to_string());
        self
    }
}
