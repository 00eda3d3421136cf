//! # Stepflow Engine
//!
//! Orchestration engine for multi-step, multi-factor authentication flows.
//!
//! An *operation* is a tracked transaction (login, payment approval, consent
//! grant) that requires one or more authentication steps before it
//! completes. The engine owns the operation state machine and delegates
//! everything else:
//!
//! - **State machine**: operations continue, complete or fail; every attempt
//!   is recorded in an append-only history.
//! - **Step policy**: candidate next steps are re-derived after every
//!   attempt from per-operation-type routing configuration.
//! - **Session binding**: each client session drives at most one unfinished
//!   operation; stale browser tabs are detected through an operation hash.
//! - **Collaborators**: credential verification, signature verification,
//!   method enablement and anti-fraud notifications are all behind traits.
//!
//! ## Example: single-step login
//!
//! ```rust,ignore
//! use stepflow_engine::*;
//!
//! let orchestrator = Orchestrator::new(
//!     InMemoryOperationStore::new(),
//!     data_adapter,
//!     anti_fraud,
//!     RoutingPolicy::new().with_template(
//!         OperationTemplate::new("login")
//!             .phase(vec![AuthStep::new(AuthMethod::Password)]),
//!     ),
//!     enablement_store,
//!     EngineConfig::default(),
//!     ScaConfig::default(),
//! );
//!
//! let ctx = RequestContext::new(session_id);
//! let update = orchestrator
//!     .initiate("login", "A2", form_data, app_context, &ctx)
//!     .await?;
//! let outcome = orchestrator
//!     .build_authorization_response(&request, &password_authenticator, &ctx)
//!     .await?;
//! ```

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]

// Public modules
pub mod attempts;
pub mod cancellation;
pub mod config;
pub mod context;
pub mod enablement;
pub mod error;
pub mod orchestrator;
pub mod policy;
pub mod providers;
pub mod session;
pub mod state;
pub mod stores;

#[cfg(any(test, feature = "test-utils"))]
pub mod mocks;

// Re-export commonly used types
pub use attempts::resolve_remaining_attempts;
pub use cancellation::CancellationService;
pub use config::{EngineConfig, ScaConfig};
pub use context::RequestContext;
pub use enablement::MethodEnablementResolver;
pub use error::{AuthStepError, Result};
pub use orchestrator::{AuthOutcome, OperationUpdate, Orchestrator};
pub use policy::{OperationTemplate, PolicyDecision, RoutingPolicy, StepPolicy};
pub use providers::{
    AntiFraudService, AuthenticationResult, DataAdapter, EnablementStore, MethodAuthenticator,
    OperationStore, ResolvedIdentity, SignatureVerifier,
};
pub use session::{SessionBinding, SessionBindingRegistry};
pub use state::{
    ApplicationContext, AuthMethod, AuthResult, AuthStep, AuthStepResult, CancelReason, FormData,
    FormDataChange, Operation, OperationChange, OperationContext, OperationHistoryEntry,
    OperationId, OrganizationId, SessionId, TerminationReason, UserId,
};
pub use stores::InMemoryOperationStore;
