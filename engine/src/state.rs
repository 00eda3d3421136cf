//! Core state types for the operation orchestration engine.
//!
//! The central aggregate is [`Operation`]: a tracked transaction (login,
//! payment approval, consent grant) that requires one or more authentication
//! steps before it completes. All types are `Clone` and serde-serializable so
//! snapshots can cross store and transport boundaries freely.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ═══════════════════════════════════════════════════════════════════════
// ID Types
// ═══════════════════════════════════════════════════════════════════════

/// Unique identifier for an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperationId(pub uuid::Uuid);

impl OperationId {
    /// Generate a new random `OperationId`.
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for OperationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identifier of a user, assigned by the external credential system.
///
/// Opaque to the engine — a user is only ever bound to an operation once a
/// collaborator has resolved one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Identifier of an organization, owned by an external catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrganizationId(pub String);

impl fmt::Display for OrganizationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for OrganizationId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Identifier of a client (browser) session, supplied by the transport layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    /// Generate a fresh random session identifier.
    ///
    /// Transport layers usually supply their own session IDs; this is a
    /// convenience for tests and embedded use.
    #[must_use]
    pub fn generate() -> Self {
        use rand::RngCore;

        let mut bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(uuid::Uuid::from_bytes(bytes).to_string())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Enumerations
// ═══════════════════════════════════════════════════════════════════════

/// Authentication method — the closed set of step kinds the engine routes
/// between. Concrete controllers for each method live outside the engine and
/// integrate through the method-authenticator capability interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuthMethod {
    /// Initial synthetic step recorded when an operation is created.
    Init,
    /// Assignment of a user identity without credential verification.
    UserIdAssign,
    /// Username and password form login.
    Password,
    /// One-time code delivered over SMS.
    SmsOtp,
    /// Possession-based mobile token (push approval or offline QR code).
    MobileToken,
    /// Display of operation detail for review before a stronger step.
    OperationReview,
    /// Strong customer authentication login.
    ScaLogin,
    /// Strong customer authentication approval.
    ScaApproval,
    /// Consent form approval.
    Consent,
}

impl AuthMethod {
    /// Get the method name as a string (stable, used in logs and params).
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::UserIdAssign => "user_id_assign",
            Self::Password => "password",
            Self::SmsOtp => "sms_otp",
            Self::MobileToken => "mobile_token",
            Self::OperationReview => "operation_review",
            Self::ScaLogin => "sca_login",
            Self::ScaApproval => "sca_approval",
            Self::Consent => "consent",
        }
    }
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Overall result of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthResult {
    /// Operation requires more authentication steps.
    Continue,
    /// Operation finished successfully.
    Done,
    /// Operation failed. A canceled operation is a failed operation whose
    /// most recent history entry is [`AuthStepResult::Canceled`].
    Failed,
}

impl AuthResult {
    /// Returns `true` for the terminal results (`Done`, `Failed`).
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

/// Outcome of a single authentication step attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthStepResult {
    /// Step confirmed successfully.
    Confirmed,
    /// Credential verification failed.
    AuthFailed,
    /// Step (and operation) canceled.
    Canceled,
}

/// Typed reason attached to the history entry produced by a cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CancelReason {
    /// No specific reason supplied.
    Unknown,
    /// Operation expired before completing.
    TimedOutOperation,
    /// Operation was superseded by a newer one in the same session.
    InterruptedOperation,
    /// User entered an incorrect PIN on a possession-based device.
    IncorrectPin,
    /// Method-specific unexpected error.
    UnexpectedError,
}

/// Reason reported to the anti-fraud system when an operation terminates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminationReason {
    /// Operation completed successfully.
    Done,
    /// Operation failed.
    Failed,
    /// Operation was canceled.
    Canceled,
}

/// Lifecycle change reported to the Data Adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationChange {
    /// Operation finished successfully.
    Done,
    /// Operation failed (attempts exhausted or explicit failure).
    Failed,
    /// Operation was canceled, tagged with the cancellation reason.
    Canceled {
        /// Why the operation was canceled.
        reason: CancelReason,
    },
}

// ═══════════════════════════════════════════════════════════════════════
// Steps & Form Data
// ═══════════════════════════════════════════════════════════════════════

/// One candidate next authentication step: a method plus step-specific
/// parameters (e.g. the phone number suffix for an SMS step).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthStep {
    /// Authentication method for this step.
    pub auth_method: AuthMethod,

    /// Step-specific key/value parameters.
    pub params: BTreeMap<String, String>,
}

impl AuthStep {
    /// Create a step for the given method with no parameters.
    #[must_use]
    pub const fn new(auth_method: AuthMethod) -> Self {
        Self {
            auth_method,
            params: BTreeMap::new(),
        }
    }

    /// Add a step parameter.
    #[must_use]
    pub fn with_param(mut self, key: &str, value: &str) -> Self {
        self.params.insert(key.to_string(), value.to_string());
        self
    }
}

/// Dynamic display attribute of an operation's form data.
///
/// The attribute values are message keys or raw values; translation happens
/// in the external localization layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FormAttribute {
    /// Monetary amount with currency, e.g. for a payment approval.
    Amount {
        /// Attribute identifier.
        id: String,
        /// Amount value.
        amount: f64,
        /// ISO 4217 currency code.
        currency: String,
    },
    /// Generic labeled key/value attribute.
    KeyValue {
        /// Attribute identifier.
        id: String,
        /// Attribute value.
        value: String,
    },
    /// Choice of source bank account offered to the user.
    BankAccountChoice {
        /// Attribute identifier.
        id: String,
        /// Account numbers the user may choose from.
        accounts: Vec<String>,
        /// Whether the choice is already fixed and not user-selectable.
        choice_disabled: bool,
    },
}

impl FormAttribute {
    /// Attribute identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Amount { id, .. }
            | Self::KeyValue { id, .. }
            | Self::BankAccountChoice { id, .. } => id,
        }
    }
}

/// User-facing structured description of an operation.
///
/// `title`/`greeting`/`summary` hold message keys resolved by the external
/// localization layer. `user_input` collects choices the user made while the
/// operation progressed and may be lazily enriched once the user is known.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormData {
    /// Title message key.
    pub title: Option<String>,

    /// Greeting message key.
    pub greeting: Option<String>,

    /// Summary message key.
    pub summary: Option<String>,

    /// Dynamic display attributes (amount, account choice, ...).
    pub attributes: Vec<FormAttribute>,

    /// Inputs the user supplied during the flow.
    pub user_input: BTreeMap<String, String>,
}

impl FormData {
    /// Create form data with the three standard message keys.
    #[must_use]
    pub fn with_messages(title: &str, greeting: &str, summary: &str) -> Self {
        Self {
            title: Some(title.to_string()),
            greeting: Some(greeting.to_string()),
            summary: Some(summary.to_string()),
            attributes: Vec::new(),
            user_input: BTreeMap::new(),
        }
    }

    /// Add a dynamic attribute.
    #[must_use]
    pub fn with_attribute(mut self, attribute: FormAttribute) -> Self {
        self.attributes.push(attribute);
        self
    }
}

/// A user-made choice that changes an operation's form data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormDataChange {
    /// The user picked a source bank account.
    BankAccountChoice {
        /// Chosen account number.
        chosen_account: String,
    },
    /// The user picked the authentication method to continue with.
    AuthMethodChoice {
        /// Chosen authentication method.
        chosen_method: AuthMethod,
    },
}

// ═══════════════════════════════════════════════════════════════════════
// Contexts
// ═══════════════════════════════════════════════════════════════════════

/// Identification of the application that created the operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationContext {
    /// Application identifier.
    pub id: String,

    /// Application display name.
    pub name: String,

    /// Application description.
    pub description: Option<String>,
}

/// Operation envelope passed to every Data Adapter call so the collaborator
/// can correlate the request with the business transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationContext {
    /// Operation identifier.
    pub operation_id: OperationId,

    /// Operation type name.
    pub operation_name: String,

    /// Opaque signed operation payload.
    pub operation_data: String,

    /// Current form data.
    pub form_data: FormData,

    /// Application that created the operation.
    pub application_context: ApplicationContext,
}

// ═══════════════════════════════════════════════════════════════════════
// Operation Aggregate
// ═══════════════════════════════════════════════════════════════════════

/// One authentication attempt recorded on an operation.
///
/// History entries are owned exclusively by their operation and are never
/// deleted; the list is append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationHistoryEntry {
    /// Method that performed the step.
    pub auth_method: AuthMethod,

    /// Outcome of the step.
    pub step_result: AuthStepResult,

    /// Cancellation reason, set only for [`AuthStepResult::Canceled`].
    pub cancel_reason: Option<CancelReason>,

    /// When the step was recorded.
    pub timestamp: DateTime<Utc>,
}

/// The central aggregate: a tracked transaction requiring one or more
/// authentication steps.
///
/// Mutated only through the orchestrator's `authorize`/`fail`/`cancel`
/// operations; immutable once `result` is terminal, except for cancellation
/// of an operation whose terminal cause was itself a cancellation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    /// Unique operation identifier.
    pub operation_id: OperationId,

    /// Operation type name (e.g. `"login"`, `"payment"`).
    pub operation_name: String,

    /// Opaque signed payload shown to the user. Immutable after creation.
    pub operation_data: String,

    /// User-facing structured description.
    pub form_data: FormData,

    /// Application that created the operation.
    pub application_context: ApplicationContext,

    /// Organization the operation belongs to, once known.
    pub organization_id: Option<OrganizationId>,

    /// User bound to the operation once an authentication step succeeded.
    pub user_id: Option<UserId>,

    /// Client-selected method override. Must always be a member of `steps`.
    pub chosen_auth_method: Option<AuthMethod>,

    /// Overall result.
    pub result: AuthResult,

    /// Current ordered set of candidate next steps. Always re-derived by the
    /// step policy, never hand-mutated.
    pub steps: Vec<AuthStep>,

    /// Append-only attempt history.
    pub history: Vec<OperationHistoryEntry>,

    /// Creation timestamp.
    pub created_at: DateTime<Utc>,

    /// Expiration timestamp; evaluated lazily at read time.
    pub expires_at: DateTime<Utc>,

    /// Store-managed version, bumped on every successful write. Used for
    /// optimistic write-conflict detection.
    pub version: u64,
}

impl Operation {
    /// Returns `true` if the operation reached a terminal state.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.result.is_terminal()
    }

    /// Returns `true` if the operation is failed *because it was canceled*.
    ///
    /// Canceled operations stay viewable (a mobile app may cancel an
    /// operation that the web UI still displays), unlike hard-failed ones.
    #[must_use]
    pub fn is_canceled(&self) -> bool {
        self.result == AuthResult::Failed
            && self
                .history
                .last()
                .is_some_and(|entry| entry.step_result == AuthStepResult::Canceled)
    }

    /// Returns `true` if the operation expired.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Whether the given method is among the current candidate steps.
    #[must_use]
    pub fn is_auth_method_available(&self, method: AuthMethod) -> bool {
        self.steps.iter().any(|step| step.auth_method == method)
    }

    /// Number of confirmed authentication steps, excluding the synthetic
    /// initial entry.
    #[must_use]
    pub fn confirmed_step_count(&self) -> usize {
        self.history
            .iter()
            .filter(|entry| {
                entry.step_result == AuthStepResult::Confirmed
                    && entry.auth_method != AuthMethod::Init
            })
            .count()
    }

    /// Number of failed authentication attempts recorded on the operation.
    #[must_use]
    pub fn failed_attempt_count(&self) -> usize {
        self.history
            .iter()
            .filter(|entry| entry.step_result == AuthStepResult::AuthFailed)
            .count()
    }

    /// Append a history entry.
    ///
    /// The overall `result` is owned by the step policy and set afterwards.
    pub fn record_step(
        &mut self,
        auth_method: AuthMethod,
        step_result: AuthStepResult,
        cancel_reason: Option<CancelReason>,
        timestamp: DateTime<Utc>,
    ) {
        self.history.push(OperationHistoryEntry {
            auth_method,
            step_result,
            cancel_reason,
            timestamp,
        });
    }

    /// Assemble the operation envelope for Data Adapter calls.
    #[must_use]
    pub fn operation_context(&self) -> OperationContext {
        OperationContext {
            operation_id: self.operation_id,
            operation_name: self.operation_name.clone(),
            operation_data: self.operation_data.clone(),
            form_data: self.form_data.clone(),
            application_context: self.application_context.clone(),
        }
    }
}
