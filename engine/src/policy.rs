//! Step policy: derives the next permissible authentication steps.
//!
//! The policy decides, for an operation type and its recorded history, what
//! the overall result is and which candidate steps come next. How the policy
//! is authored or stored is out of the engine's hands — it is injected as
//! per-operation-type configuration through the [`StepPolicy`] trait, with
//! [`RoutingPolicy`] as the table-driven implementation.

use crate::error::{AuthStepError, Result};
use crate::state::{AuthResult, AuthStep, AuthStepResult, Operation};
use std::collections::HashMap;

/// Outcome of a policy evaluation: the operation's overall result and the
/// re-derived ordered set of candidate next steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyDecision {
    /// New overall result of the operation.
    pub result: AuthResult,

    /// Candidate next steps. Empty once the result is terminal.
    pub steps: Vec<AuthStep>,

    /// Remaining failure budget reported by the policy, `None` for no limit.
    pub remaining_attempts: Option<u32>,
}

/// Policy computing candidate next steps per operation type.
///
/// Evaluations are pure with respect to the operation snapshot they receive,
/// so implementations can safely run inside the store's per-operation
/// critical section.
pub trait StepPolicy: Send + Sync {
    /// Decision for a freshly created operation of the given type.
    ///
    /// # Errors
    ///
    /// Returns [`AuthStepError::OperationConfigNotFound`] when no routing is
    /// configured for the operation type.
    fn initial_decision(&self, operation_name: &str) -> Result<PolicyDecision>;

    /// Decision after a step attempt was recorded on the operation.
    ///
    /// The operation already contains the history entry for the attempt.
    ///
    /// # Errors
    ///
    /// Returns [`AuthStepError::OperationConfigNotFound`] when no routing is
    /// configured for the operation type.
    fn decide(&self, operation: &Operation, step_result: AuthStepResult)
    -> Result<PolicyDecision>;

    /// Remaining failure budget for the operation, `None` for no limit.
    fn remaining_attempts(&self, operation: &Operation) -> Option<u32>;

    /// Configured template for the operation type, when one exists.
    fn operation_config(&self, operation_name: &str) -> Option<OperationTemplate>;
}

/// Routing template for one operation type.
///
/// A template is an ordered list of phases; each phase offers one or more
/// alternative steps. Confirming any step of the current phase advances to
/// the next; confirming the last phase completes the operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationTemplate {
    /// Operation type name this template routes.
    pub operation_name: String,

    /// Ordered phases, each a set of alternative steps.
    pub phases: Vec<Vec<AuthStep>>,

    /// Total failed attempts the operation tolerates before failing.
    pub max_failures: u32,
}

impl OperationTemplate {
    /// Default failure budget, matching the upstream credential systems'
    /// usual lockout window.
    pub const DEFAULT_MAX_FAILURES: u32 = 5;

    /// Create an empty template for the given operation type.
    #[must_use]
    pub fn new(operation_name: &str) -> Self {
        Self {
            operation_name: operation_name.to_string(),
            phases: Vec::new(),
            max_failures: Self::DEFAULT_MAX_FAILURES,
        }
    }

    /// Append a phase of alternative steps.
    #[must_use]
    pub fn phase(mut self, steps: Vec<AuthStep>) -> Self {
        self.phases.push(steps);
        self
    }

    /// Set the failure budget.
    #[must_use]
    pub const fn with_max_failures(mut self, max_failures: u32) -> Self {
        self.max_failures = max_failures;
        self
    }
}

/// Table-driven step policy over a set of [`OperationTemplate`]s.
#[derive(Debug, Clone, Default)]
pub struct RoutingPolicy {
    templates: HashMap<String, OperationTemplate>,
}

impl RoutingPolicy {
    /// Create an empty routing policy.
    #[must_use]
    pub fn new() -> Self {
        Self {
            templates: HashMap::new(),
        }
    }

    /// Register a template, replacing any previous one for the same type.
    #[must_use]
    pub fn with_template(mut self, template: OperationTemplate) -> Self {
        self.templates
            .insert(template.operation_name.clone(), template);
        self
    }

    fn template(&self, operation_name: &str) -> Result<&OperationTemplate> {
        self.templates
            .get(operation_name)
            .ok_or_else(|| AuthStepError::OperationConfigNotFound {
                operation_name: operation_name.to_string(),
            })
    }

    fn remaining_for(template: &OperationTemplate, operation: &Operation) -> u32 {
        let failures = u32::try_from(operation.failed_attempt_count()).unwrap_or(u32::MAX);
        template.max_failures.saturating_sub(failures)
    }

    /// Steps of the phase the operation currently sits in.
    fn current_phase_steps(template: &OperationTemplate, operation: &Operation) -> Vec<AuthStep> {
        template
            .phases
            .get(operation.confirmed_step_count())
            .cloned()
            .unwrap_or_default()
    }
}

impl StepPolicy for RoutingPolicy {
    fn initial_decision(&self, operation_name: &str) -> Result<PolicyDecision> {
        let template = self.template(operation_name)?;
        let steps = template.phases.first().cloned().unwrap_or_default();
        let result = if steps.is_empty() {
            AuthResult::Done
        } else {
            AuthResult::Continue
        };
        Ok(PolicyDecision {
            result,
            steps,
            remaining_attempts: Some(template.max_failures),
        })
    }

    fn decide(
        &self,
        operation: &Operation,
        step_result: AuthStepResult,
    ) -> Result<PolicyDecision> {
        let template = self.template(&operation.operation_name)?;
        let decision = match step_result {
            AuthStepResult::Confirmed => {
                let steps = Self::current_phase_steps(template, operation);
                if steps.is_empty() {
                    PolicyDecision {
                        result: AuthResult::Done,
                        steps: Vec::new(),
                        remaining_attempts: None,
                    }
                } else {
                    PolicyDecision {
                        result: AuthResult::Continue,
                        steps,
                        remaining_attempts: Some(Self::remaining_for(template, operation)),
                    }
                }
            }
            AuthStepResult::AuthFailed => {
                let remaining = Self::remaining_for(template, operation);
                if remaining == 0 {
                    PolicyDecision {
                        result: AuthResult::Failed,
                        steps: Vec::new(),
                        remaining_attempts: Some(0),
                    }
                } else {
                    PolicyDecision {
                        result: AuthResult::Continue,
                        steps: Self::current_phase_steps(template, operation),
                        remaining_attempts: Some(remaining),
                    }
                }
            }
            AuthStepResult::Canceled => PolicyDecision {
                result: AuthResult::Failed,
                steps: Vec::new(),
                remaining_attempts: None,
            },
        };
        Ok(decision)
    }

    fn remaining_attempts(&self, operation: &Operation) -> Option<u32> {
        self.templates
            .get(&operation.operation_name)
            .map(|template| Self::remaining_for(template, operation))
    }

    fn operation_config(&self, operation_name: &str) -> Option<OperationTemplate> {
        self.templates.get(operation_name).cloned()
    }
}
