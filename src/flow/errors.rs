use thiserror::Error;

use super::types::{Action, StepName};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlowError {
    /// The UI dispatched an action the current step does not declare
    #[error("Invalid transition: step '{step}' has no '{action}' transition")]
    InvalidTransition { step: StepName, action: Action },
    #[error("Invalid transition: step '{step}' has no previous step")]
    NoPreviousStep { step: StepName },
    #[error("Step not found: '{name}'")]
    NotFound { name: String },
    #[error("Invalid flow definition: {reason}")]
    InvalidDefinition { reason: String },
}

impl FlowError {
    /// Whether this is a wiring mistake in the calling UI code
    pub fn is_invalid_transition(&self) -> bool {
        matches!(
            self,
            FlowError::InvalidTransition { .. } | FlowError::NoPreviousStep { .. }
        )
    }
}
