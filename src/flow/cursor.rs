// Step cursor - the only mutable position inside a flow

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, warn};

use super::definition::FlowDefinition;
use super::errors::FlowError;
use super::types::{Action, Step, StepName};

/// Persisted form of the cursor. The name is kept as text so a snapshot
/// written by an older flow definition still parses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CursorSnapshot {
    pub current_step_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Position {
    name: StepName,
    step: Step,
}

/// Pointer to the current step of a [`FlowDefinition`].
///
/// Name and resolved step are stored together and replaced together, so the
/// pair is never observed out of sync.
#[derive(Debug, Clone)]
pub struct StepCursor {
    flow: Arc<FlowDefinition>,
    position: Position,
}

impl StepCursor {
    pub fn new(flow: Arc<FlowDefinition>) -> Self {
        let position = Self::initial_position(&flow);
        Self { flow, position }
    }

    fn initial_position(flow: &FlowDefinition) -> Position {
        Position {
            name: flow.initial_step_name(),
            step: flow.initial_step().clone(),
        }
    }

    pub fn flow(&self) -> &Arc<FlowDefinition> {
        &self.flow
    }

    pub fn current_step_name(&self) -> StepName {
        self.position.name
    }

    pub fn current_step(&self) -> &Step {
        &self.position.step
    }

    pub fn is_finished(&self) -> bool {
        self.position.step.is_final
    }

    pub fn available_actions(&self) -> Vec<Action> {
        self.position.step.actions()
    }

    /// Resolve where `action` would lead without moving
    pub fn peek_transition(&self, action: Action) -> Result<StepName, FlowError> {
        let target = self
            .position
            .step
            .transition(action)
            .ok_or(FlowError::InvalidTransition {
                step: self.position.name,
                action,
            })?;
        self.flow.get_step(target)?;
        Ok(target)
    }

    /// Follow the `action` edge of the current step.
    ///
    /// Fails with [`FlowError::InvalidTransition`] when the step does not
    /// declare `action` (always the case for final steps). The cursor is
    /// left untouched on any error.
    pub fn next_step(&mut self, action: Action) -> Result<&Step, FlowError> {
        let target = self.peek_transition(action).inspect_err(|e| {
            error!(step = %self.position.name, action = %action, "Rejected transition: {}", e);
        })?;

        self.move_to(target)?;
        debug!(action = %action, step = %target, "Cursor advanced");
        Ok(&self.position.step)
    }

    /// Follow the current step's `previous` link
    pub fn previous_step(&mut self) -> Result<&Step, FlowError> {
        let target = self.position.step.previous.ok_or(FlowError::NoPreviousStep {
            step: self.position.name,
        })?;

        self.move_to(target)?;
        debug!(step = %target, "Cursor moved back");
        Ok(&self.position.step)
    }

    /// Jump straight to `name` without following an edge. Unknown names
    /// leave the cursor where it is.
    pub fn rewind_to(&mut self, name: StepName) -> Result<&Step, FlowError> {
        self.move_to(name)?;
        debug!(step = %name, "Cursor rewound");
        Ok(&self.position.step)
    }

    fn move_to(&mut self, name: StepName) -> Result<(), FlowError> {
        let step = self.flow.get_step(name)?.clone();
        self.position = Position { name, step };
        Ok(())
    }

    pub fn clear_state(&mut self) {
        self.position = Self::initial_position(&self.flow);
    }

    /// Re-resolve a persisted position, falling back to the initial step if
    /// the name no longer exists in this flow.
    pub fn restore_state(&mut self, snapshot: &CursorSnapshot) {
        let resolved = snapshot
            .current_step_name
            .parse::<StepName>()
            .and_then(|name| self.move_to(name));

        if let Err(e) = resolved {
            warn!(
                step = %snapshot.current_step_name,
                "Persisted step no longer resolves, restarting flow: {}", e
            );
            self.clear_state();
        }
    }

    pub fn snapshot(&self) -> CursorSnapshot {
        CursorSnapshot {
            current_step_name: self.position.name.to_string(),
        }
    }
}
