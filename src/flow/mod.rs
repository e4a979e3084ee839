// Onboarding Flow - step graph and the cursor that walks it
//
// The flow definition is pure data, built and validated once. All movement
// goes through the cursor's named actions.

pub mod types;
pub mod errors;
pub mod definition;
pub mod cursor;

pub use types::{Action, Step, StepName, SubStepKey, TopStep};
pub use errors::FlowError;
pub use definition::FlowDefinition;
pub use cursor::{CursorSnapshot, StepCursor};
