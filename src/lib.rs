// Onboarding Flow Library - resumable project onboarding wizard

pub mod flow;
pub mod domains;
pub mod storage;
pub mod persistence;
pub mod router;
pub mod requests;
pub mod wizard;
pub mod telemetry;
pub mod config;

#[cfg(test)]
mod mocks;

// Re-export key types for easy access
pub use flow::{Action, CursorSnapshot, FlowDefinition, FlowError, Step, StepCursor, StepName, SubStepKey, TopStep};
pub use domains::{
    CloudProvider, DomainState, OnboardingState, ProviderConfig, ProvisionResourcesState, ProvisionSubStep,
    RegistryConnectionState, RegistrySubStep, SourceKind, SubStates,
};
pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageError};
pub use persistence::{PersistedSnapshot, PersistenceAdapter, PersistenceError, SCHEMA_VERSION};
pub use router::{HistoryRouter, Router, RouterBridge};
pub use requests::{
    abort_pair, run_abortable, submit_step, AbortHandle, AbortSignal, OnboardingApi, RequestTicket,
    StepRequestTracker, UpstreamRequestError,
};
pub use wizard::{MountOutcome, OnboardingWizard, RequestResolution, StepCommit, WizardError};
pub use telemetry::{init_telemetry, generate_correlation_id, create_wizard_span};
pub use self::config::{OnboardingConfig, config};
