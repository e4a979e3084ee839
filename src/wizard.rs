// Onboarding wizard - explicit state container for the whole flow
//
// Every mutation goes through a named action on `OnboardingWizard`; nothing
// hands out mutable access to the cursor or the domain states.

use serde_json::Value;
use statig::prelude::*;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domains::{
    CloudProvider, DomainState, OnboardingState, ProvisionResourcesState, ProvisionSubStep,
    RegistryConnectionState, RegistrySubStep, SourceKind, SubStates,
};
use crate::flow::{Action, FlowDefinition, FlowError, StepCursor, StepName, SubStepKey, TopStep};
use crate::persistence::{PersistedSnapshot, PersistenceAdapter};
use crate::requests::{
    RequestEvent, RequestTicket, StepRequestTracker, UpstreamRequestError,
};
use crate::router::{Router, RouterBridge};
use crate::storage::KeyValueStore;
use crate::telemetry::{create_wizard_span, generate_correlation_id};

#[derive(Debug, Error)]
pub enum WizardError {
    #[error(transparent)]
    Flow(#[from] FlowError),

    #[error("Action expects step '{expected}' but the wizard is at '{actual}'")]
    UnexpectedStep { expected: StepName, actual: StepName },

    #[error("A request for step '{step}' is already in flight")]
    RequestPending { step: StepName },

    #[error("No provider selected for {domain}")]
    ProviderNotSelected { domain: &'static str },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountOutcome {
    Fresh,
    Resumed { step: StepName },
}

/// What a successful step request commits before the wizard moves on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepCommit {
    RegistryCredentials,
    RegistrySettings,
    RegistryConnection,
    ProvisioningCredentials,
    ProvisioningSettings,
    OwnCluster,
}

impl StepCommit {
    /// Step whose form the commit submits
    pub fn step(&self) -> StepName {
        match self {
            StepCommit::RegistryCredentials => {
                StepName::sub(TopStep::ConnectRegistry, SubStepKey::Credentials)
            }
            StepCommit::RegistrySettings => {
                StepName::sub(TopStep::ConnectRegistry, SubStepKey::Settings)
            }
            StepCommit::RegistryConnection => {
                StepName::sub(TopStep::ConnectRegistry, SubStepKey::TestConnection)
            }
            StepCommit::ProvisioningCredentials => {
                StepName::sub(TopStep::ProvisionResources, SubStepKey::Credentials)
            }
            StepCommit::ProvisioningSettings => {
                StepName::sub(TopStep::ProvisionResources, SubStepKey::Settings)
            }
            StepCommit::OwnCluster => {
                StepName::sub(TopStep::ProvisionResources, SubStepKey::ConnectOwnCluster)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestResolution {
    /// Payload committed and the cursor moved to `step`
    Advanced { step: StepName },
    /// Upstream call failed; the wizard stays on the current step
    Rejected(UpstreamRequestError),
    /// Response arrived for a request that is no longer current
    Stale,
    /// Request was aborted before it produced a response
    Aborted,
}

pub struct OnboardingWizard<S, R> {
    project_id: u64,
    session_id: String,
    flow: Arc<FlowDefinition>,
    cursor: StepCursor,
    state: OnboardingState,
    substates: SubStates,
    persistence: PersistenceAdapter<S>,
    router: R,
    bridge: RouterBridge,
    requests: StateMachine<StepRequestTracker>,
    next_ticket: u64,
    mounted: bool,
}

impl<S: KeyValueStore, R: Router> OnboardingWizard<S, R> {
    pub fn new(project_id: u64, persistence: PersistenceAdapter<S>, router: R) -> Self {
        let flow = Arc::new(FlowDefinition::onboarding());
        Self {
            project_id,
            session_id: generate_correlation_id(),
            cursor: StepCursor::new(flow.clone()),
            flow,
            state: OnboardingState::default(),
            substates: SubStates::new(),
            persistence,
            router,
            bridge: RouterBridge::default(),
            requests: StepRequestTracker::new().state_machine(),
            next_ticket: 1,
            mounted: false,
        }
    }

    pub fn with_flow(mut self, flow: Arc<FlowDefinition>) -> Self {
        self.cursor = StepCursor::new(flow.clone());
        self.flow = flow;
        self
    }

    pub fn with_router_bridge(mut self, bridge: RouterBridge) -> Self {
        self.bridge = bridge;
        self
    }

    pub fn project_id(&self) -> u64 {
        self.project_id
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn flow(&self) -> &Arc<FlowDefinition> {
        &self.flow
    }

    pub fn cursor(&self) -> &StepCursor {
        &self.cursor
    }

    pub fn current_step_name(&self) -> StepName {
        self.cursor.current_step_name()
    }

    pub fn current_url(&self) -> &str {
        &self.cursor.current_step().url
    }

    pub fn state(&self) -> &OnboardingState {
        &self.state
    }

    pub fn substates(&self) -> &SubStates {
        &self.substates
    }

    pub fn registry(&self) -> &RegistryConnectionState {
        self.substates.registry()
    }

    pub fn provisioning(&self) -> &ProvisionResourcesState {
        self.substates.provisioning()
    }

    pub fn router(&self) -> &R {
        &self.router
    }

    pub fn persistence(&self) -> &PersistenceAdapter<S> {
        &self.persistence
    }

    pub fn request_tracker(&self) -> &StepRequestTracker {
        self.requests.inner()
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Restore persisted progress (if any) and show the current step
    pub fn mount(&mut self) -> MountOutcome {
        let _span = create_wizard_span("mount", self.project_id, &self.session_id).entered();

        let outcome = match self.persistence.restore(self.project_id) {
            Some(snapshot) => {
                self.apply_snapshot(&snapshot);
                MountOutcome::Resumed {
                    step: self.cursor.current_step_name(),
                }
            }
            None => {
                self.reset_in_memory();
                MountOutcome::Fresh
            }
        };

        self.mounted = true;
        info!(
            project_id = self.project_id,
            step = %self.cursor.current_step_name(),
            outcome = ?outcome,
            "Onboarding wizard mounted"
        );
        self.navigate();
        outcome
    }

    /// Tear the current step down; a response still in flight is dropped
    pub fn unmount(&mut self) {
        self.requests.handle(&RequestEvent::Teardown);
        self.mounted = false;
        info!(project_id = self.project_id, "Onboarding wizard unmounted");
    }

    /// Follow `action` from the current step
    pub fn next_step(&mut self, action: Action) -> Result<StepName, WizardError> {
        let _span = create_wizard_span("next_step", self.project_id, &self.session_id).entered();

        self.cursor.next_step(action)?;
        self.after_transition();
        Ok(self.cursor.current_step_name())
    }

    pub fn previous_step(&mut self) -> Result<StepName, WizardError> {
        let _span = create_wizard_span("previous_step", self.project_id, &self.session_id).entered();

        self.cursor.previous_step()?;
        self.after_transition();
        Ok(self.cursor.current_step_name())
    }

    /// Restart the flow from the initial step with empty domain states
    pub fn clear_state(&mut self) {
        self.requests.handle(&RequestEvent::Teardown);
        self.reset_in_memory();
        self.persist();
        self.navigate();
        info!(project_id = self.project_id, "Onboarding state cleared");
    }

    pub fn snapshot(&self) -> PersistedSnapshot {
        PersistedSnapshot::new(
            self.cursor.snapshot(),
            self.state.snapshot(),
            self.substates.snapshot(),
        )
    }

    // ----- named actions -------------------------------------------------

    pub fn set_project(&mut self, name: &str) -> Result<StepName, WizardError> {
        self.expect_step(StepName::top(TopStep::NewProject))?;
        let project_id = self.project_id;
        self.commit(Action::Continue, |wizard| wizard.state.set_project(project_id, name))
    }

    pub fn connect_source(&mut self, source: SourceKind) -> Result<StepName, WizardError> {
        self.expect_step(StepName::top(TopStep::ConnectSource))?;
        self.commit(Action::Continue, |wizard| wizard.state.connect_source(source))
    }

    pub fn skip_registry_connection(&mut self) -> Result<StepName, WizardError> {
        self.expect_step(StepName::top(TopStep::ConnectRegistry))?;
        self.commit(Action::Skip, |wizard| {
            wizard.state.skip_registry_connection();
            wizard.substates.registry_mut().clear_state();
        })
    }

    pub fn select_registry_provider(&mut self, provider: CloudProvider) -> Result<StepName, WizardError> {
        self.select_provider(TopStep::ConnectRegistry, |substates| {
            substates.registry_mut().select_provider(provider)
        })
    }

    pub fn submit_registry_credentials(&mut self, credentials: Value) -> Result<StepName, WizardError> {
        self.expect_step(StepName::sub(TopStep::ConnectRegistry, SubStepKey::Credentials))?;
        self.commit(Action::Continue, |wizard| {
            wizard.substates.registry_mut().submit_credentials(credentials)
        })
    }

    pub fn submit_registry_settings(&mut self, settings: Value) -> Result<StepName, WizardError> {
        self.expect_step(StepName::sub(TopStep::ConnectRegistry, SubStepKey::Settings))?;
        self.commit(Action::Continue, |wizard| {
            wizard.substates.registry_mut().submit_settings(settings)
        })
    }

    pub fn confirm_registry_connection(&mut self) -> Result<StepName, WizardError> {
        self.expect_step(StepName::sub(TopStep::ConnectRegistry, SubStepKey::TestConnection))?;
        self.commit(Action::Continue, |_| {})
    }

    pub fn skip_resource_provisioning(&mut self) -> Result<StepName, WizardError> {
        self.expect_step(StepName::top(TopStep::ProvisionResources))?;
        self.commit(Action::Skip, |wizard| {
            wizard.state.skip_resource_provisioning();
            wizard.substates.provisioning_mut().clear_state();
        })
    }

    pub fn select_provisioning_provider(&mut self, provider: CloudProvider) -> Result<StepName, WizardError> {
        self.select_provider(TopStep::ProvisionResources, |substates| {
            substates.provisioning_mut().select_provider(provider)
        })
    }

    pub fn submit_provisioning_credentials(&mut self, credentials: Value) -> Result<StepName, WizardError> {
        self.expect_step(StepName::sub(TopStep::ProvisionResources, SubStepKey::Credentials))?;
        self.commit(Action::Continue, |wizard| {
            wizard.substates.provisioning_mut().submit_credentials(credentials)
        })
    }

    pub fn submit_provisioning_settings(&mut self, settings: Value) -> Result<StepName, WizardError> {
        self.expect_step(StepName::sub(TopStep::ProvisionResources, SubStepKey::Settings))?;
        self.commit(Action::Continue, |wizard| {
            wizard.substates.provisioning_mut().submit_settings(settings)
        })
    }

    pub fn connect_own_cluster(&mut self, cluster: Value) -> Result<StepName, WizardError> {
        self.expect_step(StepName::sub(TopStep::ProvisionResources, SubStepKey::ConnectOwnCluster))?;
        self.commit(Action::Continue, |wizard| {
            wizard.substates.provisioning_mut().connect_own_cluster(cluster)
        })
    }

    // ----- step requests -------------------------------------------------

    /// Register a network call for the current step. Fails while another
    /// request is still in flight.
    pub fn begin_request(&mut self) -> Result<RequestTicket, WizardError> {
        if let Some(pending) = self.requests.inner().pending_ticket() {
            return Err(WizardError::RequestPending {
                step: pending.step(),
            });
        }

        let ticket = RequestTicket::new(self.next_ticket, self.cursor.current_step_name());
        self.next_ticket += 1;
        self.requests.handle(&RequestEvent::Submit(ticket));
        Ok(ticket)
    }

    /// Abandon the in-flight request, if any
    pub fn cancel_request(&mut self) {
        self.requests.handle(&RequestEvent::Teardown);
    }

    /// Feed the outcome of a step request back into the wizard. Only the
    /// current ticket, issued on the step the wizard is still showing, can
    /// commit its payload and advance.
    pub fn complete_request(
        &mut self,
        ticket: RequestTicket,
        commit: StepCommit,
        result: Result<Value, UpstreamRequestError>,
    ) -> Result<RequestResolution, WizardError> {
        let is_current = self.requests.inner().pending_ticket() == Some(ticket);

        match result {
            Ok(payload) => {
                self.requests.handle(&RequestEvent::Resolve(ticket));
                if !is_current {
                    return Ok(RequestResolution::Stale);
                }
                if self.cursor.current_step_name() != ticket.step() {
                    warn!(
                        ticket = ticket.id(),
                        issued_at = %ticket.step(),
                        current = %self.cursor.current_step_name(),
                        "Wizard moved on while the request was in flight, discarding payload"
                    );
                    return Ok(RequestResolution::Stale);
                }
                let step = self.apply_commit(commit, payload)?;
                Ok(RequestResolution::Advanced { step })
            }
            Err(error) => {
                self.requests.handle(&RequestEvent::Reject {
                    ticket,
                    reason: error.to_string(),
                });
                if !is_current {
                    return Ok(RequestResolution::Stale);
                }
                Ok(RequestResolution::Rejected(error))
            }
        }
    }

    fn apply_commit(&mut self, commit: StepCommit, payload: Value) -> Result<StepName, WizardError> {
        match commit {
            StepCommit::RegistryCredentials => self.submit_registry_credentials(payload),
            StepCommit::RegistrySettings => self.submit_registry_settings(payload),
            StepCommit::RegistryConnection => self.confirm_registry_connection(),
            StepCommit::ProvisioningCredentials => self.submit_provisioning_credentials(payload),
            StepCommit::ProvisioningSettings => self.submit_provisioning_settings(payload),
            StepCommit::OwnCluster => self.connect_own_cluster(payload),
        }
    }

    // ----- internals -----------------------------------------------------

    pub(crate) fn expect_step(&self, expected: StepName) -> Result<(), WizardError> {
        let actual = self.cursor.current_step_name();
        if actual != expected {
            return Err(WizardError::UnexpectedStep { expected, actual });
        }
        Ok(())
    }

    /// Provider choice is only valid inside `stage`, outside the own-cluster
    /// form. Changing it resets the domain to its credentials form, so a
    /// cursor sitting on a later sub-step is rewound there as well.
    fn select_provider<F>(&mut self, stage: TopStep, update: F) -> Result<StepName, WizardError>
    where
        F: FnOnce(&mut SubStates),
    {
        let current = self.cursor.current_step_name();
        if current.parent() != stage || current.sub_step() == Some(SubStepKey::ConnectOwnCluster) {
            return Err(WizardError::UnexpectedStep {
                expected: StepName::top(stage),
                actual: current,
            });
        }

        let credentials = StepName::sub(stage, SubStepKey::Credentials);
        let rewind = current.sub_step().is_some() && current != credentials;
        if rewind {
            self.flow.get_step(credentials)?;
        }

        update(&mut self.substates);

        if rewind {
            self.cursor.rewind_to(credentials)?;
            self.after_transition();
        } else {
            self.persist();
        }
        Ok(self.cursor.current_step_name())
    }

    /// Validate the transition, apply the form update, then move. An
    /// undeclared action fails before anything is mutated.
    fn commit<F>(&mut self, action: Action, update: F) -> Result<StepName, WizardError>
    where
        F: FnOnce(&mut Self),
    {
        self.cursor.peek_transition(action)?;
        update(self);
        self.next_step(action)
    }

    fn after_transition(&mut self) {
        self.mirror_sub_step();

        if self.cursor.is_finished() {
            self.finish();
        } else {
            self.persist();
        }

        self.navigate();
    }

    /// Keep the active domain's `currentSubStep` in line with the cursor
    fn mirror_sub_step(&mut self) {
        let name = self.cursor.current_step_name();
        let Some(key) = name.sub_step() else {
            return;
        };

        match name.parent() {
            TopStep::ConnectRegistry => {
                if let Some(sub_step) = RegistrySubStep::from_step_key(key) {
                    self.substates.registry_mut().enter_sub_step(sub_step);
                }
            }
            TopStep::ProvisionResources => {
                if let Some(sub_step) = ProvisionSubStep::from_step_key(key) {
                    self.substates.provisioning_mut().enter_sub_step(sub_step);
                }
            }
            _ => {}
        }
    }

    fn finish(&mut self) {
        self.state.clear_state();
        self.substates.clear_state();

        if let Err(e) = self
            .persistence
            .mark_finished(self.project_id, self.cursor.snapshot())
        {
            warn!(project_id = self.project_id, "Failed to record finished onboarding: {}", e);
        }
        info!(project_id = self.project_id, "Onboarding flow finished");
    }

    fn persist(&self) {
        if self.cursor.is_finished() {
            debug!(project_id = self.project_id, "Flow finished, keeping the finished marker");
            return;
        }
        if let Err(e) = self.persistence.save(self.project_id, &self.snapshot()) {
            warn!(project_id = self.project_id, "Failed to persist onboarding state: {}", e);
        }
    }

    fn navigate(&mut self) {
        self.bridge
            .sync(&mut self.router, &self.cursor.current_step().url);
    }

    fn reset_in_memory(&mut self) {
        self.cursor.clear_state();
        self.state.clear_state();
        self.substates.clear_state();
    }

    fn apply_snapshot(&mut self, snapshot: &PersistedSnapshot) {
        self.reset_in_memory();
        self.cursor.restore_state(&snapshot.step_handler);
        if snapshot.state_handler.is_object() {
            self.state.restore_state(&snapshot.state_handler);
        }
        self.substates.restore_state(&snapshot.substates);
        self.mirror_sub_step();
    }
}

impl<S, R> fmt::Debug for OnboardingWizard<S, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OnboardingWizard")
            .field("project_id", &self.project_id)
            .field("session_id", &self.session_id)
            .field("cursor", &self.cursor.current_step_name())
            .field("state", &self.state)
            .field("substates", &self.substates)
            .field("requests", &"StateMachine<StepRequestTracker>")
            .field("mounted", &self.mounted)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::FailingStore;
    use crate::router::HistoryRouter;
    use crate::storage::MemoryStore;
    use serde_json::json;

    fn wizard(store: &MemoryStore) -> OnboardingWizard<MemoryStore, HistoryRouter> {
        OnboardingWizard::new(7, PersistenceAdapter::new(store.clone()), HistoryRouter::new())
    }

    fn at_registry(store: &MemoryStore) -> OnboardingWizard<MemoryStore, HistoryRouter> {
        let mut wizard = wizard(store);
        wizard.mount();
        wizard.set_project("storefront").unwrap();
        wizard.connect_source(SourceKind::Github).unwrap();
        wizard
    }

    #[test]
    fn test_fresh_mount_navigates_to_initial_step() {
        let store = MemoryStore::new();
        let mut wizard = wizard(&store);

        assert_eq!(wizard.mount(), MountOutcome::Fresh);
        assert!(wizard.is_mounted());
        assert_eq!(wizard.router().history(), &["/onboarding/new-project".to_string()]);
        assert!(store.is_empty());
    }

    #[test]
    fn test_named_actions_update_state_and_persist() {
        let store = MemoryStore::new();
        let wizard = at_registry(&store);

        assert_eq!(wizard.current_step_name(), StepName::top(TopStep::ConnectRegistry));
        assert_eq!(wizard.state().project_id(), Some(7));
        assert_eq!(wizard.state().connected_source(), Some(SourceKind::Github));
        assert_eq!(wizard.router().location().as_deref(), Some("/onboarding/registry"));

        let saved = wizard.persistence().restore(7).unwrap();
        assert_eq!(saved.step_handler.current_step_name, "connect_registry");
        assert_eq!(saved.state_handler["connectedSource"], json!("github"));
    }

    #[test]
    fn test_action_on_wrong_step_is_rejected_without_mutation() {
        let store = MemoryStore::new();
        let mut wizard = at_registry(&store);
        let before = wizard.snapshot();

        let err = wizard.submit_registry_settings(json!({"name": "main"})).unwrap_err();
        assert!(matches!(err, WizardError::UnexpectedStep { .. }));
        assert_eq!(wizard.registry().config().settings, None);
        assert_eq!(wizard.snapshot().step_handler, before.step_handler);
    }

    #[test]
    fn test_registry_sub_steps_mirror_cursor() {
        let store = MemoryStore::new();
        let mut wizard = at_registry(&store);

        wizard.select_registry_provider(CloudProvider::Aws).unwrap();
        wizard.next_step(Action::Continue).unwrap();
        wizard.submit_registry_credentials(json!({"id": 12})).unwrap();

        assert_eq!(
            wizard.current_step_name(),
            StepName::sub(TopStep::ConnectRegistry, SubStepKey::Settings)
        );
        assert_eq!(wizard.registry().current_sub_step(), Some(RegistrySubStep::Settings));
        assert_eq!(wizard.registry().config().credentials, Some(json!({"id": 12})));
    }

    #[test]
    fn test_skip_registry_clears_registry_state() {
        let store = MemoryStore::new();
        let mut wizard = at_registry(&store);
        wizard.select_registry_provider(CloudProvider::Gcp).unwrap();

        wizard.skip_registry_connection().unwrap();
        assert_eq!(
            wizard.current_step_name(),
            StepName::top(TopStep::ProvisionResources)
        );
        assert!(wizard.state().skipped_registry_connection());
        assert_eq!(wizard.registry(), &RegistryConnectionState::default());
    }

    #[test]
    fn test_reaching_final_step_finishes_flow() {
        let store = MemoryStore::new();
        let mut wizard = at_registry(&store);
        wizard.skip_registry_connection().unwrap();
        wizard.skip_resource_provisioning().unwrap();
        wizard.connect_own_cluster(json!({"clusterId": 5})).unwrap();

        assert!(wizard.cursor().is_finished());
        assert_eq!(wizard.current_url(), "/dashboard");
        assert_eq!(wizard.state(), &OnboardingState::default());
        assert_eq!(wizard.provisioning(), &ProvisionResourcesState::default());
        assert_eq!(wizard.persistence().restore(7), None);
        assert!(wizard.next_step(Action::Continue).is_err());
    }

    #[test]
    fn test_provider_selection_after_finish_keeps_finished_marker() {
        let store = MemoryStore::new();
        let mut wizard = at_registry(&store);
        wizard.skip_registry_connection().unwrap();
        wizard.skip_resource_provisioning().unwrap();
        wizard.connect_own_cluster(json!({"clusterId": 5})).unwrap();
        let finished = store.get("onboarding-7").unwrap();

        let err = wizard
            .select_provisioning_provider(CloudProvider::Aws)
            .unwrap_err();
        assert!(matches!(err, WizardError::UnexpectedStep { .. }));
        assert_eq!(wizard.provisioning().selected_provider(), None);
        assert_eq!(store.get("onboarding-7").unwrap(), finished);

        let mut reopened =
            OnboardingWizard::new(7, PersistenceAdapter::new(store.clone()), HistoryRouter::new());
        assert_eq!(reopened.mount(), MountOutcome::Fresh);
    }

    #[test]
    fn test_provider_selection_outside_its_stage_is_rejected() {
        let store = MemoryStore::new();
        let mut wizard = at_registry(&store);
        let saved = store.get("onboarding-7").unwrap();

        assert!(matches!(
            wizard.select_provisioning_provider(CloudProvider::Gcp),
            Err(WizardError::UnexpectedStep { .. })
        ));
        assert_eq!(wizard.provisioning().selected_provider(), None);
        assert_eq!(store.get("onboarding-7").unwrap(), saved);

        wizard.skip_registry_connection().unwrap();
        wizard.skip_resource_provisioning().unwrap();
        assert!(matches!(
            wizard.select_provisioning_provider(CloudProvider::Gcp),
            Err(WizardError::UnexpectedStep { .. })
        ));
        assert!(matches!(
            wizard.select_registry_provider(CloudProvider::Gcp),
            Err(WizardError::UnexpectedStep { .. })
        ));
    }

    #[test]
    fn test_provider_change_rewinds_cursor_to_credentials() {
        let store = MemoryStore::new();
        let mut wizard = at_registry(&store);
        wizard.select_registry_provider(CloudProvider::Aws).unwrap();
        wizard.next_step(Action::Continue).unwrap();
        wizard.submit_registry_credentials(json!({"id": 12})).unwrap();

        let step = wizard.select_registry_provider(CloudProvider::Gcp).unwrap();

        let credentials = StepName::sub(TopStep::ConnectRegistry, SubStepKey::Credentials);
        assert_eq!(step, credentials);
        assert_eq!(wizard.current_step_name(), credentials);
        assert_eq!(wizard.registry().current_sub_step(), Some(RegistrySubStep::Credentials));
        assert_eq!(
            wizard.router().location().as_deref(),
            Some("/onboarding/registry/credentials")
        );

        let saved = wizard.persistence().restore(7).unwrap();
        assert_eq!(saved.step_handler.current_step_name, "connect_registry.credentials");
        assert_eq!(
            saved.substates["connected_registry"]["currentSubStep"],
            json!("credentials")
        );
    }

    #[test]
    fn test_clear_state_restarts_flow() {
        let store = MemoryStore::new();
        let mut wizard = at_registry(&store);
        wizard.select_registry_provider(CloudProvider::Do).unwrap();

        wizard.clear_state();
        assert_eq!(wizard.current_step_name(), StepName::top(TopStep::NewProject));
        assert_eq!(wizard.substates(), &SubStates::new());
        assert_eq!(
            wizard.router().location().as_deref(),
            Some("/onboarding/new-project")
        );
        let saved = wizard.persistence().restore(7).unwrap();
        assert_eq!(saved.step_handler.current_step_name, "new_project");
    }

    #[test]
    fn test_storage_failure_is_not_surfaced() {
        let mut wizard = OnboardingWizard::new(
            7,
            PersistenceAdapter::new(FailingStore),
            HistoryRouter::new(),
        );
        assert_eq!(wizard.mount(), MountOutcome::Fresh);
        assert!(wizard.set_project("storefront").is_ok());
        assert_eq!(wizard.current_step_name(), StepName::top(TopStep::ConnectSource));
    }

    #[test]
    fn test_begin_request_rejects_reentry() {
        let store = MemoryStore::new();
        let mut wizard = at_registry(&store);

        let ticket = wizard.begin_request().unwrap();
        assert_eq!(ticket.step(), StepName::top(TopStep::ConnectRegistry));
        assert!(matches!(
            wizard.begin_request(),
            Err(WizardError::RequestPending { .. })
        ));

        wizard.cancel_request();
        assert!(wizard.begin_request().is_ok());
    }

    #[test]
    fn test_request_completion_commits_payload() {
        let store = MemoryStore::new();
        let mut wizard = at_registry(&store);
        wizard.select_registry_provider(CloudProvider::Aws).unwrap();
        wizard.next_step(Action::Continue).unwrap();

        let ticket = wizard.begin_request().unwrap();
        let resolution = wizard
            .complete_request(ticket, StepCommit::RegistryCredentials, Ok(json!({"id": 3})))
            .unwrap();

        assert_eq!(
            resolution,
            RequestResolution::Advanced {
                step: StepName::sub(TopStep::ConnectRegistry, SubStepKey::Settings)
            }
        );
        assert_eq!(wizard.registry().config().credentials, Some(json!({"id": 3})));
    }

    #[test]
    fn test_rejected_request_stays_on_step() {
        let store = MemoryStore::new();
        let mut wizard = at_registry(&store);
        wizard.next_step(Action::Continue).unwrap();

        let ticket = wizard.begin_request().unwrap();
        let error = UpstreamRequestError::new("submit_registry_credentials", "403 Forbidden");
        let resolution = wizard
            .complete_request(ticket, StepCommit::RegistryCredentials, Err(error.clone()))
            .unwrap();

        assert_eq!(resolution, RequestResolution::Rejected(error));
        assert_eq!(
            wizard.current_step_name(),
            StepName::sub(TopStep::ConnectRegistry, SubStepKey::Credentials)
        );
        assert!(wizard.request_tracker().last_error().is_some());
    }

    #[test]
    fn test_response_after_unmount_is_stale() {
        let store = MemoryStore::new();
        let mut wizard = at_registry(&store);
        wizard.next_step(Action::Continue).unwrap();

        let ticket = wizard.begin_request().unwrap();
        wizard.unmount();

        let resolution = wizard
            .complete_request(ticket, StepCommit::RegistryCredentials, Ok(json!({"id": 3})))
            .unwrap();
        assert_eq!(resolution, RequestResolution::Stale);
        assert_eq!(wizard.registry().config().credentials, None);
        assert_eq!(
            wizard.current_step_name(),
            StepName::sub(TopStep::ConnectRegistry, SubStepKey::Credentials)
        );
    }

    #[test]
    fn test_response_after_navigating_away_is_stale() {
        let store = MemoryStore::new();
        let mut wizard = at_registry(&store);
        wizard.next_step(Action::Continue).unwrap();

        let ticket = wizard.begin_request().unwrap();
        wizard.previous_step().unwrap();

        let resolution = wizard
            .complete_request(ticket, StepCommit::RegistryCredentials, Ok(json!({"id": 3})))
            .unwrap();
        assert_eq!(resolution, RequestResolution::Stale);
        assert_eq!(wizard.current_step_name(), StepName::top(TopStep::ConnectRegistry));
    }

    #[test]
    fn test_double_resolution_applies_once() {
        let store = MemoryStore::new();
        let mut wizard = at_registry(&store);
        wizard.next_step(Action::Continue).unwrap();

        let ticket = wizard.begin_request().unwrap();
        wizard
            .complete_request(ticket, StepCommit::RegistryCredentials, Ok(json!({"id": 3})))
            .unwrap();
        let again = wizard
            .complete_request(ticket, StepCommit::RegistryCredentials, Ok(json!({"id": 4})))
            .unwrap();

        assert_eq!(again, RequestResolution::Stale);
        assert_eq!(wizard.registry().config().credentials, Some(json!({"id": 3})));
    }
}
