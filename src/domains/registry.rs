// Registry connection state - provider choice and per-sub-step form data

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use super::{field, CloudProvider, DomainState, ProviderConfig};
use crate::flow::SubStepKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrySubStep {
    Credentials,
    Settings,
    TestConnection,
}

impl RegistrySubStep {
    pub fn from_step_key(key: SubStepKey) -> Option<Self> {
        match key {
            SubStepKey::Credentials => Some(RegistrySubStep::Credentials),
            SubStepKey::Settings => Some(RegistrySubStep::Settings),
            SubStepKey::TestConnection => Some(RegistrySubStep::TestConnection),
            SubStepKey::ConnectOwnCluster => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegistryConnectionState {
    selected_provider: Option<CloudProvider>,
    current_sub_step: Option<RegistrySubStep>,
    config: ProviderConfig,
}

impl RegistryConnectionState {
    pub const KEY: &'static str = "connected_registry";

    pub fn selected_provider(&self) -> Option<CloudProvider> {
        self.selected_provider
    }

    pub fn current_sub_step(&self) -> Option<RegistrySubStep> {
        self.current_sub_step
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Choose the registry provider. Restarts the domain at `credentials`
    /// and drops settings entered so far; credentials survive only when the
    /// provider does not change.
    pub fn select_provider(&mut self, provider: CloudProvider) {
        if self.selected_provider != Some(provider) {
            self.config.credentials = None;
        }
        self.config.settings = None;
        self.selected_provider = Some(provider);
        self.current_sub_step = Some(RegistrySubStep::Credentials);

        info!(domain = Self::KEY, provider = %provider, "Registry provider selected");
    }

    pub fn enter_sub_step(&mut self, sub_step: RegistrySubStep) {
        self.current_sub_step = Some(sub_step);
    }

    pub fn submit_credentials(&mut self, credentials: Value) {
        self.config.credentials = Some(credentials);
    }

    pub fn submit_settings(&mut self, settings: Value) {
        self.config.settings = Some(settings);
    }
}

impl DomainState for RegistryConnectionState {
    fn key(&self) -> &'static str {
        Self::KEY
    }

    fn clear_state(&mut self) {
        *self = Self::default();
    }

    fn snapshot(&self) -> Value {
        json!({
            "selectedProvider": self.selected_provider,
            "currentSubStep": self.current_sub_step,
            "config": self.config.snapshot(),
        })
    }

    fn restore_state(&mut self, prev: &Value) {
        if let Some(provider) = field(prev, "selectedProvider") {
            self.selected_provider = Some(provider);
        }
        if let Some(sub_step) = field(prev, "currentSubStep") {
            self.current_sub_step = Some(sub_step);
        }
        if let Some(config) = prev.get("config") {
            self.config.restore_state(config);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_provider_resets_to_credentials() {
        let mut state = RegistryConnectionState::default();
        state.select_provider(CloudProvider::Aws);
        state.submit_credentials(json!({"id": 7}));
        state.enter_sub_step(RegistrySubStep::Settings);
        state.submit_settings(json!({"region": "us-east-2"}));

        state.select_provider(CloudProvider::Aws);

        assert_eq!(state.current_sub_step(), Some(RegistrySubStep::Credentials));
        assert_eq!(state.config().settings, None);
        assert_eq!(state.config().credentials, Some(json!({"id": 7})));
    }

    #[test]
    fn test_switching_provider_drops_credentials() {
        let mut state = RegistryConnectionState::default();
        state.select_provider(CloudProvider::Aws);
        state.submit_credentials(json!({"id": 7}));

        state.select_provider(CloudProvider::Gcp);
        assert_eq!(state.selected_provider(), Some(CloudProvider::Gcp));
        assert!(state.config().is_empty());
    }

    #[test]
    fn test_snapshot_shape() {
        let mut state = RegistryConnectionState::default();
        assert_eq!(
            state.snapshot(),
            json!({"selectedProvider": null, "currentSubStep": null, "config": {}})
        );

        state.select_provider(CloudProvider::Do);
        state.submit_credentials(json!({"id": 3}));
        assert_eq!(
            state.snapshot(),
            json!({
                "selectedProvider": "do",
                "currentSubStep": "credentials",
                "config": {"credentials": {"id": 3}}
            })
        );
    }

    #[test]
    fn test_restore_merges_present_fields_only() {
        let mut state = RegistryConnectionState::default();
        state.restore_state(&json!({
            "currentSubStep": "test_connection",
            "config": {"settings": {"name": "main"}},
            "someFutureField": true
        }));

        assert_eq!(state.selected_provider(), None);
        assert_eq!(state.current_sub_step(), Some(RegistrySubStep::TestConnection));
        assert_eq!(state.config().credentials, None);
        assert_eq!(state.config().settings, Some(json!({"name": "main"})));
    }

    #[test]
    fn test_restore_round_trip() {
        let mut state = RegistryConnectionState::default();
        state.select_provider(CloudProvider::Gcp);
        state.submit_credentials(json!({"id": 11}));
        state.enter_sub_step(RegistrySubStep::Settings);

        let mut restored = RegistryConnectionState::default();
        restored.restore_state(&state.snapshot());
        assert_eq!(restored, state);
    }

    #[test]
    fn test_sub_step_from_step_key() {
        assert_eq!(
            RegistrySubStep::from_step_key(SubStepKey::TestConnection),
            Some(RegistrySubStep::TestConnection)
        );
        assert_eq!(RegistrySubStep::from_step_key(SubStepKey::ConnectOwnCluster), None);
    }
}
