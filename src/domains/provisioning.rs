use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use super::{field, CloudProvider, DomainState, ProviderConfig};
use crate::flow::SubStepKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvisionSubStep {
    Credentials,
    Settings,
    ConnectOwnCluster,
}

impl ProvisionSubStep {
    pub fn from_step_key(key: SubStepKey) -> Option<Self> {
        match key {
            SubStepKey::Credentials => Some(ProvisionSubStep::Credentials),
            SubStepKey::Settings => Some(ProvisionSubStep::Settings),
            SubStepKey::ConnectOwnCluster => Some(ProvisionSubStep::ConnectOwnCluster),
            SubStepKey::TestConnection => None,
        }
    }
}

/// Resource provisioning choices: either a managed cluster on a cloud
/// provider (credentials + settings) or an existing cluster the user brings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProvisionResourcesState {
    selected_provider: Option<CloudProvider>,
    current_sub_step: Option<ProvisionSubStep>,
    config: ProviderConfig,
    own_cluster: Option<Value>,
}

impl ProvisionResourcesState {
    pub const KEY: &'static str = "provision_resources";

    pub fn selected_provider(&self) -> Option<CloudProvider> {
        self.selected_provider
    }

    pub fn current_sub_step(&self) -> Option<ProvisionSubStep> {
        self.current_sub_step
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    pub fn own_cluster(&self) -> Option<&Value> {
        self.own_cluster.as_ref()
    }

    pub fn select_provider(&mut self, provider: CloudProvider) {
        if self.selected_provider != Some(provider) {
            self.config.credentials = None;
        }
        self.config.settings = None;
        self.selected_provider = Some(provider);
        self.current_sub_step = Some(ProvisionSubStep::Credentials);

        info!(domain = Self::KEY, provider = %provider, "Provisioning provider selected");
    }

    pub fn enter_sub_step(&mut self, sub_step: ProvisionSubStep) {
        self.current_sub_step = Some(sub_step);
    }

    pub fn submit_credentials(&mut self, credentials: Value) {
        self.config.credentials = Some(credentials);
    }

    pub fn submit_settings(&mut self, settings: Value) {
        self.config.settings = Some(settings);
    }

    pub fn connect_own_cluster(&mut self, cluster: Value) {
        self.own_cluster = Some(cluster);
    }
}

impl DomainState for ProvisionResourcesState {
    fn key(&self) -> &'static str {
        Self::KEY
    }

    fn clear_state(&mut self) {
        *self = Self::default();
    }

    fn snapshot(&self) -> Value {
        let mut snapshot = json!({
            "selectedProvider": self.selected_provider,
            "currentSubStep": self.current_sub_step,
            "config": self.config.snapshot(),
        });
        if let Some(cluster) = &self.own_cluster {
            snapshot["ownCluster"] = cluster.clone();
        }
        snapshot
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
        if let Some(cluster) = prev.get("ownCluster").filter(|v| !v.is_null()) {
            self.own_cluster = Some(cluster.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_provider_discards_settings() {
        let mut state = ProvisionResourcesState::default();
        state.select_provider(CloudProvider::Gcp);
        state.enter_sub_step(ProvisionSubStep::Settings);
        state.submit_settings(json!({"clusterName": "prod"}));

        state.select_provider(CloudProvider::Gcp);
        assert_eq!(state.current_sub_step(), Some(ProvisionSubStep::Credentials));
        assert_eq!(state.config().settings, None);
    }

    #[test]
    fn test_own_cluster_round_trip() {
        let mut state = ProvisionResourcesState::default();
        state.enter_sub_step(ProvisionSubStep::ConnectOwnCluster);
        state.connect_own_cluster(json!({"clusterId": 99}));

        let snapshot = state.snapshot();
        assert_eq!(snapshot["ownCluster"], json!({"clusterId": 99}));
        assert_eq!(snapshot["currentSubStep"], json!("connect_own_cluster"));

        let mut restored = ProvisionResourcesState::default();
        restored.restore_state(&snapshot);
        assert_eq!(restored, state);
    }

    #[test]
    fn test_restore_keeps_current_values_for_bad_fields() {
        let mut state = ProvisionResourcesState::default();
        state.select_provider(CloudProvider::Aws);

        state.restore_state(&json!({"selectedProvider": 12, "currentSubStep": "unknown"}));
        assert_eq!(state.selected_provider(), Some(CloudProvider::Aws));
        assert_eq!(state.current_sub_step(), Some(ProvisionSubStep::Credentials));
    }

    #[test]
    fn test_clear_state() {
        let mut state = ProvisionResourcesState::default();
        state.select_provider(CloudProvider::Do);
        state.connect_own_cluster(json!({"clusterId": 1}));
        state.clear_state();
        assert_eq!(state, ProvisionResourcesState::default());
    }
}
