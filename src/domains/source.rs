// Project and source-control state shared by every step

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;

use super::{field, DomainState};

/// Where the project's application source comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Github,
    Docker,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Github => f.write_str("github"),
            SourceKind::Docker => f.write_str("docker"),
        }
    }
}

impl FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "github" => Ok(SourceKind::Github),
            "docker" => Ok(SourceKind::Docker),
            other => Err(format!("unknown source '{other}' (expected github or docker)")),
        }
    }
}

/// Top-level wizard state, persisted under `stateHandler`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OnboardingState {
    project_id: Option<u64>,
    project_name: Option<String>,
    connected_source: Option<SourceKind>,
    skipped_registry_connection: bool,
    skipped_resource_provisioning: bool,
}

impl OnboardingState {
    pub const KEY: &'static str = "stateHandler";

    pub fn project_id(&self) -> Option<u64> {
        self.project_id
    }

    pub fn project_name(&self) -> Option<&str> {
        self.project_name.as_deref()
    }

    pub fn connected_source(&self) -> Option<SourceKind> {
        self.connected_source
    }

    pub fn skipped_registry_connection(&self) -> bool {
        self.skipped_registry_connection
    }

    pub fn skipped_resource_provisioning(&self) -> bool {
        self.skipped_resource_provisioning
    }

    pub fn set_project(&mut self, id: u64, name: impl Into<String>) {
        self.project_id = Some(id);
        self.project_name = Some(name.into());
    }

    pub fn connect_source(&mut self, source: SourceKind) {
        self.connected_source = Some(source);
    }

    pub fn skip_registry_connection(&mut self) {
        self.skipped_registry_connection = true;
    }

    pub fn skip_resource_provisioning(&mut self) {
        self.skipped_resource_provisioning = true;
    }
}

impl DomainState for OnboardingState {
    fn key(&self) -> &'static str {
        Self::KEY
    }

    fn clear_state(&mut self) {
        *self = Self::default();
    }

    fn snapshot(&self) -> Value {
        json!({
            "projectId": self.project_id,
            "projectName": self.project_name,
            "connectedSource": self.connected_source,
            "skippedRegistryConnection": self.skipped_registry_connection,
            "skippedResourceProvisioning": self.skipped_resource_provisioning,
        })
    }

    fn restore_state(&mut self, prev: &Value) {
        if let Some(id) = field(prev, "projectId") {
            self.project_id = Some(id);
        }
        if let Some(name) = field(prev, "projectName") {
            self.project_name = Some(name);
        }
        if let Some(source) = field(prev, "connectedSource") {
            self.connected_source = Some(source);
        }
        if let Some(skipped) = field(prev, "skippedRegistryConnection") {
            self.skipped_registry_connection = skipped;
        }
        if let Some(skipped) = field(prev, "skippedResourceProvisioning") {
            self.skipped_resource_provisioning = skipped;
        }
    }
}
