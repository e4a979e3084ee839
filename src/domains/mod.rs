// Per-domain wizard state
//
// Each wizard stage keeps the data its forms collect in its own domain
// state. `SubStates` is the single registration point: persistence
// enumerates it instead of naming fields.

pub mod source;
pub mod registry;
pub mod provisioning;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

pub use source::{OnboardingState, SourceKind};
pub use registry::{RegistryConnectionState, RegistrySubStep};
pub use provisioning::{ProvisionResourcesState, ProvisionSubStep};

/// State owned by one wizard domain
pub trait DomainState: fmt::Debug {
    /// Key under which the domain is persisted
    fn key(&self) -> &'static str;

    /// Return to the empty shape the domain has on wizard entry
    fn clear_state(&mut self);

    /// Plain-data view of the domain for persistence
    fn snapshot(&self) -> Value;

    /// Merge a persisted partial object field by field. Fields that are
    /// absent or no longer deserialize keep their current value.
    fn restore_state(&mut self, prev: &Value);
}

/// Read one field of a persisted object, ignoring it when absent or ill-typed
pub(crate) fn field<T: DeserializeOwned>(prev: &Value, key: &str) -> Option<T> {
    let raw = prev.get(key)?;
    match serde_json::from_value(raw.clone()) {
        Ok(value) => Some(value),
        Err(e) => {
            debug!(field = key, "Ignoring persisted field that no longer parses: {}", e);
            None
        }
    }
}

/// Cloud provider a registry or cluster lives on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CloudProvider {
    Aws,
    Gcp,
    Do,
}

impl CloudProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            CloudProvider::Aws => "aws",
            CloudProvider::Gcp => "gcp",
            CloudProvider::Do => "do",
        }
    }
}

impl fmt::Display for CloudProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CloudProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "aws" => Ok(CloudProvider::Aws),
            "gcp" => Ok(CloudProvider::Gcp),
            "do" | "digitalocean" => Ok(CloudProvider::Do),
            other => Err(format!("unknown provider '{other}' (expected aws, gcp or do)")),
        }
    }
}

/// Form data committed for a provider. Payloads are opaque and stored as
/// received (e.g. `{"id": 42}` from a credentials endpoint).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProviderConfig {
    pub credentials: Option<Value>,
    pub settings: Option<Value>,
}

impl ProviderConfig {
    pub fn is_empty(&self) -> bool {
        self.credentials.is_none() && self.settings.is_none()
    }

    pub(crate) fn snapshot(&self) -> Value {
        let mut object = serde_json::Map::new();
        if let Some(credentials) = &self.credentials {
            object.insert("credentials".to_string(), credentials.clone());
        }
        if let Some(settings) = &self.settings {
            object.insert("settings".to_string(), settings.clone());
        }
        Value::Object(object)
    }

    pub(crate) fn restore_state(&mut self, prev: &Value) {
        if let Some(credentials) = prev.get("credentials").filter(|v| !v.is_null()) {
            self.credentials = Some(credentials.clone());
        }
        if let Some(settings) = prev.get("settings").filter(|v| !v.is_null()) {
            self.settings = Some(settings.clone());
        }
    }
}

/// Registry of the wizard sub-states that are persisted under `substates`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubStates {
    connected_registry: RegistryConnectionState,
    provision_resources: ProvisionResourcesState,
}

impl SubStates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every registered domain, in persistence order
    pub fn domains(&self) -> [&dyn DomainState; 2] {
        [&self.connected_registry, &self.provision_resources]
    }

    pub fn domains_mut(&mut self) -> [&mut dyn DomainState; 2] {
        [&mut self.connected_registry, &mut self.provision_resources]
    }

    pub fn keys(&self) -> Vec<&'static str> {
        self.domains().iter().map(|domain| domain.key()).collect()
    }

    pub fn registry(&self) -> &RegistryConnectionState {
        &self.connected_registry
    }

    pub(crate) fn registry_mut(&mut self) -> &mut RegistryConnectionState {
        &mut self.connected_registry
    }

    pub fn provisioning(&self) -> &ProvisionResourcesState {
        &self.provision_resources
    }

    pub(crate) fn provisioning_mut(&mut self) -> &mut ProvisionResourcesState {
        &mut self.provision_resources
    }

    pub fn clear_state(&mut self) {
        for domain in self.domains_mut() {
            domain.clear_state();
        }
    }

    pub fn snapshot(&self) -> BTreeMap<String, Value> {
        self.domains()
            .iter()
            .map(|domain| (domain.key().to_string(), domain.snapshot()))
            .collect()
    }

    pub fn restore_state(&mut self, prev: &BTreeMap<String, Value>) {
        for domain in self.domains_mut() {
            match prev.get(domain.key()) {
                Some(value) if value.is_object() => domain.restore_state(value),
                Some(_) => debug!(domain = domain.key(), "Persisted domain state is not an object"),
                None => debug!(domain = domain.key(), "No persisted state for domain"),
            }
        }

        let known = self.keys();
        for key in prev.keys().filter(|key| !known.contains(&key.as_str())) {
            debug!(domain = %key, "Ignoring persisted state for unregistered domain");
        }
    }
}
