// Core flow types - step names, actions and step nodes

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::errors::FlowError;

/// Top-level stage of the onboarding wizard
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TopStep {
    NewProject,
    ConnectSource,
    ConnectRegistry,
    ProvisionResources,
    CleanUp,
}

impl TopStep {
    pub const ALL: [TopStep; 5] = [
        TopStep::NewProject,
        TopStep::ConnectSource,
        TopStep::ConnectRegistry,
        TopStep::ProvisionResources,
        TopStep::CleanUp,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TopStep::NewProject => "new_project",
            TopStep::ConnectSource => "connect_source",
            TopStep::ConnectRegistry => "connect_registry",
            TopStep::ProvisionResources => "provision_resources",
            TopStep::CleanUp => "clean_up",
        }
    }
}

impl FromStr for TopStep {
    type Err = FlowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TopStep::ALL
            .into_iter()
            .find(|step| step.as_str() == s)
            .ok_or_else(|| FlowError::NotFound {
                name: s.to_string(),
            })
    }
}

/// Key of a step nested under a top-level step
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SubStepKey {
    Credentials,
    Settings,
    TestConnection,
    ConnectOwnCluster,
}

impl SubStepKey {
    pub const ALL: [SubStepKey; 4] = [
        SubStepKey::Credentials,
        SubStepKey::Settings,
        SubStepKey::TestConnection,
        SubStepKey::ConnectOwnCluster,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SubStepKey::Credentials => "credentials",
            SubStepKey::Settings => "settings",
            SubStepKey::TestConnection => "test_connection",
            SubStepKey::ConnectOwnCluster => "connect_own_cluster",
        }
    }
}

impl FromStr for SubStepKey {
    type Err = FlowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SubStepKey::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| FlowError::NotFound {
                name: s.to_string(),
            })
    }
}

/// Name of a step in the flow.
///
/// The textual form is dotted (`connect_registry.credentials`); inside the
/// crate the parent/child relation is carried by the variant instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StepName {
    Top(TopStep),
    Sub { parent: TopStep, name: SubStepKey },
}

impl StepName {
    pub const fn top(step: TopStep) -> Self {
        StepName::Top(step)
    }

    pub const fn sub(parent: TopStep, name: SubStepKey) -> Self {
        StepName::Sub { parent, name }
    }

    /// Top-level step this name lives under (itself for top-level names)
    pub fn parent(&self) -> TopStep {
        match self {
            StepName::Top(step) => *step,
            StepName::Sub { parent, .. } => *parent,
        }
    }

    pub fn sub_step(&self) -> Option<SubStepKey> {
        match self {
            StepName::Top(_) => None,
            StepName::Sub { name, .. } => Some(*name),
        }
    }
}

impl From<TopStep> for StepName {
    fn from(step: TopStep) -> Self {
        StepName::Top(step)
    }
}

impl fmt::Display for StepName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepName::Top(step) => write!(f, "{}", step.as_str()),
            StepName::Sub { parent, name } => write!(f, "{}.{}", parent.as_str(), name.as_str()),
        }
    }
}

impl FromStr for StepName {
    type Err = FlowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let not_found = || FlowError::NotFound {
            name: s.to_string(),
        };

        match s.split_once('.') {
            None => TopStep::from_str(s).map(StepName::Top).map_err(|_| not_found()),
            Some((parent, name)) => {
                let parent = TopStep::from_str(parent).map_err(|_| not_found())?;
                let name = SubStepKey::from_str(name).map_err(|_| not_found())?;
                Ok(StepName::Sub { parent, name })
            }
        }
    }
}

impl Serialize for StepName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for StepName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Named transition trigger a step may declare
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Continue,
    Skip,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Continue => "continue",
            Action::Skip => "skip",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "continue" => Ok(Action::Continue),
            "skip" => Ok(Action::Skip),
            other => Err(format!("unknown action '{other}' (expected continue or skip)")),
        }
    }
}

/// A node of the flow graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub url: String,
    pub previous: Option<StepName>,
    pub is_final: bool,
    pub transitions: BTreeMap<Action, StepName>,
    pub sub_steps: BTreeMap<SubStepKey, Step>,
}

impl Step {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            previous: None,
            is_final: false,
            transitions: BTreeMap::new(),
            sub_steps: BTreeMap::new(),
        }
    }

    pub fn on(mut self, action: Action, target: impl Into<StepName>) -> Self {
        self.transitions.insert(action, target.into());
        self
    }

    pub fn previous(mut self, previous: impl Into<StepName>) -> Self {
        self.previous = Some(previous.into());
        self
    }

    pub fn final_step(mut self) -> Self {
        self.is_final = true;
        self
    }

    pub fn with_sub_step(mut self, key: SubStepKey, step: Step) -> Self {
        self.sub_steps.insert(key, step);
        self
    }

    pub fn transition(&self, action: Action) -> Option<StepName> {
        self.transitions.get(&action).copied()
    }

    pub fn actions(&self) -> Vec<Action> {
        self.transitions.keys().copied().collect()
    }
}
