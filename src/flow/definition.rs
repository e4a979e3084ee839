// Flow definition - the immutable graph of onboarding steps

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use super::errors::FlowError;
use super::types::{Action, Step, StepName, SubStepKey, TopStep};

/// Validated, immutable set of steps and their transitions.
///
/// Construction checks that every transition target and every `previous`
/// link resolves, that final steps declare no transitions and that every
/// step has a URL. After that the graph shape never changes; only a
/// [`StepCursor`](super::StepCursor) moves over it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowDefinition {
    initial: StepName,
    steps: BTreeMap<TopStep, Step>,
}

impl FlowDefinition {
    pub fn new(initial: StepName, steps: BTreeMap<TopStep, Step>) -> Result<Self, FlowError> {
        let flow = Self { initial, steps };
        flow.validate()?;
        Ok(flow)
    }

    /// The product onboarding flow: project -> source -> registry -> provisioning -> clean up
    pub fn onboarding() -> Self {
        use SubStepKey::*;
        use TopStep::*;

        let registry = StepName::top(ConnectRegistry);
        let provision = StepName::top(ProvisionResources);

        let mut steps = BTreeMap::new();
        steps.insert(
            NewProject,
            Step::new("/onboarding/new-project").on(Action::Continue, ConnectSource),
        );
        steps.insert(
            ConnectSource,
            Step::new("/onboarding/source")
                .on(Action::Continue, ConnectRegistry)
                .previous(NewProject),
        );
        steps.insert(
            ConnectRegistry,
            Step::new("/onboarding/registry")
                .on(Action::Continue, StepName::sub(ConnectRegistry, Credentials))
                .on(Action::Skip, ProvisionResources)
                .previous(ConnectSource)
                .with_sub_step(
                    Credentials,
                    Step::new("/onboarding/registry/credentials")
                        .on(Action::Continue, StepName::sub(ConnectRegistry, Settings))
                        .previous(registry),
                )
                .with_sub_step(
                    Settings,
                    Step::new("/onboarding/registry/settings")
                        .on(Action::Continue, StepName::sub(ConnectRegistry, TestConnection))
                        .previous(StepName::sub(ConnectRegistry, Credentials)),
                )
                .with_sub_step(
                    TestConnection,
                    Step::new("/onboarding/registry/test_connection")
                        .on(Action::Continue, ProvisionResources)
                        .previous(StepName::sub(ConnectRegistry, Settings)),
                ),
        );
        steps.insert(
            ProvisionResources,
            Step::new("/onboarding/provision")
                .on(Action::Continue, StepName::sub(ProvisionResources, Credentials))
                .on(Action::Skip, StepName::sub(ProvisionResources, ConnectOwnCluster))
                .previous(ConnectRegistry)
                .with_sub_step(
                    Credentials,
                    Step::new("/onboarding/provision/credentials")
                        .on(Action::Continue, StepName::sub(ProvisionResources, Settings))
                        .previous(provision),
                )
                .with_sub_step(
                    Settings,
                    Step::new("/onboarding/provision/settings")
                        .on(Action::Continue, CleanUp)
                        .previous(StepName::sub(ProvisionResources, Credentials)),
                )
                .with_sub_step(
                    ConnectOwnCluster,
                    Step::new("/onboarding/provision/connect_own_cluster")
                        .on(Action::Continue, CleanUp)
                        .previous(provision),
                ),
        );
        steps.insert(CleanUp, Step::new("/dashboard").final_step());

        Self {
            initial: StepName::top(NewProject),
            steps,
        }
    }

    pub fn initial_step_name(&self) -> StepName {
        self.initial
    }

    pub fn initial_step(&self) -> &Step {
        // Resolvability of `initial` is checked in `validate`
        &self.steps[&self.initial.parent()]
    }

    /// Resolve a step name, descending into sub-steps for nested names
    pub fn get_step(&self, name: StepName) -> Result<&Step, FlowError> {
        let not_found = || FlowError::NotFound {
            name: name.to_string(),
        };

        let parent = self.steps.get(&name.parent()).ok_or_else(not_found)?;
        match name.sub_step() {
            None => Ok(parent),
            Some(key) => parent.sub_steps.get(&key).ok_or_else(not_found),
        }
    }

    /// Resolve a dotted textual name such as `connect_registry.settings`
    pub fn get_step_by_path(&self, path: &str) -> Result<(StepName, &Step), FlowError> {
        let name: StepName = path.parse()?;
        let step = self.get_step(name)?;
        Ok((name, step))
    }

    /// Every resolvable step name, parents before their sub-steps
    pub fn step_names(&self) -> Vec<StepName> {
        let mut names = Vec::new();
        for (top, step) in &self.steps {
            names.push(StepName::Top(*top));
            names.extend(step.sub_steps.keys().map(|key| StepName::sub(*top, *key)));
        }
        names
    }

    /// Step names reachable from the initial step by following declared transitions
    pub fn reachable_from_initial(&self) -> BTreeSet<StepName> {
        let mut seen = BTreeSet::new();
        let mut queue = VecDeque::from([self.initial]);

        while let Some(name) = queue.pop_front() {
            if !seen.insert(name) {
                continue;
            }
            if let Ok(step) = self.get_step(name) {
                queue.extend(step.transitions.values().copied());
            }
        }

        seen
    }

    fn validate(&self) -> Result<(), FlowError> {
        let invalid = |reason: String| FlowError::InvalidDefinition { reason };

        if self.initial.sub_step().is_some() || self.get_step(self.initial).is_err() {
            return Err(invalid(format!(
                "initial step '{}' must be a known top-level step",
                self.initial
            )));
        }

        for name in self.step_names() {
            let step = self.get_step(name)?;

            if step.url.trim().is_empty() {
                return Err(invalid(format!("step '{name}' has an empty url")));
            }
            if step.is_final && !step.transitions.is_empty() {
                return Err(invalid(format!(
                    "final step '{name}' must not declare transitions"
                )));
            }
            if name.sub_step().is_some() && !step.sub_steps.is_empty() {
                return Err(invalid(format!(
                    "sub-step '{name}' cannot declare nested sub-steps"
                )));
            }
            for (action, target) in &step.transitions {
                if self.get_step(*target).is_err() {
                    return Err(invalid(format!(
                        "step '{name}' has '{action}' transition to unknown step '{target}'"
                    )));
                }
            }
            if let Some(previous) = step.previous {
                if self.get_step(previous).is_err() {
                    return Err(invalid(format!(
                        "step '{name}' points back to unknown step '{previous}'"
                    )));
                }
            }
        }

        Ok(())
    }
}

impl Default for FlowDefinition {
    fn default() -> Self {
        Self::onboarding()
    }
}
