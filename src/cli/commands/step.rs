use anyhow::{anyhow, Context, Result};
use onboarding_flow::{Action, CloudProvider, SourceKind};
use serde_json::Value;

use super::{print_navigation, CliWizard, WizardContext};
use crate::cli::{Domain, FormKind};

/// One wizard action per invocation
#[derive(Debug, Clone)]
pub enum StepAction {
    Create(String),
    Next(Action),
    Back,
    Source(SourceKind),
    Provider(Domain, CloudProvider),
    Submit(Domain, FormKind, String),
}

pub struct StepCommand {
    context: WizardContext,
    action: StepAction,
}

impl StepCommand {
    pub fn new(context: WizardContext, action: StepAction) -> Self {
        Self { context, action }
    }

    pub fn execute(&self) -> Result<()> {
        let mut wizard = self.context.open()?;
        let mounted_at = wizard.router().history().len();

        self.apply(&mut wizard)?;
        print_navigation(&wizard, mounted_at);
        Ok(())
    }

    fn apply(&self, wizard: &mut CliWizard) -> Result<()> {
        match &self.action {
            StepAction::Create(name) => {
                wizard.set_project(name)?;
            }
            StepAction::Next(action) => {
                wizard.next_step(*action)?;
            }
            StepAction::Back => {
                wizard.previous_step()?;
            }
            StepAction::Source(kind) => {
                wizard.connect_source(*kind)?;
            }
            StepAction::Provider(Domain::Registry, provider) => {
                wizard.select_registry_provider(*provider)?;
                println!("☁️  Registry provider set to {}", provider);
            }
            StepAction::Provider(Domain::Provisioning, provider) => {
                wizard.select_provisioning_provider(*provider)?;
                println!("☁️  Provisioning provider set to {}", provider);
            }
            StepAction::Submit(domain, form, payload) => {
                let payload: Value = serde_json::from_str(payload)
                    .with_context(|| format!("Payload is not valid JSON: {}", payload))?;
                submit(wizard, *domain, *form, payload)?;
            }
        }
        Ok(())
    }
}

fn submit(wizard: &mut CliWizard, domain: Domain, form: FormKind, payload: Value) -> Result<()> {
    match (domain, form) {
        (Domain::Registry, FormKind::Credentials) => wizard.submit_registry_credentials(payload)?,
        (Domain::Registry, FormKind::Settings) => wizard.submit_registry_settings(payload)?,
        (Domain::Provisioning, FormKind::Credentials) => {
            wizard.submit_provisioning_credentials(payload)?
        }
        (Domain::Provisioning, FormKind::Settings) => wizard.submit_provisioning_settings(payload)?,
        (Domain::Provisioning, FormKind::OwnCluster) => wizard.connect_own_cluster(payload)?,
        (Domain::Registry, FormKind::OwnCluster) => {
            return Err(anyhow!("The registry stage has no own-cluster form"));
        }
    };
    Ok(())
}
