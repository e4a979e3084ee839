use anyhow::Result;

use super::{print_current_step, print_domain, WizardContext};

pub struct StatusCommand {
    context: WizardContext,
}

impl StatusCommand {
    pub fn new(context: WizardContext) -> Self {
        Self { context }
    }

    pub fn execute(&self) -> Result<()> {
        let wizard = self.context.open()?;

        println!("🧭 ONBOARDING STATUS - project {}", wizard.project_id());
        println!("==============================");
        print_current_step(&wizard);
        println!();

        let state = wizard.state();
        println!("📋 Collected:");
        println!("   project: {}", state.project_name().unwrap_or("-"));
        println!(
            "   source: {}",
            state
                .connected_source()
                .map(|s| s.to_string())
                .unwrap_or_else(|| "-".to_string())
        );
        if state.skipped_registry_connection() {
            println!("   registry connection skipped");
        }
        if state.skipped_resource_provisioning() {
            println!("   resource provisioning skipped");
        }

        for domain in wizard.substates().domains() {
            print_domain(domain)?;
        }
        Ok(())
    }
}
