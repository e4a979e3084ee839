use anyhow::Result;

use super::{print_navigation, WizardContext};

pub struct ResetCommand {
    context: WizardContext,
}

impl ResetCommand {
    pub fn new(context: WizardContext) -> Self {
        Self { context }
    }

    pub fn execute(&self) -> Result<()> {
        let mut wizard = self.context.open()?;
        let mounted_at = wizard.router().history().len();

        println!("🔄 Resetting onboarding for project {}", wizard.project_id());
        wizard.clear_state();
        print_navigation(&wizard, mounted_at);
        Ok(())
    }
}
