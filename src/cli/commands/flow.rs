use anyhow::Result;
use onboarding_flow::FlowDefinition;

pub struct FlowCommand {
    flow: FlowDefinition,
}

impl FlowCommand {
    pub fn new() -> Self {
        Self {
            flow: FlowDefinition::onboarding(),
        }
    }

    pub fn execute(&self) -> Result<()> {
        println!("🗺️  ONBOARDING FLOW");
        println!("==================");
        println!("Initial step: {}", self.flow.initial_step_name());
        println!();

        for name in self.flow.step_names() {
            let step = self.flow.get_step(name)?;
            let marker = if step.is_final { " (final)" } else { "" };
            println!("{}{} -> {}", name, marker, step.url);

            for (action, target) in &step.transitions {
                println!("    {} -> {}", action, target);
            }
            if let Some(previous) = step.previous {
                println!("    back -> {}", previous);
            }
        }
        Ok(())
    }
}
