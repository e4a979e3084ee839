use anyhow::Result;
use clap::Parser;

mod cli;

use cli::commands::flow::FlowCommand;
use cli::commands::init::InitConfigCommand;
use cli::commands::reset::ResetCommand;
use cli::commands::status::StatusCommand;
use cli::commands::step::{StepAction, StepCommand};
use cli::commands::WizardContext;
use cli::{Cli, Commands};
use onboarding_flow::{config, init_telemetry};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = config()?.clone();
    if cli.json_logs {
        config.observability.json_logs = true;
    }
    init_telemetry(&config.observability)?;

    let context = WizardContext::new(cli.project, cli.state_dir, config);

    match cli.command {
        Commands::Flow => FlowCommand::new().execute(),
        Commands::Status => StatusCommand::new(context).execute(),
        Commands::Create { name } => StepCommand::new(context, StepAction::Create(name)).execute(),
        Commands::Next { action } => StepCommand::new(context, StepAction::Next(action)).execute(),
        Commands::Back => StepCommand::new(context, StepAction::Back).execute(),
        Commands::Source { kind } => StepCommand::new(context, StepAction::Source(kind)).execute(),
        Commands::Provider { domain, provider } => {
            StepCommand::new(context, StepAction::Provider(domain, provider)).execute()
        }
        Commands::Submit {
            domain,
            form,
            payload,
        } => StepCommand::new(context, StepAction::Submit(domain, form, payload)).execute(),
        Commands::Reset => ResetCommand::new(context).execute(),
        Commands::InitConfig { force } => InitConfigCommand::new(force).execute(),
    }
}
