use clap::{Parser, Subcommand, ValueEnum};
use onboarding_flow::{Action, CloudProvider, SourceKind};
use std::path::PathBuf;

pub mod commands;

#[derive(Parser)]
#[command(name = "onboarding")]
#[command(about = "Resumable project onboarding wizard")]
#[command(long_about = "Walks a project through creation, source connection, container registry \
                       connection and resource provisioning. Progress is saved after every step, \
                       so each invocation picks up where the last one stopped.")]
pub struct Cli {
    /// Project the wizard runs for
    #[arg(long, global = true, default_value = "1", help = "Numeric project id the progress is saved under")]
    pub project: u64,

    /// Directory holding saved progress
    #[arg(long, global = true, help = "Override storage.directory from the configuration")]
    pub state_dir: Option<PathBuf>,

    /// Emit JSON log lines
    #[arg(long, global = true, help = "Write structured JSON logs to stderr")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print every step of the flow with its URL and transitions
    Flow,
    /// Show the current step and what has been collected so far
    Status,
    /// Name the project and leave the first step
    Create {
        /// Project name
        name: String,
    },
    /// Follow an action from the current step
    Next {
        /// Action to follow
        #[arg(help = "continue or skip")]
        action: Action,
    },
    /// Go back to the previous step
    Back,
    /// Connect the project's source
    Source {
        #[arg(help = "github or docker")]
        kind: SourceKind,
    },
    /// Select the cloud provider for the registry or provisioning stage
    Provider {
        #[arg(value_enum)]
        domain: Domain,
        #[arg(help = "aws, gcp or do")]
        provider: CloudProvider,
    },
    /// Submit a form of the registry or provisioning stage
    Submit {
        #[arg(value_enum)]
        domain: Domain,
        #[arg(value_enum)]
        form: FormKind,
        /// Form payload as JSON
        payload: String,
    },
    /// Forget saved progress and restart from the first step
    Reset,
    /// Write a default onboarding.toml to the current directory
    InitConfig {
        /// Overwrite an existing onboarding.toml
        #[arg(long, help = "Overwrite an existing configuration file")]
        force: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Domain {
    Registry,
    Provisioning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormKind {
    Credentials,
    Settings,
    OwnCluster,
}
