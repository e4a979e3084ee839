use anyhow::Result;
use onboarding_flow::{
    DomainState, FileStore, HistoryRouter, OnboardingConfig, OnboardingWizard, PersistenceAdapter,
    RouterBridge,
};
use std::path::PathBuf;

pub mod flow;
pub mod init;
pub mod reset;
pub mod status;
pub mod step;

pub type CliWizard = OnboardingWizard<FileStore, HistoryRouter>;

/// Where and how the wizard for one project is opened
#[derive(Debug, Clone)]
pub struct WizardContext {
    pub project_id: u64,
    pub state_dir: PathBuf,
    pub config: OnboardingConfig,
}

impl WizardContext {
    pub fn new(project_id: u64, state_dir: Option<PathBuf>, config: OnboardingConfig) -> Self {
        let state_dir = state_dir.unwrap_or_else(|| config.storage.directory.clone());
        Self {
            project_id,
            state_dir,
            config,
        }
    }

    /// Build the wizard and restore saved progress
    pub fn open(&self) -> Result<CliWizard> {
        std::fs::create_dir_all(&self.state_dir)?;

        let persistence = PersistenceAdapter::with_key_prefix(
            FileStore::new(&self.state_dir),
            self.config.storage.key_prefix.clone(),
        );
        let bridge = RouterBridge::new(self.config.routing.preserved_query_params.clone());

        let mut wizard = OnboardingWizard::new(self.project_id, persistence, HistoryRouter::new())
            .with_router_bridge(bridge);
        wizard.mount();
        Ok(wizard)
    }
}

/// Print navigations issued after `from` and the step now displayed
pub fn print_navigation(wizard: &CliWizard, from: usize) {
    for location in wizard.router().history().iter().skip(from) {
        println!("➡️  Navigated to {}", location);
    }
    print_current_step(wizard);
}

pub fn print_current_step(wizard: &CliWizard) {
    let cursor = wizard.cursor();
    if cursor.is_finished() {
        println!("🎉 Onboarding finished ({})", wizard.current_url());
        return;
    }

    println!("📍 Step: {} ({})", cursor.current_step_name(), wizard.current_url());
    let actions: Vec<String> = cursor
        .available_actions()
        .iter()
        .map(|a| a.to_string())
        .collect();
    if !actions.is_empty() {
        println!("   Actions: {}", actions.join(", "));
    }
}

pub fn print_domain(domain: &dyn DomainState) -> Result<()> {
    println!("   {}: {}", domain.key(), serde_json::to_string(&domain.snapshot())?);
    Ok(())
}
