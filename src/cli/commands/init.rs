use anyhow::{anyhow, Result};
use onboarding_flow::config::CONFIG_FILE_NAME;
use onboarding_flow::OnboardingConfig;
use std::path::{Path, PathBuf};

/// Writes the default configuration. An existing file is only replaced
/// with `--force`.
pub struct InitConfigCommand {
    pub force: bool,
    path: PathBuf,
}

impl InitConfigCommand {
    pub fn new(force: bool) -> Self {
        Self {
            force,
            path: Path::new(".").join(CONFIG_FILE_NAME),
        }
    }

    pub fn execute(&self) -> Result<()> {
        if self.path.exists() && !self.force {
            return Err(anyhow!(
                "{} already exists. Use --force to overwrite it",
                CONFIG_FILE_NAME
            ));
        }

        OnboardingConfig::default().save_to_file(&self.path)?;
        println!("✅ Wrote {}", self.path.display());
        Ok(())
    }
}
