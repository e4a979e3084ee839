use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::persistence::DEFAULT_KEY_PREFIX;

pub const CONFIG_FILE_NAME: &str = "onboarding.toml";

/// Main configuration structure for the onboarding wizard
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct OnboardingConfig {
    /// Where snapshots are stored
    pub storage: StorageConfig,
    /// Navigation settings
    pub routing: RoutingConfig,
    /// Observability settings
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Directory holding one JSON file per project
    pub directory: PathBuf,
    /// Prefix of the per-project storage key
    pub key_prefix: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RoutingConfig {
    /// Query parameters carried over when the wizard navigates
    pub preserved_query_params: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level or EnvFilter directive
    pub log_level: String,
    /// Emit JSON log lines instead of human-readable ones
    pub json_logs: bool,
}

impl Default for OnboardingConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig {
                directory: PathBuf::from(".onboarding"),
                key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            },
            routing: RoutingConfig {
                preserved_query_params: vec!["tab".to_string()],
            },
            observability: ObservabilityConfig {
                log_level: "warn".to_string(),
                json_logs: false,
            },
        }
    }
}

impl OnboardingConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. Configuration files (onboarding.toml, .onboarding-rc)
    /// 3. Environment variables (prefixed with ONBOARDING_, nested with __)
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new("."))
    }

    /// Same as `load`, resolving the configuration files relative to `dir`
    pub fn load_from(dir: &Path) -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        let toml_path = dir.join(CONFIG_FILE_NAME);
        if toml_path.exists() {
            builder = builder.add_source(File::from(toml_path));
        }

        let rc_path = dir.join(".onboarding-rc");
        if rc_path.exists() {
            builder = builder.add_source(File::from(rc_path).format(config::FileFormat::Toml));
        }

        builder = builder.add_source(
            Environment::with_prefix("ONBOARDING")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("routing.preserved_query_params")
                .try_parsing(true),
        );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_content = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }
}

/// Global configuration instance
static CONFIG: std::sync::LazyLock<Result<OnboardingConfig, anyhow::Error>> =
    std::sync::LazyLock::new(|| {
        let _ = OnboardingConfig::load_env_file();
        OnboardingConfig::load()
    });

/// Get the global configuration
pub fn config() -> Result<&'static OnboardingConfig> {
    CONFIG
        .as_ref()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))
}
