use anyhow::{anyhow, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

use crate::config::ObservabilityConfig;

/// Initialize structured logging.
///
/// `RUST_LOG` wins over the configured level when set. JSON output carries
/// the current span and span list so wizard sessions can be correlated.
pub fn init_telemetry(observability: &ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&observability.log_level))
        .map_err(|e| anyhow!("Invalid log level '{}': {}", observability.log_level, e))?;

    let registry = tracing_subscriber::registry().with(filter);

    if observability.json_logs {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()?;
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()?;
    }

    tracing::debug!(json = observability.json_logs, "Onboarding telemetry initialized");
    Ok(())
}

/// Generate a correlation ID for linking the operations of one wizard session
pub fn generate_correlation_id() -> String {
    Uuid::new_v4().to_string()
}

/// Create a span with common wizard attributes
pub fn create_wizard_span(operation: &str, project_id: u64, session_id: &str) -> tracing::Span {
    tracing::info_span!(
        "onboarding_wizard",
        operation = operation,
        project.id = project_id,
        correlation.id = session_id,
    )
}
