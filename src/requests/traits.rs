use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::domains::CloudProvider;

/// Failure reported by the onboarding backend. The wizard never interprets
/// it beyond staying on the current step.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{operation} failed: {message}")]
pub struct UpstreamRequestError {
    pub operation: String,
    pub message: String,
}

impl UpstreamRequestError {
    pub fn new(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            message: message.into(),
        }
    }
}

/// REST collaborator behind the registry and provisioning forms
#[async_trait]
pub trait OnboardingApi: Send + Sync {
    /// Store registry credentials; returns the credentials record to keep
    async fn submit_registry_credentials(
        &self,
        project_id: u64,
        provider: CloudProvider,
        form: Value,
    ) -> Result<Value, UpstreamRequestError>;

    /// Save registry settings; returns the saved settings
    async fn submit_registry_settings(
        &self,
        project_id: u64,
        provider: CloudProvider,
        form: Value,
    ) -> Result<Value, UpstreamRequestError>;

    async fn test_registry_connection(
        &self,
        project_id: u64,
        provider: CloudProvider,
    ) -> Result<Value, UpstreamRequestError>;

    async fn submit_provisioning_credentials(
        &self,
        project_id: u64,
        provider: CloudProvider,
        form: Value,
    ) -> Result<Value, UpstreamRequestError>;

    /// Kick off resource provisioning with the given settings
    async fn provision_resources(
        &self,
        project_id: u64,
        provider: CloudProvider,
        settings: Value,
    ) -> Result<Value, UpstreamRequestError>;

    async fn connect_own_cluster(
        &self,
        project_id: u64,
        form: Value,
    ) -> Result<Value, UpstreamRequestError>;
}
