// Test doubles for the storage and backend seams

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Mutex;
use std::time::Duration;

use crate::domains::CloudProvider;
use crate::requests::{OnboardingApi, UpstreamRequestError};
use crate::storage::{KeyValueStore, StorageError};

/// Store whose every operation fails, as when local storage is unavailable
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingStore;

impl KeyValueStore for FailingStore {
    fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Err(StorageError::LockError {
            reason: "storage unavailable".to_string(),
        })
    }

    fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Err(StorageError::IoError(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "quota exceeded",
        )))
    }

    fn remove(&self, _key: &str) -> Result<(), StorageError> {
        Ok(())
    }
}

/// Backend double recording every call. Echoes the submitted form back with
/// an `id` assigned, or fails every call when configured to.
#[derive(Debug, Default)]
pub struct MockOnboardingApi {
    calls: Mutex<Vec<String>>,
    failure: Option<String>,
    delay: Option<Duration>,
}

impl MockOnboardingApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    async fn respond(&self, call: String, operation: &str, form: Value) -> Result<Value, UpstreamRequestError> {
        let id = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(call);
            calls.len()
        };

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(message) = &self.failure {
            return Err(UpstreamRequestError::new(operation, message.clone()));
        }

        let mut record = match form {
            Value::Object(map) => map,
            _ => Default::default(),
        };
        record.insert("id".to_string(), json!(id));
        Ok(Value::Object(record))
    }
}

#[async_trait]
impl OnboardingApi for MockOnboardingApi {
    async fn submit_registry_credentials(
        &self,
        project_id: u64,
        provider: CloudProvider,
        form: Value,
    ) -> Result<Value, UpstreamRequestError> {
        let call = format!("submit_registry_credentials:{}:{}", project_id, provider);
        self.respond(call, "submit_registry_credentials", form).await
    }

    async fn submit_registry_settings(
        &self,
        project_id: u64,
        provider: CloudProvider,
        form: Value,
    ) -> Result<Value, UpstreamRequestError> {
        let call = format!("submit_registry_settings:{}:{}", project_id, provider);
        self.respond(call, "submit_registry_settings", form).await
    }

    async fn test_registry_connection(
        &self,
        project_id: u64,
        provider: CloudProvider,
    ) -> Result<Value, UpstreamRequestError> {
        let call = format!("test_registry_connection:{}:{}", project_id, provider);
        self.respond(call, "test_registry_connection", json!({"connected": true}))
            .await
    }

    async fn submit_provisioning_credentials(
        &self,
        project_id: u64,
        provider: CloudProvider,
        form: Value,
    ) -> Result<Value, UpstreamRequestError> {
        let call = format!("submit_provisioning_credentials:{}:{}", project_id, provider);
        self.respond(call, "submit_provisioning_credentials", form).await
    }

    async fn provision_resources(
        &self,
        project_id: u64,
        provider: CloudProvider,
        settings: Value,
    ) -> Result<Value, UpstreamRequestError> {
        let call = format!("provision_resources:{}:{}", project_id, provider);
        self.respond(call, "provision_resources", settings).await
    }

    async fn connect_own_cluster(
        &self,
        project_id: u64,
        form: Value,
    ) -> Result<Value, UpstreamRequestError> {
        let call = format!("connect_own_cluster:{}", project_id);
        self.respond(call, "connect_own_cluster", form).await
    }
}
