use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::flow::CursorSnapshot;
use crate::storage::{KeyValueStore, StorageError};

/// Current snapshot schema. Version 1 snapshots carried no version field.
pub const SCHEMA_VERSION: u32 = 2;
const LEGACY_SCHEMA_VERSION: u32 = 1;

pub const DEFAULT_KEY_PREFIX: &str = "onboarding-";

/// Errors that can occur during snapshot persistence
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Stored snapshot exists but cannot be parsed
    #[error("Unreadable snapshot under '{key}': {reason}")]
    ReadError { key: String, reason: String },
}

fn legacy_version() -> u32 {
    LEGACY_SCHEMA_VERSION
}

/// Combined cursor position and domain states, as written to storage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSnapshot {
    #[serde(default = "legacy_version")]
    pub version: u32,
    #[serde(default)]
    pub finished_onboarding: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub state_handler: Value,
    pub step_handler: CursorSnapshot,
    #[serde(default)]
    pub substates: BTreeMap<String, Value>,
}

impl PersistedSnapshot {
    pub fn new(
        step_handler: CursorSnapshot,
        state_handler: Value,
        substates: BTreeMap<String, Value>,
    ) -> Self {
        Self {
            version: SCHEMA_VERSION,
            finished_onboarding: false,
            saved_at: Some(Utc::now()),
            state_handler,
            step_handler,
            substates,
        }
    }

    /// Sentinel written once the flow reaches its final step
    pub fn finished(step_handler: CursorSnapshot) -> Self {
        Self {
            finished_onboarding: true,
            ..Self::new(step_handler, Value::Object(Default::default()), BTreeMap::new())
        }
    }

    pub fn is_legacy(&self) -> bool {
        self.version < SCHEMA_VERSION
    }
}

/// Saves and restores wizard snapshots under a project-scoped key
#[derive(Debug, Clone)]
pub struct PersistenceAdapter<S> {
    store: S,
    key_prefix: String,
}

impl<S: KeyValueStore> PersistenceAdapter<S> {
    pub fn new(store: S) -> Self {
        Self::with_key_prefix(store, DEFAULT_KEY_PREFIX)
    }

    pub fn with_key_prefix(store: S, key_prefix: impl Into<String>) -> Self {
        Self {
            store,
            key_prefix: key_prefix.into(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn storage_key(&self, project_id: u64) -> String {
        format!("{}{}", self.key_prefix, project_id)
    }

    /// Overwrite the project's snapshot
    pub fn save(&self, project_id: u64, snapshot: &PersistedSnapshot) -> Result<(), PersistenceError> {
        let key = self.storage_key(project_id);
        let serialized = serde_json::to_string(snapshot)?;
        self.store.set(&key, &serialized)?;

        debug!(
            key = %key,
            step = %snapshot.step_handler.current_step_name,
            finished = snapshot.finished_onboarding,
            "Snapshot saved"
        );
        Ok(())
    }

    pub fn mark_finished(&self, project_id: u64, step_handler: CursorSnapshot) -> Result<(), PersistenceError> {
        self.save(project_id, &PersistedSnapshot::finished(step_handler))?;
        info!(project_id = project_id, "Onboarding marked finished");
        Ok(())
    }

    /// Load the project's snapshot, surfacing storage and parse failures.
    /// A finished flow yields `Ok(None)`.
    pub fn try_restore(&self, project_id: u64) -> Result<Option<PersistedSnapshot>, PersistenceError> {
        let key = self.storage_key(project_id);
        let Some(raw) = self.store.get(&key)? else {
            debug!(key = %key, "No stored snapshot");
            return Ok(None);
        };

        let snapshot: PersistedSnapshot =
            serde_json::from_str(&raw).map_err(|e| PersistenceError::ReadError {
                key: key.clone(),
                reason: e.to_string(),
            })?;

        if snapshot.finished_onboarding {
            info!(key = %key, "Stored snapshot belongs to a finished flow, not resuming");
            return Ok(None);
        }

        if snapshot.version > SCHEMA_VERSION {
            warn!(
                key = %key,
                found = snapshot.version,
                expected = SCHEMA_VERSION,
                "Snapshot written by a newer schema, restoring known fields only"
            );
        } else if snapshot.is_legacy() {
            debug!(key = %key, found = snapshot.version, "Restoring legacy snapshot");
        }

        Ok(Some(snapshot))
    }

    /// Load the project's snapshot. Every failure degrades to "no prior state".
    pub fn restore(&self, project_id: u64) -> Option<PersistedSnapshot> {
        match self.try_restore(project_id) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(project_id = project_id, "Discarding stored onboarding state: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use serde_json::json;

    fn snapshot(step: &str) -> PersistedSnapshot {
        let mut substates = BTreeMap::new();
        substates.insert(
            "connected_registry".to_string(),
            json!({"selectedProvider": "aws", "currentSubStep": "credentials", "config": {}}),
        );
        PersistedSnapshot::new(
            CursorSnapshot {
                current_step_name: step.to_string(),
            },
            json!({"projectId": 3}),
            substates,
        )
    }

    #[test]
    fn test_save_then_restore() {
        let adapter = PersistenceAdapter::new(MemoryStore::new());
        let saved = snapshot("connect_registry.credentials");

        adapter.save(3, &saved).unwrap();
        assert_eq!(adapter.restore(3), Some(saved));
        assert_eq!(adapter.restore(4), None);
    }

    #[test]
    fn test_storage_key_is_project_scoped() {
        let adapter = PersistenceAdapter::new(MemoryStore::new());
        assert_eq!(adapter.storage_key(42), "onboarding-42");

        let custom = PersistenceAdapter::with_key_prefix(MemoryStore::new(), "wizard:");
        assert_eq!(custom.storage_key(42), "wizard:42");
    }

    #[test]
    fn test_persisted_json_shape() {
        let store = MemoryStore::new();
        let adapter = PersistenceAdapter::new(store.clone());
        adapter.save(3, &snapshot("connect_source")).unwrap();

        let raw: Value = serde_json::from_str(&store.get("onboarding-3").unwrap().unwrap()).unwrap();
        assert_eq!(raw["version"], json!(SCHEMA_VERSION));
        assert_eq!(raw["finishedOnboarding"], json!(false));
        assert_eq!(raw["stepHandler"]["currentStepName"], json!("connect_source"));
        assert_eq!(raw["stateHandler"]["projectId"], json!(3));
        assert!(raw["substates"]["connected_registry"].is_object());
    }

    #[test]
    fn test_finished_snapshot_is_not_restored() {
        let store = MemoryStore::new();
        let adapter = PersistenceAdapter::new(store.clone());
        adapter.save(3, &snapshot("provision_resources")).unwrap();

        adapter
            .mark_finished(
                3,
                CursorSnapshot {
                    current_step_name: "clean_up".to_string(),
                },
            )
            .unwrap();

        assert_eq!(adapter.restore(3), None);
        assert!(store.get("onboarding-3").unwrap().is_some());
    }

    #[test]
    fn test_malformed_snapshot_degrades_to_none() {
        let store = MemoryStore::new();
        let adapter = PersistenceAdapter::new(store.clone());

        for raw in ["{not json", "[]", r#"{"stateHandler": {}}"#, ""] {
            store.set("onboarding-5", raw).unwrap();
            assert!(matches!(
                adapter.try_restore(5),
                Err(PersistenceError::ReadError { .. })
            ));
            assert_eq!(adapter.restore(5), None);
        }
    }

    #[test]
    fn test_legacy_snapshot_without_version() {
        let store = MemoryStore::new();
        let adapter = PersistenceAdapter::new(store.clone());
        store
            .set(
                "onboarding-9",
                r#"{"stateHandler":{},"stepHandler":{"currentStepName":"connect_source"},"substates":{}}"#,
            )
            .unwrap();

        let restored = adapter.restore(9).unwrap();
        assert_eq!(restored.version, 1);
        assert!(restored.is_legacy());
        assert!(!restored.finished_onboarding);
        assert_eq!(restored.step_handler.current_step_name, "connect_source");
    }

    #[test]
    fn test_newer_schema_still_restores() {
        let store = MemoryStore::new();
        let adapter = PersistenceAdapter::new(store.clone());
        store
            .set(
                "onboarding-9",
                r#"{"version":7,"stepHandler":{"currentStepName":"connect_source"},"extra":true}"#,
            )
            .unwrap();

        let restored = adapter.restore(9).unwrap();
        assert_eq!(restored.version, 7);
        assert!(restored.substates.is_empty());
    }
}
