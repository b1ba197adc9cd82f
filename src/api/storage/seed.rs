//! Seed data for the storage backends.
//!
//! Users, streams and bot configuration are administered outside this
//! service; a seed file provides them at startup.

use super::{StorageBackend, StorageError};
use crate::models::{Stream, UserProfile};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeedData {
    #[serde(default)]
    pub users: Vec<UserProfile>,
    #[serde(default)]
    pub streams: Vec<Stream>,
    /// bot id -> configuration entries
    #[serde(default)]
    pub bot_configs: BTreeMap<i64, BTreeMap<String, String>>,
}

impl SeedData {
    /// Parse seed data from YAML (a superset of JSON).
    pub fn from_yaml_str(source: &str) -> Result<Self, StorageError> {
        serde_yaml::from_str(source).map_err(|e| StorageError::SeedError(e.to_string()))
    }

    /// Read seed data from a `.yaml`, `.yml` or `.json` file.
    pub fn load(path: &Path) -> Result<Self, StorageError> {
        let source = std::fs::read_to_string(path).map_err(|e| {
            StorageError::SeedError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => {
                serde_json::from_str(&source).map_err(|e| StorageError::SeedError(e.to_string()))
            }
            _ => Self::from_yaml_str(&source),
        }
    }

    /// Insert everything into `storage`.
    pub async fn apply(&self, storage: &dyn StorageBackend) -> Result<(), StorageError> {
        for user in &self.users {
            storage.create_user(user.clone()).await?;
        }
        for stream in &self.streams {
            storage.create_stream(stream.clone()).await?;
        }
        for (bot_id, entries) in &self.bot_configs {
            for (key, value) in entries {
                storage
                    .set_bot_config(*bot_id, key.clone(), value.clone())
                    .await?;
            }
        }
        info!(
            "Seeded {} users, {} streams, {} bot configs",
            self.users.len(),
            self.streams.len(),
            self.bot_configs.len()
        );
        Ok(())
    }
}
