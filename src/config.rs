use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::error::{MagnetarError, Result};
use crate::model::FeatureType;

/// Top-level service configuration, loaded from a JSON file
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    pub feature_spaces: Vec<FeatureSpaceConfig>,
    #[serde(default)]
    pub index: IndexConfig,
    /// Ranking model spec, consumed by the model registry
    pub ranking: serde_json::Value,
    #[serde(default)]
    pub server: ServerConfig,
}

/// One feature namespace declaration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FeatureSpaceConfig {
    pub name: String,
    pub id: u16,
    #[serde(rename = "type")]
    pub feature_type: FeatureType,
}

/// Index and update pipeline settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IndexConfig {
    #[serde(default = "default_initial_buckets")]
    pub initial_buckets: usize,
    /// Cap on postings expired per maintenance tick
    #[serde(default = "default_max_size")]
    pub max_size: usize,
    #[serde(default = "default_maintain_interval")]
    pub maintain_interval: u64,
    #[serde(default = "default_update_thread_num")]
    pub update_thread_num: usize,
    #[serde(default = "default_update_queue_size")]
    pub update_queue_size: usize,
    #[serde(default = "default_ttl")]
    pub default_ttl: u32,
    #[serde(default)]
    pub restore_on_startup: bool,
    #[serde(default)]
    pub dump_on_exit: bool,
    #[serde(default)]
    pub snapshot_prefix: String,
}

/// HTTP server settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_server_threads")]
    pub thread_num: usize,
    /// 0 means unbounded
    #[serde(default)]
    pub max_request_per_thread: usize,
}

fn default_initial_buckets() -> usize {
    100_000
}

fn default_max_size() -> usize {
    5_000_000
}

fn default_maintain_interval() -> u64 {
    300
}

fn default_update_thread_num() -> usize {
    4
}

fn default_update_queue_size() -> usize {
    2048
}

fn default_ttl() -> u32 {
    86_400
}

fn default_port() -> u16 {
    19_980
}

fn default_server_threads() -> usize {
    4
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            initial_buckets: default_initial_buckets(),
            max_size: default_max_size(),
            maintain_interval: default_maintain_interval(),
            update_thread_num: default_update_thread_num(),
            update_queue_size: default_update_queue_size(),
            default_ttl: default_ttl(),
            restore_on_startup: false,
            dump_on_exit: false,
            snapshot_prefix: String::new(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            thread_num: default_server_threads(),
            max_request_per_thread: 0,
        }
    }
}

impl Config {
    /// Load and validate a configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let config: Config = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| MagnetarError::Config(format!("config parse failed: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the index cannot start from
    pub fn validate(&self) -> Result<()> {
        if self.feature_spaces.is_empty() {
            return Err(MagnetarError::Config(
                "feature_spaces must declare at least one space".to_string(),
            ));
        }
        for space in &self.feature_spaces {
            if space.id == 0 {
                return Err(MagnetarError::Config(format!(
                    "feature space {:?} has id 0 (reserved)",
                    space.name
                )));
            }
        }
        if self.index.initial_buckets == 0 {
            return Err(MagnetarError::Config(
                "index.initial_buckets must be nonzero".to_string(),
            ));
        }
        if self.index.max_size == 0 {
            return Err(MagnetarError::Config(
                "index.max_size must be nonzero".to_string(),
            ));
        }
        if self.index.update_thread_num == 0 || self.index.update_queue_size == 0 {
            return Err(MagnetarError::Config(
                "update pipeline needs at least one thread and a nonempty queue".to_string(),
            ));
        }
        if self.index.restore_on_startup && self.index.snapshot_prefix.is_empty() {
            return Err(MagnetarError::Config(
                "restore_on_startup requires index.snapshot_prefix".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_json() -> serde_json::Value {
        serde_json::json!({
            "feature_spaces": [
                { "name": "category", "id": 1, "type": "Integer" },
                { "name": "keyword", "id": 2, "type": "String" }
            ],
            "ranking": { "name": "direct" }
        })
    }

    #[test]
    fn test_defaults() {
        let config: Config = serde_json::from_value(minimal_json()).unwrap();
        assert_eq!(config.index.initial_buckets, 100_000);
        assert_eq!(config.index.max_size, 5_000_000);
        assert_eq!(config.index.maintain_interval, 300);
        assert_eq!(config.index.update_thread_num, 4);
        assert_eq!(config.index.update_queue_size, 2048);
        assert_eq!(config.index.default_ttl, 86_400);
        assert!(!config.index.restore_on_startup);
        assert!(!config.index.dump_on_exit);
        assert_eq!(config.server.port, 19_980);
        assert_eq!(config.server.thread_num, 4);
        assert_eq!(config.server.max_request_per_thread, 0);
        config.validate().unwrap();
    }

    #[test]
    fn test_rejects_zero_space_id() {
        let mut json = minimal_json();
        json["feature_spaces"][0]["id"] = serde_json::json!(0);
        let config: Config = serde_json::from_value(json).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_restore_requires_prefix() {
        let mut json = minimal_json();
        json["index"] = serde_json::json!({ "restore_on_startup": true });
        let config: Config = serde_json::from_value(json).unwrap();
        assert!(config.validate().is_err());
    }
}
