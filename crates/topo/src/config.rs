//! Topology configuration
//!
//! YAML configuration naming the backend implementation, the global
//! backend, and the per-cell backends. Loaded at process start and handed
//! to [`crate::TopoServer::with_config`].

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Main topology configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopoConfig {
    /// Backend implementation name (e.g. "memory", "etcd2").
    #[serde(default = "default_implementation")]
    pub implementation: String,
    /// Address of the global backend.
    #[serde(default)]
    pub global_server_address: String,
    /// Root path inside the global backend.
    #[serde(default = "default_global_root")]
    pub global_root: String,
    /// Cell-local backends, keyed by cell name.
    #[serde(default)]
    pub cells: HashMap<String, CellConfig>,
}

impl Default for TopoConfig {
    fn default() -> Self {
        Self {
            implementation: default_implementation(),
            global_server_address: String::new(),
            global_root: default_global_root(),
            cells: HashMap::new(),
        }
    }
}

impl TopoConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|err| ConfigError::Io(err.to_string()))?;
        Self::from_yaml(&content)
    }

    /// Load configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(yaml).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Merge with another config (other takes precedence).
    pub fn merge(&mut self, other: TopoConfig) {
        if !other.implementation.is_empty() {
            self.implementation = other.implementation;
        }
        if !other.global_server_address.is_empty() {
            self.global_server_address = other.global_server_address;
        }
        if !other.global_root.is_empty() {
            self.global_root = other.global_root;
        }
        for (name, cell) in other.cells {
            self.cells.insert(name, cell);
        }
    }
}

/// One cell-local backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CellConfig {
    pub server_address: String,
    #[serde(default)]
    pub root: String,
}

fn default_implementation() -> String {
    "memory".to_string()
}

fn default_global_root() -> String {
    "/global".to_string()
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Parse error: {0}")]
    Parse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TopoConfig::default();
        assert_eq!(config.implementation, "memory");
        assert_eq!(config.global_root, "/global");
        assert!(config.cells.is_empty());
    }

    #[test]
    fn test_from_yaml() {
        let config = TopoConfig::from_yaml(
            r#"
implementation: etcd2
global_server_address: "etcd-global:2379"
cells:
  zone1:
    server_address: "etcd-zone1:2379"
    root: /zone1
"#,
        )
        .unwrap();
        assert_eq!(config.implementation, "etcd2");
        assert_eq!(config.cells["zone1"].server_address, "etcd-zone1:2379");
        assert_eq!(config.cells["zone1"].root, "/zone1");
    }

    #[test]
    fn test_merge_prefers_other() {
        let mut base = TopoConfig::default();
        let other = TopoConfig::from_yaml("implementation: etcd2").unwrap();
        base.merge(other);
        assert_eq!(base.implementation, "etcd2");
        // Unset fields keep base values.
        assert_eq!(base.global_root, "/global");
    }
}
