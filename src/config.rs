//! Configuration for the `hashchain` binary.

use crate::error::{ChainError, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ChainConfig {
    /// Leading zero hex characters required in a block hash.
    #[serde(default = "default_difficulty")]
    pub difficulty: u32,
    /// Abort a mining run after this many seconds. `None` mines until found.
    #[serde(default)]
    pub mining_timeout_secs: Option<u64>,
    #[serde(default = "default_data_path")]
    pub data_path: PathBuf,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            difficulty: default_difficulty(),
            mining_timeout_secs: None,
            data_path: default_data_path(),
        }
    }
}

fn default_difficulty() -> u32 {
    2
}

fn default_data_path() -> PathBuf {
    PathBuf::from("hashchain.json")
}

impl ChainConfig {
    pub fn from_toml(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| ChainError::Config(e.to_string()))
    }

    /// Load from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn mining_timeout(&self) -> Option<Duration> {
        self.mining_timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config = ChainConfig::from_toml("").unwrap();
        assert_eq!(config, ChainConfig::default());
        assert_eq!(config.mining_timeout(), None);
    }

    #[test]
    fn parses_all_fields() {
        let config = ChainConfig::from_toml(
            r#"
            difficulty = 3
            mining_timeout_secs = 30
            data_path = "/var/lib/hashchain/chain.json"
            "#,
        )
        .unwrap();
        assert_eq!(config.difficulty, 3);
        assert_eq!(config.mining_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.data_path, PathBuf::from("/var/lib/hashchain/chain.json"));
    }

    #[test]
    fn bad_toml_is_config_error() {
        let err = ChainConfig::from_toml("difficulty = \"high\"").unwrap_err();
        assert!(matches!(err, ChainError::Config(_)));
    }

    #[test]
    fn load_from_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("hashchain.toml");
        fs::write(&path, "difficulty = 4\n").unwrap();
        assert_eq!(ChainConfig::load(&path).unwrap().difficulty, 4);
    }
}
