//! Service configuration.
//!
//! Loaded from TOML; every field has a default, so an empty file (or no file)
//! yields a working setup:
//!
//! ```toml
//! model_path = "models/linucb_assignment.json"
//! default_top_k = 3
//!
//! [engine]
//! dim = 5
//! alpha = 1.5
//! decay = 1.0
//!
//! [rewards]
//! completed = 1.0
//! in_progress = 0.5
//! not_completed = 0.2
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{ConfigError, EngineConfig, RewardScale};

pub const DEFAULT_MODEL_PATH: &str = "models/linucb_assignment.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    /// Where the engine snapshot lives.
    pub model_path: PathBuf,
    /// Number of suggestions returned when the caller does not ask for a specific `k`.
    pub default_top_k: usize,
    pub engine: EngineConfig,
    pub rewards: RewardScale,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            default_top_k: 3,
            engine: EngineConfig::default(),
            rewards: RewardScale::default(),
        }
    }
}

impl ServiceConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let cfg: Self = toml::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.engine
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        self.rewards.validate().map_err(ConfigError::Invalid)?;
        if self.default_top_k == 0 {
            return Err(ConfigError::Invalid(
                "default_top_k must be >= 1".to_string(),
            ));
        }
        if self.model_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("model_path is empty".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_all_defaults() {
        let cfg = ServiceConfig::from_toml_str("").unwrap();
        assert_eq!(cfg, ServiceConfig::default());
        assert_eq!(cfg.engine.dim, 5);
        assert_eq!(cfg.engine.alpha, 1.5);
    }

    #[test]
    fn partial_sections_merge_with_defaults() {
        let cfg = ServiceConfig::from_toml_str(
            r#"
            model_path = "/var/lib/taskmux/model.json"
            [engine]
            alpha = 0.8
            [rewards]
            not_completed = 0.1
            "#,
        )
        .unwrap();
        assert_eq!(cfg.engine.alpha, 0.8);
        assert_eq!(cfg.engine.dim, 5);
        assert_eq!(cfg.rewards.not_completed, 0.1);
        assert_eq!(cfg.rewards.completed, 1.0);
        assert_eq!(cfg.model_path, PathBuf::from("/var/lib/taskmux/model.json"));
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            ServiceConfig::from_toml_str("[engine]\nalpha = -1.0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            ServiceConfig::from_toml_str("default_top_k = 0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            ServiceConfig::from_toml_str("bogus = 1"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("taskmux.toml");
        fs::write(&path, "default_top_k = 5\n").unwrap();
        assert_eq!(ServiceConfig::load(&path).unwrap().default_top_k, 5);
        assert!(matches!(
            ServiceConfig::load(dir.path().join("missing.toml")),
            Err(ConfigError::Io(_))
        ));
    }
}
