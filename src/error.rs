//! Error types.
//!
//! Each concern gets its own enum: engine/persistence failures ([`BanditError`]),
//! context-source failures ([`FeatureError`]), and config-file failures
//! ([`ConfigError`]).  Only [`BanditError`] ever crosses the engine boundary;
//! feature errors are absorbed by the recommendation layer.

use std::io;

use thiserror::Error;

use crate::{ArmId, TaskId};

/// Failures raised by the engine, its snapshot codec, and the blob stores.
#[derive(Debug, Error)]
pub enum BanditError {
    /// Context length does not match the engine's feature dimension.
    #[error("context has {got} features, engine expects {expected}")]
    DimensionMismatch { expected: usize, got: usize },
    #[error("invalid engine config: {0}")]
    InvalidConfig(String),
    #[error("reward must be finite, got {0}")]
    InvalidReward(f64),
    /// The arm's design matrix could not be factored, even with a ridge added.
    #[error("design matrix for arm {0} is not positive definite")]
    NotPositiveDefinite(ArmId),
    #[error("snapshot schema version {found} is not supported (expected {supported})")]
    UnsupportedSchema { found: u32, supported: u32 },
    #[error("corrupt snapshot: {0}")]
    CorruptSnapshot(String),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("snapshot encoding: {0}")]
    Serde(#[from] serde_json::Error),
}

impl BanditError {
    /// Stable short code, suitable for log fields and metrics labels.
    pub fn stable_code(&self) -> &'static str {
        match self {
            Self::DimensionMismatch { .. } => "dimension_mismatch",
            Self::InvalidConfig(_) => "invalid_config",
            Self::InvalidReward(_) => "invalid_reward",
            Self::NotPositiveDefinite(_) => "not_positive_definite",
            Self::UnsupportedSchema { .. } => "unsupported_schema",
            Self::CorruptSnapshot(_) => "corrupt_snapshot",
            Self::Io(_) => "io",
            Self::Serde(_) => "serde",
        }
    }
}

/// Failures reported by a [`ContextBuilder`](crate::ContextBuilder).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FeatureError {
    #[error("task {0} not found")]
    TaskNotFound(TaskId),
    #[error("arm {0} not found")]
    ArmNotFound(ArmId),
    #[error("feature source failed: {0}")]
    Source(String),
}

/// Failures while loading a [`ServiceConfig`](crate::ServiceConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading config: {0}")]
    Io(#[from] io::Error),
    #[error("parsing config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}
