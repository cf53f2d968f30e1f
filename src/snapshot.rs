//! Versioned, serializable engine snapshot.
//!
//! The snapshot carries exactly what is needed to resume learning: the engine
//! parameters and each arm's `(A, b)`.  The derived `theta` is not stored.
//!
//! Wire format is JSON:
//!
//! ```text
//! {
//!   "schema_version": 1,
//!   "dim": 5,
//!   "alpha": 1.5,
//!   "decay": 1.0,
//!   "arms": [ { "arm": 7, "a": [..25 floats..], "b": [..5 floats..], "uses": 3 } ]
//! }
//! ```
//!
//! Decoding checks `schema_version` before interpreting anything else, so a
//! snapshot written by a future layout is rejected rather than misread.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{ArmId, BanditError, MAX_DIM};

/// Current snapshot layout version.
pub const SNAPSHOT_SCHEMA_VERSION: u32 = 1;

/// Serialized `(A, b)` for one arm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArmSnapshot {
    pub arm: ArmId,
    /// Design matrix, `dim * dim` row-major.
    pub a: Vec<f64>,
    /// Reward-weighted context sum, `dim`.
    pub b: Vec<f64>,
    #[serde(default)]
    pub uses: u64,
}

/// Full engine state at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub schema_version: u32,
    pub dim: usize,
    pub alpha: f64,
    #[serde(default = "default_decay")]
    pub decay: f64,
    /// Arms in ascending id order.
    pub arms: Vec<ArmSnapshot>,
}

fn default_decay() -> f64 {
    1.0
}

#[derive(Deserialize)]
struct SchemaProbe {
    schema_version: Option<u32>,
}

impl Snapshot {
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, BanditError> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    /// Decode and validate a snapshot.
    pub fn from_json_bytes(bytes: &[u8]) -> Result<Self, BanditError> {
        let probe: SchemaProbe = serde_json::from_slice(bytes)?;
        match probe.schema_version {
            Some(SNAPSHOT_SCHEMA_VERSION) => {}
            Some(found) => {
                return Err(BanditError::UnsupportedSchema {
                    found,
                    supported: SNAPSHOT_SCHEMA_VERSION,
                })
            }
            None => {
                return Err(BanditError::CorruptSnapshot(
                    "missing schema_version".to_string(),
                ))
            }
        }
        let snap: Snapshot = serde_json::from_slice(bytes)?;
        snap.validate()?;
        Ok(snap)
    }

    /// Structural checks: `dim` is plausible, shapes match it, values are finite,
    /// arms are unique.
    pub fn validate(&self) -> Result<(), BanditError> {
        if self.dim == 0 || self.dim > MAX_DIM {
            return Err(BanditError::CorruptSnapshot(format!(
                "dim {} outside 1..={MAX_DIM}",
                self.dim
            )));
        }
        let d = self.dim;
        let cells = d
            .checked_mul(d)
            .ok_or_else(|| BanditError::CorruptSnapshot(format!("dim {d} overflows")))?;
        let mut seen = BTreeSet::new();
        for arm in &self.arms {
            if !seen.insert(&arm.arm) {
                return Err(BanditError::CorruptSnapshot(format!(
                    "duplicate arm {}",
                    arm.arm
                )));
            }
            if arm.a.len() != cells || arm.b.len() != d {
                return Err(BanditError::CorruptSnapshot(format!(
                    "arm {}: expected A {}x{} and b {}, got {} and {}",
                    arm.arm,
                    d,
                    d,
                    d,
                    arm.a.len(),
                    arm.b.len()
                )));
            }
            if !arm.a.iter().chain(arm.b.iter()).all(|v| v.is_finite()) {
                return Err(BanditError::CorruptSnapshot(format!(
                    "arm {}: non-finite statistics",
                    arm.arm
                )));
            }
        }
        Ok(())
    }
}
