//! Disjoint linear contextual bandit (LinUCB) over per-arm ridge regressions.
//!
//! ## Model
//!
//! Every arm `a` keeps `A_a` (starts at `I`) and `b_a` (starts at `0`).  For a
//! context `x`:
//!
//! ```text
//!   theta_a = A_a^{-1} b_a
//!   mean    = theta_a^T x
//!   bonus   = alpha * sqrt(x^T A_a^{-1} x)
//!   ucb     = mean + bonus
//! ```
//!
//! After observing reward `r` for `(a, x)`: `A_a += x x^T`, `b_a += r x`.
//! With forgetting (`decay < 1`), the old statistics are first shrunk toward the
//! prior: `A_a <- decay*A_a + (1-decay)*I`, `b_a <- decay*b_a`.
//!
//! The bonus shrinks in every direction the arm has been observed in, whatever
//! the reward, so unexplored arms (bonus `alpha * |x|`) keep getting a look
//! until their point estimate has been pinned down.
//!
//! ## Design
//!
//! - `predict`/`score` take `&self` and never touch the store.  An arm with no
//!   state is scored against the `(I, 0)` prior, which is exactly what lazily
//!   creating it would produce.
//! - `update` takes `&mut self`; callers sharing an engine go through
//!   [`SharedEngine`](crate::SharedEngine).
//! - Solves use a Cholesky factor of `A`; no inverse is ever formed.
//! - Context length is a hard contract.  A context of the wrong length is an
//!   error, never truncated or padded.  Non-finite components are read as `0.0`.

use serde::{Deserialize, Serialize};

use crate::linalg::{dot, Cholesky};
use crate::snapshot::{ArmSnapshot, Snapshot, SNAPSHOT_SCHEMA_VERSION};
use crate::store::{ArmState, ArmStore};
use crate::{ArmId, BanditError, DEFAULT_ALPHA, DEFAULT_DIM};

/// Relative ridge added to `A` only if its plain Cholesky factorization fails.
const FALLBACK_RIDGE: f64 = 1e-9;

/// Largest context dimension an engine (or a snapshot) may declare.
pub const MAX_DIM: usize = 1024;

/// Engine parameters, fixed for the lifetime of an engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Context vector length `d` (must be >= 1).
    pub dim: usize,
    /// Exploration strength `alpha` (finite, > 0).
    pub alpha: f64,
    /// Exponential forgetting factor applied to `(A, b)` before each update.
    ///
    /// `1.0` keeps all history with equal weight.  Values in `(0, 1)` forget
    /// older observations: `A <- decay*A + (1-decay)*I + x x^T`, `b <- decay*b + r x`.
    pub decay: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dim: DEFAULT_DIM,
            alpha: DEFAULT_ALPHA,
            decay: 1.0,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), BanditError> {
        if self.dim == 0 || self.dim > MAX_DIM {
            return Err(BanditError::InvalidConfig(format!(
                "dim must be in 1..={MAX_DIM}, got {}",
                self.dim
            )));
        }
        if !(self.alpha.is_finite() && self.alpha > 0.0) {
            return Err(BanditError::InvalidConfig(format!(
                "alpha must be finite and > 0, got {}",
                self.alpha
            )));
        }
        if !(self.decay.is_finite() && self.decay > 0.0 && self.decay <= 1.0) {
            return Err(BanditError::InvalidConfig(format!(
                "decay must be in (0, 1], got {}",
                self.decay
            )));
        }
        Ok(())
    }
}

/// Score breakdown for one `(arm, context)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UcbScore {
    /// `mean + bonus`.
    pub ucb: f64,
    /// Point estimate `theta^T x`.
    pub mean: f64,
    /// Exploration bonus `alpha * sqrt(x^T A^{-1} x)`.
    pub bonus: f64,
}

impl UcbScore {
    const ZERO: Self = Self {
        ucb: 0.0,
        mean: 0.0,
        bonus: 0.0,
    };
}

/// LinUCB engine: one independent linear model per arm.
///
/// Usage:
/// - call `predict(arm, context)` (or `score`) for every candidate arm
/// - call `update(arm, context, reward)` once the outcome is known
///
/// ```rust
/// use taskmux::{ArmId, EngineConfig, LinUcbEngine};
///
/// let mut engine = LinUcbEngine::new(EngineConfig { dim: 2, alpha: 1.0, decay: 1.0 }).unwrap();
/// let arm = ArmId::from(7u64);
/// let x = [0.6, 0.8];
/// let before = engine.predict(&arm, &x).unwrap();
/// assert!((before - 1.0).abs() < 1e-12); // alpha * |x|
/// engine.update(&arm, &x, 1.0).unwrap();
/// assert!(engine.score(&arm, &x).unwrap().bonus < 1.0);
/// ```
#[derive(Debug, Clone)]
pub struct LinUcbEngine {
    cfg: EngineConfig,
    store: ArmStore,
}

impl Default for LinUcbEngine {
    /// `d = 5`, `alpha = 1.5`, no forgetting, no arms.
    fn default() -> Self {
        let cfg = EngineConfig::default();
        Self {
            store: ArmStore::new(cfg.dim),
            cfg,
        }
    }
}

impl LinUcbEngine {
    pub fn new(cfg: EngineConfig) -> Result<Self, BanditError> {
        cfg.validate()?;
        Ok(Self {
            store: ArmStore::new(cfg.dim),
            cfg,
        })
    }

    pub fn config(&self) -> EngineConfig {
        self.cfg
    }

    pub fn dim(&self) -> usize {
        self.cfg.dim
    }

    pub fn alpha(&self) -> f64 {
        self.cfg.alpha
    }

    /// Per-arm statistics (read-only).
    pub fn arms(&self) -> &ArmStore {
        &self.store
    }

    fn check_context(&self, context: &[f64]) -> Result<Vec<f64>, BanditError> {
        let d = self.dim();
        if context.len() != d {
            return Err(BanditError::DimensionMismatch {
                expected: d,
                got: context.len(),
            });
        }
        Ok(context
            .iter()
            .map(|&v| if v.is_finite() { v } else { 0.0 })
            .collect())
    }

    fn factor(&self, arm: &ArmId, st: &ArmState) -> Result<Cholesky, BanditError> {
        let d = self.dim();
        let mean_diag = (0..d).map(|i| st.a[i * d + i]).sum::<f64>() / d as f64;
        Cholesky::factor_with_ridge(&st.a, d, FALLBACK_RIDGE * mean_diag.max(1.0))
            .ok_or_else(|| BanditError::NotPositiveDefinite(arm.clone()))
    }

    /// Score breakdown `(ucb, mean, bonus)` for `arm` under `context`.
    ///
    /// An empty context scores a neutral `0.0` (some candidates legitimately
    /// have no computable features).
    pub fn score(&self, arm: &ArmId, context: &[f64]) -> Result<UcbScore, BanditError> {
        if context.is_empty() {
            return Ok(UcbScore::ZERO);
        }
        let x = self.check_context(context)?;

        let Some(st) = self.store.get(arm) else {
            // Cold start: theta = 0, A = I.
            let bonus = self.cfg.alpha * dot(&x, &x).sqrt();
            return Ok(UcbScore {
                ucb: bonus,
                mean: 0.0,
                bonus,
            });
        };

        let chol = self.factor(arm, st)?;
        let theta = chol.solve(&st.b);
        let mean = dot(&theta, &x);
        let bonus = self.cfg.alpha * chol.inv_quad_form(&x).max(0.0).sqrt();
        Ok(UcbScore {
            ucb: mean + bonus,
            mean,
            bonus,
        })
    }

    /// Upper-confidence score `theta^T x + alpha * sqrt(x^T A^{-1} x)`.
    pub fn predict(&self, arm: &ArmId, context: &[f64]) -> Result<f64, BanditError> {
        Ok(self.score(arm, context)?.ucb)
    }

    /// Fold an observed reward for `(arm, context)` into the arm's statistics.
    ///
    /// Creates the arm on first sight.  The reward range is not constrained;
    /// it only has to be finite.
    pub fn update(&mut self, arm: &ArmId, context: &[f64], reward: f64) -> Result<(), BanditError> {
        if !reward.is_finite() {
            return Err(BanditError::InvalidReward(reward));
        }
        let x = self.check_context(context)?;
        let decay = self.cfg.decay;
        self.store.get_or_create(arm).observe(&x, reward, decay);
        Ok(())
    }

    /// Current point-estimate weights `theta = A^{-1} b` for `arm`.
    ///
    /// Unknown arms return the prior (all zeros).
    pub fn theta(&self, arm: &ArmId) -> Result<Vec<f64>, BanditError> {
        match self.store.get(arm) {
            Some(st) => Ok(self.factor(arm, st)?.solve(&st.b)),
            None => Ok(vec![0.0; self.dim()]),
        }
    }

    /// Capture the full state for persistence.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            schema_version: SNAPSHOT_SCHEMA_VERSION,
            dim: self.cfg.dim,
            alpha: self.cfg.alpha,
            decay: self.cfg.decay,
            arms: self
                .store
                .iter()
                .map(|(arm, st)| ArmSnapshot {
                    arm: arm.clone(),
                    a: st.a.clone(),
                    b: st.b.clone(),
                    uses: st.uses,
                })
                .collect(),
        }
    }

    /// Rebuild an engine from a snapshot, parameters included.
    pub fn from_snapshot(snap: Snapshot) -> Result<Self, BanditError> {
        if snap.schema_version != SNAPSHOT_SCHEMA_VERSION {
            return Err(BanditError::UnsupportedSchema {
                found: snap.schema_version,
                supported: SNAPSHOT_SCHEMA_VERSION,
            });
        }
        snap.validate()?;
        let mut engine = Self::new(EngineConfig {
            dim: snap.dim,
            alpha: snap.alpha,
            decay: snap.decay,
        })
        .map_err(|e| BanditError::CorruptSnapshot(e.to_string()))?;
        let d = snap.dim;
        for arm in snap.arms {
            if !is_symmetric(&arm.a, d) || Cholesky::factor(&arm.a, d).is_none() {
                return Err(BanditError::CorruptSnapshot(format!(
                    "arm {}: A is not symmetric positive definite",
                    arm.arm
                )));
            }
            engine.store.insert(
                arm.arm,
                ArmState {
                    a: arm.a,
                    b: arm.b,
                    uses: arm.uses,
                },
            );
        }
        Ok(engine)
    }
}

fn is_symmetric(a: &[f64], d: usize) -> bool {
    (0..d).all(|i| {
        (i + 1..d).all(|j| {
            let (x, y) = (a[i * d + j], a[j * d + i]);
            (x - y).abs() <= 1e-9 * x.abs().max(y.abs()).max(1.0)
        })
    })
}
