//! Per-arm ridge-regression sufficient statistics.

use std::collections::BTreeMap;

use crate::linalg::{add_outer, identity};
use crate::ArmId;

/// Sufficient statistics for one arm: `A` (`d x d`, row-major) and `b` (`d`).
///
/// `A` starts at the identity and only ever grows by outer products of
/// contexts, so it stays symmetric positive definite.  `theta = A^{-1} b` is
/// always derived from these, never stored.
#[derive(Debug, Clone, PartialEq)]
pub struct ArmState {
    pub(crate) a: Vec<f64>,
    pub(crate) b: Vec<f64>,
    pub(crate) uses: u64,
}

impl ArmState {
    /// The `(I, 0)` prior.
    pub fn prior(dim: usize) -> Self {
        Self {
            a: identity(dim),
            b: vec![0.0; dim],
            uses: 0,
        }
    }

    /// Design matrix `A`, row-major.
    pub fn design(&self) -> &[f64] {
        &self.a
    }

    /// Reward-weighted context sum `b`.
    pub fn response(&self) -> &[f64] {
        &self.b
    }

    /// Number of observations folded into this arm.
    pub fn uses(&self) -> u64 {
        self.uses
    }

    /// Fold one observation in: `A <- decay*A + (1-decay)*I + x x^T`, `b <- decay*b + r x`.
    ///
    /// `decay == 1.0` is plain LinUCB (all history weighted equally).  With
    /// forgetting, `A` decays toward the identity prior rather than toward zero,
    /// so `A >= I` holds no matter how many updates have been folded in.
    pub(crate) fn observe(&mut self, x: &[f64], reward: f64, decay: f64) {
        let dim = self.b.len();
        if decay < 1.0 {
            for v in &mut self.a {
                *v *= decay;
            }
            for i in 0..dim {
                self.a[i * dim + i] += 1.0 - decay;
            }
            for v in &mut self.b {
                *v *= decay;
            }
        }
        add_outer(&mut self.a, dim, x);
        for (bi, xi) in self.b.iter_mut().zip(x) {
            *bi += reward * xi;
        }
        self.uses = self.uses.saturating_add(1);
    }
}

/// Mapping from arm to [`ArmState`], created lazily.
///
/// Arms are never removed; the map grows with the set of users ever observed.
#[derive(Debug, Clone)]
pub struct ArmStore {
    dim: usize,
    arms: BTreeMap<ArmId, ArmState>,
}

impl ArmStore {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            arms: BTreeMap::new(),
        }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Return the arm's state, initializing it to the prior on first sight.
    ///
    /// Never resets an existing arm.
    pub fn get_or_create(&mut self, arm: &ArmId) -> &mut ArmState {
        let dim = self.dim;
        self.arms
            .entry(arm.clone())
            .or_insert_with(|| ArmState::prior(dim))
    }

    pub fn get(&self, arm: &ArmId) -> Option<&ArmState> {
        self.arms.get(arm)
    }

    pub fn contains(&self, arm: &ArmId) -> bool {
        self.arms.contains_key(arm)
    }

    pub fn len(&self) -> usize {
        self.arms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arms.is_empty()
    }

    /// Arms in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (&ArmId, &ArmState)> {
        self.arms.iter()
    }

    /// Insert restored state; returns the previous state if the arm was present.
    pub(crate) fn insert(&mut self, arm: ArmId, state: ArmState) -> Option<ArmState> {
        self.arms.insert(arm, state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_or_create_is_idempotent_and_never_resets() {
        let mut s = ArmStore::new(2);
        let arm = ArmId::from(1u64);
        s.get_or_create(&arm).observe(&[1.0, 0.0], 1.0, 1.0);
        let st = s.get_or_create(&arm).clone();
        assert_eq!(st.uses(), 1);
        assert_eq!(st.response(), &[1.0, 0.0]);
        assert_eq!(st.design(), &[2.0, 0.0, 0.0, 1.0]);
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn fresh_arm_is_identity_and_zero() {
        let mut s = ArmStore::new(3);
        let st = s.get_or_create(&"u".into());
        assert_eq!(st.design(), &[1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0]);
        assert_eq!(st.response(), &[0.0, 0.0, 0.0]);
        assert_eq!(st.uses(), 0);
    }

    #[test]
    fn decay_scales_history_before_update() {
        let mut st = ArmState::prior(1);
        st.observe(&[1.0], 1.0, 0.5);
        // A = 0.5*1 + 0.5 + 1, b = 0.5*0 + 1
        assert!((st.design()[0] - 2.0).abs() < 1e-12);
        assert!((st.response()[0] - 1.0).abs() < 1e-12);
        st.observe(&[1.0], 0.0, 0.5);
        assert!((st.design()[0] - 2.5).abs() < 1e-12);
        assert!((st.response()[0] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn decay_never_erodes_the_prior() {
        let mut st = ArmState::prior(2);
        for _ in 0..10_000 {
            st.observe(&[1.0, 0.0], 1.0, 0.9);
        }
        // The unobserved direction stays at the prior.
        assert!((st.design()[3] - 1.0).abs() < 1e-9);
        assert!(st.design()[0] >= 1.0);
        assert_eq!(st.design()[1], 0.0);
    }
}
