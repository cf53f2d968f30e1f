//! Property tests for LinUcbEngine: persistence, learning direction, guards.

use proptest::prelude::*;
use taskmux::{
    ArmId, BanditError, EngineConfig, LinUcbEngine, MemoryStore, Snapshot,
    SNAPSHOT_SCHEMA_VERSION,
};

const D: usize = 5;

fn unit_context() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(0.0f64..=1.0, D)
}

fn update_seq() -> impl Strategy<Value = Vec<(u64, Vec<f64>, f64)>> {
    prop::collection::vec((0u64..6, unit_context(), 0.0f64..=1.0), 0..40)
}

fn trained(updates: &[(u64, Vec<f64>, f64)], alpha: f64) -> LinUcbEngine {
    let mut e = LinUcbEngine::new(EngineConfig {
        dim: D,
        alpha,
        decay: 1.0,
    })
    .unwrap();
    for (arm, x, r) in updates {
        e.update(&ArmId::Num(*arm), x, *r).unwrap();
    }
    e
}

// ---------------------------------------------------------------------------
// Property tests
// ---------------------------------------------------------------------------

proptest! {
    /// Save then load reproduces every prediction exactly.
    #[test]
    fn reload_preserves_predictions(
        updates in update_seq(),
        alpha in 0.01f64..3.0,
        probe in unit_context(),
    ) {
        let engine = trained(&updates, alpha);
        let store = MemoryStore::new();
        engine.save(&store).unwrap();
        let back = LinUcbEngine::try_load(&store).unwrap().unwrap();

        prop_assert_eq!(back.snapshot(), engine.snapshot());
        for arm in 0..7u64 {
            let id = ArmId::Num(arm);
            prop_assert_eq!(
                back.predict(&id, &probe).unwrap(),
                engine.predict(&id, &probe).unwrap()
            );
        }
    }

    /// A high reward never lowers the mean estimate for the same context, a
    /// low one never raises it.
    #[test]
    fn reward_moves_mean_toward_itself(
        updates in update_seq(),
        x in unit_context(),
    ) {
        let arm = ArmId::Num(0);
        let base = trained(&updates, 1.0);
        let before = base.score(&arm, &x).unwrap().mean;

        let mut hi = base.clone();
        hi.update(&arm, &x, before.max(0.0) + 1.0).unwrap();
        prop_assert!(hi.score(&arm, &x).unwrap().mean >= before - 1e-9);

        let mut lo = base;
        lo.update(&arm, &x, before.min(0.0) - 1.0).unwrap();
        prop_assert!(lo.score(&arm, &x).unwrap().mean <= before + 1e-9);
    }

    /// Predict is read-only: scoring unseen arms never creates state.
    #[test]
    fn predict_does_not_create_arms(updates in update_seq(), x in unit_context()) {
        let engine = trained(&updates, 1.5);
        let before = engine.arms().len();
        let _ = engine.predict(&ArmId::from("never-seen"), &x).unwrap();
        prop_assert_eq!(engine.arms().len(), before);
    }

    /// Contexts of the wrong length are rejected without touching state.
    #[test]
    fn wrong_length_is_rejected(
        updates in update_seq(),
        len in (1usize..12).prop_filter("not d", |l| *l != D),
    ) {
        let mut engine = trained(&updates, 1.5);
        let snap = engine.snapshot();
        let x = vec![0.5; len];
        let is_mismatch = |r: Result<(), BanditError>| {
            matches!(r, Err(BanditError::DimensionMismatch { expected: D, got }) if got == len)
        };
        prop_assert!(matches!(
            engine.predict(&ArmId::Num(0), &x),
            Err(BanditError::DimensionMismatch { .. })
        ), "predict should reject a context of the wrong length");
        prop_assert!(is_mismatch(engine.update(&ArmId::Num(0), &x, 1.0)));
        prop_assert_eq!(engine.snapshot(), snap);
    }
}

// ---------------------------------------------------------------------------
// Edge cases
// ---------------------------------------------------------------------------

#[test]
fn cold_start_score_is_alpha_times_norm() {
    let engine = LinUcbEngine::default();
    let x = [0.8, 0.2, 0.9, 1.0, 0.6];
    let norm = x.iter().map(|v| v * v).sum::<f64>().sqrt();
    let s = engine.score(&ArmId::Num(1), &x).unwrap();
    assert_eq!(s.mean, 0.0);
    assert!((s.bonus - 1.5 * norm).abs() < 1e-12);
    assert!((s.ucb - 2.4829).abs() < 1e-3);
}

#[test]
fn empty_context_scores_zero_but_cannot_train() {
    let mut engine = LinUcbEngine::default();
    assert_eq!(engine.predict(&ArmId::Num(1), &[]).unwrap(), 0.0);
    assert!(engine.update(&ArmId::Num(1), &[], 1.0).is_err());
    assert!(engine.arms().is_empty());
}

#[test]
fn non_finite_reward_is_rejected() {
    let mut engine = LinUcbEngine::default();
    let x = [0.1; 5];
    assert!(matches!(
        engine.update(&ArmId::Num(1), &x, f64::NAN),
        Err(BanditError::InvalidReward(_))
    ));
    assert!(engine.arms().is_empty());
}

#[test]
fn newer_schema_is_refused_not_misread() {
    let engine = LinUcbEngine::default();
    let mut v: serde_json::Value =
        serde_json::from_slice(&engine.snapshot().to_json_bytes().unwrap()).unwrap();
    v["schema_version"] = serde_json::json!(SNAPSHOT_SCHEMA_VERSION + 1);
    let bytes = serde_json::to_vec(&v).unwrap();

    assert!(matches!(
        Snapshot::from_json_bytes(&bytes),
        Err(BanditError::UnsupportedSchema { .. })
    ));
    let store = MemoryStore::with_bytes(bytes);
    assert!(LinUcbEngine::try_load(&store).is_err());
    // Graceful load falls back to defaults.
    let fallback = LinUcbEngine::load(&store);
    assert_eq!(fallback.dim(), 5);
    assert_eq!(fallback.alpha(), 1.5);
}

#[test]
fn string_and_numeric_arms_coexist_in_a_snapshot() {
    let mut engine = LinUcbEngine::default();
    let x = [0.2; 5];
    engine.update(&ArmId::from("alice"), &x, 1.0).unwrap();
    engine.update(&ArmId::from(42u64), &x, 0.2).unwrap();
    let store = MemoryStore::new();
    engine.save(&store).unwrap();
    let back = LinUcbEngine::load(&store);
    assert!(back.arms().contains(&ArmId::from("alice")));
    assert!(back.arms().contains(&ArmId::Num(42)));
}
