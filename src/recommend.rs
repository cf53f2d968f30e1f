//! Assignee recommendation: rank candidates for a task, learn from outcomes.
//!
//! This is thin composition over the engine:
//!
//! ```text
//! recommend(task, k):   Directory::candidates -> ContextBuilder (per candidate)
//!                       -> LinUcbEngine::score -> sort -> top k
//! record_outcome(...):  ContextBuilder -> reward -> update + save
//! retrain(history):     fresh engine <- replay every record -> swap + save
//! ```
//!
//! Failures local to one candidate or one history record are contained: a
//! candidate whose features cannot be computed is scored on the neutral
//! vector; a history record that cannot be replayed is skipped and counted.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::explain::{explain, Explanation};
use crate::features::{build_or_neutral, ContextBuilder, NEUTRAL_CONTEXT};
use crate::persist::{BlobStore, FileStore};
use crate::{
    ArmId, BanditError, ConfigError, FeatureError, LinUcbEngine, ServiceConfig, SharedEngine,
    TaskId,
};

/// A user who could be assigned the task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub arm: ArmId,
    pub display_name: String,
}

impl Candidate {
    pub fn new(arm: impl Into<ArmId>, display_name: impl Into<String>) -> Self {
        Self {
            arm: arm.into(),
            display_name: display_name.into(),
        }
    }
}

/// One ranked suggestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub arm: ArmId,
    pub display_name: String,
    /// UCB score (higher is better).
    pub score: f64,
    pub explanation: Explanation,
}

/// Observed result of an assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Completed,
    InProgress,
    NotCompleted,
}

/// Reward assigned to each [`Outcome`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardScale {
    pub completed: f64,
    pub in_progress: f64,
    pub not_completed: f64,
}

impl Default for RewardScale {
    fn default() -> Self {
        Self {
            completed: 1.0,
            in_progress: 0.5,
            not_completed: 0.2,
        }
    }
}

impl RewardScale {
    pub fn reward(&self, outcome: Outcome) -> f64 {
        match outcome {
            Outcome::Completed => self.completed,
            Outcome::InProgress => self.in_progress,
            Outcome::NotCompleted => self.not_completed,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        for (name, v) in [
            ("completed", self.completed),
            ("in_progress", self.in_progress),
            ("not_completed", self.not_completed),
        ] {
            if !v.is_finite() {
                return Err(format!("reward `{name}` must be finite, got {v}"));
            }
        }
        Ok(())
    }
}

/// One historical `(user, task, outcome)` triple for batch retraining.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub arm: ArmId,
    pub task: TaskId,
    pub outcome: Outcome,
}

/// Counts from a batch retrain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrainReport {
    pub applied: usize,
    pub skipped: usize,
}

/// Where candidates come from.
pub trait Directory {
    fn task_exists(&self, task: TaskId) -> Result<bool, FeatureError>;

    /// Users eligible for `task`.
    fn candidates(&self, task: TaskId) -> Result<Vec<Candidate>, FeatureError>;
}

/// The neutral vector resized to `dim` (extra components are `0.0`).
pub fn neutral_context(dim: usize) -> Vec<f64> {
    let mut v: Vec<f64> = NEUTRAL_CONTEXT.iter().copied().take(dim).collect();
    v.resize(dim, 0.0);
    v
}

/// Rank `candidates` for `task` and keep the top `k`.
///
/// Sorted by descending score, ties broken by ascending arm id.  Duplicate
/// arms keep their first occurrence.
pub fn rank<B: ContextBuilder + ?Sized>(
    engine: &LinUcbEngine,
    builder: &B,
    task: TaskId,
    candidates: &[Candidate],
    k: usize,
) -> Vec<Recommendation> {
    let neutral = neutral_context(engine.dim());
    let contexts = candidates
        .iter()
        .map(|c| build_or_neutral(builder, &c.arm, task, &neutral))
        .collect::<Vec<_>>();
    rank_contexts(engine, candidates.iter().zip(contexts), k)
}

fn rank_contexts<'a>(
    engine: &LinUcbEngine,
    items: impl IntoIterator<Item = (&'a Candidate, Vec<f64>)>,
    k: usize,
) -> Vec<Recommendation> {
    let mut seen = BTreeSet::new();
    let mut out = Vec::new();
    for (cand, context) in items {
        if !seen.insert(&cand.arm) {
            continue;
        }
        let score = match engine.predict(&cand.arm, &context) {
            Ok(s) if s.is_finite() => s,
            Ok(s) => {
                warn!(arm = %cand.arm, score = s, "Non-finite score, using 0.0");
                0.0
            }
            Err(e) => {
                warn!(arm = %cand.arm, error = %e, "Scoring failed, using 0.0");
                0.0
            }
        };
        out.push(Recommendation {
            arm: cand.arm.clone(),
            display_name: cand.display_name.clone(),
            score,
            explanation: explain(&context),
        });
    }
    out.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.arm.cmp(&b.arm))
    });
    out.truncate(k);
    out
}

/// Recommendation service owning the engine handle.
pub struct Recommender<D, B, S> {
    directory: D,
    builder: B,
    engine: SharedEngine<S>,
    rewards: RewardScale,
    default_top_k: usize,
}

impl<D, B> Recommender<D, B, FileStore>
where
    D: Directory,
    B: ContextBuilder,
{
    /// Open (or cold-start) the snapshot at `cfg.model_path`.
    pub fn from_config(cfg: &ServiceConfig, directory: D, builder: B) -> Result<Self, ConfigError> {
        cfg.validate()?;
        let engine = SharedEngine::open(FileStore::new(&cfg.model_path), cfg.engine);
        Ok(Self::new(directory, builder, engine)
            .with_rewards(cfg.rewards)
            .with_default_top_k(cfg.default_top_k))
    }
}

impl<D, B, S> Recommender<D, B, S>
where
    D: Directory,
    B: ContextBuilder,
    S: BlobStore,
{
    pub fn new(directory: D, builder: B, engine: SharedEngine<S>) -> Self {
        Self {
            directory,
            builder,
            engine,
            rewards: RewardScale::default(),
            default_top_k: 3,
        }
    }

    pub fn with_rewards(mut self, rewards: RewardScale) -> Self {
        self.rewards = rewards;
        self
    }

    pub fn with_default_top_k(mut self, k: usize) -> Self {
        self.default_top_k = k;
        self
    }

    pub fn engine(&self) -> &SharedEngine<S> {
        &self.engine
    }

    pub fn default_top_k(&self) -> usize {
        self.default_top_k
    }

    fn neutral(&self) -> Vec<f64> {
        neutral_context(self.engine.config().dim)
    }

    /// Top `top_k` candidates for `task`; empty if the task does not exist.
    ///
    /// Never fails: directory errors produce an empty list, per-candidate
    /// feature errors fall back to the neutral vector.
    pub fn recommend(&self, task: TaskId, top_k: usize) -> Vec<Recommendation> {
        match self.directory.task_exists(task) {
            Ok(true) => {}
            Ok(false) => {
                debug!(task, "Task not found, no recommendations");
                return Vec::new();
            }
            Err(e) => {
                warn!(task, error = %e, "Task lookup failed, no recommendations");
                return Vec::new();
            }
        }
        let candidates = match self.directory.candidates(task) {
            Ok(c) => c,
            Err(e) => {
                warn!(task, error = %e, "Candidate lookup failed, no recommendations");
                return Vec::new();
            }
        };

        // Build contexts before taking the engine lock; builders may do I/O.
        let neutral = self.neutral();
        let contexts = candidates
            .iter()
            .map(|c| build_or_neutral(&self.builder, &c.arm, task, &neutral))
            .collect::<Vec<_>>();
        let ranked = self
            .engine
            .with_engine(|e| rank_contexts(e, candidates.iter().zip(contexts), top_k));
        debug!(
            task,
            candidates = candidates.len(),
            returned = ranked.len(),
            "Ranked candidates"
        );
        ranked
    }

    /// [`Self::recommend`] with the configured default `k`.
    pub fn recommend_default(&self, task: TaskId) -> Vec<Recommendation> {
        self.recommend(task, self.default_top_k)
    }

    /// Feed back a binary outcome and persist immediately.
    ///
    /// An `Err` from the save step means the outcome *was* learned in memory
    /// but not yet written; it is persisted by the next successful save.  Do
    /// not retry on such an error, or the outcome is counted twice.
    pub fn record_outcome(&self, arm: &ArmId, task: TaskId, succeeded: bool) -> Result<(), BanditError> {
        let outcome = if succeeded {
            Outcome::Completed
        } else {
            Outcome::NotCompleted
        };
        self.record(arm, task, outcome)
    }

    /// Feed back a graded outcome and persist immediately.
    ///
    /// Same persistence contract as [`Self::record_outcome`].
    pub fn record(&self, arm: &ArmId, task: TaskId, outcome: Outcome) -> Result<(), BanditError> {
        let context = build_or_neutral(&self.builder, arm, task, &self.neutral());
        let reward = self.rewards.reward(outcome);
        self.engine.update_and_save(arm, &context, reward)?;
        info!(%arm, task, ?outcome, reward, "Recorded assignment outcome");
        Ok(())
    }

    /// Rebuild the model from scratch by replaying `history`, then swap it in and save.
    ///
    /// Records whose context cannot be built (or is malformed) are skipped.
    /// The rebuilt engine is saved even if every record was skipped.
    ///
    /// The replay runs as the engine's single writer: recommendations keep
    /// being served from the current model, while outcomes recorded meanwhile
    /// wait and are applied to the rebuilt model, so none is lost.
    pub fn retrain<I>(&self, history: I) -> Result<RetrainReport, BanditError>
    where
        I: IntoIterator<Item = HistoryRecord>,
    {
        let report = self.engine.rebuild_and_save(|cfg| {
            let mut engine = LinUcbEngine::new(cfg)?;
            let mut report = RetrainReport::default();
            for rec in history {
                let applied = self
                    .builder
                    .build(&rec.arm, rec.task)
                    .map_err(|e| e.to_string())
                    .and_then(|ctx| {
                        engine
                            .update(&rec.arm, &ctx, self.rewards.reward(rec.outcome))
                            .map_err(|e| e.to_string())
                    });
                match applied {
                    Ok(()) => report.applied += 1,
                    Err(e) => {
                        debug!(arm = %rec.arm, task = rec.task, error = %e, "Skipping history record");
                        report.skipped += 1;
                    }
                }
            }
            info!(arms = engine.arms().len(), "Replayed history into fresh model");
            Ok((engine, report))
        })?;
        info!(
            applied = report.applied,
            skipped = report.skipped,
            "Retrained bandit from history"
        );
        Ok(report)
    }
}
