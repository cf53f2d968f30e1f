//! Context vectors for `(user, task)` pairs.
//!
//! The engine itself is feature-agnostic; it only needs a fixed-length vector
//! per candidate.  This module defines the seam ([`ContextBuilder`]) plus the
//! canonical five-feature layout used for task assignment and its normalizers.
//!
//! Canonical layout (`d = 5`):
//!
//! | idx | feature        | range   | meaning                                       |
//! |-----|----------------|---------|-----------------------------------------------|
//! | 0   | `skill_match`  | `[0,1]` | mean skill level over the task's requirements |
//! | 1   | `workload`     | `[0,1]` | active assignments, saturating at 10          |
//! | 2   | `urgency`      | `[0.1,1]` | closeness of the due date                   |
//! | 3   | `dept_match`   | `>= 0`  | same-department signal                        |
//! | 4   | `past_success` | `[0,1]` | historical completion rate                    |

use tracing::warn;

use crate::{ArmId, FeatureError, TaskId};

/// Neutral vector used when a candidate's features cannot be computed.
pub const NEUTRAL_CONTEXT: [f64; 5] = [0.0, 0.5, 0.0, 0.0, 0.5];

/// Number of features in the canonical layout.
pub const TASK_FEATURE_DIM: usize = 5;

/// Source of context vectors for `(arm, task)` pairs.
///
/// Implementations typically query a database.  Errors are allowed here; the
/// recommendation layer decides whether to substitute a neutral vector
/// (ranking, outcome feedback) or skip the record (batch retraining).
pub trait ContextBuilder {
    fn build(&self, arm: &ArmId, task: TaskId) -> Result<Vec<f64>, FeatureError>;
}

impl<F> ContextBuilder for F
where
    F: Fn(&ArmId, TaskId) -> Result<Vec<f64>, FeatureError>,
{
    fn build(&self, arm: &ArmId, task: TaskId) -> Result<Vec<f64>, FeatureError> {
        self(arm, task)
    }
}

/// Build a context, substituting `neutral` on failure (logged).
pub fn build_or_neutral<B: ContextBuilder + ?Sized>(
    builder: &B,
    arm: &ArmId,
    task: TaskId,
    neutral: &[f64],
) -> Vec<f64> {
    match builder.build(arm, task) {
        Ok(v) => v,
        Err(e) => {
            warn!(%arm, task, error = %e, "Context build failed, using neutral vector");
            neutral.to_vec()
        }
    }
}

/// The canonical assignment features for one `(user, task)` pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TaskFeatures {
    pub skill_match: f64,
    pub workload: f64,
    pub urgency: f64,
    pub dept_match: f64,
    pub past_success: f64,
}

impl Default for TaskFeatures {
    /// Same values as [`NEUTRAL_CONTEXT`].
    fn default() -> Self {
        Self::from_vector(&NEUTRAL_CONTEXT)
    }
}

impl TaskFeatures {
    pub fn to_vector(&self) -> Vec<f64> {
        vec![
            self.skill_match,
            self.workload,
            self.urgency,
            self.dept_match,
            self.past_success,
        ]
    }

    /// Read the canonical layout back; missing trailing components read as `0.0`.
    pub fn from_vector(v: &[f64]) -> Self {
        let at = |i: usize| v.get(i).copied().unwrap_or(0.0);
        Self {
            skill_match: at(0),
            workload: at(1),
            urgency: at(2),
            dept_match: at(3),
            past_success: at(4),
        }
    }
}

/// Active assignment count mapped to `[0, 1]`, saturating at 10.
pub fn workload_from_active(active: u32) -> f64 {
    (f64::from(active) / 10.0).min(1.0)
}

/// Due-date urgency: `10 / (days_left + 1)` clamped to `[0.1, 1.0]`.
///
/// No due date and overdue tasks are both maximally urgent.
/// `days_left` counts whole days until due, rounded down (negative once
/// overdue), the same convention as [`crate::ordering`].
pub fn urgency_from_days_left(days_left: Option<i64>) -> f64 {
    match days_left {
        None => 1.0,
        Some(d) if d < 0 => 1.0,
        Some(d) => (10.0 / (d as f64 + 1.0)).clamp(0.1, 1.0),
    }
}

/// Completion rate with a `0.5` prior when there is no history.
pub fn past_success_rate(done: u32, total: u32) -> f64 {
    if total == 0 {
        0.5
    } else {
        (f64::from(done) / f64::from(total)).clamp(0.0, 1.0)
    }
}
