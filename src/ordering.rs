//! Backlog ordering: which of a user's open tasks to work on first.
//!
//! A fixed heuristic, independent of the bandit:
//!
//! ```text
//! score = 10 * priority_weight + max(0, 10 - days_left)
//! ```
//!
//! `High`/`Medium`/`Low` weigh `3`/`2`/`1`; an unknown or missing priority
//! weighs `1`.  `days_left` is the number of whole days until the due date,
//! rounded down (so overdue tasks are negative and keep gaining score).  A task
//! with no due date counts as [`NO_DUE_DATE_DAYS`] away and gets no urgency
//! points.

use std::cmp::Reverse;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{ArmId, FeatureError, TaskId};

/// How many tasks a backlog suggestion returns by default.
pub const BACKLOG_TOP_N: usize = 5;

/// Days-left value used for tasks without a due date.
pub const NO_DUE_DATE_DAYS: i64 = 999;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    /// Parse the exact labels `High`, `Medium` and `Low`.
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "High" => Some(Self::High),
            "Medium" => Some(Self::Medium),
            "Low" => Some(Self::Low),
            _ => None,
        }
    }

    pub fn weight(self) -> i64 {
        match self {
            Self::High => 3,
            Self::Medium => 2,
            Self::Low => 1,
        }
    }
}

/// One open task assigned to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BacklogItem {
    pub task: TaskId,
    pub title: String,
    pub priority: Option<Priority>,
    /// Whole days until due, rounded down; `None` if there is no due date.
    pub days_left: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderedTask {
    pub task: TaskId,
    pub title: String,
    pub score: i64,
}

/// Where a user's open tasks come from.
pub trait Backlog {
    /// Open (not done) tasks assigned to `user`.
    fn open_tasks(&self, user: &ArmId) -> Result<Vec<BacklogItem>, FeatureError>;
}

pub fn backlog_score(priority: Option<Priority>, days_left: Option<i64>) -> i64 {
    let weight = priority.map_or(1, Priority::weight);
    let days = days_left.unwrap_or(NO_DUE_DATE_DAYS);
    (weight * 10).saturating_add(10i64.saturating_sub(days).max(0))
}

/// Score every item and keep the best `top_n`.
///
/// Sorted by descending score; equal scores keep their input order.
pub fn order_backlog(
    items: impl IntoIterator<Item = BacklogItem>,
    top_n: usize,
) -> Vec<OrderedTask> {
    let mut out: Vec<OrderedTask> = items
        .into_iter()
        .map(|it| OrderedTask {
            score: backlog_score(it.priority, it.days_left),
            task: it.task,
            title: it.title,
        })
        .collect();
    out.sort_by_key(|t| Reverse(t.score));
    out.truncate(top_n);
    out
}

/// Best-effort ordering of `user`'s backlog; a lookup failure yields an empty list.
pub fn suggest_order<B: Backlog + ?Sized>(
    backlog: &B,
    user: &ArmId,
    top_n: usize,
) -> Vec<OrderedTask> {
    match backlog.open_tasks(user) {
        Ok(items) => order_backlog(items, top_n),
        Err(e) => {
            warn!(%user, error = %e, "Backlog lookup failed, no ordering");
            Vec::new()
        }
    }
}
