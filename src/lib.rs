//! `taskmux`: contextual-bandit assignee recommendation.
//!
//! Given a task and a set of candidate users, `taskmux` ranks the users by how
//! likely they are to complete the task well, and learns from what actually
//! happens.  Each user is an *arm* of a disjoint linear contextual bandit
//! (LinUCB): a per-user ridge regression over a small feature vector
//! describing the `(user, task)` pair, scored with an upper confidence bound.
//!
//! **Core pieces:**
//! - [`LinUcbEngine`]: `predict` / `score` / `update` over per-arm `(A, b)` statistics.
//! - [`ArmStore`]: lazily-created per-arm state.
//! - [`Snapshot`] + [`BlobStore`] ([`FileStore`], [`MemoryStore`]): versioned
//!   persistence with atomic replacement and graceful cold start.
//! - [`SharedEngine`]: concurrent readers, a single writer, durable updates.
//! - [`Recommender`]: `recommend` / `record_outcome` / `retrain` over a
//!   caller-supplied [`Directory`] and [`ContextBuilder`].
//! - [`ordering`]: a fixed priority/due-date heuristic for a user's backlog.
//!
//! **Goals:**
//! - **Deterministic**: same state + same contexts → same ranking (ties by arm id).
//! - **Degrade, don't fail**: a bad candidate, a bad history record or a bad
//!   snapshot never takes the recommendation path down.
//! - **Small d**: built for a handful of features; dense `O(d^3)` solves are fine.
//!
//! **Non-goals:**
//! - Computing features.  Callers bring a [`ContextBuilder`].
//! - Cross-process coordination of snapshot writers.
//!
//! # Example
//!
//! ```rust
//! use taskmux::{ArmId, LinUcbEngine, MemoryStore};
//!
//! let mut engine = LinUcbEngine::default(); // d = 5, alpha = 1.5
//! let x = [0.8, 0.2, 0.9, 1.0, 0.6];
//! let arm = ArmId::from(7u64);
//!
//! let cold = engine.predict(&arm, &x).unwrap();
//! assert!((cold - 2.48).abs() < 0.01);
//!
//! engine.update(&arm, &x, 1.0).unwrap();
//! assert!(engine.predict(&arm, &x).unwrap() < cold);
//!
//! let store = MemoryStore::new();
//! engine.save(&store).unwrap();
//! let back = LinUcbEngine::load(&store);
//! assert_eq!(back.snapshot(), engine.snapshot());
//! ```

#![forbid(unsafe_code)]

/// Feature dimension used when no snapshot or config says otherwise.
pub const DEFAULT_DIM: usize = 5;

/// Exploration strength used when no snapshot or config says otherwise.
pub const DEFAULT_ALPHA: f64 = 1.5;

mod arm;
pub use arm::*;

mod error;
pub use error::*;

mod linalg;

mod store;
pub use store::*;

mod engine;
pub use engine::*;

mod snapshot;
pub use snapshot::*;

mod persist;
pub use persist::*;

mod shared;
pub use shared::*;

pub mod features;
pub use features::{ContextBuilder, TaskFeatures, NEUTRAL_CONTEXT};

pub mod explain;
pub use explain::{Explanation, Reason};

mod recommend;
pub use recommend::*;

mod config;
pub use config::*;

pub mod ordering;
pub use ordering::{order_backlog, Backlog, BacklogItem, OrderedTask, Priority};
