//! Simulated assignment loop: recommend, assign the top pick, record the outcome.
//!
//! ```text
//! RUST_LOG=taskmux=debug cargo run --example assignment_router
//! ```

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use taskmux::features::{past_success_rate, urgency_from_days_left, workload_from_active};
use taskmux::{
    ArmId, Candidate, ContextBuilder, Directory, FeatureError, FileStore, Recommender,
    ServiceConfig, SharedEngine, TaskFeatures, TaskId,
};
use tracing_subscriber::EnvFilter;

struct User {
    name: &'static str,
    dept: u32,
    skills: &'static [&'static str],
    active: u32,
    done: u32,
    total: u32,
    // Hidden from the model.
    reliability: f64,
}

struct Task {
    dept: u32,
    skills: &'static [&'static str],
    days_left: Option<i64>,
}

struct Org {
    users: BTreeMap<u64, User>,
    tasks: BTreeMap<TaskId, Task>,
}

impl Directory for Org {
    fn task_exists(&self, task: TaskId) -> Result<bool, FeatureError> {
        Ok(self.tasks.contains_key(&task))
    }

    fn candidates(&self, _task: TaskId) -> Result<Vec<Candidate>, FeatureError> {
        Ok(self
            .users
            .iter()
            .map(|(id, u)| Candidate::new(*id, u.name))
            .collect())
    }
}

impl ContextBuilder for Org {
    fn build(&self, arm: &ArmId, task: TaskId) -> Result<Vec<f64>, FeatureError> {
        let t = self.tasks.get(&task).ok_or(FeatureError::TaskNotFound(task))?;
        let u = match arm {
            ArmId::Num(id) => self.users.get(id),
            ArmId::Name(_) => None,
        }
        .ok_or_else(|| FeatureError::ArmNotFound(arm.clone()))?;
        let hits = t.skills.iter().filter(|s| u.skills.contains(*s)).count();
        Ok(TaskFeatures {
            skill_match: hits as f64 / t.skills.len().max(1) as f64,
            workload: workload_from_active(u.active),
            urgency: urgency_from_days_left(t.days_left),
            dept_match: if u.dept == t.dept { 1.0 } else { 0.0 },
            past_success: past_success_rate(u.done, u.total),
        }
        .to_vector())
    }
}

fn org() -> Org {
    let users = [
        (
            1,
            User {
                name: "Lan",
                dept: 1,
                skills: &["rust", "sql"],
                active: 2,
                done: 8,
                total: 10,
                reliability: 0.9,
            },
        ),
        (
            2,
            User {
                name: "Minh",
                dept: 1,
                skills: &["rust"],
                active: 7,
                done: 3,
                total: 10,
                reliability: 0.4,
            },
        ),
        (
            3,
            User {
                name: "Hoa",
                dept: 2,
                skills: &["sql", "ops"],
                active: 1,
                done: 0,
                total: 0,
                reliability: 0.7,
            },
        ),
        (
            4,
            User {
                name: "Tuan",
                dept: 2,
                skills: &["ops"],
                active: 4,
                done: 5,
                total: 9,
                reliability: 0.3,
            },
        ),
    ];
    let tasks = (0..300u64)
        .map(|i| {
            let skills: &'static [&'static str] = match i % 3 {
                0 => &["rust", "sql"],
                1 => &["ops"],
                _ => &["sql"],
            };
            let task = Task {
                dept: 1 + (i % 2) as u32,
                skills,
                days_left: if i % 5 == 0 { None } else { Some((i % 14) as i64) },
            };
            (i, task)
        })
        .collect();
    Org {
        users: users.into_iter().collect(),
        tasks,
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("taskmux=info")),
        )
        .init();

    let dir = std::env::temp_dir().join("taskmux-demo");
    let cfg = ServiceConfig {
        model_path: dir.join("linucb_assignment.json"),
        ..ServiceConfig::default()
    };
    let chart = org();
    let reliability: BTreeMap<u64, f64> =
        chart.users.iter().map(|(id, u)| (*id, u.reliability)).collect();
    let task_ids: Vec<TaskId> = chart.tasks.keys().copied().collect();
    let engine = SharedEngine::open(FileStore::new(&cfg.model_path), cfg.engine);
    // The directory and the feature builder read the same org chart.
    let svc = Recommender::new(org(), chart, engine);

    let mut env = StdRng::seed_from_u64(7);
    let mut picks: BTreeMap<String, usize> = BTreeMap::new();
    for &task in &task_ids {
        let recs = svc.recommend_default(task);
        let Some(top) = recs.first() else { continue };
        *picks.entry(top.display_name.clone()).or_default() += 1;

        let p = match &top.arm {
            ArmId::Num(id) => reliability.get(id).copied().unwrap_or(0.5),
            ArmId::Name(_) => 0.5,
        };
        svc.record_outcome(&top.arm, task, env.random_bool(p))?;

        if task % 100 == 0 {
            for r in &recs {
                println!(
                    "task {task:>3}: {:<5} score={:.3} ({})",
                    r.display_name, r.score, r.explanation
                );
            }
        }
    }

    println!("picks after {} tasks: {picks:?}", task_ids.len());
    println!("snapshot: {}", cfg.model_path.display());
    Ok(())
}

