//! Human-readable reasons attached to a recommendation.
//!
//! Purely cosmetic: derived from the candidate's context vector against fixed
//! thresholds, never fed back into scoring.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::features::TaskFeatures;

pub const SKILL_MATCH_THRESHOLD: f64 = 0.6;
pub const LIGHT_WORKLOAD_THRESHOLD: f64 = 0.5;
pub const URGENCY_THRESHOLD: f64 = 0.5;
pub const DEPT_MATCH_THRESHOLD: f64 = 0.0;
pub const PAST_SUCCESS_THRESHOLD: f64 = 0.7;

/// One reason a candidate looks suitable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reason {
    SkillMatch,
    LightWorkload,
    UrgentTask,
    SameDepartment,
    StrongHistory,
    /// Nothing stands out; the candidate is ranked on exploration value.
    Exploration,
}

impl Reason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SkillMatch => "strong skill match",
            Self::LightWorkload => "light current workload",
            Self::UrgentTask => "task is urgent",
            Self::SameDepartment => "same department",
            Self::StrongHistory => "good completion history",
            Self::Exploration => "exploration candidate",
        }
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered list of reasons; never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Explanation {
    pub reasons: Vec<Reason>,
}

impl fmt::Display for Explanation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, r) in self.reasons.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(r.as_str())?;
        }
        Ok(())
    }
}

/// Explain a context in the canonical five-feature layout.
///
/// Shorter contexts only evaluate the components they have.
pub fn explain(context: &[f64]) -> Explanation {
    let f = TaskFeatures::from_vector(context);
    let has = |i: usize| context.len() > i;
    let mut reasons = Vec::new();
    if has(0) && f.skill_match > SKILL_MATCH_THRESHOLD {
        reasons.push(Reason::SkillMatch);
    }
    if has(1) && f.workload < LIGHT_WORKLOAD_THRESHOLD {
        reasons.push(Reason::LightWorkload);
    }
    if has(2) && f.urgency > URGENCY_THRESHOLD {
        reasons.push(Reason::UrgentTask);
    }
    if has(3) && f.dept_match > DEPT_MATCH_THRESHOLD {
        reasons.push(Reason::SameDepartment);
    }
    if has(4) && f.past_success > PAST_SUCCESS_THRESHOLD {
        reasons.push(Reason::StrongHistory);
    }
    if reasons.is_empty() {
        reasons.push(Reason::Exploration);
    }
    Explanation { reasons }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::NEUTRAL_CONTEXT;

    #[test]
    fn all_reasons_in_order() {
        let e = explain(&[0.8, 0.1, 0.9, 1.0, 0.8]);
        assert_eq!(
            e.reasons,
            vec![
                Reason::SkillMatch,
                Reason::LightWorkload,
                Reason::UrgentTask,
                Reason::SameDepartment,
                Reason::StrongHistory,
            ]
        );
        assert_eq!(
            e.to_string(),
            "strong skill match, light current workload, task is urgent, same department, good completion history"
        );
    }

    #[test]
    fn thresholds_are_strict() {
        let e = explain(&[0.6, 0.5, 0.5, 0.0, 0.7]);
        assert_eq!(e.reasons, vec![Reason::Exploration]);

        let just_past = explain(&[0.61, 0.49, 0.51, 0.01, 0.71]);
        assert_eq!(
            just_past.reasons,
            vec![
                Reason::SkillMatch,
                Reason::LightWorkload,
                Reason::UrgentTask,
                Reason::SameDepartment,
                Reason::StrongHistory,
            ]
        );
    }

    #[test]
    fn neutral_vector_is_exploration_only() {
        assert_eq!(explain(&NEUTRAL_CONTEXT).reasons, vec![Reason::Exploration]);
    }

    #[test]
    fn short_and_empty_contexts() {
        // A missing workload component must not read as "light workload".
        assert_eq!(explain(&[0.9]).reasons, vec![Reason::SkillMatch]);
        assert_eq!(explain(&[]).to_string(), "exploration candidate");
    }
}
