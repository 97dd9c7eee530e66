//! Run-termination conditions.
//!
//! Grounded in `original_source/pbt/controller.py`'s `end_criteria` dict:
//! recognized keys are `{ steps, nfe, score }`, any present key is active,
//! and the run stops as soon as any active key's condition is met.

use pbt_types::Generation;

/// Which of a run's end conditions are active. Any present (`Some`) field
/// participates in `is_met`; an all-`None` criteria set is a configuration
/// error the controller rejects before starting (see [`crate::ControllerError::NoEndCriterion`]).
#[derive(Debug, Clone, Copy, Default)]
pub struct EndCriteria {
    /// Stop once every member of the current generation has `steps >= steps`.
    pub steps: Option<u64>,
    /// Stop once the cumulative number of `select` calls reaches `nfe`.
    pub nfe: Option<u64>,
    /// Stop once any member's score reaches the target, direction depending
    /// on that member's own `minimize` flag (>= when maximizing, <= when
    /// minimizing).
    pub score: Option<f64>,
}

impl EndCriteria {
    pub fn is_configured(&self) -> bool {
        self.steps.is_some() || self.nfe.is_some() || self.score.is_some()
    }

    /// Evaluates every active criterion against the just-completed
    /// generation and the run's cumulative NFE counter.
    pub fn is_met(&self, generation: &Generation, nfe: u64) -> bool {
        if let Some(target) = self.steps {
            if !generation.is_empty() && generation.iter().all(|m| m.steps >= target) {
                return true;
            }
        }
        if let Some(target) = self.nfe {
            if nfe >= target {
                return true;
            }
        }
        if let Some(target) = self.score {
            if generation.iter().any(|m| score_meets_target(m, target)) {
                return true;
            }
        }
        false
    }
}

fn score_meets_target(member: &pbt_types::MemberState, target: f64) -> bool {
    let score = member.score();
    if score.is_nan() {
        return false;
    }
    if member.minimize {
        score <= target
    } else {
        score >= target
    }
}
