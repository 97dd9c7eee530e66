//! Member state: one population member's hyperparameters, opaque training
//! state, and recorded loss/time history.
//!
//! Grounded in `original_source/database.py`'s `Checkpoint` class.

use std::any::Any;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::hyperparameter::Hyperparameter;

/// Opaque model or optimizer state. Owned by the collaborator; the scheduler
/// never inspects it, only moves it between members.
pub type StateBlob = Arc<dyn Any + Send + Sync>;

/// One population member: its ordered hyperparameters, opaque training
/// state, and the loss/time bookkeeping the controller and evolvers read.
#[derive(Clone)]
pub struct MemberState {
    pub id: u64,
    pub epochs: u64,
    pub steps: u64,
    pub parameters: IndexMap<String, Hyperparameter>,
    pub model_state: Option<StateBlob>,
    pub optimizer_state: Option<StateBlob>,
    /// `loss[group][metric]`, e.g. `loss["eval"]["accuracy"]`.
    pub loss: IndexMap<String, IndexMap<String, f64>>,
    pub time: IndexMap<String, f64>,
    pub loss_metric: String,
    pub eval_metric: String,
    /// Whether a lower score is better for this run's eval metric.
    pub minimize: bool,
}

impl MemberState {
    pub fn new(
        id: u64,
        parameters: IndexMap<String, Hyperparameter>,
        loss_metric: impl Into<String>,
        eval_metric: impl Into<String>,
        minimize: bool,
    ) -> Self {
        Self {
            id,
            epochs: 0,
            steps: 0,
            parameters,
            model_state: None,
            optimizer_state: None,
            loss: IndexMap::new(),
            time: IndexMap::new(),
            loss_metric: loss_metric.into(),
            eval_metric: eval_metric.into(),
            minimize,
        }
    }

    /// `loss["eval"][eval_metric]`, or NaN if not yet recorded.
    pub fn score(&self) -> f64 {
        self.loss
            .get("eval")
            .and_then(|m| m.get(&self.eval_metric))
            .copied()
            .unwrap_or(f64::NAN)
    }

    /// A rank where larger is always better, regardless of `minimize`, with
    /// NaN (no score recorded yet) always ranked worst.
    fn fitness_rank(&self) -> f64 {
        let s = self.score();
        if s.is_nan() {
            return f64::NEG_INFINITY;
        }
        if self.minimize {
            -s
        } else {
            s
        }
    }

    /// A full, independent copy: parameters and metadata duplicated,
    /// opaque state blobs shared by reference (cheap `Arc` clone).
    pub fn copy(&self) -> Self {
        self.clone()
    }

    /// Duplicates only the hyperparameter map, leaving state blobs,
    /// identity and history untouched. Mirrors the original's
    /// `__exploit_and_explore` calling `copy_parameters` separately from
    /// `copy_state`.
    pub fn copy_parameters(&mut self, source: &MemberState) {
        self.parameters = source.parameters.clone();
    }

    /// Shares the source's opaque training state by reference.
    pub fn copy_state(&mut self, source: &MemberState) {
        self.model_state = source.model_state.clone();
        self.optimizer_state = source.optimizer_state.clone();
    }

    /// Reads the normalized coordinate at ordinal position `j`, the
    /// representation DE mutation kernels operate on.
    pub fn coord(&self, j: usize) -> f64 {
        self.parameters
            .get_index(j)
            .expect("coordinate index out of bounds")
            .1
            .normalized()
    }

    /// Overwrites the normalized coordinate at ordinal position `j` without
    /// clipping; callers clip or halve the whole vector afterwards.
    pub fn set_coord(&mut self, j: usize, u: f64) {
        self.parameters
            .get_index_mut(j)
            .expect("coordinate index out of bounds")
            .1
            .set_normalized_unclipped(u);
    }

    pub fn dimensions(&self) -> usize {
        self.parameters.len()
    }

    /// A human summary mirroring `Checkpoint.__str__`: one line per recorded
    /// loss entry, `"Member {id:03}, epoch {epochs}, step {steps}, {group}_{metric} {value:.5}"`.
    pub fn performance_details(&self) -> String {
        if self.loss.is_empty() {
            return format!(
                "Member {:03}, epoch {}, step {}, no loss recorded",
                self.id, self.epochs, self.steps
            );
        }
        let mut lines = Vec::new();
        for (group, metrics) in &self.loss {
            for (metric, value) in metrics {
                lines.push(format!(
                    "Member {:03}, epoch {}, step {}, {}_{} {:.5}",
                    self.id, self.epochs, self.steps, group, metric, value
                ));
            }
        }
        lines.join("\n")
    }
}

impl PartialEq for MemberState {
    fn eq(&self, other: &Self) -> bool {
        self.fitness_rank() == other.fitness_rank()
    }
}

impl PartialOrd for MemberState {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        self.fitness_rank().partial_cmp(&other.fitness_rank())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(id: u64, score: Option<f64>, minimize: bool) -> MemberState {
        let mut m = MemberState::new(id, IndexMap::new(), "train", "eval_metric", minimize);
        if let Some(s) = score {
            let mut metrics = IndexMap::new();
            metrics.insert("eval_metric".to_string(), s);
            m.loss.insert("eval".to_string(), metrics);
        }
        m
    }

    #[test]
    fn higher_score_ranks_better_when_maximizing() {
        let a = member(1, Some(0.5), false);
        let b = member(2, Some(0.9), false);
        assert!(b > a);
    }

    #[test]
    fn lower_score_ranks_better_when_minimizing() {
        let a = member(1, Some(0.5), true);
        let b = member(2, Some(0.9), true);
        assert!(a > b);
    }

    #[test]
    fn nan_score_always_ranks_worst() {
        let unscored = member(1, None, false);
        let scored = member(2, Some(-100.0), false);
        assert!(scored > unscored);

        let unscored_min = member(3, None, true);
        let scored_min = member(4, Some(-100.0), true);
        assert!(scored_min > unscored_min);
    }

    #[test]
    fn copy_parameters_and_copy_state_are_independent() {
        use crate::hyperparameter::Hyperparameter;
        let mut params = IndexMap::new();
        params.insert("lr".to_string(), Hyperparameter::continuous_real(0.0, 1.0).unwrap());
        let source = MemberState::new(1, params, "train", "eval", false);

        let mut target = member(2, None, false);
        target.copy_parameters(&source);
        assert_eq!(target.parameters.len(), 1);
        assert!(target.model_state.is_none());
    }
}
