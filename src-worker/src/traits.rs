//! Collaborator contracts consumed by the pool and the controller.
//!
//! Grounded in `src-de`'s `DEConfig.callback: Option<Box<dyn FnMut(..) -> .. +
//! Send>>` and `penalty_ineq: Vec<(Box<dyn Fn(..) -> f64 + Send + Sync>,
//! f64)>`: opaque behavior is injected into the numeric core as `Send + Sync`
//! trait objects rather than generic parameters, since the pool stores one
//! shared instance behind `Arc` across every worker thread.

use rand::RngCore;

use pbt_types::{MemberState, Population};

use crate::error::WorkerError;

/// Runs one training step on the members of a job, in place. `rng` is the
/// owning worker's own seeded generator, so trainers that need randomness
/// (dropout masks, data augmentation) draw from a stream independent of the
/// evolver's controller-thread RNG.
pub trait Trainer: Send + Sync {
    fn train_step(
        &self,
        members: &mut [&mut MemberState],
        step_size: u64,
        shuffle: bool,
        rng: &mut dyn RngCore,
    ) -> Result<(), WorkerError>;
}

/// Runs one evaluation step, updating each member's `loss`/`time` maps.
pub trait Evaluator: Send + Sync {
    fn eval_step(
        &self,
        members: &mut [&mut MemberState],
        step_size: u64,
        shuffle: bool,
        rng: &mut dyn RngCore,
    ) -> Result<(), WorkerError>;
}

/// Optional held-out test pass, independent of the eval metric used for
/// selection.
pub trait Tester: Send + Sync {
    fn test(&self, member: &MemberState) -> Result<f64, WorkerError>;
}

/// Durable keyed storage of member snapshots, written only by the
/// controller thread.
pub trait CheckpointStore: Send + Sync {
    /// Persists a member snapshot keyed by `(id, steps)`.
    fn update(&self, member_id: u64, steps: u64, member: MemberState);

    /// Fetches a snapshot; `steps = None` returns the latest for that id.
    fn get(&self, member_id: u64, steps: Option<u64>) -> Option<MemberState>;

    /// The latest snapshot for every known id.
    fn get_last(&self) -> Vec<MemberState>;

    /// Deletes snapshots older than the last `history_limit` generations
    /// (clamped to a minimum of 2), given the population's current shape.
    fn collect(&self, population: &Population, history_limit: usize);
}
