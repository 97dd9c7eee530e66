//! Job and result message types exchanged between the controller and workers.
//!
//! Grounded in `original_source/pbt/trainingservice.py` and `worker_pool.py`:
//! a job carries an opaque "checkpoints" payload (one member, or a parent/
//! trial pair trained together as a unit) plus the step sizes and shuffle
//! flags the trainer/evaluator need.

use pbt_types::MemberState;

/// The opaque training payload of one job: either a single member (random
/// search, random walk, PBT) or a parent/trial pair (DE family), mirroring
/// `pbt_evolve::Candidate`'s shape without depending on that crate.
#[derive(Clone)]
pub enum WorkItem {
    Single(MemberState),
    Pair(MemberState, MemberState),
}

impl WorkItem {
    pub fn members(&self) -> Vec<&MemberState> {
        match self {
            WorkItem::Single(m) => vec![m],
            WorkItem::Pair(a, b) => vec![a, b],
        }
    }

    pub fn members_mut(&mut self) -> Vec<&mut MemberState> {
        match self {
            WorkItem::Single(m) => vec![m],
            WorkItem::Pair(a, b) => vec![a, b],
        }
    }

    pub fn into_members(self) -> Vec<MemberState> {
        match self {
            WorkItem::Single(m) => vec![m],
            WorkItem::Pair(a, b) => vec![a, b],
        }
    }
}

/// One unit of work submitted to the pool.
#[derive(Clone)]
pub struct TrainJob {
    pub work: WorkItem,
    pub train_step_size: u64,
    pub eval_step_size: Option<u64>,
    pub train_shuffle: bool,
    pub eval_shuffle: bool,
}

/// Reported by a worker when training or evaluation raises, instead of
/// panicking the worker thread.
#[derive(Debug, Clone)]
pub struct FailMessage {
    pub sender_id: usize,
    pub text: String,
    pub exception: Option<String>,
}

/// What a worker sends back for one submitted job.
pub enum WorkerOutcome {
    Trained(WorkItem),
    Failed(FailMessage),
}
