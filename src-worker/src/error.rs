//! Error types for the worker pool.
//!
//! Grounded in `autoeq-env`'s `EnvError` / `sotf_hal`'s `AudioDriverError`:
//! one `thiserror` enum per crate, one variant per failure mode.

use thiserror::Error;

/// Errors raised while constructing or running the worker pool.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("n_jobs ({n_jobs}) must be >= the number of devices ({devices})")]
    TooFewJobsForDevices { n_jobs: usize, devices: usize },

    #[error("at least one device is required")]
    NoDevices,

    #[error("worker pool was not started")]
    NotStarted,

    #[error("all {0} workers have failed; the pool cannot continue")]
    AllWorkersFailed(usize),

    #[error("trainer failed on member {member_id}: {reason}")]
    TrainingFailed { member_id: u64, reason: String },

    #[error("evaluator failed on member {member_id}: {reason}")]
    EvaluationFailed { member_id: u64, reason: String },
}
