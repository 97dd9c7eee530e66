//! Error types for the controller.
//!
//! Grounded in `autoeq-env`'s `EnvError` / `sotf_hal`'s `AudioDriverError`:
//! one `thiserror` enum per crate, composing library errors via `#[from]`
//! the way a top binary crate wraps the crates it wires together.

use thiserror::Error;

use pbt_evolve::EvolveError;
use pbt_types::TypesError;
use pbt_worker::WorkerError;

/// Errors raised while configuring or running the controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("no end criterion is configured; at least one of steps/nfe/score is required")]
    NoEndCriterion,

    #[error("seed population is empty")]
    EmptyPopulation,

    #[error(transparent)]
    Types(#[from] TypesError),

    #[error(transparent)]
    Evolve(#[from] EvolveError),

    #[error(transparent)]
    Worker(#[from] WorkerError),
}
