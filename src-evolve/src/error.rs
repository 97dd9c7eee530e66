//! Error types for evolution engines.
//!
//! Grounded in `autoeq-env`'s `EnvError` / `sotf_hal`'s `AudioDriverError`:
//! one `thiserror` enum per crate, one variant per failure mode.

use thiserror::Error;

/// Errors raised while constructing or running an evolution engine.
#[derive(Debug, Error)]
pub enum EvolveError {
    #[error("exploit_factor must lie in [0, 1], got {0}")]
    InvalidExploitFactor(f64),

    #[error("explore_factors must be non-empty")]
    EmptyExploreFactors,

    #[error("explore factor must be non-negative, got {0}")]
    InvalidExploreFactor(f64),

    #[error("DifferentialEvolution requires Cr in [0, 1], got {0}")]
    InvalidCrossoverRate(f64),

    #[error("SHADE requires N_INIT >= 4, got {0}")]
    PopulationTooSmallForShade(usize),

    #[error("SHADE requires f_min <= f_max, got f_min={f_min}, f_max={f_max}")]
    InvertedFBounds { f_min: f64, f_max: f64 },

    #[error("SHADE requires a memory size H >= 1, got {0}")]
    InvalidMemorySize(usize),

    #[error("SHADE requires an archive ratio >= 0, got {0}")]
    InvalidArchiveRatio(f64),

    #[error("L-SHADE requires MAX_NFE >= 1, got {0}")]
    InvalidMaxNfe(u64),

    #[error("L-SHADE requires N_MIN >= 1 and N_MIN <= N_INIT, got N_MIN={n_min}, N_INIT={n_init}")]
    InvalidMinPopulation { n_min: usize, n_init: usize },

    #[error("guided/decaying strength must lie in [0, 1], got {0}")]
    InvalidStrength(f64),

    #[error("DifferentialEvolution requires a generation of at least 3 members, got {0}")]
    GenerationTooSmallForDe(usize),

    #[error("SHADE requires a generation of at least 4 members, got {0}")]
    GenerationTooSmallForShade(usize),

    #[error("candidate generation is empty")]
    EmptyGeneration,

    #[error("member {0} has no hyperparameters to mutate over")]
    NoDimensions(u64),
}
