//! Pluggable evolution strategies for population-based training: the
//! `Evolver` contract plus random search, random walk, classic PBT
//! exploit-and-explore, differential evolution and the SHADE/L-SHADE family.

mod archive;
mod constraints;
mod distributions;
mod engines;
mod error;
mod evolver;
mod historical_memory;
mod mutation;
mod sampling;

pub use archive::ExternalArchive;
pub use constraints::{clip, halving};
pub use distributions::{randc, randn};
pub use engines::{
    DifferentialEvolution, ExploitAndExplore, FModulation, LShadeConfig, RandomSearch, RandomWalk,
    Shade,
};
pub use error::EvolveError;
pub use evolver::{Candidate, Evolver};
pub use historical_memory::HistoricalMemory;
pub use mutation::{de_current_to_best_1, de_rand_1};
pub use sampling::{choose_one, sample_distinct, top_n};
