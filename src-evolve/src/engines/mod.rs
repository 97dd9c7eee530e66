//! Concrete evolution engines implementing the `Evolver` contract.

mod differential_evolution;
mod exploit_and_explore;
mod random_search;
mod random_walk;
mod shade;

pub use differential_evolution::DifferentialEvolution;
pub use exploit_and_explore::ExploitAndExplore;
pub use random_search::RandomSearch;
pub use random_walk::RandomWalk;
pub use shade::{FModulation, LShadeConfig, Shade};
