//! `RandomSearch`: no mutation, every member trains as-is.
//!
//! Grounded in `original_source/pbt/evolution.py`'s `RandomSearch`. Per the
//! spec's open question, `mutate` does not re-sample parameters — only
//! `spawn` does; this ambiguity is preserved rather than guessed at.

use rand::RngCore;

use pbt_types::{Generation, MemberState};

use crate::error::EvolveError;
use crate::evolver::{Candidate, Evolver};

/// Trains every member of the generation unchanged, relying on `spawn`'s
/// initial uniform sampling for diversity.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomSearch;

impl Evolver for RandomSearch {
    fn mutate(
        &mut self,
        generation: &Generation,
        _rng: &mut dyn RngCore,
    ) -> Result<Vec<Candidate>, EvolveError> {
        Ok(generation
            .iter()
            .map(|m| Candidate::Single(m.copy()))
            .collect())
    }

    fn select(&mut self, candidate: Candidate, _rng: &mut dyn RngCore) -> MemberState {
        match candidate {
            Candidate::Single(m) => m,
            Candidate::Pair(_, trial) => trial,
        }
    }
}
