//! Classic `DE/rand/1/bin` differential evolution.
//!
//! Grounded in `original_source/pbt/evolution.py`'s `DifferentialEvolution`.

use rand::{Rng, RngCore};

use pbt_types::{Generation, MemberState};

use crate::constraints::clip;
use crate::error::EvolveError;
use crate::evolver::{Candidate, Evolver};
use crate::mutation::de_rand_1;
use crate::sampling::sample_distinct;

/// `DE/rand/1/bin`: mutates every member against three other distinct
/// members of the same generation, then binomially crosses the mutant back
/// with the parent.
#[derive(Debug, Clone, Copy)]
pub struct DifferentialEvolution {
    pub f: f64,
    pub cr: f64,
}

impl DifferentialEvolution {
    pub fn new(f: f64, cr: f64) -> Result<Self, EvolveError> {
        if !(0.0..=1.0).contains(&cr) {
            return Err(EvolveError::InvalidCrossoverRate(cr));
        }
        Ok(Self { f, cr })
    }
}

impl Default for DifferentialEvolution {
    fn default() -> Self {
        Self::new(0.2, 0.8).expect("default parameters are valid")
    }
}

impl Evolver for DifferentialEvolution {
    fn mutate(
        &mut self,
        generation: &Generation,
        rng: &mut dyn RngCore,
    ) -> Result<Vec<Candidate>, EvolveError> {
        if generation.len() < 3 {
            return Err(EvolveError::GenerationTooSmallForDe(generation.len()));
        }
        let members: Vec<&MemberState> = generation.iter().collect();
        let mut candidates = Vec::with_capacity(members.len());

        for parent in &members {
            let dims = parent.dimensions();
            if dims == 0 {
                return Err(EvolveError::NoDimensions(parent.id));
            }
            let picked = sample_distinct(&members, &[parent.id], 3, rng);
            let (x_r0, x_r1, x_r2) = (picked[0], picked[1], picked[2]);

            let j_rand = rng.random_range(0..dims);
            let mut trial = parent.copy();
            for j in 0..dims {
                if rng.random_range(0.0..1.0) <= self.cr || j == j_rand {
                    let mutant = de_rand_1(self.f, x_r0.coord(j), x_r1.coord(j), x_r2.coord(j));
                    trial.set_coord(j, clip(mutant, 0.0, 1.0));
                }
            }
            candidates.push(Candidate::Pair(parent.copy(), trial));
        }
        Ok(candidates)
    }

    fn select(&mut self, candidate: Candidate, _rng: &mut dyn RngCore) -> MemberState {
        match candidate {
            Candidate::Pair(parent, trial) => {
                if parent <= trial {
                    trial
                } else {
                    parent
                }
            }
            Candidate::Single(m) => m,
        }
    }
}
