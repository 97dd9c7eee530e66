//! `RandomWalk`: perturbs every coordinate by a uniform random factor.
//!
//! Grounded in `original_source/pbt/evolution.py`'s `RandomWalk`.

use rand::{Rng, RngCore};

use pbt_types::{Generation, MemberState};

use crate::error::EvolveError;
use crate::evolver::{Candidate, Evolver};

/// Explores the search space by multiplying every coordinate by a factor
/// drawn uniformly from `[-explore_factor, +explore_factor]`.
#[derive(Debug, Clone, Copy)]
pub struct RandomWalk {
    pub explore_factor: f64,
}

impl RandomWalk {
    pub fn new(explore_factor: f64) -> Self {
        Self { explore_factor }
    }
}

impl Default for RandomWalk {
    fn default() -> Self {
        Self::new(0.2)
    }
}

impl Evolver for RandomWalk {
    fn mutate(
        &mut self,
        generation: &Generation,
        rng: &mut dyn RngCore,
    ) -> Result<Vec<Candidate>, EvolveError> {
        let mut candidates = Vec::with_capacity(generation.len());
        for member in generation.iter() {
            let mut explorer = member.copy();
            for j in 0..explorer.dimensions() {
                let factor = rng.random_range(-self.explore_factor..self.explore_factor);
                let (_, hp) = explorer.parameters.get_index(j).expect("index in range");
                let u = hp.mul(factor);
                explorer.set_coord(j, u);
            }
            candidates.push(Candidate::Single(explorer));
        }
        Ok(candidates)
    }

    fn select(&mut self, candidate: Candidate, _rng: &mut dyn RngCore) -> MemberState {
        match candidate {
            Candidate::Single(m) => m,
            Candidate::Pair(_, trial) => trial,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use pbt_types::Hyperparameter;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn mutate_keeps_coordinates_normalized() {
        let mut params = IndexMap::new();
        let mut hp = Hyperparameter::continuous_real(0.0, 1.0).unwrap();
        hp.set_normalized(0.5);
        params.insert("lr".to_string(), hp);

        let mut gen = Generation::new();
        gen.push(MemberState::new(1, params, "train", "eval", false))
            .unwrap();

        let mut rng = StdRng::seed_from_u64(3);
        let mut engine = RandomWalk::new(0.5);
        let candidates = engine.mutate(&gen, &mut rng).unwrap();
        assert_eq!(candidates.len(), 1);
        for candidate in candidates {
            for m in candidate.members() {
                for hp in m.parameters.values() {
                    assert!((0.0..=1.0).contains(&hp.normalized()));
                }
            }
        }
    }
}
