//! Classic Population-Based Training: exploit an elitist, then explore.
//!
//! Grounded in `original_source/pbt/evolution.py`'s `ExploitAndExplore`.

use rand::RngCore;
use rand::seq::IndexedRandom;

use pbt_types::{Generation, MemberState};

use crate::error::EvolveError;
use crate::evolver::{Candidate, Evolver};

/// Bottom performers copy an elitist's parameters and opaque state, then
/// perturb every coordinate by a factor drawn from `explore_factors`.
/// Elitists advance unchanged.
#[derive(Debug, Clone)]
pub struct ExploitAndExplore {
    exploit_factor: f64,
    explore_factors: Vec<f64>,
}

impl ExploitAndExplore {
    pub fn new(exploit_factor: f64, explore_factors: Vec<f64>) -> Result<Self, EvolveError> {
        if !(0.0..=1.0).contains(&exploit_factor) {
            return Err(EvolveError::InvalidExploitFactor(exploit_factor));
        }
        if explore_factors.is_empty() {
            return Err(EvolveError::EmptyExploreFactors);
        }
        if let Some(&bad) = explore_factors.iter().find(|&&f| f < 0.0) {
            return Err(EvolveError::InvalidExploreFactor(bad));
        }
        Ok(Self {
            exploit_factor,
            explore_factors,
        })
    }
}

impl Default for ExploitAndExplore {
    fn default() -> Self {
        Self::new(0.2, vec![0.8, 1.2]).expect("default parameters are valid")
    }
}

impl Evolver for ExploitAndExplore {
    fn mutate(
        &mut self,
        generation: &Generation,
        rng: &mut dyn RngCore,
    ) -> Result<Vec<Candidate>, EvolveError> {
        let members: Vec<&MemberState> = generation.iter().collect();
        let n_elitists = ((members.len() as f64) * self.exploit_factor).round().max(1.0) as usize;
        let elitists = crate::sampling::top_n(&members, n_elitists);
        let elitist_ids: Vec<u64> = elitists.iter().map(|m| m.id).collect();

        let mut candidates = Vec::with_capacity(members.len());
        for member in &members {
            if elitist_ids.contains(&member.id) {
                candidates.push(Candidate::Single(member.copy()));
                continue;
            }
            let elitist = elitists.choose(rng).expect("exploit_factor yields >= 1 elitist");
            let mut exploiter = member.copy();
            exploiter.copy_parameters(elitist);
            exploiter.copy_state(elitist);
            for j in 0..exploiter.dimensions() {
                let factor = *self
                    .explore_factors
                    .choose(rng)
                    .expect("explore_factors is non-empty");
                let (_, hp) = exploiter.parameters.get_index(j).expect("index in range");
                let u = hp.mul(factor);
                exploiter.set_coord(j, u);
            }
            candidates.push(Candidate::Single(exploiter));
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
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn scored_member(id: u64, score: f64) -> MemberState {
        let mut m = MemberState::new(id, IndexMap::new(), "train", "eval", false);
        let mut metrics = IndexMap::new();
        metrics.insert("eval".to_string(), score);
        m.loss.insert("eval".to_string(), metrics);
        m
    }

    #[test]
    fn elitists_are_the_top_scoring_members() {
        let mut gen = Generation::new();
        for (id, score) in [(1, 0.1), (2, 0.2), (3, 0.3), (4, 0.4), (5, 0.5)] {
            gen.push(scored_member(id, score)).unwrap();
        }
        let mut engine = ExploitAndExplore::new(0.4, vec![0.8, 1.2]).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let candidates = engine.mutate(&gen, &mut rng).unwrap();
        assert_eq!(candidates.len(), 5);

        // members 4 and 5 (scores 0.4, 0.5) are elitists and pass through
        // with the same id and an unperturbed parameter set (none here).
        let ids_passing_through: Vec<u64> = candidates
            .iter()
            .filter_map(|c| match c {
                Candidate::Single(m) if m.id == 4 || m.id == 5 => Some(m.id),
                _ => None,
            })
            .collect();
        assert_eq!(ids_passing_through.len(), 2);
    }

    #[test]
    fn rejects_out_of_range_exploit_factor() {
        assert!(ExploitAndExplore::new(1.5, vec![0.8, 1.2]).is_err());
    }

    #[test]
    fn rejects_empty_explore_factors() {
        assert!(ExploitAndExplore::new(0.2, vec![]).is_err());
    }
}
