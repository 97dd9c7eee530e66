//! The `Evolver` contract every evolution engine implements.
//!
//! Grounded in `original_source/pbt/evolution.py`'s `EvolveEngine` abstract
//! base: `spawn` / `on_generation_start` / `mutate` / `select` /
//! `on_generation_end`. Generic `Rng` parameters are replaced with
//! `&mut dyn RngCore` so the trait stays object-safe, the same way the
//! teacher's `Box<dyn Fn(..) -> .. + Send>` callbacks (`src-de`'s
//! `DEConfig.callback`) keep dynamic dispatch usable behind a trait object.

use rand::RngCore;

use pbt_types::{Generation, MemberState};

use crate::error::EvolveError;

/// One unit of work produced by `Evolver::mutate`: either a single candidate
/// (random search, random walk, PBT) or a `(parent, trial)` pair that must
/// both be trained before `select` compares them (DE family).
#[derive(Clone)]
pub enum Candidate {
    Single(MemberState),
    Pair(MemberState, MemberState),
}

impl Candidate {
    /// Every member carried by this candidate, trained independently by the
    /// worker pool before being handed back to `select`.
    pub fn members(&self) -> Vec<&MemberState> {
        match self {
            Candidate::Single(m) => vec![m],
            Candidate::Pair(a, b) => vec![a, b],
        }
    }

    pub fn into_members(self) -> Vec<MemberState> {
        match self {
            Candidate::Single(m) => vec![m],
            Candidate::Pair(a, b) => vec![a, b],
        }
    }

    /// Rebuilds a candidate of the same shape from trained members, in the
    /// order `into_members` produced them.
    pub fn from_trained(shape: &Candidate, mut trained: Vec<MemberState>) -> Self {
        match shape {
            Candidate::Single(_) => Candidate::Single(trained.remove(0)),
            Candidate::Pair(_, _) => {
                let b = trained.remove(1);
                let a = trained.remove(0);
                Candidate::Pair(a, b)
            }
        }
    }
}

/// A pluggable population-based search strategy. The controller owns the
/// evolver; the evolver receives the generation it operates on as a
/// parameter rather than holding a reference back to the controller.
pub trait Evolver: Send {
    /// Initializes a fresh generation from seed members by sampling every
    /// hyperparameter uniformly.
    fn spawn(&mut self, members: Vec<MemberState>, rng: &mut dyn RngCore) -> Generation {
        let mut generation = Generation::new();
        for mut member in members {
            for hp in member.parameters.values_mut() {
                hp.sample_uniform(rng);
            }
            let _ = generation.push(member);
        }
        generation
    }

    /// Optional hook run before mutation for a generation. SHADE resets its
    /// per-generation sample buffers here.
    fn on_generation_start(&mut self, _generation: &Generation) {}

    /// Produces one candidate (or candidate pair) per member of `generation`.
    fn mutate(
        &mut self,
        generation: &Generation,
        rng: &mut dyn RngCore,
    ) -> Result<Vec<Candidate>, EvolveError>;

    /// Decides the survivor for one trained candidate.
    fn select(&mut self, candidate: Candidate, rng: &mut dyn RngCore) -> MemberState;

    /// Optional hook run after a generation's survivors are known. SHADE
    /// updates its historical memory here; L-SHADE also resizes.
    fn on_generation_end(&mut self, _generation: &mut Generation, _rng: &mut dyn RngCore) {}
}
