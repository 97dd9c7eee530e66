//! SHADE, and its L-SHADE / decaying / guided L-SHADE extensions.
//!
//! Grounded in `original_source/pbt/evolution.py`'s `SHADE`, `LSHADE`,
//! `DecayingLSHADE` and `GuidedLSHADE`. Per the design note ("deep
//! inheritance... collapses cleanly to a single SHADE engine parameterized
//! by an optional resizer and an optional F-modulation function"), the four
//! classes become one `Shade` engine configured with an optional
//! [`LShadeConfig`] (population-size reduction) and an optional
//! [`FModulation`] (the decaying/guided progress functions).

use indexmap::IndexMap;
use rand::{Rng, RngCore};

use pbt_types::{Generation, MemberState};

use crate::archive::ExternalArchive;
use crate::constraints::halving;
use crate::distributions::{randc, randn};
use crate::error::EvolveError;
use crate::evolver::{Candidate, Evolver};
use crate::historical_memory::HistoricalMemory;
use crate::mutation::de_current_to_best_1;
use crate::sampling::{choose_one, sample_distinct, top_n};

/// Linear population size reduction parameters, turning `Shade` into
/// L-SHADE.
#[derive(Debug, Clone, Copy)]
pub struct LShadeConfig {
    pub max_nfe: u64,
    pub n_min: usize,
}

/// The six decaying/guided progress functions, applied to
/// `F_i` after SHADE's own control-parameter draw.
#[derive(Debug, Clone, Copy)]
pub enum FModulation {
    DecayingLinear,
    DecayingCurve,
    DecayingLogistic,
    GuidedLinear { strength: f64 },
    GuidedCurve { strength: f64 },
    GuidedLogistic { strength: f64 },
}

fn logistic(x: f64) -> f64 {
    1.0 / (1.0 + (-20.0 * (x - 0.5)).exp())
}

fn curve(x: f64) -> f64 {
    x.powi(5)
}

impl FModulation {
    fn apply(self, f: f64, t: f64) -> f64 {
        match self {
            FModulation::DecayingLinear => f * (1.0 - t),
            FModulation::DecayingCurve => f * (1.0 - curve(t)),
            FModulation::DecayingLogistic => f * (1.0 - logistic(t)),
            FModulation::GuidedLinear { strength } => f + ((1.0 - t) - f) * strength,
            FModulation::GuidedCurve { strength } => f + ((1.0 - curve(t)) - f) * strength,
            FModulation::GuidedLogistic { strength } => f + ((1.0 - logistic(t)) - f) * strength,
        }
    }
}

/// Success-History based Adaptive Differential Evolution, `DE/current-to-pbest/1/bin`
/// with an adaptive `CR`/`F` historical memory and an external archive.
pub struct Shade {
    n_init: usize,
    r_arc: f64,
    p: f64,
    f_min: f64,
    f_max: f64,
    state_sharing: bool,
    archive: ExternalArchive,
    memory: HistoricalMemory,
    cr_by_id: IndexMap<u64, f64>,
    f_by_id: IndexMap<u64, f64>,
    f_averages: Vec<f64>,
    cr_averages: Vec<f64>,
    lshade: Option<LShadeConfig>,
    modulation: Option<FModulation>,
    nfe: u64,
}

impl Shade {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        n_init: usize,
        r_arc: f64,
        p: f64,
        memory_size: usize,
        f_min: f64,
        f_max: f64,
        state_sharing: bool,
    ) -> Result<Self, EvolveError> {
        if n_init < 4 {
            return Err(EvolveError::PopulationTooSmallForShade(n_init));
        }
        if r_arc < 0.0 {
            return Err(EvolveError::InvalidArchiveRatio(r_arc));
        }
        if memory_size == 0 {
            return Err(EvolveError::InvalidMemorySize(memory_size));
        }
        if f_min < 0.0 || f_max <= 0.0 || f_max < f_min {
            return Err(EvolveError::InvertedFBounds { f_min, f_max });
        }
        if (n_init as f64 * p).round() < 1.0 {
            log::warn!(
                "p-parameter {p} too low for population size {n_init}; pbest will always be the single best performer"
            );
        }
        Ok(Self {
            n_init,
            r_arc,
            p,
            f_min,
            f_max,
            state_sharing,
            archive: ExternalArchive::new((n_init as f64 * r_arc).round() as usize),
            memory: HistoricalMemory::new(memory_size, 0.5),
            cr_by_id: IndexMap::new(),
            f_by_id: IndexMap::new(),
            f_averages: Vec::new(),
            cr_averages: Vec::new(),
            lshade: None,
            modulation: None,
            nfe: 0,
        })
    }

    /// Turns this engine into L-SHADE, adding linear population-size
    /// reduction against a fitness-evaluation budget.
    pub fn with_lshade(mut self, max_nfe: u64, n_min: usize) -> Result<Self, EvolveError> {
        if max_nfe == 0 {
            return Err(EvolveError::InvalidMaxNfe(max_nfe));
        }
        if n_min == 0 || n_min > self.n_init {
            return Err(EvolveError::InvalidMinPopulation {
                n_min,
                n_init: self.n_init,
            });
        }
        self.lshade = Some(LShadeConfig { max_nfe, n_min });
        Ok(self)
    }

    /// Adds a decaying or guided progress function on top of L-SHADE's `F`.
    /// Requires `with_lshade` to already be configured, since the progress
    /// ratio `t = NFE / MAX_NFE` needs a budget to normalize against.
    pub fn with_modulation(mut self, modulation: FModulation) -> Result<Self, EvolveError> {
        if let FModulation::GuidedLinear { strength }
        | FModulation::GuidedCurve { strength }
        | FModulation::GuidedLogistic { strength } = modulation
        {
            if !(0.0..=1.0).contains(&strength) {
                return Err(EvolveError::InvalidStrength(strength));
            }
        }
        self.modulation = Some(modulation);
        Ok(self)
    }

    pub fn archive_len(&self) -> usize {
        self.archive.len()
    }

    pub fn archive_capacity(&self) -> usize {
        self.archive.capacity()
    }

    pub fn nfe(&self) -> u64 {
        self.nfe
    }

    fn control_parameters(&self, rng: &mut dyn RngCore) -> (f64, f64) {
        let r = rng.random_range(0..self.memory.size());
        let mf_r = self.memory.f(r);
        let mcr_r = self.memory.cr(r);

        let cr = match mcr_r {
            None => 0.0,
            Some(m) => crate::constraints::clip(randn(rng, m, 0.1), 0.0, 1.0),
        };

        let mut f = loop {
            let candidate = randc(rng, mf_r, 0.1);
            if candidate < self.f_min {
                continue;
            }
            break candidate.min(self.f_max);
        };

        if let Some(modulation) = self.modulation {
            let max_nfe = self
                .lshade
                .expect("modulation requires with_lshade")
                .max_nfe as f64;
            let t = self.nfe as f64 / max_nfe;
            f = modulation.apply(f, t);
        }

        (cr, f)
    }

    fn pbest<'a>(&self, members: &[&'a MemberState], rng: &mut dyn RngCore) -> &'a MemberState {
        let n_elitists = ((members.len() as f64) * self.p).round().max(1.0) as usize;
        let elitists = top_n(members, n_elitists);
        choose_one(&elitists, rng)
    }
}

impl Evolver for Shade {
    fn on_generation_start(&mut self, _generation: &Generation) {
        self.memory.reset_buffers();
        self.cr_by_id.clear();
        self.f_by_id.clear();
    }

    fn mutate(
        &mut self,
        generation: &Generation,
        rng: &mut dyn RngCore,
    ) -> Result<Vec<Candidate>, EvolveError> {
        if generation.len() < 4 {
            return Err(EvolveError::GenerationTooSmallForShade(generation.len()));
        }
        let members: Vec<&MemberState> = generation.iter().collect();
        let archive_members: Vec<&MemberState> = self.archive.iter().collect();

        let mut candidates = Vec::with_capacity(members.len());
        for parent in &members {
            let dims = parent.dimensions();
            if dims == 0 {
                return Err(EvolveError::NoDimensions(parent.id));
            }
            let (cr, f) = self.control_parameters(rng);
            self.cr_by_id.insert(parent.id, cr);
            self.f_by_id.insert(parent.id, f);

            let x_r1 = sample_distinct(&members, &[parent.id], 1, rng)[0];
            let mut union: Vec<&MemberState> = members.clone();
            union.extend(archive_members.iter().copied());
            let x_r2 = sample_distinct(&union, &[parent.id, x_r1.id], 1, rng)[0];

            let x_pbest = self.pbest(&members, rng);

            let j_rand = rng.random_range(0..dims);
            let mut trial = parent.copy();
            if self.state_sharing {
                trial.copy_state(x_pbest);
            }
            for j in 0..dims {
                if rng.random_range(0.0..1.0) <= cr || j == j_rand {
                    let mutant = de_current_to_best_1(
                        f,
                        parent.coord(j),
                        x_pbest.coord(j),
                        x_r1.coord(j),
                        x_r2.coord(j),
                    );
                    trial.set_coord(j, halving(parent.coord(j), mutant, 0.0, 1.0));
                }
            }
            candidates.push(Candidate::Pair(parent.copy(), trial));
        }
        Ok(candidates)
    }

    fn select(&mut self, candidate: Candidate, rng: &mut dyn RngCore) -> MemberState {
        let (parent, trial) = match candidate {
            Candidate::Pair(parent, trial) => (parent, trial),
            Candidate::Single(m) => return m,
        };

        if self.lshade.is_some() {
            self.nfe += 1;
        }

        if parent <= trial {
            self.archive.push(parent.copy(), rng);
            let delta_score = (trial.score() - parent.score()).abs();
            let cr = self.cr_by_id.get(&parent.id).copied().unwrap_or(0.0);
            let f = self.f_by_id.get(&parent.id).copied().unwrap_or(0.0);
            self.memory.record(cr, f, delta_score);
            trial
        } else {
            parent
        }
    }

    fn on_generation_end(&mut self, generation: &mut Generation, rng: &mut dyn RngCore) {
        if let Some(lshade) = self.lshade {
            let n_new = (((lshade.n_min as f64 - self.n_init as f64) / lshade.max_nfe as f64)
                * self.nfe as f64
                + self.n_init as f64)
                .round() as usize;
            if n_new < generation.len() {
                self.archive
                    .set_capacity((n_new as f64 * self.r_arc).round() as usize, rng);
                let size_delta = generation.len() - n_new;
                let worst_ids: Vec<u64> = {
                    let mut members: Vec<&MemberState> = generation.iter().collect();
                    members.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
                    members.into_iter().take(size_delta).map(|m| m.id).collect()
                };
                for id in worst_ids {
                    generation.remove(id);
                }
            }
        }

        self.memory.update();
        if !self.f_by_id.is_empty() {
            let f_avg = self.f_by_id.values().sum::<f64>() / self.f_by_id.len() as f64;
            let cr_avg = self.cr_by_id.values().sum::<f64>() / self.cr_by_id.len() as f64;
            self.f_averages.push(f_avg);
            self.cr_averages.push(cr_avg);
        }
    }
}
