//! Demonstration CLI: runs the generational controller against a toy sphere
//! function so the evolution engines can be exercised end-to-end without a
//! real trainer/evaluator. Mirrors `src-de/bin/plot_functions.rs`'s role as
//! a small driver binary sitting on top of a library crate.

use std::collections::HashMap;
use std::error::Error;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use indexmap::IndexMap;
use parking_lot::Mutex;
use rand::RngCore;

use pbt::{Controller, EndCriteria, RunMode, RunStatus, StepConfig};
use pbt_evolve::{
    DifferentialEvolution, Evolver, ExploitAndExplore, FModulation, RandomSearch, RandomWalk,
    Shade,
};
use pbt_types::{Hyperparameter, MemberState, Population};
use pbt_worker::{CheckpointStore, Evaluator, Trainer, WorkerError, WorkerPool};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Algorithm {
    RandomSearch,
    RandomWalk,
    Pbt,
    De,
    Shade,
    Lshade,
    DecayingLshade,
    GuidedLshade,
}

/// Runs a population-based search against a toy sphere function, to
/// exercise the generational controller and its evolution engines.
#[derive(Parser, Debug)]
#[command(author, about = "Population-based training demonstration CLI")]
struct Args {
    /// Which evolution engine to run.
    #[arg(long, value_enum, default_value_t = Algorithm::Shade)]
    algorithm: Algorithm,

    /// Number of members in the initial population.
    #[arg(long, default_value_t = 20)]
    population: usize,

    /// Number of hyperparameters (search dimensions).
    #[arg(long, default_value_t = 5)]
    dims: usize,

    /// Number of parallel training workers.
    #[arg(long, default_value_t = 0)]
    n_jobs: usize,

    /// Stop once every member has trained for this many steps.
    #[arg(long, default_value_t = 50)]
    max_steps: u64,

    /// Random seed driving the controller and its evolver.
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// History window of generations retained in the checkpoint store.
    #[arg(long, default_value_t = 3)]
    history_limit: usize,
}

/// A no-op trainer: the sphere function needs no weights, so training just
/// advances the step/epoch counters a real trainer would bump after a
/// gradient step.
struct SphereTrainer;

impl Trainer for SphereTrainer {
    fn train_step(
        &self,
        members: &mut [&mut MemberState],
        step_size: u64,
        _shuffle: bool,
        _rng: &mut dyn RngCore,
    ) -> Result<(), WorkerError> {
        for member in members {
            member.steps += step_size;
            member.epochs += 1;
        }
        Ok(())
    }
}

/// Scores each member by the negated sphere function over its normalized
/// hyperparameters, so "better" always means "closer to the origin" and the
/// search can be run as either a minimization or maximization demo.
struct SphereEvaluator {
    minimize: bool,
}

impl Evaluator for SphereEvaluator {
    fn eval_step(
        &self,
        members: &mut [&mut MemberState],
        _step_size: u64,
        _shuffle: bool,
        _rng: &mut dyn RngCore,
    ) -> Result<(), WorkerError> {
        for member in members {
            let sum_sq: f64 = member
                .parameters
                .values()
                .map(|hp| match hp.value() {
                    pbt_types::HpValue::Real(v) => v * v,
                    pbt_types::HpValue::Int(v) => (v as f64) * (v as f64),
                    pbt_types::HpValue::Str(_) => 0.0,
                })
                .sum();
            let score = if self.minimize { sum_sq } else { -sum_sq };
            let mut metrics = IndexMap::new();
            metrics.insert("sphere".to_string(), score);
            member.loss.insert("eval".to_string(), metrics);
        }
        Ok(())
    }
}

/// An in-memory checkpoint store keyed by `(member id, steps)`, standing in
/// for a durable store the way a real deployment would use a database or
/// filesystem, per the checkpoint-store collaborator contract.
#[derive(Default)]
struct MemoryCheckpointStore {
    snapshots: Mutex<HashMap<(u64, u64), MemberState>>,
}

impl CheckpointStore for MemoryCheckpointStore {
    fn update(&self, member_id: u64, steps: u64, member: MemberState) {
        self.snapshots.lock().insert((member_id, steps), member);
    }

    fn get(&self, member_id: u64, steps: Option<u64>) -> Option<MemberState> {
        let snapshots = self.snapshots.lock();
        match steps {
            Some(steps) => snapshots.get(&(member_id, steps)).map(MemberState::copy),
            None => snapshots
                .iter()
                .filter(|((id, _), _)| *id == member_id)
                .max_by_key(|((_, steps), _)| *steps)
                .map(|(_, m)| m.copy()),
        }
    }

    fn get_last(&self) -> Vec<MemberState> {
        let snapshots = self.snapshots.lock();
        let mut latest: HashMap<u64, &MemberState> = HashMap::new();
        for ((id, steps), member) in snapshots.iter() {
            latest
                .entry(*id)
                .and_modify(|current| {
                    if *steps > current.steps {
                        *current = member;
                    }
                })
                .or_insert(member);
        }
        latest.into_values().map(MemberState::copy).collect()
    }

    fn collect(&self, population: &Population, history_limit: usize) {
        let limit = history_limit.max(2);
        let generations = population.generations();
        if generations.len() <= limit {
            return;
        }
        let retained_floor: u64 = generations[generations.len() - limit]
            .iter()
            .map(|m| m.steps)
            .min()
            .unwrap_or(0);
        self.snapshots
            .lock()
            .retain(|(_, steps), _| *steps >= retained_floor);
    }
}

fn build_evolver(algorithm: Algorithm, max_steps: u64, population: usize) -> Box<dyn Evolver> {
    let max_nfe = max_steps * population as u64;
    match algorithm {
        Algorithm::RandomSearch => Box::new(RandomSearch),
        Algorithm::RandomWalk => Box::new(RandomWalk::new(0.2)),
        Algorithm::Pbt => {
            Box::new(ExploitAndExplore::new(0.2, vec![0.8, 1.2]).expect("valid PBT parameters"))
        }
        Algorithm::De => {
            Box::new(DifferentialEvolution::new(0.2, 0.8).expect("valid DE parameters"))
        }
        Algorithm::Shade => Box::new(
            Shade::new(population, 2.0, 0.1, 5, 0.0, 1.0, false).expect("valid SHADE parameters"),
        ),
        Algorithm::Lshade => Box::new(
            Shade::new(population, 2.0, 0.1, 5, 0.0, 1.0, false)
                .expect("valid SHADE parameters")
                .with_lshade(max_nfe, 4)
                .expect("valid L-SHADE parameters"),
        ),
        Algorithm::DecayingLshade => Box::new(
            Shade::new(population, 2.0, 0.1, 5, 0.0, 1.0, false)
                .expect("valid SHADE parameters")
                .with_lshade(max_nfe, 4)
                .expect("valid L-SHADE parameters")
                .with_modulation(FModulation::DecayingCurve)
                .expect("valid modulation parameters"),
        ),
        Algorithm::GuidedLshade => Box::new(
            Shade::new(population, 2.0, 0.1, 5, 0.0, 1.0, false)
                .expect("valid SHADE parameters")
                .with_lshade(max_nfe, 4)
                .expect("valid L-SHADE parameters")
                .with_modulation(FModulation::GuidedCurve { strength: 0.5 })
                .expect("valid modulation parameters"),
        ),
    }
}

fn seed_members(population: usize, dims: usize) -> Vec<MemberState> {
    (0..population as u64)
        .map(|id| {
            let mut parameters = IndexMap::new();
            for d in 0..dims {
                parameters.insert(
                    format!("x{d}"),
                    Hyperparameter::continuous_real(-5.0, 5.0).expect("valid bounds"),
                );
            }
            MemberState::new(id, parameters, "train", "sphere", true)
        })
        .collect()
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = Args::parse();

    let n_jobs = if args.n_jobs > 0 {
        args.n_jobs
    } else {
        num_cpus::get()
    };
    let devices: Vec<String> = vec!["cpu".to_string()];
    let pool = WorkerPool::new(
        Arc::new(SphereTrainer),
        Arc::new(SphereEvaluator { minimize: true }),
        None,
        devices,
        n_jobs.max(1),
    )?;

    let evolver = build_evolver(args.algorithm, args.max_steps, args.population);
    let checkpoint_store: Arc<dyn CheckpointStore> = Arc::new(MemoryCheckpointStore::default());
    let end_criteria = EndCriteria {
        steps: Some(args.max_steps),
        nfe: None,
        score: None,
    };
    let step = StepConfig {
        train_step_size: 1,
        eval_step_size: None,
        train_shuffle: false,
        eval_shuffle: false,
    };

    let mut controller = Controller::new(
        evolver,
        pool,
        checkpoint_store,
        end_criteria,
        args.history_limit,
        step,
        args.seed,
    )?;

    let running = controller.running_flag();
    ctrlc::set_handler(move || {
        log::info!("received interrupt signal, shutting down...");
        *running.lock() = false;
    })?;

    let outcome = controller.run(seed_members(args.population, args.dims), RunMode::Synchronous)?;

    let status = match outcome.status {
        RunStatus::EndCriteriaReached => "end criteria reached",
        RunStatus::Interrupted => "interrupted",
    };
    log::info!(
        "{status} after {} generations, nfe={}",
        outcome.population.len(),
        outcome.nfe
    );
    if let Some(best) = outcome.population.current().and_then(|g| g.best()) {
        log::info!("best member: {}", best.performance_details());
    }
    Ok(())
}
