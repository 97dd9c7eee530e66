//! The generational control loop binding evolver, worker pool and checkpoint
//! store together.
//!
//! Grounded in `original_source/pbt/controller.py`'s `Controller.run` /
//! `__train_synchronously` / `__train_synchronously_old`: build candidates
//! from the evolver, submit them to the training service, select survivors,
//! persist, log, garbage-collect, repeat until an end criterion fires or the
//! run is interrupted.

use std::sync::Arc;

use parking_lot::Mutex;
use rand::SeedableRng;
use rand::rngs::StdRng;

use pbt_evolve::Evolver;
use pbt_types::{MemberState, Population};
use pbt_worker::{CheckpointStore, TrainJob, WorkItem, WorkerPool};

use crate::convert::{candidate_to_work_item, work_item_to_candidate};
use crate::end_criteria::EndCriteria;
use crate::error::ControllerError;
use crate::garbage_collector::GarbageCollector;

/// How a generation's trials are trained before selection.
///
/// Grounded in the controller's "alternative fast-evaluate mode" and
/// `controller.py`'s `__train_synchronously_old`: `FastEvaluate` spends a
/// short `eval_steps` probe on every trial, selects survivors from that
/// signal, then finishes training only the survivors for the remaining
/// budget — cheaper when most trials will be discarded anyway.
#[derive(Debug, Clone, Copy)]
pub enum RunMode {
    Synchronous,
    FastEvaluate { eval_steps: u64 },
}

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    EndCriteriaReached,
    Interrupted,
}

/// The population history and bookkeeping produced by one call to
/// [`Controller::run`].
pub struct RunOutcome {
    pub population: Population,
    pub nfe: u64,
    pub status: RunStatus,
}

/// Per-step configuration passed to the trainer/evaluator on every
/// generation, mirroring the worker job descriptor.
#[derive(Debug, Clone, Copy)]
pub struct StepConfig {
    pub train_step_size: u64,
    pub eval_step_size: Option<u64>,
    pub train_shuffle: bool,
    pub eval_shuffle: bool,
}

/// Orchestrates generations end-to-end: spawn, mutate, train, select,
/// persist, garbage-collect, until an end criterion fires.
pub struct Controller {
    evolver: Box<dyn Evolver>,
    pool: WorkerPool,
    checkpoint_store: Arc<dyn CheckpointStore>,
    end_criteria: EndCriteria,
    gc: GarbageCollector,
    step: StepConfig,
    rng: StdRng,
    running: Arc<Mutex<bool>>,
    nfe: u64,
}

impl Controller {
    pub fn new(
        evolver: Box<dyn Evolver>,
        pool: WorkerPool,
        checkpoint_store: Arc<dyn CheckpointStore>,
        end_criteria: EndCriteria,
        history_limit: usize,
        step: StepConfig,
        seed: u64,
    ) -> Result<Self, ControllerError> {
        if !end_criteria.is_configured() {
            return Err(ControllerError::NoEndCriterion);
        }
        Ok(Self {
            evolver,
            pool,
            checkpoint_store,
            end_criteria,
            gc: GarbageCollector::new(history_limit),
            step,
            rng: StdRng::seed_from_u64(seed),
            running: Arc::new(Mutex::new(true)),
            nfe: 0,
        })
    }

    /// A shared flag the caller can wire to `ctrlc` (or any other signal
    /// source) to cooperatively interrupt the run, mirroring
    /// `sotf_daemon.rs`'s `Arc<parking_lot::Mutex<bool>>` shutdown flag.
    pub fn running_flag(&self) -> Arc<Mutex<bool>> {
        Arc::clone(&self.running)
    }

    pub fn nfe(&self) -> u64 {
        self.nfe
    }

    /// Initializes a fresh generation from `seed_members` and runs the
    /// generational loop until an end criterion fires or the run is
    /// interrupted.
    pub fn run(
        &mut self,
        seed_members: Vec<MemberState>,
        mode: RunMode,
    ) -> Result<RunOutcome, ControllerError> {
        if seed_members.is_empty() {
            return Err(ControllerError::EmptyPopulation);
        }

        self.pool.start();
        let mut population = Population::new();
        let mut current = self.evolver.spawn(seed_members, &mut self.rng);

        let status = loop {
            if !*self.running.lock() {
                break RunStatus::Interrupted;
            }

            log::debug!("on_generation_start: {} members", current.len());
            self.evolver.on_generation_start(&current);

            let candidates = self.evolver.mutate(&current, &mut self.rng)?;
            log::debug!("mutate produced {} candidates", candidates.len());

            let mut new_generation = match mode {
                RunMode::Synchronous => self.run_generation_synchronous(candidates)?,
                RunMode::FastEvaluate { eval_steps } => {
                    self.run_generation_fast_evaluate(candidates, eval_steps)?
                }
            };

            self.evolver
                .on_generation_end(&mut new_generation, &mut self.rng);

            let met = self.end_criteria.is_met(&new_generation, self.nfe);
            population.push(new_generation.clone());
            population.truncate_history(self.gc.history_limit());
            self.gc.collect(self.checkpoint_store.as_ref(), &population);

            current = new_generation;
            if met {
                break RunStatus::EndCriteriaReached;
            }
        };

        self.pool.stop();
        Ok(RunOutcome {
            population,
            nfe: self.nfe,
            status,
        })
    }

    /// Trains every candidate for the full `train_step_size` then selects,
    /// matching `__train_synchronously`.
    fn run_generation_synchronous(
        &mut self,
        candidates: Vec<pbt_evolve::Candidate>,
    ) -> Result<pbt_types::Generation, ControllerError> {
        let jobs: Vec<TrainJob> = candidates
            .into_iter()
            .map(|c| self.candidate_job(c, self.step.train_step_size))
            .collect();
        let results = self.pool.train(jobs)?;
        Ok(self.select_results(results))
    }

    /// Trains every candidate for a short `eval_steps` probe, selects
    /// survivors from that signal, then finishes training only the
    /// survivors for the remaining budget before persisting, matching
    /// `__train_synchronously_old`.
    fn run_generation_fast_evaluate(
        &mut self,
        candidates: Vec<pbt_evolve::Candidate>,
        eval_steps: u64,
    ) -> Result<pbt_types::Generation, ControllerError> {
        let probe_step = eval_steps.min(self.step.train_step_size);
        let jobs: Vec<TrainJob> = candidates
            .into_iter()
            .map(|c| self.candidate_job(c, probe_step))
            .collect();
        let probed = self.pool.train(jobs)?;

        let remaining = self.step.train_step_size.saturating_sub(probe_step);
        if remaining == 0 {
            return Ok(self.select_results(probed));
        }

        let mut survivors: Vec<MemberState> = Vec::new();
        for result in probed {
            match result {
                Ok(work) => {
                    let candidate = work_item_to_candidate(work);
                    let survivor = self.evolver.select(candidate, &mut self.rng);
                    self.nfe += 1;
                    survivors.push(survivor);
                }
                Err(fail) => {
                    log::warn!(
                        "worker {} failed during fast-evaluate probe: {}",
                        fail.sender_id,
                        fail.text
                    );
                    self.nfe += 1;
                }
            }
        }

        let finishing_jobs: Vec<TrainJob> = survivors
            .into_iter()
            .map(|m| TrainJob {
                work: WorkItem::Single(m),
                train_step_size: remaining,
                eval_step_size: self.step.eval_step_size,
                train_shuffle: self.step.train_shuffle,
                eval_shuffle: self.step.eval_shuffle,
            })
            .collect();
        let finished = self.pool.train(finishing_jobs)?;

        let mut generation = pbt_types::Generation::new();
        for result in finished {
            match result {
                Ok(work) => {
                    for member in work.into_members() {
                        self.persist_and_log(&member);
                        let _ = generation.push(member);
                    }
                }
                Err(fail) => {
                    log::warn!(
                        "worker {} failed finishing fast-evaluate survivor: {}",
                        fail.sender_id,
                        fail.text
                    );
                }
            }
        }
        Ok(generation)
    }

    fn candidate_job(&self, candidate: pbt_evolve::Candidate, train_step_size: u64) -> TrainJob {
        TrainJob {
            work: candidate_to_work_item(candidate),
            train_step_size,
            eval_step_size: self.step.eval_step_size,
            train_shuffle: self.step.train_shuffle,
            eval_shuffle: self.step.eval_shuffle,
        }
    }

    /// Converts trained work items back into candidates, selects a survivor
    /// per result in arrival order, persists it, and appends it to the new
    /// generation. A `FailMessage` is logged and counted toward NFE but
    /// skipped for persistence, per the "missing state" handling rule.
    fn select_results(
        &mut self,
        results: Vec<Result<WorkItem, pbt_worker::FailMessage>>,
    ) -> pbt_types::Generation {
        let mut generation = pbt_types::Generation::new();
        for result in results {
            match result {
                Ok(work) => {
                    let candidate = work_item_to_candidate(work);
                    let survivor = self.evolver.select(candidate, &mut self.rng);
                    self.nfe += 1;
                    self.persist_and_log(&survivor);
                    let _ = generation.push(survivor);
                }
                Err(fail) => {
                    log::warn!(
                        "worker {} reported a training failure: {}",
                        fail.sender_id,
                        fail.text
                    );
                    self.nfe += 1;
                }
            }
        }
        generation
    }

    fn persist_and_log(&self, survivor: &MemberState) {
        log::info!("{}", survivor.performance_details());
        self.checkpoint_store
            .update(survivor.id, survivor.steps, survivor.copy());
    }
}
