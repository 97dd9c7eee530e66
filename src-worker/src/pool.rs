//! The worker pool: one bounded job queue per device, `n_jobs` long-lived
//! worker threads round-robin assigned across those queues, and one shared
//! unbounded result queue.
//!
//! Follows `src-audio/src/engine/decoder_thread.rs`'s thread-engine style: a
//! handle struct holding the command channel and an `Option<JoinHandle<_>>`,
//! a `Drop` impl that joins, and a named `std::thread::Builder` thread per
//! worker — generalized here from one fixed decoder thread to `n_jobs`
//! interchangeable training workers.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender, bounded, unbounded};
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::error::WorkerError;
use crate::job::{FailMessage, TrainJob, WorkItem, WorkerOutcome};
use crate::traits::{Evaluator, Tester, Trainer};

/// A job-queue message: real work, or a termination sentinel for exactly
/// one worker.
enum PoolMessage {
    Job(TrainJob),
    Shutdown,
}

/// Per-device queue capacity. Bounded so `pool.train(...)` naturally
/// backpressures the submitter against slow devices.
const QUEUE_CAPACITY: usize = 8;

struct WorkerSlot {
    id: usize,
    device_index: usize,
    thread: Option<JoinHandle<()>>,
}

/// Dispatches training jobs to a fixed-size pool of long-lived workers, one
/// bounded queue per device, round-robin assigned.
pub struct WorkerPool {
    trainer: Arc<dyn Trainer>,
    evaluator: Arc<dyn Evaluator>,
    tester: Option<Arc<dyn Tester>>,
    devices: Vec<String>,
    n_jobs: usize,
    respawn_on_failure: bool,

    device_senders: Vec<Sender<PoolMessage>>,
    device_receivers: Vec<Receiver<PoolMessage>>,
    result_tx: Sender<WorkerOutcome>,
    result_rx: Receiver<WorkerOutcome>,
    workers: Vec<WorkerSlot>,
    started: bool,
}

impl WorkerPool {
    pub fn new(
        trainer: Arc<dyn Trainer>,
        evaluator: Arc<dyn Evaluator>,
        tester: Option<Arc<dyn Tester>>,
        devices: Vec<String>,
        n_jobs: usize,
    ) -> Result<Self, WorkerError> {
        if devices.is_empty() {
            return Err(WorkerError::NoDevices);
        }
        if n_jobs < devices.len() {
            return Err(WorkerError::TooFewJobsForDevices {
                n_jobs,
                devices: devices.len(),
            });
        }

        let mut device_senders = Vec::with_capacity(devices.len());
        let mut device_receivers = Vec::with_capacity(devices.len());
        for _ in &devices {
            let (tx, rx) = bounded(QUEUE_CAPACITY);
            device_senders.push(tx);
            device_receivers.push(rx);
        }
        let (result_tx, result_rx) = unbounded();

        Ok(Self {
            trainer,
            evaluator,
            tester,
            devices,
            n_jobs,
            respawn_on_failure: true,
            device_senders,
            device_receivers,
            result_tx,
            result_rx,
            workers: Vec::new(),
            started: false,
        })
    }

    pub fn with_respawn(mut self, respawn_on_failure: bool) -> Self {
        self.respawn_on_failure = respawn_on_failure;
        self
    }

    pub fn tester(&self) -> Option<&Arc<dyn Tester>> {
        self.tester.as_ref()
    }

    pub fn devices(&self) -> &[String] {
        &self.devices
    }

    /// Spawns `n_jobs` worker threads, round-robin assigned across device
    /// queues. Idempotent: a second call is a no-op.
    pub fn start(&mut self) {
        if self.started {
            return;
        }
        for id in 0..self.n_jobs {
            let device_index = id % self.devices.len();
            self.spawn_worker(id, device_index);
        }
        self.started = true;
    }

    fn spawn_worker(&mut self, id: usize, device_index: usize) {
        let job_rx = self.device_receivers[device_index].clone();
        let result_tx = self.result_tx.clone();
        let trainer = Arc::clone(&self.trainer);
        let evaluator = Arc::clone(&self.evaluator);
        let seed = rand::random::<u64>();
        let device = self.devices[device_index].clone();

        let thread = std::thread::Builder::new()
            .name(format!("pbt-worker-{id}"))
            .spawn(move || run_worker(id, device, job_rx, result_tx, trainer, evaluator, seed))
            .expect("failed to spawn worker thread");

        self.workers.push(WorkerSlot {
            id,
            device_index,
            thread: Some(thread),
        });
    }

    /// Replaces any worker whose thread has exited (panicked mid-job) with a
    /// fresh one listening on the same device queue, with a new seed.
    fn respawn_dead_workers(&mut self) {
        if !self.respawn_on_failure {
            return;
        }
        let mut dead: Vec<(usize, usize, usize)> = self
            .workers
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.thread.as_ref().is_some_and(|t| t.is_finished()))
            .map(|(idx, slot)| (idx, slot.id, slot.device_index))
            .collect();
        // Remove highest indices first so earlier indices stay valid.
        dead.sort_by(|a, b| b.0.cmp(&a.0));
        for (idx, id, device_index) in dead {
            if let Some(handle) = self.workers[idx].thread.take() {
                let _ = handle.join();
            }
            log::warn!("respawning worker {id} on device {device_index}");
            self.workers.remove(idx);
            self.spawn_worker(id, device_index);
        }
    }

    fn alive_count(&self) -> usize {
        self.workers
            .iter()
            .filter(|w| w.thread.as_ref().is_some_and(|t| !t.is_finished()))
            .count()
    }

    /// Submits `jobs`, round-robin across device queues, and collects
    /// results in arrival order (not submission order). Returns one entry
    /// per submitted job unless every worker has failed.
    pub fn train(
        &mut self,
        jobs: Vec<TrainJob>,
    ) -> Result<Vec<Result<WorkItem, FailMessage>>, WorkerError> {
        if !self.started {
            return Err(WorkerError::NotStarted);
        }
        let expected = jobs.len();
        for (i, job) in jobs.into_iter().enumerate() {
            let device_index = i % self.devices.len();
            let _ = self.device_senders[device_index].send(PoolMessage::Job(job));
        }

        let mut results = Vec::with_capacity(expected);
        while results.len() < expected {
            match self.result_rx.recv() {
                Ok(WorkerOutcome::Trained(work)) => results.push(Ok(work)),
                Ok(WorkerOutcome::Failed(msg)) => {
                    log::warn!("worker {} reported a failure: {}", msg.sender_id, msg.text);
                    results.push(Err(msg));
                    self.respawn_dead_workers();
                    if self.alive_count() == 0 {
                        return Err(WorkerError::AllWorkersFailed(self.n_jobs));
                    }
                }
                Err(_) => return Err(WorkerError::AllWorkersFailed(self.n_jobs)),
            }
        }
        Ok(results)
    }

    /// Sends one termination sentinel per worker and joins every thread.
    /// Idempotent by observable effect: calling twice is harmless.
    pub fn stop(&mut self) {
        if !self.started {
            return;
        }
        for worker in &self.workers {
            let _ = self.device_senders[worker.device_index].send(PoolMessage::Shutdown);
        }
        for worker in &mut self.workers {
            if let Some(handle) = worker.thread.take() {
                let _ = handle.join();
            }
        }
        self.workers.clear();
        self.started = false;
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_worker(
    id: usize,
    _device: String,
    job_rx: Receiver<PoolMessage>,
    result_tx: Sender<WorkerOutcome>,
    trainer: Arc<dyn Trainer>,
    evaluator: Arc<dyn Evaluator>,
    seed: u64,
) {
    let mut rng = StdRng::seed_from_u64(seed);
    loop {
        let message = match job_rx.recv() {
            Ok(m) => m,
            Err(_) => break,
        };
        let job = match message {
            PoolMessage::Shutdown => break,
            PoolMessage::Job(job) => job,
        };

        let outcome = catch_unwind(AssertUnwindSafe(|| {
            run_job(id, job, &trainer, &evaluator, &mut rng)
        }));

        match outcome {
            Ok(outcome) => {
                if result_tx.send(outcome).is_err() {
                    break;
                }
            }
            Err(panic) => {
                let text = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "worker panicked".to_string());
                let _ = result_tx.send(WorkerOutcome::Failed(FailMessage {
                    sender_id: id,
                    text: "worker panicked and will be respawned".to_string(),
                    exception: Some(text),
                }));
                break;
            }
        }
    }
}

fn run_job(
    id: usize,
    mut job: TrainJob,
    trainer: &Arc<dyn Trainer>,
    evaluator: &Arc<dyn Evaluator>,
    rng: &mut StdRng,
) -> WorkerOutcome {
    let member_id = job.work.members().first().map(|m| m.id).unwrap_or(0);

    if let Err(e) = trainer.train_step(
        &mut job.work.members_mut(),
        job.train_step_size,
        job.train_shuffle,
        rng,
    ) {
        return WorkerOutcome::Failed(FailMessage {
            sender_id: id,
            text: format!("training failed for member {member_id}: {e}"),
            exception: None,
        });
    }

    let eval_step_size = job.eval_step_size.unwrap_or(job.train_step_size);
    if let Err(e) = evaluator.eval_step(
        &mut job.work.members_mut(),
        eval_step_size,
        job.eval_shuffle,
        rng,
    ) {
        return WorkerOutcome::Failed(FailMessage {
            sender_id: id,
            text: format!("evaluation failed for member {member_id}: {e}"),
            exception: None,
        });
    }

    WorkerOutcome::Trained(job.work)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingTrainer {
        calls: AtomicUsize,
    }

    impl Trainer for CountingTrainer {
        fn train_step(
            &self,
            members: &mut [&mut pbt_types::MemberState],
            _step_size: u64,
            _shuffle: bool,
            _rng: &mut dyn rand::RngCore,
        ) -> Result<(), WorkerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            for m in members {
                m.steps += 1;
            }
            Ok(())
        }
    }

    struct NoopEvaluator;

    impl Evaluator for NoopEvaluator {
        fn eval_step(
            &self,
            members: &mut [&mut pbt_types::MemberState],
            _step_size: u64,
            _shuffle: bool,
            _rng: &mut dyn rand::RngCore,
        ) -> Result<(), WorkerError> {
            for m in members {
                let mut metrics = IndexMap::new();
                metrics.insert("eval".to_string(), 0.5);
                m.loss.insert("eval".to_string(), metrics);
            }
            Ok(())
        }
    }

    struct AlwaysFailsTrainer;

    impl Trainer for AlwaysFailsTrainer {
        fn train_step(
            &self,
            _members: &mut [&mut pbt_types::MemberState],
            _step_size: u64,
            _shuffle: bool,
            _rng: &mut dyn rand::RngCore,
        ) -> Result<(), WorkerError> {
            Err(WorkerError::TrainingFailed {
                member_id: 0,
                reason: "synthetic failure".to_string(),
            })
        }
    }

    fn member(id: u64) -> pbt_types::MemberState {
        pbt_types::MemberState::new(id, IndexMap::new(), "train", "eval", false)
    }

    #[test]
    fn rejects_too_few_jobs_for_devices() {
        let err = WorkerPool::new(
            Arc::new(CountingTrainer {
                calls: AtomicUsize::new(0),
            }),
            Arc::new(NoopEvaluator),
            None,
            vec!["cpu0".to_string(), "cpu1".to_string()],
            1,
        )
        .unwrap_err();
        assert!(matches!(err, WorkerError::TooFewJobsForDevices { .. }));
    }

    #[test]
    fn train_before_start_is_an_error() {
        let mut pool = WorkerPool::new(
            Arc::new(CountingTrainer {
                calls: AtomicUsize::new(0),
            }),
            Arc::new(NoopEvaluator),
            None,
            vec!["cpu".to_string()],
            1,
        )
        .unwrap();
        let job = TrainJob {
            work: WorkItem::Single(member(1)),
            train_step_size: 1,
            eval_step_size: None,
            train_shuffle: false,
            eval_shuffle: false,
        };
        assert!(matches!(
            pool.train(vec![job]),
            Err(WorkerError::NotStarted)
        ));
    }

    #[test]
    fn trains_every_submitted_job() {
        let mut pool = WorkerPool::new(
            Arc::new(CountingTrainer {
                calls: AtomicUsize::new(0),
            }),
            Arc::new(NoopEvaluator),
            None,
            vec!["cpu".to_string()],
            2,
        )
        .unwrap();
        pool.start();

        let jobs: Vec<TrainJob> = (1..=4)
            .map(|id| TrainJob {
                work: WorkItem::Single(member(id)),
                train_step_size: 3,
                eval_step_size: None,
                train_shuffle: false,
                eval_shuffle: false,
            })
            .collect();
        let results = pool.train(jobs).unwrap();
        assert_eq!(results.len(), 4);
        for r in results {
            let work = r.unwrap();
            assert_eq!(work.members()[0].steps, 1);
            assert_eq!(work.members()[0].score(), 0.5);
        }
        pool.stop();
    }

    #[test]
    fn soft_training_failures_are_reported_without_killing_the_worker() {
        let mut pool = WorkerPool::new(
            Arc::new(AlwaysFailsTrainer),
            Arc::new(NoopEvaluator),
            None,
            vec!["cpu".to_string()],
            1,
        )
        .unwrap();
        pool.start();

        let jobs: Vec<TrainJob> = (1..=2)
            .map(|id| TrainJob {
                work: WorkItem::Single(member(id)),
                train_step_size: 1,
                eval_step_size: None,
                train_shuffle: false,
                eval_shuffle: false,
            })
            .collect();
        let results = pool.train(jobs).unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.into_iter().all(|r| r.is_err()));
        pool.stop();
    }
}
