//! End-to-end scenarios exercised against the real crates rather than
//! re-derived unit tests: a degenerate DE generation, PBT elitism, SHADE
//! archive eviction, L-SHADE population resizing, historical-memory update
//! with all-zero CR samples, and the controller's score end-criterion
//! running a full generation through a worker pool.

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;
use rand::SeedableRng;
use rand::rngs::StdRng;

use pbt::{Controller, EndCriteria, RunMode, RunStatus, StepConfig};
use pbt_evolve::{DifferentialEvolution, EvolveError, Evolver, ExploitAndExplore, Shade};
use pbt_types::{Generation, Hyperparameter, MemberState, Population};
use pbt_worker::{CheckpointStore, Evaluator, Trainer, WorkerError, WorkerPool};

fn scored_member(id: u64, score: f64) -> MemberState {
    let mut m = MemberState::new(id, IndexMap::new(), "train", "eval", false);
    let mut metrics = IndexMap::new();
    metrics.insert("eval".to_string(), score);
    m.loss.insert("eval".to_string(), metrics);
    m
}

fn member_with_one_param(id: u64) -> MemberState {
    let mut params = IndexMap::new();
    params.insert(
        "lr".to_string(),
        Hyperparameter::continuous_real(0.0, 1.0).unwrap(),
    );
    MemberState::new(id, params, "train", "eval", false)
}

/// Scenario 1: population size 2, `DifferentialEvolution.mutate` fails with
/// "generation size must be at least 3".
#[test]
fn degenerate_de_population_fails() {
    let mut gen = Generation::new();
    gen.push(member_with_one_param(1)).unwrap();
    gen.push(member_with_one_param(2)).unwrap();

    let mut engine = DifferentialEvolution::default();
    let mut rng = StdRng::seed_from_u64(0);
    let err = engine.mutate(&gen, &mut rng).unwrap_err();
    assert!(matches!(err, EvolveError::GenerationTooSmallForDe(2)));
}

/// Scenario 2: 5 members scoring `[0.1, 0.2, 0.3, 0.4, 0.5]`,
/// `exploit_factor = 0.4` ⇒ elitists are the members scoring `0.4` and
/// `0.5`; every non-elitist trial's parameters equal one elitist's
/// parameters multiplied coordinate-wise by a factor from `explore_factors`.
#[test]
fn pbt_elitism_scenario() {
    let explore_factors = vec![0.8_f64, 1.2_f64];
    let mut gen = Generation::new();
    for (id, score) in [(1, 0.1), (2, 0.2), (3, 0.3), (4, 0.4), (5, 0.5)] {
        let mut m = member_with_one_param(id);
        let mut metrics = IndexMap::new();
        metrics.insert("eval".to_string(), score);
        m.loss.insert("eval".to_string(), metrics);
        gen.push(m).unwrap();
    }

    let mut engine = ExploitAndExplore::new(0.4, explore_factors.clone()).unwrap();
    let mut rng = StdRng::seed_from_u64(2);
    let candidates = engine.mutate(&gen, &mut rng).unwrap();
    assert_eq!(candidates.len(), 5);

    let elitist_lrs: HashMap<u64, f64> = [(4u64, gen.get(4).unwrap().coord(0)), (5, gen.get(5).unwrap().coord(0))]
        .into_iter()
        .collect();

    for candidate in candidates {
        let member = match candidate {
            pbt_evolve::Candidate::Single(m) => m,
            pbt_evolve::Candidate::Pair(_, _) => panic!("PBT only ever emits single candidates"),
        };
        if member.id == 4 || member.id == 5 {
            assert!((member.coord(0) - elitist_lrs[&member.id]).abs() < 1e-12);
            continue;
        }
        // A non-elitist's coordinate must equal *some* elitist's coordinate
        // times *some* explore factor.
        let matches_some_elitist = elitist_lrs.values().any(|&elitist_lr| {
            explore_factors
                .iter()
                .any(|&factor| (member.coord(0) - elitist_lr * factor).abs() < 1e-9)
        });
        assert!(
            matches_some_elitist,
            "member {} coord {} did not match any elitist*factor combination",
            member.id,
            member.coord(0)
        );
    }
}

/// Scenario 3: archive capacity 3, insert 4 parents via SHADE's selection
/// path ⇒ length stays at 3.
#[test]
fn shade_archive_eviction_scenario() {
    let mut engine = Shade::new(4, 0.75, 0.5, 5, 0.0, 1.0, false).unwrap();
    assert_eq!(engine.archive_capacity(), 3);
    let mut rng = StdRng::seed_from_u64(9);

    for id in 0..4u64 {
        let parent = scored_member(id, 0.0);
        let trial = scored_member(id, 1.0); // always weakly better, always archived
        engine.select(pbt_evolve::Candidate::Pair(parent, trial), &mut rng);
    }
    assert_eq!(engine.archive_len(), 3);
}

/// Scenario 4: `N_INIT=20, N_MIN=4, MAX_NFE=1000`; after `NFE=500`,
/// `N_new = round(((4-20)/1000)*500 + 20) = 12`; the 8 lowest-scoring
/// members are removed and archive capacity becomes `12 * r_arc`.
#[test]
fn lshade_resize_scenario() {
    let mut engine = Shade::new(20, 2.0, 0.1, 5, 0.0, 1.0, false)
        .unwrap()
        .with_lshade(1000, 4)
        .unwrap();
    let mut rng = StdRng::seed_from_u64(4);

    let mut gen = Generation::new();
    for id in 0..20u64 {
        gen.push(scored_member(id, id as f64)).unwrap();
    }

    for _ in 0..500 {
        engine.select(
            pbt_evolve::Candidate::Pair(scored_member(999, 0.0), scored_member(999, 0.0)),
            &mut rng,
        );
    }
    assert_eq!(engine.nfe(), 500);

    engine.on_generation_end(&mut gen, &mut rng);
    assert_eq!(gen.len(), 12);
    assert_eq!(engine.archive_capacity(), 24);
    // The 8 lowest-scoring ids (0..=7) must be the ones removed.
    for id in 0..8u64 {
        assert!(gen.get(id).is_none());
    }
    for id in 8..20u64 {
        assert!(gen.get(id).is_some());
    }
}

/// Scenario 5: `S_CR = [0, 0, 0]`, `S_F = [0.3, 0.5, 0.7]` ⇒ `M_CR[k]` becomes
/// `None` and `M_F[k]` becomes the weighted Lehmer mean of `S_F`.
#[test]
fn historical_memory_all_zero_cr_scenario() {
    use pbt_evolve::HistoricalMemory;

    let mut memory = HistoricalMemory::new(1, 0.5);
    memory.reset_buffers();
    memory.record(0.0, 0.3, 1.0);
    memory.record(0.0, 0.5, 1.0);
    memory.record(0.0, 0.7, 1.0);
    memory.update();

    assert!(memory.cr(0).is_none());
    let expected_f = {
        let s = [0.3_f64, 0.5, 0.7];
        let w = [1.0_f64, 1.0, 1.0];
        let total: f64 = w.iter().sum();
        let norm: Vec<f64> = w.iter().map(|x| x / total).collect();
        let num: f64 = norm.iter().zip(s).map(|(w, s)| w * s * s).sum();
        let den: f64 = norm.iter().zip(s).map(|(w, s)| w * s).sum();
        num / den
    };
    assert!((memory.f(0) - expected_f).abs() < 1e-12);
}

struct NoopTrainer;

impl Trainer for NoopTrainer {
    fn train_step(
        &self,
        members: &mut [&mut MemberState],
        step_size: u64,
        _shuffle: bool,
        _rng: &mut dyn rand::RngCore,
    ) -> Result<(), WorkerError> {
        for m in members {
            m.steps += step_size;
        }
        Ok(())
    }
}

/// Every member immediately scores above the target, so the controller
/// should stop after exactly one persisted generation.
struct AlwaysOnTargetEvaluator;

impl Evaluator for AlwaysOnTargetEvaluator {
    fn eval_step(
        &self,
        members: &mut [&mut MemberState],
        _step_size: u64,
        _shuffle: bool,
        _rng: &mut dyn rand::RngCore,
    ) -> Result<(), WorkerError> {
        for m in members {
            let mut metrics = IndexMap::new();
            metrics.insert("eval".to_string(), 1.0);
            m.loss.insert("eval".to_string(), metrics);
        }
        Ok(())
    }
}

#[derive(Default)]
struct InMemoryCheckpointStore {
    snapshots: Mutex<HashMap<(u64, u64), MemberState>>,
}

impl CheckpointStore for InMemoryCheckpointStore {
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
        self.snapshots.lock().values().map(MemberState::copy).collect()
    }

    fn collect(&self, _population: &Population, _history_limit: usize) {}
}

/// Scenario 6: `end_criteria.score = 0.99`; as soon as any member in the
/// current generation scores >= 0.99, the loop terminates after persisting
/// that generation.
#[test]
fn controller_score_end_criterion_scenario() {
    let pool = WorkerPool::new(
        Arc::new(NoopTrainer),
        Arc::new(AlwaysOnTargetEvaluator),
        None,
        vec!["cpu".to_string()],
        1,
    )
    .unwrap();

    let evolver = Box::new(pbt_evolve::RandomSearch);
    let checkpoint_store: Arc<dyn CheckpointStore> = Arc::new(InMemoryCheckpointStore::default());
    let end_criteria = EndCriteria {
        steps: None,
        nfe: None,
        score: Some(0.99),
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
        2,
        step,
        0,
    )
    .unwrap();

    let seed = vec![
        member_with_one_param(1),
        member_with_one_param(2),
        member_with_one_param(3),
    ];
    let outcome = controller.run(seed, RunMode::Synchronous).unwrap();

    assert_eq!(outcome.status, RunStatus::EndCriteriaReached);
    assert_eq!(outcome.population.len(), 1);
    let current = outcome.population.current().unwrap();
    assert!(current.iter().all(|m| m.score() >= 0.99));
}
