//! Prunes durable checkpoint history, mirroring `Population::truncate_history`'s
//! in-memory pruning but against the `CheckpointStore` collaborator.
//!
//! Grounded in `src-de`'s `OptimizationRecorder`: a small struct wrapping one
//! piece of bookkeeping with its own constructor and a single verb method.

use pbt_types::Population;
use pbt_worker::CheckpointStore;

/// Drops checkpoint-store snapshots older than the last `history_limit`
/// generations after every completed generation, minimum 2.
pub struct GarbageCollector {
    history_limit: usize,
}

impl GarbageCollector {
    pub fn new(history_limit: usize) -> Self {
        Self {
            history_limit: history_limit.max(2),
        }
    }

    pub fn history_limit(&self) -> usize {
        self.history_limit
    }

    /// Asks the checkpoint store to drop anything older than the retained
    /// window for the population's current shape.
    pub fn collect(&self, store: &dyn CheckpointStore, population: &Population) {
        store.collect(population, self.history_limit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_to_minimum_of_two() {
        assert_eq!(GarbageCollector::new(0).history_limit(), 2);
        assert_eq!(GarbageCollector::new(1).history_limit(), 2);
        assert_eq!(GarbageCollector::new(10).history_limit(), 10);
    }
}
