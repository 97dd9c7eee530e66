//! Bounded external archive of replaced parents.
//!
//! Grounded in `original_source/PopulationBasedTraining/pbt/archive.py`'s
//! `ExternalArchive`: a fixed-capacity bag with uniform-random eviction on
//! overflow, "evict-then-append" with no batch or positional insertion.

use pbt_types::MemberState;
use rand::{Rng, RngCore};

/// A capacity-bounded collection of parent members kept for extra mutation
/// diversity. On overflow a uniformly random existing entry is dropped
/// before the new one is appended.
#[derive(Clone, Default)]
pub struct ExternalArchive {
    capacity: usize,
    entries: Vec<MemberState>,
}

impl ExternalArchive {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Vec::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Shrinks or grows the capacity for subsequent pushes. If the archive
    /// is already over the new capacity, entries are evicted uniformly at
    /// random down to size, mirroring L-SHADE's post-resize archive trim.
    pub fn set_capacity(&mut self, capacity: usize, rng: &mut dyn RngCore) {
        self.capacity = capacity;
        while self.entries.len() > self.capacity {
            let idx = rng.random_range(0..self.entries.len());
            self.entries.swap_remove(idx);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MemberState> {
        self.entries.iter()
    }

    /// Appends `member`, first evicting a uniformly random existing entry if
    /// the archive is at or over capacity.
    pub fn push(&mut self, member: MemberState, rng: &mut dyn RngCore) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.len() >= self.capacity {
            let idx = rng.random_range(0..self.entries.len());
            self.entries.swap_remove(idx);
        }
        self.entries.push(member);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn member(id: u64) -> MemberState {
        MemberState::new(id, IndexMap::new(), "train", "eval", false)
    }

    #[test]
    fn eviction_keeps_capacity_bound() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut archive = ExternalArchive::new(3);
        for id in 0..4 {
            archive.push(member(id), &mut rng);
        }
        assert_eq!(archive.len(), 3);
    }

    #[test]
    fn zero_capacity_archive_stays_empty() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut archive = ExternalArchive::new(0);
        archive.push(member(0), &mut rng);
        assert!(archive.is_empty());
    }
}
