//! Random sampling helpers shared by DE, SHADE and L-SHADE.
//!
//! Grounded in `original_source/pbt/utils/iterable.py`'s `random_from_list`
//! and `src-de/src/mod.rs`'s `distinct_indices`: shuffle a candidate pool and
//! take the first `k` entries not excluded, rather than rejection-sampling.

use rand::RngCore;
use rand::seq::SliceRandom;

use pbt_types::MemberState;

/// Picks `k` distinct members from `pool`, excluding any whose id is in
/// `exclude_ids`. Panics if the pool (after exclusion) is smaller than `k`,
/// which would indicate a degenerate-population bug upstream.
pub fn sample_distinct<'a>(
    pool: &[&'a MemberState],
    exclude_ids: &[u64],
    k: usize,
    rng: &mut dyn RngCore,
) -> Vec<&'a MemberState> {
    let mut eligible: Vec<&MemberState> = pool
        .iter()
        .copied()
        .filter(|m| !exclude_ids.contains(&m.id))
        .collect();
    eligible.shuffle(rng);
    eligible.truncate(k);
    debug_assert_eq!(eligible.len(), k, "not enough distinct members to sample");
    eligible
}

/// The top `n` members of `pool`, ordered best-first under member ordering.
pub fn top_n<'a>(pool: &[&'a MemberState], n: usize) -> Vec<&'a MemberState> {
    let mut sorted: Vec<&MemberState> = pool.to_vec();
    sorted.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
    sorted.truncate(n.max(1));
    sorted
}

/// Uniformly samples one member from `pool`.
pub fn choose_one<'a>(pool: &[&'a MemberState], rng: &mut dyn RngCore) -> &'a MemberState {
    pool.choose(rng).expect("pool must be non-empty")
}
