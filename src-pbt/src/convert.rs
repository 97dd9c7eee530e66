//! Converts between `pbt_evolve::Candidate` and `pbt_worker::WorkItem`.
//!
//! The two enums are deliberately independent (`pbt-worker` does not depend
//! on `pbt-evolve`, per the workspace's crate-layout split); the controller
//! is the only place that needs both, so the conversion lives here rather
//! than in either leaf crate.

use pbt_evolve::Candidate;
use pbt_worker::WorkItem;

pub(crate) fn candidate_to_work_item(candidate: Candidate) -> WorkItem {
    match candidate {
        Candidate::Single(m) => WorkItem::Single(m),
        Candidate::Pair(a, b) => WorkItem::Pair(a, b),
    }
}

pub(crate) fn work_item_to_candidate(work: WorkItem) -> Candidate {
    match work {
        WorkItem::Single(m) => Candidate::Single(m),
        WorkItem::Pair(a, b) => Candidate::Pair(a, b),
    }
}
