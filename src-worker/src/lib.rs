//! The parallel worker pool: per-device job queues, long-lived training
//! workers, and the `Trainer`/`Evaluator`/`Tester`/`CheckpointStore`
//! contracts the controller wires up to run trials.

mod error;
mod job;
mod pool;
mod traits;

pub use error::WorkerError;
pub use job::{FailMessage, TrainJob, WorkItem, WorkerOutcome};
pub use pool::WorkerPool;
pub use traits::{CheckpointStore, Evaluator, Tester, Trainer};
