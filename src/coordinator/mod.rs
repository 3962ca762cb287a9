//! Transaction coordinator
//!
//! Single source of truth for transaction lifecycle. Routes reads and
//! writes across sites, queues work for down sites, drives commit-time
//! validation (pending operations, first-committer-wins, serialization
//! graph) and cascades aborts on site failure.

mod errors;
mod manager;
mod outcome;
mod wait_queue;

pub use errors::{CoordinatorError, CoordinatorResult};
pub use manager::Coordinator;
pub use outcome::{
    AbortReason, CommitOutcome, ReadOutcome, RecoveryEvent, RecoveryReport, SiteDump,
    TransactionStatus, WriteOutcome,
};
pub use wait_queue::{QueuedOperation, WaitQueue};
