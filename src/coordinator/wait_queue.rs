//! Per-site FIFO of operations waiting for the site to come back up

use std::collections::VecDeque;

use crate::model::{OperationIndex, TransactionId};

/// Reference to a queued operation inside its transaction's log.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct QueuedOperation {
    pub transaction: TransactionId,
    pub index: OperationIndex,
}

#[derive(Clone, Debug, Default)]
pub struct WaitQueue {
    entries: VecDeque<QueuedOperation>,
}

impl WaitQueue {
    pub fn push(&mut self, transaction: TransactionId, index: OperationIndex) {
        self.entries.push_back(QueuedOperation { transaction, index });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Takes every entry in enqueue order, leaving the queue empty.
    pub fn drain(&mut self) -> Vec<QueuedOperation> {
        self.entries.drain(..).collect()
    }

    /// Drops every entry belonging to `transaction`.
    pub fn forget(&mut self, transaction: TransactionId) {
        self.entries.retain(|e| e.transaction != transaction);
    }
}
