//! Footprint - What the graph remembers about an admitted transaction

use std::collections::BTreeSet;

use crate::model::{AccessKind, Transaction, TransactionId, VariableId};
use crate::mvcc::Timestamp;

/// Snapshot, commit tick and read/write sets of one transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Footprint {
    pub id: TransactionId,
    pub start_ts: Timestamp,
    pub commit_ts: Timestamp,
    pub reads: BTreeSet<VariableId>,
    pub writes: BTreeSet<VariableId>,
}

impl Footprint {
    /// Builds the footprint of `transaction` as if it commits at `commit_ts`.
    pub fn of(transaction: &Transaction, commit_ts: Timestamp) -> Self {
        let mut reads = BTreeSet::new();
        let mut writes = BTreeSet::new();
        for (variable, kind) in transaction.accesses() {
            match kind {
                AccessKind::Read => reads.insert(variable),
                AccessKind::Write => writes.insert(variable),
            };
        }
        Self {
            id: transaction.id(),
            start_ts: transaction.start_ts(),
            commit_ts,
            reads,
            writes,
        }
    }
}
