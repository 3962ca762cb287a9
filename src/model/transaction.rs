//! Transaction - Lifecycle record and operation log
//!
//! A transaction is created by `begin` at the current tick, grows its log
//! with every operation it issues, and terminates exactly once by commit
//! or abort.

use super::{AccessKind, Operation, TransactionId, VariableId, WriteOperation};
use crate::mvcc::Timestamp;

/// Position of an operation in its transaction's log.
///
/// Wait queues hold `(TransactionId, OperationIndex)` pairs instead of the
/// operation itself, so the log is the only owner of the record.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct OperationIndex(usize);

impl OperationIndex {
    #[inline]
    pub fn value(&self) -> usize {
        self.0
    }
}

#[derive(Clone, Debug)]
pub struct Transaction {
    id: TransactionId,
    start_ts: Timestamp,
    commit_ts: Option<Timestamp>,
    operations: Vec<Operation>,
}

impl Transaction {
    /// Creates a transaction whose snapshot is fixed at `start_ts`.
    pub fn new(id: TransactionId, start_ts: Timestamp) -> Self {
        Self {
            id,
            start_ts,
            commit_ts: None,
            operations: Vec::new(),
        }
    }

    #[inline]
    pub fn id(&self) -> TransactionId {
        self.id
    }

    #[inline]
    pub fn start_ts(&self) -> Timestamp {
        self.start_ts
    }

    #[inline]
    pub fn commit_ts(&self) -> Option<Timestamp> {
        self.commit_ts
    }

    pub fn set_commit_ts(&mut self, at: Timestamp) {
        self.commit_ts = Some(at);
    }

    /// Appends an operation to the log.
    pub fn push(&mut self, op: Operation) -> OperationIndex {
        self.operations.push(op);
        OperationIndex(self.operations.len() - 1)
    }

    #[inline]
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn operation(&self, index: OperationIndex) -> Option<&Operation> {
        self.operations.get(index.0)
    }

    pub fn operation_mut(&mut self, index: OperationIndex) -> Option<&mut Operation> {
        self.operations.get_mut(index.0)
    }

    /// Operations no site has served yet, excluding the log's trailing
    /// commit request.
    pub fn pending_operations(&self) -> impl Iterator<Item = &Operation> {
        self.operations
            .iter()
            .filter(|op| !matches!(op, Operation::Commit(_)) && !op.is_executed())
    }

    /// The most recent write this transaction issued to `variable`.
    pub fn latest_write_to(&self, variable: VariableId) -> Option<&WriteOperation> {
        self.operations.iter().rev().find_map(|op| match op {
            Operation::Write(w) if w.variable() == variable => Some(w),
            _ => None,
        })
    }

    /// Executed data accesses, in log order.
    pub fn accesses(&self) -> impl Iterator<Item = (VariableId, AccessKind)> + '_ {
        self.operations
            .iter()
            .filter(|op| op.is_executed())
            .filter_map(Operation::access)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CommitOperation, ReadOperation};

    fn txn() -> Transaction {
        Transaction::new(TransactionId::new(1), Timestamp::new(2))
    }

    fn x(n: u32) -> VariableId {
        VariableId::new(n)
    }

    #[test]
    fn test_new_transaction() {
        let t = txn();
        assert_eq!(t.id(), TransactionId::new(1));
        assert_eq!(t.start_ts(), Timestamp::new(2));
        assert_eq!(t.commit_ts(), None);
        assert!(t.operations().is_empty());
    }

    #[test]
    fn test_push_returns_log_position() {
        let mut t = txn();
        let a = t.push(Operation::Read(ReadOperation::new(t.id(), x(1), Timestamp::new(3))));
        let b = t.push(Operation::Read(ReadOperation::new(t.id(), x(2), Timestamp::new(4))));
        assert_eq!(a.value(), 0);
        assert_eq!(b.value(), 1);
        assert!(t.operation(b).is_some());
    }

    #[test]
    fn test_pending_operations_ignores_commit() {
        let mut t = txn();
        let id = t.id();
        let r = t.push(Operation::Read(ReadOperation::new(id, x(1), Timestamp::new(3))));
        t.push(Operation::Read(ReadOperation::new(id, x(2), Timestamp::new(4))));
        t.push(Operation::Commit(CommitOperation::new(id, Timestamp::new(5))));

        t.operation_mut(r).unwrap().mark_executed(Timestamp::new(3));

        let pending: Vec<_> = t.pending_operations().collect();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].access(), Some((x(2), AccessKind::Read)));
    }

    #[test]
    fn test_latest_write_to_picks_most_recent() {
        let mut t = txn();
        let id = t.id();
        t.push(Operation::Write(WriteOperation::new(id, x(4), 1, Timestamp::new(3))));
        t.push(Operation::Write(WriteOperation::new(id, x(6), 2, Timestamp::new(4))));
        t.push(Operation::Write(WriteOperation::new(id, x(4), 3, Timestamp::new(5))));

        assert_eq!(t.latest_write_to(x(4)).unwrap().value(), 3);
        assert_eq!(t.latest_write_to(x(6)).unwrap().value(), 2);
        assert!(t.latest_write_to(x(8)).is_none());
    }

    #[test]
    fn test_accesses_only_include_executed() {
        let mut t = txn();
        let id = t.id();
        let w = t.push(Operation::Write(WriteOperation::new(id, x(4), 1, Timestamp::new(3))));
        t.push(Operation::Read(ReadOperation::new(id, x(5), Timestamp::new(4))));
        t.operation_mut(w).unwrap().mark_executed(Timestamp::new(3));

        let accesses: Vec<_> = t.accesses().collect();
        assert_eq!(accesses, vec![(x(4), AccessKind::Write)]);
    }
}
