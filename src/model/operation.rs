//! Operation - Entries of a transaction's operation log
//!
//! An operation is created when the command is issued and is stamped with
//! an executed tick once a site actually serves it. `executed_at == None`
//! means the operation is still waiting on a down site.
//!
//! Reads also count how many site wait queues still hold them. The count
//! is written only by the coordinator: incremented when the read is queued
//! and decremented as each of those sites recovers.

use std::fmt;

use super::{TransactionId, Value, VariableId};
use crate::mvcc::Timestamp;

/// Data access performed by an operation.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum AccessKind {
    Read,
    Write,
}

/// `R(Tn, xk)`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReadOperation {
    transaction: TransactionId,
    variable: VariableId,
    created_at: Timestamp,
    executed_at: Option<Timestamp>,
    queued_sites: usize,
}

impl ReadOperation {
    pub fn new(transaction: TransactionId, variable: VariableId, created_at: Timestamp) -> Self {
        Self {
            transaction,
            variable,
            created_at,
            executed_at: None,
            queued_sites: 0,
        }
    }

    #[inline]
    pub fn variable(&self) -> VariableId {
        self.variable
    }

    /// Number of site wait queues still holding this read.
    #[inline]
    pub fn queued_sites(&self) -> usize {
        self.queued_sites
    }

    /// Records that the read was placed on one more site's wait queue.
    pub fn enqueue_on_site(&mut self) {
        self.queued_sites += 1;
    }

    /// Records that one queued site has resolved this read, successfully
    /// or not. Returns how many queued sites remain.
    pub fn resolve_queued_site(&mut self) -> usize {
        self.queued_sites = self.queued_sites.saturating_sub(1);
        self.queued_sites
    }
}

/// `W(Tn, xk, v)`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WriteOperation {
    transaction: TransactionId,
    variable: VariableId,
    value: Value,
    created_at: Timestamp,
    executed_at: Option<Timestamp>,
}

impl WriteOperation {
    pub fn new(
        transaction: TransactionId,
        variable: VariableId,
        value: Value,
        created_at: Timestamp,
    ) -> Self {
        Self {
            transaction,
            variable,
            value,
            created_at,
            executed_at: None,
        }
    }

    #[inline]
    pub fn variable(&self) -> VariableId {
        self.variable
    }

    #[inline]
    pub fn value(&self) -> Value {
        self.value
    }

    #[inline]
    pub fn executed_at(&self) -> Option<Timestamp> {
        self.executed_at
    }
}

/// `end(Tn)`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitOperation {
    transaction: TransactionId,
    created_at: Timestamp,
    executed_at: Option<Timestamp>,
}

impl CommitOperation {
    pub fn new(transaction: TransactionId, created_at: Timestamp) -> Self {
        Self {
            transaction,
            created_at,
            executed_at: None,
        }
    }
}

/// One entry of a transaction's operation log.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Operation {
    Read(ReadOperation),
    Write(WriteOperation),
    Commit(CommitOperation),
}

impl Operation {
    /// Tick at which the command was issued.
    pub fn created_at(&self) -> Timestamp {
        match self {
            Operation::Read(op) => op.created_at,
            Operation::Write(op) => op.created_at,
            Operation::Commit(op) => op.created_at,
        }
    }

    /// Tick at which a site served the operation, if any has.
    pub fn executed_at(&self) -> Option<Timestamp> {
        match self {
            Operation::Read(op) => op.executed_at,
            Operation::Write(op) => op.executed_at,
            Operation::Commit(op) => op.executed_at,
        }
    }

    #[inline]
    pub fn is_executed(&self) -> bool {
        self.executed_at().is_some()
    }

    /// Stamps the executed tick. The first stamp wins.
    pub fn mark_executed(&mut self, at: Timestamp) {
        let slot = match self {
            Operation::Read(op) => &mut op.executed_at,
            Operation::Write(op) => &mut op.executed_at,
            Operation::Commit(op) => &mut op.executed_at,
        };
        if slot.is_none() {
            *slot = Some(at);
        }
    }

    /// Variable touched and how, for data operations.
    pub fn access(&self) -> Option<(VariableId, AccessKind)> {
        match self {
            Operation::Read(op) => Some((op.variable, AccessKind::Read)),
            Operation::Write(op) => Some((op.variable, AccessKind::Write)),
            Operation::Commit(_) => None,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Read(op) => write!(f, "R({}, {})", op.transaction, op.variable),
            Operation::Write(op) => {
                write!(f, "W({}, {}, {})", op.transaction, op.variable, op.value)
            }
            Operation::Commit(op) => write!(f, "end({})", op.transaction),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(n: u64) -> TransactionId {
        TransactionId::new(n)
    }

    fn x(n: u32) -> VariableId {
        VariableId::new(n)
    }

    #[test]
    fn test_new_operations_are_not_executed() {
        let read = Operation::Read(ReadOperation::new(t(1), x(2), Timestamp::new(3)));
        let write = Operation::Write(WriteOperation::new(t(1), x(2), 5, Timestamp::new(3)));
        let commit = Operation::Commit(CommitOperation::new(t(1), Timestamp::new(3)));
        assert!(!read.is_executed());
        assert!(!write.is_executed());
        assert!(!commit.is_executed());
    }

    #[test]
    fn test_mark_executed_keeps_first_stamp() {
        let mut op = Operation::Write(WriteOperation::new(t(1), x(2), 5, Timestamp::new(1)));
        op.mark_executed(Timestamp::new(4));
        op.mark_executed(Timestamp::new(9));
        assert_eq!(op.executed_at(), Some(Timestamp::new(4)));
    }

    #[test]
    fn test_access_classification() {
        let read = Operation::Read(ReadOperation::new(t(1), x(3), Timestamp::ZERO));
        let write = Operation::Write(WriteOperation::new(t(1), x(4), 1, Timestamp::ZERO));
        let commit = Operation::Commit(CommitOperation::new(t(1), Timestamp::ZERO));
        assert_eq!(read.access(), Some((x(3), AccessKind::Read)));
        assert_eq!(write.access(), Some((x(4), AccessKind::Write)));
        assert_eq!(commit.access(), None);
    }

    #[test]
    fn test_queued_site_counter() {
        let mut read = ReadOperation::new(t(1), x(2), Timestamp::ZERO);
        read.enqueue_on_site();
        read.enqueue_on_site();
        assert_eq!(read.queued_sites(), 2);
        assert_eq!(read.resolve_queued_site(), 1);
        assert_eq!(read.resolve_queued_site(), 0);
        assert_eq!(read.resolve_queued_site(), 0);
    }

    #[test]
    fn test_display() {
        let read = Operation::Read(ReadOperation::new(t(1), x(3), Timestamp::ZERO));
        let write = Operation::Write(WriteOperation::new(t(2), x(4), 7, Timestamp::ZERO));
        let commit = Operation::Commit(CommitOperation::new(t(2), Timestamp::ZERO));
        assert_eq!(read.to_string(), "R(T1, x3)");
        assert_eq!(write.to_string(), "W(T2, x4, 7)");
        assert_eq!(commit.to_string(), "end(T2)");
    }
}
