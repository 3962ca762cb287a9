//! SiteStore - Committed versions and uncommitted buffers of one site
//!
//! A site owns:
//! - the version chain of every variable assigned to it
//! - per-transaction write buffers (uncommitted, lost on failure)
//! - its up/down history
//!
//! The store never talks to other sites. Routing, queuing and recovery
//! replay belong to the coordinator.

use std::collections::{BTreeMap, HashMap};

use super::errors::{SiteError, SiteResult};
use super::history::SiteHistory;
use crate::model::{SiteId, Transaction, TransactionId, Value, VariableId};
use crate::mvcc::{MvccError, Timestamp, VersionChain};
use crate::observability::{log_event_with_fields, Event};

/// Where a served value came from.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Provenance {
    /// The reading transaction's own buffered write.
    Uncommitted,
    /// A committed version with this commit tick.
    Committed(Timestamp),
}

/// A value served by a site.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ReadValue {
    pub variable: VariableId,
    pub value: Value,
    pub site: SiteId,
    pub provenance: Provenance,
}

/// Outcome of a site-level read.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SiteRead {
    Served(ReadValue),
    /// The site is down or cannot prove its copy is current.
    Unavailable,
}

/// Outcome of first-committer-wins validation at one site.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Precommit {
    Clear,
    /// Another transaction committed this variable after the validating
    /// transaction began.
    Conflict(VariableId),
}

#[derive(Debug)]
pub struct SiteStore {
    id: SiteId,
    history: SiteHistory,
    variables: BTreeMap<VariableId, VersionChain>,
    buffers: HashMap<TransactionId, BTreeMap<VariableId, Value>>,
}

impl SiteStore {
    /// Creates an empty site that is up.
    pub fn new(id: SiteId) -> Self {
        Self {
            id,
            history: SiteHistory::new(),
            variables: BTreeMap::new(),
            buffers: HashMap::new(),
        }
    }

    #[inline]
    pub fn site_id(&self) -> SiteId {
        self.id
    }

    #[inline]
    pub fn is_up(&self) -> bool {
        self.history.is_up()
    }

    pub fn history(&self) -> &SiteHistory {
        &self.history
    }

    /// Variables stored at this site, ascending.
    pub fn managed_variables(&self) -> impl Iterator<Item = VariableId> + '_ {
        self.variables.keys().copied()
    }

    pub fn has_variable(&self, variable: VariableId) -> bool {
        self.variables.contains_key(&variable)
    }

    /// True if `transaction` has any uncommitted write buffered here.
    pub fn has_buffer(&self, transaction: TransactionId) -> bool {
        self.buffers.contains_key(&transaction)
    }

    /// Adds a variable with its tick-0 initial value.
    pub fn register(&mut self, variable: VariableId, initial_value: Value) -> SiteResult<()> {
        if self.variables.contains_key(&variable) {
            return Err(SiteError::DuplicateVariable {
                site: self.id,
                variable,
            });
        }
        self.variables.insert(variable, VersionChain::new(initial_value));
        Ok(())
    }

    fn chain(&self, variable: VariableId) -> SiteResult<&VersionChain> {
        self.variables
            .get(&variable)
            .ok_or(SiteError::UnknownVariable {
                site: self.id,
                variable,
            })
    }

    /// Serves a read for `transaction`.
    ///
    /// Read-your-writes comes first and skips every check. Otherwise the
    /// snapshot version at the transaction's start tick is returned, and
    /// when `enforce_consistency` is set the available-copies rule applies:
    /// 1. the site must not have gone down between that version's commit
    ///    and the transaction's start
    /// 2. the site must not have been down around the transaction's latest
    ///    executed write to the same variable
    pub fn read(
        &self,
        transaction: &Transaction,
        variable: VariableId,
        enforce_consistency: bool,
    ) -> SiteResult<SiteRead> {
        let chain = self.chain(variable)?;
        if !self.is_up() {
            return Ok(SiteRead::Unavailable);
        }

        if let Some(&value) = self
            .buffers
            .get(&transaction.id())
            .and_then(|buf| buf.get(&variable))
        {
            return Ok(self.served(transaction.id(), variable, value, Provenance::Uncommitted));
        }

        let start = transaction.start_ts();
        let version = chain.visible_at(start);

        if enforce_consistency {
            if self.history.went_down_within(version.commit_ts(), start) {
                self.refused(transaction.id(), variable, "down since last commit");
                return Ok(SiteRead::Unavailable);
            }
            let own_write = transaction
                .latest_write_to(variable)
                .and_then(|w| w.executed_at());
            if let Some(written_at) = own_write {
                if self.history.was_down_around(written_at) {
                    self.refused(transaction.id(), variable, "down around own write");
                    return Ok(SiteRead::Unavailable);
                }
            }
        }

        Ok(self.served(
            transaction.id(),
            variable,
            version.value(),
            Provenance::Committed(version.commit_ts()),
        ))
    }

    fn served(
        &self,
        transaction: TransactionId,
        variable: VariableId,
        value: Value,
        provenance: Provenance,
    ) -> SiteRead {
        log_event_with_fields(
            Event::ReadServed,
            &[
                ("site", &self.id.to_string()),
                ("txn", &transaction.to_string()),
                ("value", &value.to_string()),
                ("variable", &variable.to_string()),
            ],
        );
        SiteRead::Served(ReadValue {
            variable,
            value,
            site: self.id,
            provenance,
        })
    }

    fn refused(&self, transaction: TransactionId, variable: VariableId, reason: &str) {
        log_event_with_fields(
            Event::ReadRefused,
            &[
                ("reason", reason),
                ("site", &self.id.to_string()),
                ("txn", &transaction.to_string()),
                ("variable", &variable.to_string()),
            ],
        );
    }

    /// Buffers an uncommitted write. Returns false if the site is down.
    pub fn write(
        &mut self,
        transaction: TransactionId,
        variable: VariableId,
        value: Value,
    ) -> SiteResult<bool> {
        self.chain(variable)?;
        if !self.is_up() {
            return Ok(false);
        }
        self.buffers
            .entry(transaction)
            .or_default()
            .insert(variable, value);
        log_event_with_fields(
            Event::WriteBuffered,
            &[
                ("site", &self.id.to_string()),
                ("txn", &transaction.to_string()),
                ("value", &value.to_string()),
                ("variable", &variable.to_string()),
            ],
        );
        Ok(true)
    }

    /// First-committer-wins: every buffered variable's latest committed
    /// version must not be newer than the transaction's start.
    pub fn precommit_check(&self, transaction: &Transaction) -> SiteResult<Precommit> {
        let Some(buffer) = self.buffers.get(&transaction.id()) else {
            return Ok(Precommit::Clear);
        };
        for &variable in buffer.keys() {
            if self.chain(variable)?.latest().commit_ts() > transaction.start_ts() {
                return Ok(Precommit::Conflict(variable));
            }
        }
        Ok(Precommit::Clear)
    }

    /// Fails with `NonMonotonicCommit` if any buffered variable already
    /// has a version at or after `commit_ts`. Nothing is changed.
    pub fn check_install(
        &self,
        transaction: TransactionId,
        commit_ts: Timestamp,
    ) -> SiteResult<()> {
        let Some(buffer) = self.buffers.get(&transaction) else {
            return Ok(());
        };
        for &variable in buffer.keys() {
            let latest = self.chain(variable)?.latest().commit_ts();
            if commit_ts <= latest {
                return Err(MvccError::NonMonotonicCommit {
                    latest,
                    attempted: commit_ts,
                }
                .into());
            }
        }
        Ok(())
    }

    /// Installs the transaction's buffered writes as versions committed at
    /// `commit_ts`, then drops the buffer. Returns the variables written.
    pub fn commit(
        &mut self,
        transaction: TransactionId,
        commit_ts: Timestamp,
    ) -> SiteResult<Vec<VariableId>> {
        let Some(buffer) = self.buffers.remove(&transaction) else {
            return Ok(Vec::new());
        };
        let mut written = Vec::with_capacity(buffer.len());
        for (variable, value) in buffer {
            let site = self.id;
            let chain = self
                .variables
                .get_mut(&variable)
                .ok_or(SiteError::UnknownVariable { site, variable })?;
            chain.push(value, commit_ts)?;
            written.push(variable);
        }
        Ok(written)
    }

    /// Drops the transaction's buffer. Committed history is untouched.
    pub fn abort(&mut self, transaction: TransactionId) {
        self.buffers.remove(&transaction);
    }

    /// Goes down at `at`, losing every uncommitted buffer.
    pub fn fail(&mut self, at: Timestamp) -> SiteResult<()> {
        self.history.record_down(self.id, at)?;
        self.buffers.clear();
        Ok(())
    }

    /// Comes back up at `at`. Nothing is replayed here.
    pub fn recover(&mut self, at: Timestamp) -> SiteResult<()> {
        self.history.record_boot(self.id, at)
    }

    /// Latest committed value of every variable, ascending by id.
    pub fn dump(&self) -> Vec<(VariableId, Value)> {
        self.variables
            .iter()
            .map(|(&variable, chain)| (variable, chain.latest().value()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Operation, WriteOperation};

    fn ts(n: u64) -> Timestamp {
        Timestamp::new(n)
    }

    fn x(n: u32) -> VariableId {
        VariableId::new(n)
    }

    fn t(n: u64) -> TransactionId {
        TransactionId::new(n)
    }

    fn site() -> SiteStore {
        let mut s = SiteStore::new(SiteId::new(1));
        s.register(x(2), 20).unwrap();
        s.register(x(4), 40).unwrap();
        s
    }

    fn served_value(read: SiteRead) -> Value {
        match read {
            SiteRead::Served(v) => v.value,
            SiteRead::Unavailable => panic!("expected a served read"),
        }
    }

    // === Registration ===

    #[test]
    fn test_register_and_dump_ascending() {
        let mut s = SiteStore::new(SiteId::new(3));
        s.register(x(8), 80).unwrap();
        s.register(x(2), 20).unwrap();
        assert_eq!(s.dump(), vec![(x(2), 20), (x(8), 80)]);
        assert!(s.has_variable(x(8)));
        assert!(!s.has_variable(x(4)));
    }

    #[test]
    fn test_register_twice_rejected() {
        let mut s = site();
        assert!(matches!(
            s.register(x(2), 1),
            Err(SiteError::DuplicateVariable { .. })
        ));
    }

    // === Reads ===

    #[test]
    fn test_read_initial_value() {
        let s = site();
        let txn = Transaction::new(t(1), ts(1));
        let read = s.read(&txn, x(2), true).unwrap();
        assert_eq!(
            read,
            SiteRead::Served(ReadValue {
                variable: x(2),
                value: 20,
                site: SiteId::new(1),
                provenance: Provenance::Committed(Timestamp::ZERO),
            })
        );
    }

    #[test]
    fn test_read_unknown_variable_is_error() {
        let s = site();
        let txn = Transaction::new(t(1), ts(1));
        assert!(matches!(
            s.read(&txn, x(3), true),
            Err(SiteError::UnknownVariable { .. })
        ));
    }

    #[test]
    fn test_read_your_own_write() {
        let mut s = site();
        let txn = Transaction::new(t(1), ts(1));
        s.write(t(1), x(2), 99).unwrap();
        match s.read(&txn, x(2), true).unwrap() {
            SiteRead::Served(v) => {
                assert_eq!(v.value, 99);
                assert_eq!(v.provenance, Provenance::Uncommitted);
            }
            SiteRead::Unavailable => panic!("expected a served read"),
        }
    }

    #[test]
    fn test_read_sees_snapshot_not_later_commit() {
        let mut s = site();
        let reader = Transaction::new(t(1), ts(2));
        s.write(t(2), x(2), 55).unwrap();
        s.commit(t(2), ts(5)).unwrap();

        assert_eq!(served_value(s.read(&reader, x(2), true).unwrap()), 20);

        let later = Transaction::new(t(3), ts(6));
        assert_eq!(served_value(s.read(&later, x(2), true).unwrap()), 55);
    }

    #[test]
    fn test_read_refused_when_down_since_last_commit() {
        let mut s = site();
        s.fail(ts(3)).unwrap();
        s.recover(ts(4)).unwrap();

        let txn = Transaction::new(t(1), ts(5));
        assert_eq!(s.read(&txn, x(2), true).unwrap(), SiteRead::Unavailable);
        // Without enforcement the committed value is still served
        assert_eq!(served_value(s.read(&txn, x(2), false).unwrap()), 20);
    }

    #[test]
    fn test_read_allowed_after_commit_following_recovery() {
        let mut s = site();
        s.fail(ts(3)).unwrap();
        s.recover(ts(4)).unwrap();
        s.write(t(9), x(2), 77).unwrap();
        s.commit(t(9), ts(6)).unwrap();

        let txn = Transaction::new(t(1), ts(7));
        assert_eq!(served_value(s.read(&txn, x(2), true).unwrap()), 77);
    }

    #[test]
    fn test_read_allowed_when_failure_after_start() {
        let mut s = site();
        let txn = Transaction::new(t(1), ts(2));
        s.fail(ts(3)).unwrap();
        s.recover(ts(4)).unwrap();
        assert_eq!(served_value(s.read(&txn, x(2), true).unwrap()), 20);
    }

    #[test]
    fn test_read_refused_when_down_around_own_write() {
        let mut s = site();
        let mut txn = Transaction::new(t(1), ts(1));
        let idx = txn.push(Operation::Write(WriteOperation::new(t(1), x(2), 5, ts(4))));
        txn.operation_mut(idx).unwrap().mark_executed(ts(4));

        s.fail(ts(3)).unwrap();
        s.recover(ts(6)).unwrap();

        assert_eq!(s.read(&txn, x(2), true).unwrap(), SiteRead::Unavailable);
    }

    #[test]
    fn test_read_on_down_site_unavailable() {
        let mut s = site();
        s.fail(ts(2)).unwrap();
        let txn = Transaction::new(t(1), ts(3));
        assert_eq!(s.read(&txn, x(2), false).unwrap(), SiteRead::Unavailable);
    }

    // === Writes ===

    #[test]
    fn test_write_refused_when_down() {
        let mut s = site();
        s.fail(ts(1)).unwrap();
        assert!(!s.write(t(1), x(2), 5).unwrap());
        assert!(!s.has_buffer(t(1)));
    }

    #[test]
    fn test_write_unknown_variable_is_error() {
        let mut s = site();
        assert!(s.write(t(1), x(7), 5).is_err());
    }

    // === Commit / abort ===

    #[test]
    fn test_commit_installs_versions_and_clears_buffer() {
        let mut s = site();
        s.write(t(1), x(2), 5).unwrap();
        s.write(t(1), x(4), 6).unwrap();
        let written = s.commit(t(1), ts(3)).unwrap();

        assert_eq!(written, vec![x(2), x(4)]);
        assert_eq!(s.dump(), vec![(x(2), 5), (x(4), 6)]);
        assert!(!s.has_buffer(t(1)));
    }

    #[test]
    fn test_commit_without_buffer_is_noop() {
        let mut s = site();
        assert!(s.commit(t(1), ts(3)).unwrap().is_empty());
        assert_eq!(s.dump(), vec![(x(2), 20), (x(4), 40)]);
    }

    #[test]
    fn test_abort_discards_buffer_only() {
        let mut s = site();
        s.write(t(1), x(2), 5).unwrap();
        s.abort(t(1));
        assert!(!s.has_buffer(t(1)));
        assert_eq!(s.dump(), vec![(x(2), 20), (x(4), 40)]);
    }

    #[test]
    fn test_precommit_detects_newer_commit() {
        let mut s = site();
        let late = Transaction::new(t(2), ts(1));
        s.write(t(1), x(2), 5).unwrap();
        s.commit(t(1), ts(3)).unwrap();

        s.write(t(2), x(2), 6).unwrap();
        assert_eq!(s.precommit_check(&late).unwrap(), Precommit::Conflict(x(2)));
    }

    #[test]
    fn test_precommit_clear_when_commit_before_start() {
        let mut s = site();
        s.write(t(1), x(2), 5).unwrap();
        s.commit(t(1), ts(3)).unwrap();

        let fresh = Transaction::new(t(2), ts(4));
        s.write(t(2), x(2), 6).unwrap();
        assert_eq!(s.precommit_check(&fresh).unwrap(), Precommit::Clear);
    }

    #[test]
    fn test_check_install_rejects_commit_at_latest_tick() {
        let mut s = site();
        s.write(t(1), x(2), 5).unwrap();
        s.commit(t(1), ts(3)).unwrap();
        s.write(t(2), x(2), 6).unwrap();

        let err = s.check_install(t(2), ts(3)).unwrap_err();
        assert_eq!(
            err,
            SiteError::Mvcc(MvccError::NonMonotonicCommit {
                latest: ts(3),
                attempted: ts(3),
            })
        );
        // buffer and history untouched
        assert!(s.has_buffer(t(2)));
        assert_eq!(s.dump(), vec![(x(2), 5), (x(4), 40)]);
        assert!(s.check_install(t(2), ts(4)).is_ok());
        assert!(s.check_install(t(9), ts(0)).is_ok());
    }

    // === Failure / recovery ===

    #[test]
    fn test_fail_discards_all_buffers_keeps_history() {
        let mut s = site();
        s.write(t(1), x(2), 5).unwrap();
        s.write(t(2), x(4), 6).unwrap();
        s.fail(ts(3)).unwrap();

        assert!(!s.is_up());
        assert!(!s.has_buffer(t(1)));
        assert!(!s.has_buffer(t(2)));

        s.recover(ts(4)).unwrap();
        assert!(s.is_up());
        assert_eq!(s.dump(), vec![(x(2), 20), (x(4), 40)]);
    }

    #[test]
    fn test_fail_twice_is_error() {
        let mut s = site();
        s.fail(ts(1)).unwrap();
        assert_eq!(s.fail(ts(2)), Err(SiteError::AlreadyDown(SiteId::new(1))));
    }
}
