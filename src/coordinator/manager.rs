//! Coordinator - Transaction lifecycle and multi-site routing
//!
//! The coordinator is the only component that talks to more than one
//! site. It owns:
//! - the logical clock
//! - the registry of active transactions
//! - the variable -> sites routing table
//! - per-site active-writer sets and wait queues
//! - the serialization graph
//!
//! Every public operation runs to completion before the next one starts.
//! Callers sharing a coordinator across threads must hold one lock around
//! each call.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::errors::{CoordinatorError, CoordinatorResult};
use super::outcome::{
    AbortReason, CommitOutcome, ReadOutcome, RecoveryEvent, RecoveryReport, SiteDump,
    TransactionStatus, WriteOutcome,
};
use super::wait_queue::WaitQueue;
use crate::config::SimulationConfig;
use crate::graph::{CycleCriterion, SerializationGraph};
use crate::model::{
    CommitOperation, Operation, OperationIndex, ReadOperation, SiteId, Transaction,
    TransactionId, Value, VariableId, WriteOperation,
};
use crate::mvcc::{LogicalClock, Timestamp};
use crate::observability::{log_event_with_fields, Event};
use crate::site::{Precommit, SiteRead, SiteStore};

/// Work recovered from a wait queue entry.
enum Retry {
    Read(VariableId),
    Write(VariableId, Value),
}

#[derive(Debug)]
pub struct Coordinator {
    clock: LogicalClock,
    sites: BTreeMap<SiteId, SiteStore>,
    placement: BTreeMap<VariableId, Vec<SiteId>>,
    active: BTreeMap<TransactionId, Transaction>,
    committed: BTreeMap<TransactionId, Transaction>,
    aborted: HashMap<TransactionId, AbortReason>,
    writers: BTreeMap<SiteId, BTreeSet<TransactionId>>,
    wait_queues: BTreeMap<SiteId, WaitQueue>,
    graph: SerializationGraph,
}

impl Coordinator {
    /// Builds a coordinator over already-populated sites. The routing
    /// table is derived from the variables each site manages.
    pub fn new(sites: Vec<SiteStore>, criterion: CycleCriterion) -> Self {
        let mut placement: BTreeMap<VariableId, Vec<SiteId>> = BTreeMap::new();
        let mut by_id = BTreeMap::new();
        let mut writers = BTreeMap::new();
        let mut wait_queues = BTreeMap::new();

        for site in sites {
            let id = site.site_id();
            for variable in site.managed_variables() {
                placement.entry(variable).or_default().push(id);
            }
            writers.insert(id, BTreeSet::new());
            wait_queues.insert(id, WaitQueue::default());
            by_id.insert(id, site);
        }
        for owners in placement.values_mut() {
            owners.sort();
        }

        Self {
            clock: LogicalClock::new(),
            sites: by_id,
            placement,
            active: BTreeMap::new(),
            committed: BTreeMap::new(),
            aborted: HashMap::new(),
            writers,
            wait_queues,
            graph: SerializationGraph::new(criterion),
        }
    }

    /// Creates the sites described by `config` and registers every
    /// variable's initial value at tick 0.
    pub fn from_config(config: &SimulationConfig) -> CoordinatorResult<Self> {
        let mut sites: BTreeMap<SiteId, SiteStore> = config
            .site_ids()
            .map(|id| (id, SiteStore::new(id)))
            .collect();

        for variable in config.variable_ids() {
            let value = config.initial_value(variable);
            for site_id in config.placement(variable) {
                sites
                    .get_mut(&site_id)
                    .ok_or(CoordinatorError::UnknownSite(site_id))?
                    .register(variable, value)?;
            }
        }

        Ok(Self::new(sites.into_values().collect(), config.cycle_criterion))
    }

    // =========================================================================
    // Clock
    // =========================================================================

    /// Current tick.
    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// Advances the clock. Called once per processed command.
    pub fn tick(&mut self) -> Timestamp {
        self.clock.advance()
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    pub fn is_active(&self, id: TransactionId) -> bool {
        self.active.contains_key(&id)
    }

    /// Lifecycle state of `id`, if it was ever begun.
    pub fn status(&self, id: TransactionId) -> Option<TransactionStatus> {
        if self.active.contains_key(&id) {
            return Some(TransactionStatus::Active);
        }
        if let Some(ts) = self.committed.get(&id).and_then(Transaction::commit_ts) {
            return Some(TransactionStatus::Committed(ts));
        }
        self.aborted.get(&id).map(|&r| TransactionStatus::Aborted(r))
    }

    /// Active or committed transaction record.
    pub fn transaction(&self, id: TransactionId) -> Option<&Transaction> {
        self.active.get(&id).or_else(|| self.committed.get(&id))
    }

    pub fn site(&self, id: SiteId) -> Option<&SiteStore> {
        self.sites.get(&id)
    }

    pub fn is_site_up(&self, id: SiteId) -> CoordinatorResult<bool> {
        self.site_ref(id).map(SiteStore::is_up)
    }

    /// Sites holding `variable`, ascending.
    pub fn sites_for(&self, variable: VariableId) -> CoordinatorResult<&[SiteId]> {
        match self.placement.get(&variable) {
            Some(owners) if !owners.is_empty() => Ok(owners.as_slice()),
            _ => Err(CoordinatorError::NoSitesForVariable(variable)),
        }
    }

    /// Number of operations waiting on `site`.
    pub fn queued_on(&self, site: SiteId) -> usize {
        self.wait_queues.get(&site).map_or(0, WaitQueue::len)
    }

    /// Transactions with buffered writes on `site`.
    pub fn writers_on(&self, site: SiteId) -> Vec<TransactionId> {
        self.writers
            .get(&site)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn graph(&self) -> &SerializationGraph {
        &self.graph
    }

    /// Committed values at every site, ascending by site id.
    pub fn dump(&self) -> Vec<SiteDump> {
        self.sites
            .values()
            .map(|site| SiteDump {
                site: site.site_id(),
                values: site.dump(),
            })
            .collect()
    }

    // =========================================================================
    // Transaction operations
    // =========================================================================

    /// Starts a transaction whose snapshot is the current tick.
    pub fn begin(&mut self, id: TransactionId) -> CoordinatorResult<()> {
        if self.active.contains_key(&id) || self.committed.contains_key(&id) {
            return Err(CoordinatorError::DuplicateTransaction(id));
        }
        let now = self.clock.now();
        self.aborted.remove(&id);
        self.active.insert(id, Transaction::new(id, now));
        log_event_with_fields(
            Event::TransactionBegin,
            &[("tick", &now.to_string()), ("txn", &id.to_string())],
        );
        Ok(())
    }

    /// Reads `variable` for transaction `id`.
    ///
    /// Replicated variables are tried at each up site in ascending order
    /// under the available-copies rule. If no up site can serve the read:
    /// with every copy up the value is unattainable and the transaction
    /// aborts; otherwise the read waits on every down site.
    pub fn read(&mut self, id: TransactionId, variable: VariableId) -> CoordinatorResult<ReadOutcome> {
        if !self.ensure_active(id, "read")? {
            return Ok(ReadOutcome::Rejected);
        }
        let owners = self.sites_for(variable)?.to_vec();
        let replicated = owners.len() > 1;
        let now = self.clock.now();

        let txn = self
            .active
            .get_mut(&id)
            .ok_or(CoordinatorError::UnknownTransaction(id))?;
        let index = txn.push(Operation::Read(ReadOperation::new(id, variable, now)));

        let mut down = Vec::new();
        for &site_id in &owners {
            let site = self
                .sites
                .get(&site_id)
                .ok_or(CoordinatorError::UnknownSite(site_id))?;
            if !site.is_up() {
                down.push(site_id);
                continue;
            }
            if let SiteRead::Served(value) = site.read(txn, variable, replicated)? {
                mark_executed(txn, index, now);
                return Ok(ReadOutcome::Value(value));
            }
        }

        if down.is_empty() {
            let reason = self.abort(id, AbortReason::UnreadableVariable(variable));
            return Ok(ReadOutcome::Aborted(reason));
        }
        self.enqueue(id, index, &down);
        Ok(ReadOutcome::Pending)
    }

    /// Buffers `value` for `variable` at every up owning site.
    ///
    /// Down owners are skipped and the write is queued on them for
    /// catch-up. If no owner accepts, the write is queued on all of them.
    pub fn write(
        &mut self,
        id: TransactionId,
        variable: VariableId,
        value: Value,
    ) -> CoordinatorResult<WriteOutcome> {
        if !self.ensure_active(id, "write")? {
            return Ok(WriteOutcome::Rejected);
        }
        let owners = self.sites_for(variable)?.to_vec();
        let now = self.clock.now();

        let index = self
            .active
            .get_mut(&id)
            .ok_or(CoordinatorError::UnknownTransaction(id))?
            .push(Operation::Write(WriteOperation::new(id, variable, value, now)));

        let mut accepted = Vec::new();
        let mut refused = Vec::new();
        for &site_id in &owners {
            let site = self
                .sites
                .get_mut(&site_id)
                .ok_or(CoordinatorError::UnknownSite(site_id))?;
            if site.write(id, variable, value)? {
                self.writers.entry(site_id).or_default().insert(id);
                accepted.push(site_id);
            } else {
                refused.push(site_id);
            }
        }

        if accepted.is_empty() {
            self.enqueue(id, index, &owners);
            return Ok(WriteOutcome::Pending);
        }
        if let Some(txn) = self.active.get_mut(&id) {
            mark_executed(txn, index, now);
        }
        if !refused.is_empty() {
            self.enqueue(id, index, &refused);
        }
        Ok(WriteOutcome::Accepted { sites: accepted })
    }

    /// Validates and commits transaction `id`.
    ///
    /// 1. every earlier operation must have executed
    /// 2. first-committer-wins at every site holding its writes
    /// 3. serialization graph admission
    ///
    /// On success every written site installs the writes at one shared
    /// commit tick. A commit on the tick of an earlier version of one of
    /// its variables is a usage error and leaves the transaction active.
    pub fn commit(&mut self, id: TransactionId) -> CoordinatorResult<CommitOutcome> {
        if !self.ensure_active(id, "commit")? {
            return Ok(CommitOutcome::Rejected);
        }
        let now = self.clock.now();

        let pending = self
            .active
            .get(&id)
            .ok_or(CoordinatorError::UnknownTransaction(id))?
            .pending_operations()
            .next()
            .map(|op| (op.to_string(), op.created_at().to_string()));
        if let Some((pending, issued)) = pending {
            log_event_with_fields(
                Event::TransactionAbort,
                &[("issued", &issued), ("pending", &pending), ("txn", &id.to_string())],
            );
            let reason = self.abort(id, AbortReason::PendingOperation);
            return Ok(CommitOutcome::Aborted(reason));
        }

        let written_sites = self.sites_written_by(id);
        for &site_id in &written_sites {
            let txn = self
                .active
                .get(&id)
                .ok_or(CoordinatorError::UnknownTransaction(id))?;
            let site = self.site_ref(site_id)?;
            if let Precommit::Conflict(variable) = site.precommit_check(txn)? {
                log_event_with_fields(
                    Event::WriteConflict,
                    &[
                        ("site", &site_id.to_string()),
                        ("txn", &id.to_string()),
                        ("variable", &variable.to_string()),
                    ],
                );
                let reason = self.abort(
                    id,
                    AbortReason::WriteConflict {
                        variable,
                        site: site_id,
                    },
                );
                return Ok(CommitOutcome::Aborted(reason));
            }
        }
        for &site_id in &written_sites {
            self.site_ref(site_id)?.check_install(id, now)?;
        }

        let admitted = {
            let txn = self
                .active
                .get_mut(&id)
                .ok_or(CoordinatorError::UnknownTransaction(id))?;
            let commit_index = txn.push(Operation::Commit(CommitOperation::new(id, now)));
            mark_executed(txn, commit_index, now);
            self.graph.validate_and_admit(txn, now)
        };
        if !admitted {
            let reason = self.abort(id, AbortReason::SerializationCycle);
            return Ok(CommitOutcome::Aborted(reason));
        }

        for &site_id in &written_sites {
            let installed = self
                .sites
                .get_mut(&site_id)
                .ok_or(CoordinatorError::UnknownSite(site_id))
                .and_then(|site| site.commit(id, now).map_err(CoordinatorError::from));
            if let Err(e) = installed {
                self.graph.remove_node(id);
                self.abort(id, AbortReason::InstallFailed(site_id));
                return Err(e);
            }
        }

        let mut txn = self
            .active
            .remove(&id)
            .ok_or(CoordinatorError::UnknownTransaction(id))?;
        txn.set_commit_ts(now);
        self.committed.insert(id, txn);
        self.forget(id);

        log_event_with_fields(
            Event::TransactionCommit,
            &[
                ("sites", &written_sites.len().to_string()),
                ("tick", &now.to_string()),
                ("txn", &id.to_string()),
            ],
        );
        Ok(CommitOutcome::Committed(now))
    }

    // =========================================================================
    // Site failure and recovery
    // =========================================================================

    /// Takes `site_id` down. Every transaction with buffered writes there
    /// is aborted; the aborted ids are returned. No-op if already down.
    pub fn fail(&mut self, site_id: SiteId) -> CoordinatorResult<Vec<TransactionId>> {
        let now = self.clock.now();
        let site = self
            .sites
            .get_mut(&site_id)
            .ok_or(CoordinatorError::UnknownSite(site_id))?;
        if !site.is_up() {
            return Ok(Vec::new());
        }
        site.fail(now)?;
        log_event_with_fields(
            Event::SiteFail,
            &[("site", &site_id.to_string()), ("tick", &now.to_string())],
        );

        let victims: Vec<TransactionId> = self
            .writers
            .get_mut(&site_id)
            .map(std::mem::take)
            .unwrap_or_default()
            .into_iter()
            .collect();
        for &victim in &victims {
            self.abort(victim, AbortReason::SiteFailure(site_id));
        }
        Ok(victims)
    }

    /// Brings `site_id` back up and drains its wait queue in enqueue
    /// order. No-op if already up.
    pub fn recover(&mut self, site_id: SiteId) -> CoordinatorResult<RecoveryReport> {
        let now = self.clock.now();
        let site = self
            .sites
            .get_mut(&site_id)
            .ok_or(CoordinatorError::UnknownSite(site_id))?;
        if site.is_up() {
            return Ok(RecoveryReport::default());
        }
        site.recover(now)?;
        log_event_with_fields(
            Event::SiteRecover,
            &[("site", &site_id.to_string()), ("tick", &now.to_string())],
        );

        let queued = self
            .wait_queues
            .get_mut(&site_id)
            .map(WaitQueue::drain)
            .unwrap_or_default();
        let drained = queued.len();
        let mut report = RecoveryReport::default();

        for entry in queued {
            let owner = entry.transaction;
            let Some(txn) = self.active.get_mut(&owner) else {
                continue;
            };
            let Some(op) = txn.operation(entry.index) else {
                continue;
            };
            let executed = op.is_executed();
            let retry = match op {
                Operation::Read(read) => Retry::Read(read.variable()),
                Operation::Write(write) => Retry::Write(write.variable(), write.value()),
                Operation::Commit(_) => continue,
            };

            match retry {
                Retry::Read(variable) => {
                    if executed {
                        continue;
                    }
                    let replicated = self.placement.get(&variable).map_or(false, |o| o.len() > 1);
                    let site = self
                        .sites
                        .get(&site_id)
                        .ok_or(CoordinatorError::UnknownSite(site_id))?;
                    let served = site.read(txn, variable, replicated)?;
                    let remaining = match txn.operation_mut(entry.index) {
                        Some(Operation::Read(read)) => read.resolve_queued_site(),
                        _ => 0,
                    };
                    if let SiteRead::Served(value) = served {
                        mark_executed(txn, entry.index, now);
                        report.events.push(RecoveryEvent::ReadServed(owner, value));
                    } else if remaining == 0 {
                        let reason = self.abort(owner, AbortReason::QueuedReadUnservable(variable));
                        report.events.push(RecoveryEvent::Aborted(owner, reason));
                    }
                }
                Retry::Write(variable, value) => {
                    let site = self
                        .sites
                        .get_mut(&site_id)
                        .ok_or(CoordinatorError::UnknownSite(site_id))?;
                    if site.write(owner, variable, value)? {
                        self.writers.entry(site_id).or_default().insert(owner);
                        mark_executed(txn, entry.index, now);
                        report.events.push(RecoveryEvent::WriteApplied(owner, variable));
                    }
                }
            }
        }

        let aborted = report
            .events
            .iter()
            .filter(|e| matches!(e, RecoveryEvent::Aborted(..)))
            .count();
        log_event_with_fields(
            Event::WaitQueueDrained,
            &[
                ("aborted", &aborted.to_string()),
                ("entries", &drained.to_string()),
                ("site", &site_id.to_string()),
            ],
        );
        Ok(report)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn site_ref(&self, id: SiteId) -> CoordinatorResult<&SiteStore> {
        self.sites.get(&id).ok_or(CoordinatorError::UnknownSite(id))
    }

    /// Ok(true) if active, Ok(false) if already finished, error if never
    /// begun.
    fn ensure_active(&self, id: TransactionId, what: &str) -> CoordinatorResult<bool> {
        if self.active.contains_key(&id) {
            return Ok(true);
        }
        if self.committed.contains_key(&id) || self.aborted.contains_key(&id) {
            log_event_with_fields(
                Event::OperationRejected,
                &[("operation", what), ("txn", &id.to_string())],
            );
            return Ok(false);
        }
        Err(CoordinatorError::UnknownTransaction(id))
    }

    fn sites_written_by(&self, id: TransactionId) -> Vec<SiteId> {
        self.writers
            .iter()
            .filter(|(_, set)| set.contains(&id))
            .map(|(&site, _)| site)
            .collect()
    }

    fn enqueue(&mut self, id: TransactionId, index: OperationIndex, sites: &[SiteId]) {
        for &site_id in sites {
            self.wait_queues.entry(site_id).or_default().push(id, index);
            if let Some(Operation::Read(read)) = self
                .active
                .get_mut(&id)
                .and_then(|txn| txn.operation_mut(index))
            {
                read.enqueue_on_site();
            }
            log_event_with_fields(
                Event::OperationQueued,
                &[("site", &site_id.to_string()), ("txn", &id.to_string())],
            );
        }
    }

    /// Discards `id`'s buffers everywhere and retires it as aborted.
    fn abort(&mut self, id: TransactionId, reason: AbortReason) -> AbortReason {
        for site_id in self.sites_written_by(id) {
            if let Some(site) = self.sites.get_mut(&site_id) {
                site.abort(id);
            }
        }
        self.forget(id);
        self.active.remove(&id);
        self.aborted.insert(id, reason);
        log_event_with_fields(
            Event::TransactionAbort,
            &[("reason", &reason.to_string()), ("txn", &id.to_string())],
        );
        reason
    }

    /// Drops `id` from every writer set and wait queue.
    fn forget(&mut self, id: TransactionId) {
        for set in self.writers.values_mut() {
            set.remove(&id);
        }
        for queue in self.wait_queues.values_mut() {
            queue.forget(id);
        }
    }
}

fn mark_executed(txn: &mut Transaction, index: OperationIndex, at: Timestamp) {
    if let Some(op) = txn.operation_mut(index) {
        op.mark_executed(at);
    }
}
