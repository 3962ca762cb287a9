//! Outcomes reported by the coordinator
//!
//! Protocol aborts and deferrals are values, not errors.

use std::fmt;

use crate::model::{SiteId, TransactionId, VariableId};
use crate::mvcc::Timestamp;
use crate::site::ReadValue;

/// Why a transaction was aborted.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AbortReason {
    /// A read or write was still waiting on a down site at commit.
    PendingOperation,
    /// First-committer-wins: another transaction committed this variable
    /// after this transaction began.
    WriteConflict { variable: VariableId, site: SiteId },
    /// Admission to the serialization graph would close a cycle.
    SerializationCycle,
    /// A site holding this transaction's buffered writes failed.
    SiteFailure(SiteId),
    /// Every copy of a replicated variable is up and none can serve the
    /// snapshot.
    UnreadableVariable(VariableId),
    /// Every site a read was queued on recovered without serving it.
    QueuedReadUnservable(VariableId),
    /// A site refused to install the writes after graph admission.
    InstallFailed(SiteId),
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbortReason::PendingOperation => write!(f, "operation still pending at commit"),
            AbortReason::WriteConflict { variable, site } => {
                write!(f, "{} committed by another transaction at site {}", variable, site)
            }
            AbortReason::SerializationCycle => write!(f, "serialization graph cycle"),
            AbortReason::SiteFailure(site) => write!(f, "site {} failed", site),
            AbortReason::UnreadableVariable(variable) => {
                write!(f, "no up site can serve {}", variable)
            }
            AbortReason::QueuedReadUnservable(variable) => {
                write!(f, "queued read of {} cannot be served", variable)
            }
            AbortReason::InstallFailed(site) => {
                write!(f, "site {} could not install the commit", site)
            }
        }
    }
}

/// Result of `Coordinator::read`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ReadOutcome {
    Value(ReadValue),
    /// Queued on down sites until they recover.
    Pending,
    Aborted(AbortReason),
    /// The transaction already committed or aborted.
    Rejected,
}

/// Result of `Coordinator::write`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Buffered at these sites.
    Accepted { sites: Vec<SiteId> },
    /// Every owning site is down; queued on all of them.
    Pending,
    Rejected,
}

/// Result of `Coordinator::commit`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CommitOutcome {
    Committed(Timestamp),
    Aborted(AbortReason),
    Rejected,
}

/// How a finished transaction ended.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TransactionStatus {
    Active,
    Committed(Timestamp),
    Aborted(AbortReason),
}

/// One effect of draining a recovered site's wait queue.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecoveryEvent {
    /// A queued read served by the recovered site.
    ReadServed(TransactionId, ReadValue),
    /// A queued write buffered at the recovered site.
    WriteApplied(TransactionId, VariableId),
    /// The last site a queued read waited on could not serve it.
    Aborted(TransactionId, AbortReason),
}

/// What draining a recovered site's wait queue did, in drain order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    pub events: Vec<RecoveryEvent>,
}

/// Committed values at one site.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SiteDump {
    pub site: SiteId,
    pub values: Vec<(VariableId, crate::model::Value)>,
}

impl fmt::Display for SiteDump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "site {} -", self.site)?;
        for (i, (variable, value)) in self.values.iter().enumerate() {
            let sep = if i == 0 { " " } else { ", " };
            write!(f, "{}{}: {}", sep, variable, value)?;
        }
        Ok(())
    }
}
