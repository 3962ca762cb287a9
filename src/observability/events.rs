//! Observable simulation events
//!
//! Events are explicit and typed. Each maps to a stable string name and a
//! default severity.

use std::fmt;

use super::Severity;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Lifecycle
    SimulationStart,
    SimulationComplete,
    ConfigLoaded,

    // Transactions
    TransactionBegin,
    TransactionCommit,
    TransactionAbort,
    /// Operation on a transaction that already committed or aborted
    OperationRejected,

    // Data access
    ReadServed,
    /// A site refused a read under the available-copies rule
    ReadRefused,
    WriteBuffered,
    /// Read or write placed on a down site's wait queue
    OperationQueued,

    // Validation
    WriteConflict,
    GraphCycle,

    // Sites
    SiteFail,
    SiteRecover,
    WaitQueueDrained,

    // Driver
    ParseFailed,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::SimulationStart => "SIMULATION_START",
            Event::SimulationComplete => "SIMULATION_COMPLETE",
            Event::ConfigLoaded => "CONFIG_LOADED",

            Event::TransactionBegin => "TXN_BEGIN",
            Event::TransactionCommit => "TXN_COMMIT",
            Event::TransactionAbort => "TXN_ABORT",
            Event::OperationRejected => "OP_REJECTED",

            Event::ReadServed => "READ_SERVED",
            Event::ReadRefused => "READ_REFUSED",
            Event::WriteBuffered => "WRITE_BUFFERED",
            Event::OperationQueued => "OP_QUEUED",

            Event::WriteConflict => "FIRST_COMMITTER_CONFLICT",
            Event::GraphCycle => "SERIALIZATION_CYCLE",

            Event::SiteFail => "SITE_FAIL",
            Event::SiteRecover => "SITE_RECOVER",
            Event::WaitQueueDrained => "WAIT_QUEUE_DRAINED",

            Event::ParseFailed => "PARSE_FAILED",
        }
    }

    /// Default severity for this event.
    pub fn severity(&self) -> Severity {
        match self {
            Event::ParseFailed => Severity::Fatal,
            Event::OperationRejected => Severity::Warn,
            Event::ReadServed
            | Event::ReadRefused
            | Event::WriteBuffered
            | Event::OperationQueued
            | Event::WaitQueueDrained => Severity::Trace,
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
