//! Shared data model
//!
//! Identifiers, the operation log variants, and the transaction record
//! that the site stores, the coordinator, and the serialization graph all
//! agree on.

mod ids;
mod operation;
mod transaction;

pub use ids::{SiteId, TransactionId, Value, VariableId};
pub use operation::{AccessKind, CommitOperation, Operation, ReadOperation, WriteOperation};
pub use transaction::{OperationIndex, Transaction};
