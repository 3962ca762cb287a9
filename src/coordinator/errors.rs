//! Coordinator error types
//!
//! Only usage and configuration errors are represented here. Every one of
//! them is fatal for the run.

use thiserror::Error;

use crate::model::{SiteId, TransactionId, VariableId};
use crate::site::SiteError;

/// Result type for coordinator operations
pub type CoordinatorResult<T> = Result<T, CoordinatorError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoordinatorError {
    #[error("unknown transaction {0}")]
    UnknownTransaction(TransactionId),

    #[error("transaction {0} already exists")]
    DuplicateTransaction(TransactionId),

    #[error("unknown site {0}")]
    UnknownSite(SiteId),

    #[error("no site stores {0}")]
    NoSitesForVariable(VariableId),

    #[error(transparent)]
    Site(#[from] SiteError),
}
