//! Site store error types
//!
//! These are configuration or usage errors. Protocol refusals (a down
//! site, an untrustworthy replica, a write conflict) are returned as
//! values, never as errors.

use thiserror::Error;

use crate::model::{SiteId, VariableId};
use crate::mvcc::MvccError;

/// Result type for site store operations
pub type SiteResult<T> = Result<T, SiteError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SiteError {
    #[error("variable {variable} is not stored at site {site}")]
    UnknownVariable { site: SiteId, variable: VariableId },

    #[error("variable {variable} registered twice at site {site}")]
    DuplicateVariable { site: SiteId, variable: VariableId },

    #[error("site {0} is already down")]
    AlreadyDown(SiteId),

    #[error("site {0} is already up")]
    AlreadyUp(SiteId),

    #[error(transparent)]
    Mvcc(#[from] MvccError),
}
