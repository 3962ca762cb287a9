//! MVCC error types

use thiserror::Error;

use super::Timestamp;

/// Result type for MVCC operations
pub type MvccResult<T> = Result<T, MvccError>;

/// Version history errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MvccError {
    #[error("commit at tick {attempted} does not follow latest version at tick {latest}")]
    NonMonotonicCommit {
        latest: Timestamp,
        attempted: Timestamp,
    },
}
