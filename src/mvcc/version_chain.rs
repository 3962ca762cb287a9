//! VersionChain - Version history for a single variable at a single site
//!
//! - Versions are kept in commit order
//! - Commit timestamps are strictly increasing
//! - The first version (tick 0) is the initial value and is never removed
//!
//! Visibility rule: given a snapshot tick `S`, the visible version is the
//! one with the largest `commit_ts <= S`. Because index 0 is committed at
//! tick 0 a visible version always exists.

use super::errors::{MvccError, MvccResult};
use super::{Timestamp, Version};
use crate::model::Value;

/// The complete committed history of one variable copy.
#[derive(Clone, Debug)]
pub struct VersionChain {
    /// Never empty. Index 0 is the tick-0 initial value.
    versions: Vec<Version>,
}

impl VersionChain {
    /// Creates a chain seeded with the initial value at tick 0.
    pub fn new(initial_value: Value) -> Self {
        Self {
            versions: vec![Version::new(initial_value, Timestamp::ZERO)],
        }
    }

    /// Returns the number of versions in this chain.
    #[inline]
    pub fn len(&self) -> usize {
        self.versions.len()
    }

    /// Always false; kept for API symmetry with `len`.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    /// Returns all versions in commit order.
    #[inline]
    pub fn versions(&self) -> &[Version] {
        &self.versions
    }

    /// Returns the most recently committed version.
    pub fn latest(&self) -> &Version {
        // versions is seeded in `new` and only ever grows
        &self.versions[self.versions.len() - 1]
    }

    /// Appends a newly committed version.
    ///
    /// Fails if `commit_ts` does not strictly follow the latest version.
    pub fn push(&mut self, value: Value, commit_ts: Timestamp) -> MvccResult<()> {
        let latest = self.latest().commit_ts();
        if commit_ts <= latest {
            return Err(MvccError::NonMonotonicCommit {
                latest,
                attempted: commit_ts,
            });
        }
        self.versions.push(Version::new(value, commit_ts));
        Ok(())
    }

    /// Finds the version visible to a snapshot taken at `snapshot`.
    ///
    /// Walks backward from the newest version and stops at index 0.
    pub fn visible_at(&self, snapshot: Timestamp) -> &Version {
        let mut i = self.versions.len() - 1;
        while i > 0 && self.versions[i].commit_ts() > snapshot {
            i -= 1;
        }
        &self.versions[i]
    }
}
