//! Version - One committed value of a variable
//!
//! A version is immutable once created. Updates append new versions to
//! the owning chain; nothing is ever rewritten in place.

use super::Timestamp;
use crate::model::Value;

/// A single committed value together with the tick it was committed at.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Version {
    value: Value,
    commit_ts: Timestamp,
}

impl Version {
    /// Creates a version.
    pub fn new(value: Value, commit_ts: Timestamp) -> Self {
        Self { value, commit_ts }
    }

    /// Returns the committed value.
    #[inline]
    pub fn value(&self) -> Value {
        self.value
    }

    /// Returns the commit tick.
    #[inline]
    pub fn commit_ts(&self) -> Timestamp {
        self.commit_ts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_accessors() {
        let v = Version::new(20, Timestamp::new(5));
        assert_eq!(v.value(), 20);
        assert_eq!(v.commit_ts(), Timestamp::new(5));
    }

    #[test]
    fn test_version_is_copy() {
        let a = Version::new(1, Timestamp::ZERO);
        let b = a;
        assert_eq!(a, b);
    }
}
