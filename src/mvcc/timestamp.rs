//! Timestamp - Logical clock tick
//!
//! A single totally ordered tick value is used both as a causality
//! timestamp (transaction start, site down/boot, operation execution)
//! and as the commit-order timestamp of committed versions.
//!
//! Tick 0 is the setup tick at which every initial value is committed.

use std::fmt;

/// A totally ordered logical tick.
///
/// No wall-clock meaning. Two events on the same tick happened while the
/// same command was being processed.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Default)]
pub struct Timestamp(u64);

impl Timestamp {
    /// The setup tick. Initial values are committed here.
    pub const ZERO: Timestamp = Timestamp(0);

    /// Creates a timestamp with the given tick value.
    #[inline]
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the underlying tick.
    #[inline]
    pub fn value(&self) -> u64 {
        self.0
    }

    /// Returns the next tick.
    #[inline]
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_zero_is_default() {
        assert_eq!(Timestamp::default(), Timestamp::ZERO);
        assert_eq!(Timestamp::ZERO.value(), 0);
    }

    #[test]
    fn test_timestamp_ordering() {
        let a = Timestamp::new(3);
        let b = Timestamp::new(7);
        assert!(a < b);
        assert_eq!(a.next(), Timestamp::new(4));
    }

    #[test]
    fn test_timestamp_display() {
        assert_eq!(Timestamp::new(42).to_string(), "42");
    }
}
