//! LogicalClock - Per-simulation tick counter
//!
//! The clock advances exactly once per processed command. It is owned by
//! the coordinator, never ambient, so independent simulations (and tests)
//! each start from tick 0.

use super::Timestamp;

/// Monotonic logical clock.
#[derive(Debug, Clone, Default)]
pub struct LogicalClock {
    now: Timestamp,
}

impl LogicalClock {
    /// Creates a clock positioned at the setup tick.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current tick.
    #[inline]
    pub fn now(&self) -> Timestamp {
        self.now
    }

    /// Advances to the next tick and returns it.
    pub fn advance(&mut self) -> Timestamp {
        self.now = self.now.next();
        self.now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_starts_at_zero() {
        let clock = LogicalClock::new();
        assert_eq!(clock.now(), Timestamp::ZERO);
    }

    #[test]
    fn test_clock_advance_is_monotonic() {
        let mut clock = LogicalClock::new();
        let t1 = clock.advance();
        let t2 = clock.advance();
        assert_eq!(t1, Timestamp::new(1));
        assert_eq!(t2, Timestamp::new(2));
        assert_eq!(clock.now(), t2);
    }

    #[test]
    fn test_clocks_are_independent() {
        let mut a = LogicalClock::new();
        let b = LogicalClock::new();
        a.advance();
        assert_eq!(b.now(), Timestamp::ZERO);
    }
}
