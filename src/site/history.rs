//! SiteHistory - Up/down history of one site
//!
//! Two time-ordered sequences: the ticks at which the site went down and
//! the ticks at which it came back up.
//!
//! Invariant:
//! - up:   `down.len() == boot.len()`
//! - down: `down.len() == boot.len() + 1`

use super::errors::{SiteError, SiteResult};
use crate::model::SiteId;
use crate::mvcc::Timestamp;

#[derive(Clone, Debug, Default)]
pub struct SiteHistory {
    down: Vec<Timestamp>,
    boot: Vec<Timestamp>,
}

impl SiteHistory {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_up(&self) -> bool {
        self.down.len() == self.boot.len()
    }

    pub fn down_times(&self) -> &[Timestamp] {
        &self.down
    }

    pub fn boot_times(&self) -> &[Timestamp] {
        &self.boot
    }

    /// Records the site going down at `at`.
    pub fn record_down(&mut self, site: SiteId, at: Timestamp) -> SiteResult<()> {
        if !self.is_up() {
            return Err(SiteError::AlreadyDown(site));
        }
        self.down.push(at);
        Ok(())
    }

    /// Records the site coming back up at `at`.
    pub fn record_boot(&mut self, site: SiteId, at: Timestamp) -> SiteResult<()> {
        if self.is_up() {
            return Err(SiteError::AlreadyUp(site));
        }
        self.boot.push(at);
        Ok(())
    }

    /// True if the site went down at any tick in `[from, to]`.
    pub fn went_down_within(&self, from: Timestamp, to: Timestamp) -> bool {
        self.down.iter().any(|&d| d >= from && d <= to)
    }

    /// True if some completed down period strictly encloses `at`.
    pub fn was_down_around(&self, at: Timestamp) -> bool {
        self.down
            .iter()
            .zip(self.boot.iter())
            .any(|(&d, &b)| at > d && at < b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(n: u64) -> Timestamp {
        Timestamp::new(n)
    }

    fn site() -> SiteId {
        SiteId::new(1)
    }

    #[test]
    fn test_new_history_is_up() {
        let h = SiteHistory::new();
        assert!(h.is_up());
        assert!(h.down_times().is_empty());
    }

    #[test]
    fn test_down_then_boot_keeps_lengths_paired() {
        let mut h = SiteHistory::new();
        h.record_down(site(), ts(3)).unwrap();
        assert!(!h.is_up());
        assert_eq!(h.down_times().len(), h.boot_times().len() + 1);

        h.record_boot(site(), ts(5)).unwrap();
        assert!(h.is_up());
        assert_eq!(h.down_times().len(), h.boot_times().len());
    }

    #[test]
    fn test_double_down_rejected() {
        let mut h = SiteHistory::new();
        h.record_down(site(), ts(3)).unwrap();
        assert_eq!(
            h.record_down(site(), ts(4)),
            Err(SiteError::AlreadyDown(site()))
        );
    }

    #[test]
    fn test_boot_while_up_rejected() {
        let mut h = SiteHistory::new();
        assert_eq!(h.record_boot(site(), ts(1)), Err(SiteError::AlreadyUp(site())));
    }

    #[test]
    fn test_went_down_within_is_inclusive() {
        let mut h = SiteHistory::new();
        h.record_down(site(), ts(5)).unwrap();
        h.record_boot(site(), ts(8)).unwrap();

        assert!(h.went_down_within(ts(5), ts(5)));
        assert!(h.went_down_within(ts(0), ts(10)));
        assert!(!h.went_down_within(ts(6), ts(10)));
        assert!(!h.went_down_within(ts(0), ts(4)));
    }

    #[test]
    fn test_was_down_around_is_strict() {
        let mut h = SiteHistory::new();
        h.record_down(site(), ts(5)).unwrap();
        h.record_boot(site(), ts(8)).unwrap();

        assert!(h.was_down_around(ts(6)));
        assert!(!h.was_down_around(ts(5)));
        assert!(!h.was_down_around(ts(8)));
        assert!(!h.was_down_around(ts(9)));
    }

    #[test]
    fn test_open_down_period_does_not_enclose() {
        let mut h = SiteHistory::new();
        h.record_down(site(), ts(5)).unwrap();
        assert!(!h.was_down_around(ts(6)));
    }
}
