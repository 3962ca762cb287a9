//! Observability for the simulation
//!
//! This module provides:
//! - Structured logging (JSON lines on stderr)
//! - Typed lifecycle and protocol events
//!
//! # Principles
//!
//! 1. Observability is read-only
//! 2. No side effects on protocol decisions
//! 3. No async or background threads
//! 4. Deterministic output
//!
//! # Usage
//!
//! ```ignore
//! use acsidb::observability::{log_event_with_fields, Event};
//!
//! log_event_with_fields(Event::SiteFail, &[("site", "4")]);
//! ```

mod events;
mod logger;

pub use events::Event;
pub use logger::{Logger, Severity};

/// Log a lifecycle event with fields at its default severity
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.severity(), event.as_str(), fields);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_event_with_fields() {
        log_event_with_fields(Event::SiteFail, &[("site", "3"), ("tick", "7")]);
    }
}
