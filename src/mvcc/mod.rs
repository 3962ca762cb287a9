//! MVCC Domain Types
//!
//! This module provides:
//! - `Timestamp` - Totally ordered logical tick
//! - `LogicalClock` - Per-simulation clock, one tick per command
//! - `Version` - Immutable committed value
//! - `VersionChain` - Append-only version history with snapshot visibility

mod clock;
mod errors;
mod timestamp;
mod version;
mod version_chain;

pub use clock::LogicalClock;
pub use errors::{MvccError, MvccResult};
pub use timestamp::Timestamp;
pub use version::Version;
pub use version_chain::VersionChain;
