//! Site stores
//!
//! One `SiteStore` per simulated site. Each holds the multiversion
//! history of its variables, the uncommitted write buffers of active
//! transactions, and its up/down history.

mod errors;
mod history;
mod store;

pub use errors::{SiteError, SiteResult};
pub use history::SiteHistory;
pub use store::{Precommit, Provenance, ReadValue, SiteRead, SiteStore};
