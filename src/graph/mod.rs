//! Serialization graph
//!
//! Certifies at commit time that admitting a transaction does not create
//! a non-serializable conflict cycle among committed transactions.

mod footprint;
mod serialization;

pub use footprint::Footprint;
pub use serialization::{CycleCriterion, EdgeKind, SerializationGraph};
