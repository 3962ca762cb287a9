//! acsidb - Replicated multi-version database simulator
//!
//! Transactions run under snapshot isolation over a set of in-process
//! sites. Replicated variables follow the available-copies rule; commits
//! are validated with first-committer-wins and a serialization graph.

pub mod cli;
pub mod config;
pub mod coordinator;
pub mod graph;
pub mod model;
pub mod mvcc;
pub mod observability;
pub mod script;
pub mod site;
