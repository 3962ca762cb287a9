//! SerializationGraph - Conflict graph over validated transactions
//!
//! Nodes are keyed by transaction id and carry the transaction's
//! footprint, so edge derivation never needs the live transaction.
//!
//! Edge rules for a pair of accesses to the same variable:
//! - write/write: earlier commit -> later commit
//! - read/write: if the reader's snapshot precedes the writer's commit the
//!   reader saw an older version and must serialize first
//!   (reader -> writer, anti-dependency); otherwise writer -> reader
//!
//! The graph only shrinks when a newly inserted node closes a cycle.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};

use super::Footprint;
use crate::model::{Transaction, TransactionId};
use crate::mvcc::Timestamp;
use crate::observability::{log_event_with_fields, Event};

/// Kind of conflict an edge encodes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EdgeKind {
    WriteWrite,
    WriteRead,
    /// Anti-dependency: the source read a version the target overwrote.
    ReadWrite,
}

/// What counts as a non-serializable cycle.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleCriterion {
    /// Reject on any directed cycle.
    #[default]
    AnyCycle,
    /// Reject only cycles containing two consecutive anti-dependency edges.
    ConsecutiveAntiDependencies,
}

#[derive(Clone, Debug)]
struct Node {
    footprint: Footprint,
    edges: BTreeMap<TransactionId, BTreeSet<EdgeKind>>,
}

#[derive(Clone, Debug, Default)]
pub struct SerializationGraph {
    criterion: CycleCriterion,
    nodes: BTreeMap<TransactionId, Node>,
}

impl SerializationGraph {
    pub fn new(criterion: CycleCriterion) -> Self {
        Self {
            criterion,
            nodes: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: TransactionId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Outgoing edges of `id`, ordered by target.
    pub fn edges_from(&self, id: TransactionId) -> Vec<(TransactionId, EdgeKind)> {
        self.nodes
            .get(&id)
            .map(|node| {
                node.edges
                    .iter()
                    .flat_map(|(&to, kinds)| kinds.iter().map(move |&k| (to, k)))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Admits `transaction` committing at `commit_ts` unless doing so
    /// closes a cycle. Returns true if admitted.
    pub fn validate_and_admit(&mut self, transaction: &Transaction, commit_ts: Timestamp) -> bool {
        let footprint = Footprint::of(transaction, commit_ts);
        let id = footprint.id;
        self.insert_node(footprint);
        self.connect(id);

        if self.has_cycle() {
            log_event_with_fields(
                Event::GraphCycle,
                &[
                    ("criterion", &format!("{:?}", self.criterion)),
                    ("txn", &id.to_string()),
                ],
            );
            self.remove_node(id);
            return false;
        }
        true
    }

    /// Inserts a node with no edges, replacing any node with the same id.
    pub fn insert_node(&mut self, footprint: Footprint) {
        self.nodes.insert(
            footprint.id,
            Node {
                footprint,
                edges: BTreeMap::new(),
            },
        );
    }

    /// Adds a labelled edge. Ignored if either endpoint is missing.
    pub fn add_edge(&mut self, from: TransactionId, to: TransactionId, kind: EdgeKind) {
        if from == to || !self.nodes.contains_key(&to) {
            return;
        }
        if let Some(node) = self.nodes.get_mut(&from) {
            node.edges.entry(to).or_default().insert(kind);
        }
    }

    /// Removes the node and every edge touching it.
    pub fn remove_node(&mut self, id: TransactionId) {
        self.nodes.remove(&id);
        for node in self.nodes.values_mut() {
            node.edges.remove(&id);
        }
    }

    /// Derives every conflict edge between `id` and the rest of the graph.
    fn connect(&mut self, id: TransactionId) {
        let Some(new) = self.nodes.get(&id).map(|n| n.footprint.clone()) else {
            return;
        };
        let mut edges = Vec::new();
        for (&other_id, other) in &self.nodes {
            if other_id == id {
                continue;
            }
            edges.extend(conflict_edges(&new, &other.footprint));
        }
        for (from, to, kind) in edges {
            self.add_edge(from, to, kind);
        }
    }

    /// Cycle test under the configured criterion.
    pub fn has_cycle(&self) -> bool {
        match self.criterion {
            CycleCriterion::AnyCycle => self.has_any_cycle(),
            CycleCriterion::ConsecutiveAntiDependencies => self.has_dangerous_cycle(),
        }
    }

    fn has_any_cycle(&self) -> bool {
        let mut visited = BTreeSet::new();
        let mut on_stack = BTreeSet::new();
        self.nodes
            .keys()
            .any(|&id| self.dfs(id, &mut on_stack, &mut visited))
    }

    fn dfs(
        &self,
        id: TransactionId,
        on_stack: &mut BTreeSet<TransactionId>,
        visited: &mut BTreeSet<TransactionId>,
    ) -> bool {
        if on_stack.contains(&id) {
            return true;
        }
        if !visited.insert(id) {
            return false;
        }
        on_stack.insert(id);
        if let Some(node) = self.nodes.get(&id) {
            for &child in node.edges.keys() {
                if self.dfs(child, on_stack, visited) {
                    return true;
                }
            }
        }
        on_stack.remove(&id);
        false
    }

    /// Looks for `a -rw-> b -rw-> c` where `c` reaches back to `a`.
    fn has_dangerous_cycle(&self) -> bool {
        for (&a, node) in &self.nodes {
            for (&b, kinds) in &node.edges {
                if !kinds.contains(&EdgeKind::ReadWrite) {
                    continue;
                }
                let Some(pivot) = self.nodes.get(&b) else {
                    continue;
                };
                for (&c, kinds) in &pivot.edges {
                    if kinds.contains(&EdgeKind::ReadWrite) && self.reaches(c, a) {
                        return true;
                    }
                }
            }
        }
        false
    }

    fn reaches(&self, from: TransactionId, to: TransactionId) -> bool {
        let mut seen = BTreeSet::new();
        let mut queue = VecDeque::from([from]);
        while let Some(id) = queue.pop_front() {
            if id == to {
                return true;
            }
            if !seen.insert(id) {
                continue;
            }
            if let Some(node) = self.nodes.get(&id) {
                queue.extend(node.edges.keys().copied());
            }
        }
        false
    }
}

/// Conflict edges between two footprints, as `(from, to, kind)`.
fn conflict_edges(a: &Footprint, b: &Footprint) -> Vec<(TransactionId, TransactionId, EdgeKind)> {
    let mut edges = Vec::new();

    if a.writes.intersection(&b.writes).next().is_some() {
        if a.commit_ts <= b.commit_ts {
            edges.push((a.id, b.id, EdgeKind::WriteWrite));
        } else {
            edges.push((b.id, a.id, EdgeKind::WriteWrite));
        }
    }
    if a.writes.intersection(&b.reads).next().is_some() {
        edges.push(read_write_edge(b, a));
    }
    if a.reads.intersection(&b.writes).next().is_some() {
        edges.push(read_write_edge(a, b));
    }
    edges
}

fn read_write_edge(
    reader: &Footprint,
    writer: &Footprint,
) -> (TransactionId, TransactionId, EdgeKind) {
    if reader.start_ts < writer.commit_ts {
        (reader.id, writer.id, EdgeKind::ReadWrite)
    } else {
        (writer.id, reader.id, EdgeKind::WriteRead)
    }
}
