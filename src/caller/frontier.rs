//! A small ordered wrapper used for the pending-node priority queue, in the
//! same shape as the teacher's `FrontierItem` used to drive a
//! `BinaryHeap`-based Dijkstra frontier (`kneasle-monument`
//! `graph/src/graph.rs::build_graph`).

use std::cmp::Ordering;

use crate::kmer::Kmer;
use crate::node::NodeId;

/// One entry in the pending-node queue: orders by `first_start` ascending,
/// then `first_kmer`, then `node` id, to give a total and deterministic
/// order even when two nodes share a `first_start` (the tie-break rule
/// documented in SPEC_FULL.md §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrontierItem {
    pub first_start: i64,
    pub first_kmer: Kmer,
    pub node: NodeId,
}

impl Ord for FrontierItem {
    fn cmp(&self, other: &Self) -> Ordering {
        self.first_start
            .cmp(&other.first_start)
            .then(self.first_kmer.cmp(&other.first_kmer))
            .then(self.node.cmp(&other.node))
    }
}

impl PartialOrd for FrontierItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
