//! The sub-interval DP record and its life-cycle state.
//!
//! spec.md §4.4 models each loaded node as a *set* of sub-intervals: ranges
//! of a node's first-position interval over which the best predecessor and
//! score are constant. This implementation takes the degenerate case of
//! that model — one sub-interval per live node, spanning the node's whole
//! `[first_start, first_end]` — because a `PositionalKmerNode` already
//! arrives pre-partitioned by the upstream producer and by `WeightSplitter`
//! along every axis that would otherwise force an internal split (offset
//! weight changes produce new nodes; positional ambiguity within one node
//! is assumed to share a single best-predecessor choice). See DESIGN.md.

use ordered_float::OrderedFloat;

use crate::kmer::Kmer;
use crate::node::NodeId;

pub const ANCHORED_SCORE: f64 = 1e12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubIntervalState {
    Live,
    Callable,
    Consumed,
}

/// The memoized best path ending at a given live node.
#[derive(Debug, Clone)]
pub struct SubInterval {
    pub node: NodeId,
    pub first_start: i64,
    pub first_kmer: Kmer,
    pub last_end: i64,
    pub score: OrderedFloat<f64>,
    pub predecessor: Option<NodeId>,
    /// True once the path has touched a reference node's bonus at least
    /// once (the anchor bonus is only applied at that transition, never
    /// re-applied, per spec.md §4.4).
    pub anchored: bool,
    /// The predecessor's score at the moment this entry was last computed,
    /// used to detect staleness after a predecessor recomputes without
    /// needing to eagerly walk forward through dependents (design note §9
    /// "lazy invalidation on remove").
    pub predecessor_score_snapshot: Option<OrderedFloat<f64>>,
    pub state: SubIntervalState,
}

impl SubInterval {
    /// Deterministic tie-break key: score descending (handled by caller),
    /// then `first_start` ascending, then `first_kmer` ascending, then
    /// `node` id ascending (SPEC_FULL.md §4.4's resolution of the tie-break
    /// Open Question).
    pub fn tie_break_key(&self) -> (i64, Kmer, NodeId) {
        (self.first_start, self.first_kmer, self.node)
    }
}
