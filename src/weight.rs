//! Subtracts evidence weight from a node, splitting it into the maximal
//! runs of still-positive-weight offsets when the removal isn't uniform
//! enough to leave the whole node alive.

use crate::index::NodeIdAllocator;
use crate::node::PositionalKmerNode;

/// Subtract `per_offset_removed[i]` from `node.weights[i]` for every
/// offset, producing zero or more replacement nodes covering the maximal
/// contiguous runs of offsets whose post-reduction weight is still
/// positive. All replacement nodes carry a fresh id and must be re-added
/// to the `PathNodeIndex` and re-announced to `MemoContigCaller` by the
/// caller (spec.md §4.3).
///
/// When every offset survives, this naturally degenerates to the "uniform
/// reduction" fast path from spec.md §4.3 — a single replacement node with
/// reduced weights — without needing a separate code path, since a single
/// contiguous surviving run *is* the whole node.
pub fn split_weight(
    node: &PositionalKmerNode,
    per_offset_removed: &[u32],
    allocator: &mut NodeIdAllocator,
) -> Vec<PositionalKmerNode> {
    assert_eq!(per_offset_removed.len(), node.len());

    let new_weights: Vec<i64> = node
        .weights
        .iter()
        .zip(per_offset_removed)
        .map(|(&w, &r)| w as i64 - r as i64)
        .collect();
    debug_assert!(
        new_weights.iter().all(|&w| w >= 0),
        "removed more weight than a node carried"
    );

    let mut replacements = Vec::new();
    let mut run_start: Option<usize> = None;
    for i in 0..=node.len() {
        let survives = i < node.len() && new_weights[i] > 0;
        match (survives, run_start) {
            (true, None) => run_start = Some(i),
            (false, Some(start)) => {
                replacements.push(build_sub_node(node, start, i, &new_weights, allocator));
                run_start = None;
            }
            _ => {}
        }
    }
    replacements
}

fn build_sub_node(
    node: &PositionalKmerNode,
    start: usize,
    end: usize,
    new_weights: &[i64],
    allocator: &mut NodeIdAllocator,
) -> PositionalKmerNode {
    let kmers = node.kmers[start..end].to_vec();
    let weights = new_weights[start..end]
        .iter()
        .map(|&w| w as u32)
        .collect::<Vec<_>>();
    let mut n = PositionalKmerNode::new(
        allocator.alloc(),
        kmers,
        weights,
        node.first_start + start as i64,
        node.first_end + start as i64,
        node.is_reference,
    );
    n.collapsed_kmers = node.collapsed_kmers.clone();
    // The first surviving run keeps the original predecessors; the last
    // keeps the original successors. A run that doesn't touch either edge
    // of the original node has no adjacency left to inherit (the removed
    // offsets around it severed the chain).
    if start == 0 {
        n.prev = node.prev.clone();
    }
    if end == node.len() {
        n.next = node.next.clone();
    }
    n
}
