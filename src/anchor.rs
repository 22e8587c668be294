//! Extends a called contig's path with reference-anchored flanks by a
//! greedy graph traversal, preferring reference nodes at each step
//! (spec.md §4.6). Grounded on the teacher's greedy shortest-link
//! selection in `layout::get_segment` (`kneasle-monument`
//! `graph/src/layout/mod.rs`), generalised from "shortest link" to
//! "reference-preferring link".

use std::collections::HashSet;

use crate::config::Config;
use crate::index::PathNodeIndex;
use crate::node::NodeId;

/// One extended flank: the nodes added beyond the contig's seed node, in
/// nearest-to-seed-first order, plus the resulting genomic anchor.
#[derive(Debug, Clone)]
pub struct ExtendedAnchor {
    pub nodes: Vec<NodeId>,
    pub position: i64,
    pub base_count: i64,
}

/// Extend both ends of `chain` and return whichever flanks exist (`None`
/// when neither the chain itself nor any node beyond it touches reference).
///
/// The called chain can itself already contain a reference run at either
/// end — `ANCHORED_SCORE` (`caller::subinterval`) makes the best path pull
/// reference predecessors/successors into the chain body whenever doing so
/// scores higher, which it always does once touched. So a flank is anchored
/// either by reference nodes already in the chain, by nodes reachable
/// beyond it, or both; `build_anchor` accounts for the in-chain run first
/// and only walks further if the anchor-length cap leaves room.
pub fn extend(
    chain: &[NodeId],
    index: &PathNodeIndex,
    config: &Config,
) -> (Option<ExtendedAnchor>, Option<ExtendedAnchor>) {
    if chain.is_empty() {
        return (None, None);
    }
    let contig_len: i64 = chain
        .iter()
        .filter_map(|id| index.get(*id))
        .map(|n| n.len() as i64)
        .sum();
    let cap = std::cmp::max(contig_len, config.anchor_length)
        + config.max_evidence_support_interval_width;

    let prefix_len = reference_run_len(chain.iter(), index);
    let suffix_len = reference_run_len(chain.iter().rev(), index);
    let start = build_anchor(chain, index, cap, prefix_len, true);
    let end = build_anchor(chain, index, cap, suffix_len, false);
    (start, end)
}

/// Length of the leading run of `chain` (in iteration order) that is all
/// reference nodes.
fn reference_run_len<'a>(chain: impl Iterator<Item = &'a NodeId>, index: &PathNodeIndex) -> usize {
    chain
        .take_while(|&&id| index.get(id).map(|n| n.is_reference).unwrap_or(false))
        .count()
}

/// Build one end's anchor. `in_chain_run` is how many of the chain's nodes
/// at this end (from the outside in) are already reference. If that run is
/// non-empty it anchors the flank outright; `walk` is only consulted for
/// whatever anchor-length budget remains beyond it.
fn build_anchor(
    chain: &[NodeId],
    index: &PathNodeIndex,
    cap_bases: i64,
    in_chain_run: usize,
    backward: bool,
) -> Option<ExtendedAnchor> {
    if in_chain_run == 0 {
        let seed = if backward { chain[0] } else { *chain.last().unwrap() };
        return walk(seed, index, cap_bases, backward).map(|(nodes, total)| {
            let outer = *nodes.last().unwrap();
            let position = anchor_position(outer, index, backward);
            ExtendedAnchor {
                nodes,
                position,
                base_count: total,
            }
        });
    }

    let run_nodes = if backward {
        &chain[..in_chain_run]
    } else {
        &chain[chain.len() - in_chain_run..]
    };
    let in_chain_bases: i64 = run_nodes
        .iter()
        .filter_map(|id| index.get(*id))
        .map(|n| n.len() as i64)
        .sum();
    let boundary = if backward { chain[0] } else { *chain.last().unwrap() };
    let remaining_cap = cap_bases - in_chain_bases;
    let (ext_nodes, ext_bases) = if remaining_cap > 0 {
        walk(boundary, index, remaining_cap, backward).unwrap_or_default()
    } else {
        (Vec::new(), 0)
    };
    let outer = ext_nodes.last().copied().unwrap_or(boundary);
    let position = anchor_position(outer, index, backward);
    Some(ExtendedAnchor {
        nodes: ext_nodes,
        position,
        base_count: in_chain_bases + ext_bases,
    })
}

fn anchor_position(outer: NodeId, index: &PathNodeIndex, backward: bool) -> i64 {
    index
        .get(outer)
        .map(|n| if backward { n.first_start } else { n.last_end() })
        .unwrap_or(0)
}

/// Walk from `seed` following `prev` (backward) or `next` (forward),
/// always choosing a reference node over a non-reference one when both are
/// available, tie-broken by lowest `NodeId`. Stops once `cap_bases` bases
/// have been collected, or there is nowhere left to go. The seed node
/// itself is never included — it's already part of the contig.
fn walk(
    seed: NodeId,
    index: &PathNodeIndex,
    cap_bases: i64,
    backward: bool,
) -> Option<(Vec<NodeId>, i64)> {
    let mut result = Vec::new();
    let mut total = 0i64;
    let mut current = seed;
    while total < cap_bases {
        let Some(n) = index.get(current) else { break };
        let candidates: &HashSet<NodeId> = if backward { &n.prev } else { &n.next };
        if candidates.is_empty() {
            break;
        }
        let next = *candidates
            .iter()
            .min_by_key(|&&id| {
                let prefer_non_reference = index.get(id).map(|c| !c.is_reference).unwrap_or(true);
                (prefer_non_reference, id)
            })
            .unwrap();
        let Some(next_node) = index.get(next) else { break };
        result.push(next);
        total += next_node.len() as i64;
        current = next;
    }
    if result.is_empty() {
        return None;
    }
    // Trim from the outside (farthest from the seed) if the walk overshot.
    while total > cap_bases && result.len() > 1 {
        let removed = result.pop().unwrap();
        total -= index.get(removed).map(|n| n.len() as i64).unwrap_or(0);
    }
    Some((result, total))
}
