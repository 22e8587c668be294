//! Detects k-mer repeats within a called contig's concatenated path and
//! re-places ambiguously-supported evidence, truncating the path at the
//! first repeat that can't be resolved consistently (spec.md §4.5).

use std::collections::{HashMap, HashSet};

use crate::evidence::EvidenceTracker;
use crate::index::PathNodeIndex;
use crate::kmer::Kmer;
use crate::node::{EvidenceId, NodeId};

#[derive(Debug, Clone, Copy)]
struct Occurrence {
    position: i64,
}

/// The outcome of repairing one called path.
#[derive(Debug, Clone)]
pub struct FixedPath {
    /// The node chain to actually emit — identical to the input unless a
    /// repeat forced a truncation.
    pub nodes: Vec<NodeId>,
    /// Evidence ids confirmed to sit consistently at one of a repeated
    /// k-mer's occurrences. Empty when the path had no repeat at all, in
    /// which case the caller should fall back to untracking every piece of
    /// evidence that overlaps the path normally.
    pub consistent_evidence: HashSet<EvidenceId>,
    /// Evidence ids whose support interval didn't land on any occurrence
    /// of the k-mer they claim to support; dropped from the contig.
    pub dropped_evidence: HashSet<EvidenceId>,
}

/// True if `chain`'s concatenated k-mer sequence (including collapsed
/// alternates) repeats any k-mer at more than one first-position offset.
pub fn has_repeat(chain: &[NodeId], index: &PathNodeIndex) -> bool {
    !find_repeats(chain, index).is_empty()
}

fn find_repeats(chain: &[NodeId], index: &PathNodeIndex) -> HashMap<Kmer, Vec<Occurrence>> {
    let mut seen: HashMap<Kmer, Vec<Occurrence>> = HashMap::new();
    for &id in chain {
        let Some(n) = index.get(id) else { continue };
        for (offset, &kmer) in n.kmers.iter().enumerate() {
            seen.entry(kmer).or_default().push(Occurrence {
                position: n.first_start + offset as i64,
            });
        }
        for &kmer in &n.collapsed_kmers {
            seen.entry(kmer).or_default().push(Occurrence {
                position: n.first_start,
            });
        }
    }
    seen.retain(|_, occs| occs.len() > 1);
    seen
}

/// Re-place each piece of evidence supporting a repeated k-mer at whichever
/// occurrence its support interval covers, preferring the occurrence
/// closest to the interval's start. Evidence whose interval covers no
/// occurrence is dropped. If any repeat has unresolvable evidence, the path
/// is truncated just before that repeat's second occurrence — everything
/// up to and including the first (unambiguous) occurrence survives, which
/// is "the possibly-shorter re-segmented path".
pub fn fix(chain: &[NodeId], index: &PathNodeIndex, tracker: &EvidenceTracker) -> FixedPath {
    let repeats = find_repeats(chain, index);
    if repeats.is_empty() {
        return FixedPath {
            nodes: chain.to_vec(),
            consistent_evidence: HashSet::new(),
            dropped_evidence: HashSet::new(),
        };
    }

    let mut dropped: HashSet<EvidenceId> = HashSet::new();
    let mut retained: HashSet<EvidenceId> = HashSet::new();
    let mut cut_before: Option<i64> = None;

    for (&kmer, occurrences) in &repeats {
        let mut positions: Vec<i64> = occurrences.iter().map(|o| o.position).collect();
        positions.sort_unstable();
        let repeat_point = positions[1]; // occurrences.len() > 1 is guaranteed by find_repeats

        for support in tracker.support_for_kmer(kmer) {
            let best = occurrences
                .iter()
                .filter(|occ| occ.position >= support.last_start && occ.position <= support.last_end)
                .min_by_key(|occ| (occ.position - support.last_start).abs());
            if best.is_some() {
                retained.insert(support.evidence_id);
            } else {
                dropped.insert(support.evidence_id);
                cut_before = Some(cut_before.map_or(repeat_point, |c: i64| c.min(repeat_point)));
            }
        }
    }

    let nodes = match cut_before {
        None => chain.to_vec(),
        Some(cut_position) => chain
            .iter()
            .copied()
            .take_while(|&id| {
                index
                    .get(id)
                    .map(|n| n.first_start < cut_position)
                    .unwrap_or(false)
            })
            .collect(),
    };

    FixedPath {
        nodes,
        consistent_evidence: retained,
        dropped_evidence: dropped,
    }
}
