//! Maps evidence ids to the k-mer support nodes currently contributing
//! their weight to the graph, and back from a k-mer to the evidence ids
//! that support it there.

use std::collections::{HashMap, HashSet};

use crate::kmer::Kmer;
use crate::node::{EvidenceId, KmerSupportNode};

/// A closed positional interval, used when querying which evidence
/// overlaps a called contig's k-mer occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub start: i64,
    pub end: i64,
}

impl Interval {
    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

/// Owns all `KmerSupportNode`s, keyed by the evidence id they belong to,
/// with a k-mer-indexed reverse map for fast untrack queries (design note
/// §9: "one lookup + one removal from the primary map rather than a graph
/// walk").
#[derive(Debug, Default)]
pub struct EvidenceTracker {
    by_evidence: HashMap<EvidenceId, Vec<KmerSupportNode>>,
    by_kmer: HashMap<Kmer, Vec<EvidenceId>>,
}

impl EvidenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a support node under its evidence id and k-mer key.
    pub fn track(&mut self, support: KmerSupportNode) {
        self.by_evidence
            .entry(support.evidence_id)
            .or_default()
            .push(support);
        let evidence_ids = self.by_kmer.entry(support.kmer).or_default();
        if !evidence_ids.contains(&support.evidence_id) {
            evidence_ids.push(support.evidence_id);
        }
    }

    /// For each `(kmer, interval)` in `occurrences`, gather every evidence
    /// id whose support overlaps, then retire those ids entirely (removing
    /// every support node they own). Retiring an already-retired id is a
    /// no-op (idempotent); an empty `occurrences` yields the empty set.
    pub fn untrack(&mut self, occurrences: &[(Kmer, Interval)]) -> HashSet<EvidenceId> {
        let mut hit: HashSet<EvidenceId> = HashSet::new();
        for (kmer, interval) in occurrences {
            for &evidence_id in self.by_kmer.get(kmer).into_iter().flatten() {
                let overlaps = self
                    .by_evidence
                    .get(&evidence_id)
                    .map(|supports| {
                        supports
                            .iter()
                            .any(|s| s.kmer == *kmer && interval.overlaps(&support_interval(s)))
                    })
                    .unwrap_or(false);
                if overlaps {
                    hit.insert(evidence_id);
                }
            }
        }
        for &evidence_id in &hit {
            self.retire(evidence_id);
        }
        hit
    }

    /// Retire a single evidence id, removing every support node it owns.
    /// Idempotent: retiring an id with no tracked supports is a no-op.
    fn retire(&mut self, evidence_id: EvidenceId) {
        let Some(supports) = self.by_evidence.remove(&evidence_id) else {
            return;
        };
        for support in supports {
            if let Some(ids) = self.by_kmer.get_mut(&support.kmer) {
                ids.retain(|&id| id != evidence_id);
                if ids.is_empty() {
                    self.by_kmer.remove(&support.kmer);
                }
            }
        }
    }

    /// Read-only view of every support node currently tracked for `kmer`,
    /// used by `MisassemblyFixer` to re-assign mis-placed evidence.
    pub fn support_for_kmer(&self, kmer: Kmer) -> Vec<KmerSupportNode> {
        self.by_kmer
            .get(&kmer)
            .into_iter()
            .flatten()
            .filter_map(|id| self.by_evidence.get(id))
            .flatten()
            .filter(|s| s.kmer == kmer)
            .copied()
            .collect()
    }

    pub fn is_tracked(&self, evidence_id: EvidenceId) -> bool {
        self.by_evidence.contains_key(&evidence_id)
    }

    pub fn tracked_evidence_count(&self) -> usize {
        self.by_evidence.len()
    }
}

fn support_interval(s: &KmerSupportNode) -> Interval {
    Interval {
        start: s.last_start,
        end: s.last_end,
    }
}
