//! The dual index over live nodes: by position (for frontier scans) and by
//! k-mer (for successor/falseness/misassembly lookups).

use std::collections::{BTreeMap, HashMap};

use crate::error::InvariantViolation;
use crate::kmer::Kmer;
use crate::node::{NodeId, PositionalKmerNode};

/// Mints fresh `NodeId`s for replacement nodes produced by `WeightSplitter`.
/// Owned by `PathNodeIndex`, since the index is the sole owner of live
/// nodes (spec.md §3 "Ownership").
#[derive(Debug, Default)]
pub struct NodeIdAllocator {
    next: u64,
}

impl NodeIdAllocator {
    pub fn alloc(&mut self) -> NodeId {
        let id = NodeId::from(self.next);
        self.next += 1;
        id
    }
}

/// Ordered set of live nodes keyed by `(first_start, first_kmer, id)`, plus
/// a k-mer -> occurrence multimap. The trailing `id` in the position key
/// only exists to keep the key unique while two nodes transiently share a
/// `(first_start, first_kmer)` pair during a split/replace; the
/// node-interval-disjointness invariant (spec.md §8) still forbids that
/// pair persisting across two fully-live nodes.
#[derive(Debug, Default)]
pub struct PathNodeIndex {
    nodes: HashMap<NodeId, PositionalKmerNode>,
    by_position: BTreeMap<(i64, Kmer, NodeId), ()>,
    by_kmer: HashMap<Kmer, Vec<(NodeId, usize)>>,
    pub allocator: NodeIdAllocator,
}

impl PathNodeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: NodeId) -> Option<&PositionalKmerNode> {
        self.nodes.get(&id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PositionalKmerNode> {
        self.nodes.values()
    }

    /// Insert `node` into both indexes. Fails with `InvariantViolation` if
    /// any live node already claims the same `(first_kmer, first position)`
    /// with an overlapping interval (spec.md §3's uniqueness invariant).
    pub fn add(&mut self, node: PositionalKmerNode) -> Result<(), InvariantViolation> {
        let first_kmer = node.first_kmer();
        for (other_id, _offset) in self.by_kmer.get(&first_kmer).into_iter().flatten() {
            if *other_id == node.id {
                continue;
            }
            let other = &self.nodes[other_id];
            if other.first_kmer() == first_kmer
                && intervals_overlap(
                    node.first_start,
                    node.first_end,
                    other.first_start,
                    other.first_end,
                )
            {
                return Err(InvariantViolation::NodeIntervalNotDisjoint {
                    kmer: first_kmer,
                    node_a: node.id,
                    node_b: *other_id,
                });
            }
        }

        for (kmer, offset) in node.kmer_offsets() {
            self.by_kmer.entry(kmer).or_default().push((node.id, offset));
        }
        for &kmer in &node.collapsed_kmers {
            self.by_kmer.entry(kmer).or_default().push((node.id, usize::MAX));
        }
        self.by_position
            .insert((node.first_start, first_kmer, node.id), ());
        self.nodes.insert(node.id, node);
        Ok(())
    }

    /// Remove a live node entirely from both indexes. Returns the removed
    /// node so callers (e.g. `MemoContigCaller::remove`) can inspect it
    /// before it's gone.
    pub fn remove(&mut self, id: NodeId) -> Option<PositionalKmerNode> {
        let node = self.nodes.remove(&id)?;
        self.by_position
            .remove(&(node.first_start, node.first_kmer(), id));
        for (kmer, _offset) in node.kmer_offsets() {
            if let Some(occs) = self.by_kmer.get_mut(&kmer) {
                occs.retain(|(n, _)| *n != id);
                if occs.is_empty() {
                    self.by_kmer.remove(&kmer);
                }
            }
        }
        for &kmer in &node.collapsed_kmers {
            if let Some(occs) = self.by_kmer.get_mut(&kmer) {
                occs.retain(|(n, _)| *n != id);
                if occs.is_empty() {
                    self.by_kmer.remove(&kmer);
                }
            }
        }
        Some(node)
    }

    /// All `(node, offset)` pairs sharing a given k-mer, across both
    /// primary and collapsed keys.
    pub fn lookup(&self, kmer: Kmer) -> &[(NodeId, usize)] {
        self.by_kmer.get(&kmer).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The `first_start` of the earliest live node, or `i64::MAX` if the
    /// index is empty (spec.md §4.1's "+∞").
    pub fn first_start(&self) -> i64 {
        self.by_position
            .keys()
            .next()
            .map(|(start, _, _)| *start)
            .unwrap_or(i64::MAX)
    }

    /// Nodes in ascending `(first_start, first_kmer)` order, for bounded
    /// scans (e.g. the Assembler's batch-load and flush passes).
    pub fn ordered_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.by_position.keys().map(|(_, _, id)| *id)
    }
}

fn intervals_overlap(a_start: i64, a_end: i64, b_start: i64, b_end: i64) -> bool {
    a_start <= b_end && b_start <= a_end
}
