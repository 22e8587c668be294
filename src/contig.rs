//! Output record types: a called, anchored-or-not contig and its anchors.

use serde::{Deserialize, Serialize};

use crate::node::EvidenceId;

/// Which ends of a called contig are anchored to reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnchorClass {
    Unanchored,
    ForwardAnchored,
    BackwardAnchored,
    Breakpoint,
}

/// One reference-anchored flank, already trimmed to its target length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anchor {
    /// Genomic position of the anchor's outer (trimmed) edge.
    pub position: i64,
    /// Number of anchor bases retained after trimming.
    pub base_count: i64,
}

/// A called contig, ready for downstream alignment/variant calling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contig {
    /// Raw base sequence, alphabet `{A,C,G,T,N}`.
    pub bases: Vec<u8>,
    /// Per-base quality, aligned with `bases`.
    pub qualities: Vec<u8>,
    pub anchor_class: AnchorClass,
    /// Present iff `anchor_class` is `ForwardAnchored` or `Breakpoint`.
    pub start_anchor: Option<Anchor>,
    /// Present iff `anchor_class` is `BackwardAnchored` or `Breakpoint`.
    pub end_anchor: Option<Anchor>,
    pub evidence_ids: Vec<EvidenceId>,
}

impl Contig {
    pub fn len(&self) -> usize {
        self.bases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bases.is_empty()
    }

    /// True for a contig whose both ends are anchored and whose own called
    /// path contributed no non-reference bases — a reference allele,
    /// discarded by the Assembler rather than emitted (spec.md §4.7: "two
    /// anchors with zero residual bases").
    pub fn is_reference_allele(&self, chain_is_all_reference: bool) -> bool {
        matches!(self.anchor_class, AnchorClass::Breakpoint) && chain_is_all_reference
    }
}
