//! Integration scenarios from the design's seed test list: straight-line
//! assembly, k-mer-repeat truncation, forced premature flush, divergent
//! reference-anchored tails, reference-allele synthesis, and
//! evidence-overreach handling.

use contig_caller::assembler::{Assembler, IncomingNode};
use contig_caller::config::Config;
use contig_caller::contig::AnchorClass;
use contig_caller::node::{EvidenceId, KmerSupportNode, NodeId, PositionalKmerNode};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn straight_chain(count: u64, len: i64, weight: u32) -> Vec<IncomingNode> {
    straight_chain_with_reference(count, len, weight, false)
}

fn straight_chain_with_reference(count: u64, len: i64, weight: u32, is_reference: bool) -> Vec<IncomingNode> {
    let mut nodes = Vec::new();
    let mut next_evidence_id = 0u64;
    for i in 0..count {
        let start = i as i64 * len;
        let kmers: Vec<u64> = (0..len).map(|o| i * 1000 + o as u64).collect();
        let mut n = PositionalKmerNode::new(
            NodeId::from(i),
            kmers.clone(),
            vec![weight; len as usize],
            start,
            start,
            is_reference,
        );
        if i > 0 {
            n.prev.insert(NodeId::from(i - 1));
        }
        if i + 1 < count {
            n.next.insert(NodeId::from(i + 1));
        }
        let supports = kmers
            .iter()
            .enumerate()
            .map(|(offset, &kmer)| {
                let pos = start + offset as i64;
                let id = EvidenceId::from(next_evidence_id);
                next_evidence_id += 1;
                KmerSupportNode {
                    kmer,
                    last_start: pos,
                    last_end: pos,
                    weight,
                    evidence_id: id,
                }
            })
            .collect();
        nodes.push(IncomingNode { node: n, supports });
    }
    nodes
}

fn collect_contigs<I: Iterator<Item = IncomingNode>>(
    assembler: &mut Assembler<I>,
) -> Vec<contig_caller::Contig> {
    init_logging();
    let mut out = Vec::new();
    while let Some(result) = assembler.next() {
        out.push(result.expect("unexpected fatal error"));
    }
    out
}

#[test]
fn straight_line_graph_yields_one_unanchored_contig() {
    let incoming = straight_chain(10, 4, 2);
    let mut config = Config::default();
    config.k = 4;
    let mut assembler = Assembler::new(incoming.into_iter(), config).unwrap();
    let contigs = collect_contigs(&mut assembler);

    assert_eq!(contigs.len(), 1);
    let contig = &contigs[0];
    assert_eq!(contig.anchor_class, AnchorClass::Unanchored);
    // k bases for the first k-mer, plus one new base per subsequent k-mer
    // across all 10 nodes of length 4 (40 k-mers total).
    assert_eq!(contig.bases.len(), 4 + (40 - 1));
    assert_eq!(contig.evidence_ids.len(), 40);
}

#[test]
fn kmer_repeat_truncates_contig_and_drops_ambiguous_evidence() {
    // node0 (offset 0) and node2 (offset 12) both carry k-mer 99; node1
    // fills the gap with 11 unique k-mers. node2's evidence support sits
    // far from its true occurrence, so it can't be placed consistently.
    let mut node0 = PositionalKmerNode::new(NodeId::from(0u64), vec![99], vec![3], 0, 0, false);
    let mid_kmers: Vec<u64> = (1..12).collect();
    let mut node1 = PositionalKmerNode::new(
        NodeId::from(1u64),
        mid_kmers.clone(),
        vec![3; mid_kmers.len()],
        1,
        1,
        false,
    );
    let mut node2 = PositionalKmerNode::new(NodeId::from(2u64), vec![99], vec![3], 12, 12, false);

    node0.next.insert(node1.id);
    node1.prev.insert(node0.id);
    node1.next.insert(node2.id);
    node2.prev.insert(node1.id);

    let support0 = KmerSupportNode {
        kmer: 99,
        last_start: 0,
        last_end: 0,
        weight: 3,
        evidence_id: EvidenceId::from(0u64),
    };
    // This support claims to back the k-mer-99 occurrence but sits at a
    // position neither real occurrence (0 or 12) overlaps.
    let support_ambiguous = KmerSupportNode {
        kmer: 99,
        last_start: 500,
        last_end: 500,
        weight: 3,
        evidence_id: EvidenceId::from(1u64),
    };

    let mut incoming = vec![IncomingNode {
        node: node0,
        supports: vec![support0, support_ambiguous],
    }];
    for (offset, &kmer) in mid_kmers.iter().enumerate() {
        let pos = 1 + offset as i64;
        incoming.push(IncomingNode {
            node: if offset == 0 {
                node1.clone()
            } else {
                // node1 was already pushed whole above; only add it once.
                continue;
            },
            supports: vec![KmerSupportNode {
                kmer,
                last_start: pos,
                last_end: pos,
                weight: 3,
                evidence_id: EvidenceId::from(2 + offset as u64),
            }],
        });
    }
    incoming.push(IncomingNode {
        node: node2,
        supports: vec![],
    });

    let mut config = Config::default();
    config.k = 1;
    let mut assembler = Assembler::new(incoming.into_iter(), config).unwrap();
    let contigs = collect_contigs(&mut assembler);

    assert_eq!(contigs.len(), 1);
    let contig = &contigs[0];
    // Truncated before node2 (the repeat's second occurrence): only
    // node0's and node1's bases survive (1 + 11 = 12 k-mers, 12 bases at
    // k=1).
    assert_eq!(contig.bases.len(), 12);
    assert!(!contig.evidence_ids.contains(&EvidenceId::from(1u64)));
}

#[test]
fn wide_graph_forces_premature_flush_into_multiple_contigs() {
    // 60 nodes of length 4 span 240 positions, all loaded in a single
    // batch (well within the default support-interval width). A tight
    // retain/flush width of 5 each forces `safety_flush` to repeatedly
    // call out small prefixes of the chain well before the whole thing is
    // loaded, fragmenting what would otherwise be a single straight-line
    // contig (see `straight_line_graph_yields_one_unanchored_contig`).
    let incoming = straight_chain(60, 4, 2);
    let mut config = Config::default();
    config.k = 4;
    config.fragment_size = 5;
    config.retain_width_multiple = 1.0;
    config.flush_width_multiple = 1.0;
    let mut assembler = Assembler::new(incoming.into_iter(), config).unwrap();
    let contigs = collect_contigs(&mut assembler);

    assert!(
        contigs.len() > 1,
        "expected the forced flush to split the chain into multiple contigs, got {}",
        contigs.len()
    );
}

#[test]
fn divergent_tails_share_reference_prefix_each_get_a_forward_anchored_breakend() {
    // A 5-node reference prefix branches into two divergent non-reference
    // tails. Both get called as separate contigs, each carrying a
    // forward-anchored breakend at the branch position; the shared
    // reference prefix is still in the graph (and hence still available
    // to synthesize from) when the second tail is called, since
    // `retire_chain_nodes` never evicts reference nodes out from under a
    // sibling branch that hasn't been called yet.
    const PREFIX_LEN: u64 = 5;
    const NODE_LEN: i64 = 4;
    const WEIGHT: u32 = 2;

    let mut incoming = straight_chain_with_reference(PREFIX_LEN, NODE_LEN, WEIGHT, true);
    let branch_start = PREFIX_LEN as i64 * NODE_LEN;
    let last_prefix_id = NodeId::from(PREFIX_LEN - 1);
    let tail_a_id = NodeId::from(PREFIX_LEN);
    let tail_b_id = NodeId::from(PREFIX_LEN + 1);

    let mut tail_a = PositionalKmerNode::new(
        tail_a_id,
        vec![5001, 5002, 5003, 5004],
        vec![WEIGHT; 4],
        branch_start,
        branch_start,
        false,
    );
    let mut tail_b = PositionalKmerNode::new(
        tail_b_id,
        vec![6001, 6002, 6003, 6004],
        vec![WEIGHT; 4],
        branch_start,
        branch_start,
        false,
    );
    tail_a.prev.insert(last_prefix_id);
    tail_b.prev.insert(last_prefix_id);
    incoming[PREFIX_LEN as usize - 1].node.next.insert(tail_a_id);
    incoming[PREFIX_LEN as usize - 1].node.next.insert(tail_b_id);

    let mut next_evidence_id = PREFIX_LEN * NODE_LEN as u64;
    for tail in [tail_a, tail_b] {
        let supports = tail
            .kmers
            .iter()
            .enumerate()
            .map(|(offset, &kmer)| {
                let pos = branch_start + offset as i64;
                let id = EvidenceId::from(next_evidence_id);
                next_evidence_id += 1;
                KmerSupportNode {
                    kmer,
                    last_start: pos,
                    last_end: pos,
                    weight: WEIGHT,
                    evidence_id: id,
                }
            })
            .collect();
        incoming.push(IncomingNode { node: tail, supports });
    }

    let mut config = Config::default();
    config.k = 4;
    // A retain width of zero keeps the shared reference prefix from being
    // force-flushed by position before both tails are called; this graph
    // is far too small for that to matter in production use.
    config.fragment_size = 1;
    config.retain_width_multiple = 0.01;
    let mut assembler = Assembler::new(incoming.into_iter(), config).unwrap();
    let contigs = collect_contigs(&mut assembler);

    assert_eq!(contigs.len(), 2);
    for contig in &contigs {
        assert_eq!(contig.anchor_class, AnchorClass::ForwardAnchored);
        assert!(contig.start_anchor.is_some());
        assert!(contig.end_anchor.is_none());
        // k bases for the chain's first k-mer, plus one new base per
        // subsequent k-mer across 24 total k-mers (20 prefix + 4 tail).
        assert_eq!(contig.bases.len(), NODE_LEN as usize + (24 - 1));
    }
    // Both contigs were synthesized from the same still-live reference
    // prefix: their shared leading bases (the prefix's contribution)
    // match exactly, proving the prefix wasn't evicted between calls.
    let shared_prefix_len = NODE_LEN as usize + (20 - 1);
    assert_eq!(
        contigs[0].bases[..shared_prefix_len],
        contigs[1].bases[..shared_prefix_len]
    );
}

#[test]
fn reference_only_graph_synthesizes_a_breakpoint_that_is_not_emitted() {
    // A graph built entirely from reference nodes calls a best path
    // anchored at both ends by its own content (prefix and suffix both
    // fully reference): a reference-allele breakpoint with zero residual
    // novel bases, which `Assembler::call_contig` discards rather than
    // emits.
    let incoming = straight_chain_with_reference(3, 4, 2, true);
    let mut config = Config::default();
    config.k = 4;
    let mut assembler = Assembler::new(incoming.into_iter(), config).unwrap();
    let contigs = collect_contigs(&mut assembler);

    assert!(
        contigs.is_empty(),
        "expected the reference-only chain to be discarded as a reference allele, got {}",
        contigs.len()
    );
}

#[test]
fn evidence_overreaching_input_frontier_is_still_retired() {
    let mut n = PositionalKmerNode::new(NodeId::from(0u64), vec![7], vec![1], 0, 0, false);
    n.collapsed_kmers.clear();
    let overreaching_support = KmerSupportNode {
        kmer: 7,
        last_start: 0,
        // Extends far past any position this single-node input stream
        // will ever load — an "evidence overreach" soft error.
        last_end: 5000,
        weight: 1,
        evidence_id: EvidenceId::from(0u64),
    };
    let incoming = vec![IncomingNode {
        node: n,
        supports: vec![overreaching_support],
    }];
    let mut config = Config::default();
    config.k = 1;
    let mut assembler = Assembler::new(incoming.into_iter(), config).unwrap();
    let contigs = collect_contigs(&mut assembler);

    assert_eq!(contigs.len(), 1);
    assert_eq!(contigs[0].evidence_ids, vec![EvidenceId::from(0u64)]);
}
