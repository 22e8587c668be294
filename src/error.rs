//! Error taxonomy (spec.md §7): fatal `InvariantViolation`/`ConfigurationFailure`
//! surface through the `Assembler` iterator and end the stream;
//! `SoftInconsistency` is logged and never escapes.

use thiserror::Error;

use crate::kmer::Kmer;
use crate::node::NodeId;

/// Fatal: a structural guarantee the rest of the crate relies on has been
/// broken. Aborts the stream.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    #[error("node {node_a} and node {node_b} both claim first-kmer {kmer} with overlapping first-position intervals")]
    NodeIntervalNotDisjoint {
        kmer: Kmer,
        node_a: NodeId,
        node_b: NodeId,
    },

    #[error("input out of order: node with first_start={got} arrived after first_start={last_loaded}")]
    InputOutOfOrder { last_loaded: i64, got: i64 },

    #[error("memoization self-check failed: {0}")]
    MemoizationMismatch(String),
}

/// Warn-and-continue: logged via `log::warn!` by the component that
/// detects it; never constructed as part of `CallerError` (spec.md §7).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SoftInconsistency {
    EvidenceOverreach { evidence_extends_past: i64, input_frontier: i64 },
    ContigWithNoTrackedEvidence,
    TelemetryExportFailed { sink: &'static str, message: String },
}

impl std::fmt::Display for SoftInconsistency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SoftInconsistency::EvidenceOverreach {
                evidence_extends_past,
                input_frontier,
            } => write!(
                f,
                "evidence extends to {evidence_extends_past}, past current input frontier {input_frontier}"
            ),
            SoftInconsistency::ContigWithNoTrackedEvidence => {
                write!(f, "called contig has no tracked evidence")
            }
            SoftInconsistency::TelemetryExportFailed { sink, message } => {
                write!(f, "telemetry sink '{sink}' failed: {message}")
            }
        }
    }
}

/// Fatal, raised at construction: a required `Config` option is missing or
/// malformed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigurationFailure {
    #[error("k must be positive")]
    ZeroK,
    #[error("anchor_length must be positive")]
    NonPositiveAnchorLength,
    #[error("max_anchor_length must be >= anchor_length")]
    MaxAnchorLengthBelowAnchorLength,
    #[error("fragment_size must be positive")]
    NonPositiveFragmentSize,
    #[error("retain_width_multiple must be positive")]
    NonPositiveRetainWidthMultiple,
    #[error("flush_width_multiple must be positive")]
    NonPositiveFlushWidthMultiple,
    #[error("max_evidence_support_interval_width must be non-negative")]
    NegativeSupportIntervalWidth,
    #[error("max_expected_breakend_length_multiple must be positive")]
    NonPositiveBreakendLengthMultiple,
}

/// Top-level error returned by the `Assembler` iterator. Only the fatal
/// taxonomy members appear here; soft inconsistencies never do.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CallerError {
    #[error(transparent)]
    Invariant(#[from] InvariantViolation),
    #[error(transparent)]
    Configuration(#[from] ConfigurationFailure),
}
