//! Recognized configuration options (spec.md §6) and their validation.
//!
//! Compare this to the per-call telemetry sinks in `telemetry.rs`, which
//! determine what gets *observed*, not what compositions/contigs are
//! generated — same split as monument's `Config` (how fast/how much is
//! logged) vs `Query` (what is generated).

use crate::error::ConfigurationFailure;

/// Configuration parameters for the caller. None of these change the
/// identity of emitted contigs' evidence content, but they do change
/// timing (flush pressure) and the anchor/quality presentation.
#[derive(Debug, Clone)]
pub struct Config {
    /// k-mer length; governs overlap and quality derivation.
    pub k: u8,
    /// Identifier attached to emitted contigs.
    pub reference_index: u32,
    /// Worst-case support reach, used for flush safety.
    pub max_evidence_support_interval_width: i64,
    /// Floor on anchor extension length.
    pub max_anchor_length: i64,
    /// Multiplied by `fragment_size` to get the misassembly length threshold.
    pub max_expected_breakend_length_multiple: f64,
    /// Multiplied by `fragment_size` to get the retain-width force-flush bound.
    pub retain_width_multiple: f64,
    /// Multiplied by `fragment_size` to get the flush-width force-flush bound.
    pub flush_width_multiple: f64,
    /// Minimum anchor bases.
    pub anchor_length: i64,
    /// Enable/disable ongoing misassembly pruning during assembly.
    pub remove_misassembled_partial_contigs_during_assembly: bool,
    /// The unit scaled by the `*_multiple` options above.
    pub fragment_size: i64,
    /// Upper bound on derived per-base quality values.
    pub max_qual: u8,
    /// Enable the `MemoContigCaller` memoization self-check (debug-only;
    /// expensive, off by default).
    pub self_check: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            k: 25,
            reference_index: 0,
            max_evidence_support_interval_width: 1000,
            max_anchor_length: 150,
            max_expected_breakend_length_multiple: 8.0,
            retain_width_multiple: 4.0,
            flush_width_multiple: 2.0,
            anchor_length: 100,
            remove_misassembled_partial_contigs_during_assembly: true,
            fragment_size: 300,
            max_qual: 40,
            self_check: false,
        }
    }
}

impl Config {
    /// Validate that required options are present and well-formed. Run at
    /// construction time (`Assembler::new`) so malformed configuration is
    /// a `ConfigurationFailure` before any input is consumed (spec.md §7).
    pub fn validate(&self) -> Result<(), ConfigurationFailure> {
        if self.k == 0 {
            return Err(ConfigurationFailure::ZeroK);
        }
        if self.anchor_length <= 0 {
            return Err(ConfigurationFailure::NonPositiveAnchorLength);
        }
        if self.max_anchor_length < self.anchor_length {
            return Err(ConfigurationFailure::MaxAnchorLengthBelowAnchorLength);
        }
        if self.fragment_size <= 0 {
            return Err(ConfigurationFailure::NonPositiveFragmentSize);
        }
        if self.retain_width_multiple <= 0.0 {
            return Err(ConfigurationFailure::NonPositiveRetainWidthMultiple);
        }
        if self.flush_width_multiple <= 0.0 {
            return Err(ConfigurationFailure::NonPositiveFlushWidthMultiple);
        }
        if self.max_evidence_support_interval_width < 0 {
            return Err(ConfigurationFailure::NegativeSupportIntervalWidth);
        }
        if self.max_expected_breakend_length_multiple <= 0.0 {
            return Err(ConfigurationFailure::NonPositiveBreakendLengthMultiple);
        }
        Ok(())
    }

    pub fn retain_width(&self) -> i64 {
        (self.retain_width_multiple * self.fragment_size as f64) as i64
    }

    pub fn flush_width(&self) -> i64 {
        (self.flush_width_multiple * self.fragment_size as f64) as i64
    }

    pub fn max_expected_breakend_length(&self) -> i64 {
        (self.max_expected_breakend_length_multiple * self.fragment_size as f64) as i64
    }
}
