//! Optional telemetry sinks (spec.md §6): pure observers with no effect on
//! emitted contigs. A failing sink is disabled and logged as a
//! `SoftInconsistency`, never propagated as a fatal error.

use crate::caller::CallerStateSnapshot;
use crate::contig::Contig;

/// Per-emitted-contig statistics callback.
pub trait ContigStatsSink {
    fn on_contig(&mut self, contig: &Contig);
}

/// Periodic snapshot of `MemoContigCaller`'s internal state.
pub trait CallerStateSink {
    fn on_state(&mut self, state: &CallerStateSnapshot);
}

/// Graph-visualization event sink; fallible because it typically does
/// file or network I/O, unlike the other two sinks.
pub trait GraphVisualizationSink {
    fn on_node_loaded(&mut self, node_id: u64) -> std::io::Result<()>;
    fn on_node_flushed(&mut self, node_id: u64) -> std::io::Result<()>;
}

/// No-op sink used when the embedding application registers nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ContigStatsSink for NullSink {
    fn on_contig(&mut self, _contig: &Contig) {}
}

impl CallerStateSink for NullSink {
    fn on_state(&mut self, _state: &CallerStateSnapshot) {}
}

impl GraphVisualizationSink for NullSink {
    fn on_node_loaded(&mut self, _node_id: u64) -> std::io::Result<()> {
        Ok(())
    }
    fn on_node_flushed(&mut self, _node_id: u64) -> std::io::Result<()> {
        Ok(())
    }
}

/// Bundles the three optional sinks the `Assembler` drives. Any field can
/// be `None`.
#[derive(Default)]
pub struct TelemetryHooks {
    pub contig_stats: Option<Box<dyn ContigStatsSink>>,
    pub caller_state: Option<Box<dyn CallerStateSink>>,
    pub graph_visualization: Option<Box<dyn GraphVisualizationSink>>,
}

impl TelemetryHooks {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn notify_contig(&mut self, contig: &Contig) {
        if let Some(sink) = self.contig_stats.as_mut() {
            sink.on_contig(contig);
        }
    }

    pub fn notify_state(&mut self, state: &CallerStateSnapshot) {
        if let Some(sink) = self.caller_state.as_mut() {
            sink.on_state(state);
        }
    }

    /// Runs the visualization callback, disabling the sink (logging a
    /// warning) on the first I/O failure — spec.md §7's "for telemetry I/O
    /// by disabling that sink".
    pub fn notify_node_loaded(&mut self, node_id: u64) {
        if let Some(sink) = self.graph_visualization.as_mut() {
            if let Err(err) = sink.on_node_loaded(node_id) {
                log::warn!("graph-visualization sink failed, disabling it: {err}");
                self.graph_visualization = None;
            }
        }
    }

    pub fn notify_node_flushed(&mut self, node_id: u64) {
        if let Some(sink) = self.graph_visualization.as_mut() {
            if let Err(err) = sink.on_node_flushed(node_id) {
                log::warn!("graph-visualization sink failed, disabling it: {err}");
                self.graph_visualization = None;
            }
        }
    }
}
