//! A streaming positional de Bruijn graph contig caller.
//!
//! Given a position-sorted stream of de Bruijn graph path nodes, this
//! crate incrementally loads them into a working graph, continuously
//! memoizes the best-scoring anchored path through the currently loaded
//! graph, and emits called contigs (with their contributing evidence) in
//! streaming order. See [`Assembler`] for the entry point.

pub mod anchor;
pub mod assembler;
pub mod caller;
pub mod config;
pub mod contig;
pub mod error;
pub mod evidence;
pub mod index;
pub mod kmer;
pub mod misassembly;
pub mod node;
pub mod telemetry;
pub mod weight;

pub use assembler::{Assembler, IncomingNode};
pub use config::Config;
pub use contig::{Anchor, AnchorClass, Contig};
pub use error::{CallerError, ConfigurationFailure, InvariantViolation, SoftInconsistency};
