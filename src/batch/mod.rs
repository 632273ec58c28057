//! # Batch Export
//!
//! Runs a template against many records and emits one PNG per row.
//!
//! ```text
//! record ─▶ clone page ─▶ fill placeholders ─▶ restore unbound images
//!        ─▶ load assets ─▶ rasterize ─▶ name ─▶ sink
//! ```
//!
//! A failing row is recorded and skipped. Cancellation stops pending rows
//! and still ends in [`BatchState::Done`].

pub mod naming;
pub mod runner;
pub mod sink;
pub mod state;

pub use naming::{NamingScheme, sanitize};
pub use runner::{BatchContext, BatchOptions, RowSource};
pub use sink::{Artifact, ArtifactSink, DirectorySink, MemorySink};
pub use state::{BatchEvent, BatchState, BatchSummary, RowFailure, RowOutcome};
