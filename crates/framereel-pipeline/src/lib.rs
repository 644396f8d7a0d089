//! # framereel-pipeline
//!
//! Ordered, concurrent transform-and-reassemble pipeline.
//!
//! This crate provides:
//!
//! - **Collaborator traits** ([`ItemSource`], [`ItemLoader`],
//!   [`ItemTransform`], [`Sink`]) -- the pieces a caller plugs in.
//! - **[`WorkerPool`]** -- a fixed set of threads claiming indices from an
//!   atomic counter and running load + transform in parallel.
//! - **[`Reassembler`]** -- a min-index reorder buffer that releases items
//!   strictly in index order, treating failed indices as skipped.
//! - **[`Orchestrator`]** -- owns enumeration, the worker pool, the single
//!   consumer that appends to the sink, and sink finalization, producing a
//!   [`PipelineResult`].

pub mod context;
pub mod descriptor;
pub mod orchestrator;
pub mod pool;
pub mod reassembler;
pub mod result;
mod sink;
pub mod traits;

// Re-export key types at the crate root.
pub use context::{ProgressSender, RunContext};
pub use descriptor::WorkDescriptor;
pub use orchestrator::{run, Orchestrator, OrchestratorState};
pub use pool::{ClaimCounter, PoolReport, WorkerPool};
pub use reassembler::{Reassembler, Release};
pub use result::{ItemFailure, PipelineResult};
pub use traits::{FnTransform, Identity, ItemLoader, ItemSource, ItemTransform, Sink};
pub use tokio_util::sync::CancellationToken;
