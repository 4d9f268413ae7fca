//! Concurrent per-project aggregation of metric outputs
//!
//! Outputs are grouped by shape because metrics produce structurally different
//! containers. Each shape accumulates independently and is resolved on demand.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │        Cell computations            │
//! │  one per (time window, threshold)   │
//! └─────────────────────────────────────┘
//!                  ↓ add / submit
//! ┌─────────────────────────────────────┐
//! │       ProjectOutputBuilder          │
//! │  per shape: key → [PendingOutput]   │
//! └─────────────────────────────────────┘
//!                  ↓ build
//! ┌─────────────────────────────────────┐
//! │          ProjectOutput              │
//! │  per shape: join-all, merge, freeze │
//! └─────────────────────────────────────┘
//!                  ↓
//! ┌─────────────────────────────────────┐
//! │       MetricOutputMultiMap          │
//! │   immutable, shared via Arc         │
//! └─────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use hydroverify::aggregation::ProjectOutputBuilder;
//!
//! let builder = ProjectOutputBuilder::new(&config.aggregation);
//! for (key, pool) in pools {
//!     builder.submit(key, compute_scores(pool))?;
//! }
//!
//! let output = builder.build();
//! if output.has_output(OutputGroup::DoubleScore) {
//!     let scores = output.double_scores().await?;
//! }
//! ```

mod pending;
mod project;
mod shape;

pub use pending::{CellResult, MetricComputeError, PendingOutput};
pub use project::{ProjectOutput, ProjectOutputBuilder};
pub use shape::{ShapeGroup, Shapes};
