//! Clip post-processing worker.
//!
//! Runs the clip processor over a directory of generated clips, isolating
//! per-clip failures and reporting a `{processed, skipped, errors}`
//! partition.

pub mod batch;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;

pub use batch::{BatchOrchestrator, BatchSettings, PROCESSED_MARKER};
pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use logging::{init_tracing, ClipLogger};
