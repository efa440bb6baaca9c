//! Shared data models for the ClipFix post-processing pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Post-processing options and ambient noise categories
//! - Encoding configuration
//! - Batch run results

pub mod ambient;
pub mod batch;
pub mod encoding;
pub mod options;

// Re-export common types
pub use ambient::{AmbientNoise, AmbientNoiseParseError};
pub use batch::BatchResult;
pub use encoding::EncodingConfig;
pub use options::{OptionsError, PostProcessOptions};
