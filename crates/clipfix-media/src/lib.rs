#![deny(unreachable_patterns)]
//! FFmpeg CLI wrapper for clip post-processing.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building with timeouts
//! - Single-pass filter graphs (re-time, subtitle crop, ambient mix)
//! - Burned-in subtitle detection from a sampled frame
//! - Ambient bed assets with on-demand synthesis
//! - An atomic commit protocol that never leaves a half-written clip

pub mod ambient;
pub mod command;
pub mod error;
pub mod filters;
pub mod fs_utils;
pub mod probe;
pub mod processor;
pub mod subtitle;
pub mod toolchain;

pub use ambient::{AmbientAssetProvider, NoiseRecipe};
pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use filters::{tempo_chain, FilterGraph, FilterGraphBuilder};
pub use fs_utils::{commit_file, DestinationLocks};
pub use probe::{probe_dimensions, FrameDimensions};
pub use processor::{ClipJob, ClipProcessor, ProcessorConfig, DEFAULT_MIN_OUTPUT_BYTES};
pub use subtitle::{SubtitleDetection, SubtitleDetector};
pub use toolchain::{FfmpegToolchain, MediaToolchain};
