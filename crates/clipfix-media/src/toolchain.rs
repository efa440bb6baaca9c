//! Media toolchain capability.
//!
//! Graph construction, subtitle detection and the commit protocol only talk
//! to the encoder through [`MediaToolchain`], so they can be exercised
//! against a fake in tests. [`FfmpegToolchain`] is the production
//! implementation backed by the `ffmpeg`/`ffprobe` binaries.

use async_trait::async_trait;
use std::path::Path;

use crate::ambient::NoiseRecipe;
use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::MediaResult;
use crate::probe::{self, FrameDimensions};

/// The two black-box capabilities the pipeline needs from a media toolchain.
#[async_trait]
pub trait MediaToolchain: Send + Sync {
    /// Run a transcode described by `cmd`, writing to `cmd.output()`.
    async fn transcode(&self, cmd: &FfmpegCommand) -> MediaResult<()>;

    /// Pixel dimensions of the first video stream.
    async fn probe_dimensions(&self, path: &Path) -> MediaResult<FrameDimensions>;

    /// Write the frame at `at_secs` to an image file.
    async fn extract_frame(&self, clip: &Path, at_secs: f64, output: &Path) -> MediaResult<()> {
        let cmd = FfmpegCommand::new(clip, output)
            .seek(at_secs)
            .single_frame()
            .output_arg("-an");
        self.transcode(&cmd).await
    }

    /// Render a noise bed described by `recipe` to `output`.
    async fn synthesize_noise(&self, recipe: &NoiseRecipe, output: &Path) -> MediaResult<()> {
        self.transcode(&recipe.to_command(output)).await
    }
}

/// Toolchain backed by the FFmpeg CLI.
#[derive(Debug, Clone, Default)]
pub struct FfmpegToolchain {
    runner: FfmpegRunner,
}

impl FfmpegToolchain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound every transcode to `secs`; the encoder is killed on expiry.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.runner = self.runner.with_timeout(secs);
        self
    }
}

#[async_trait]
impl MediaToolchain for FfmpegToolchain {
    async fn transcode(&self, cmd: &FfmpegCommand) -> MediaResult<()> {
        self.runner.run(cmd).await
    }

    async fn probe_dimensions(&self, path: &Path) -> MediaResult<FrameDimensions> {
        probe::probe_dimensions(path).await
    }
}
