//! Single-clip post-processing.
//!
//! # Protocol
//!
//! 1. Validate the input file exists and the destination container can
//!    hold H.264/AAC.
//! 2. Resolve the subtitle crop (explicit option, else detection) and the
//!    ambient bed.
//! 3. Build the filter graph and transcode into a unique scratch file.
//! 4. On encoder failure, delete the scratch file and fail.
//! 5. Check the scratch file exists and meets the minimum size.
//! 6. Atomically rename the scratch file onto the destination.
//!
//! Step 6 is the only step that touches the destination, so after any call
//! the destination holds either its original bytes or a complete output.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use clipfix_models::{EncodingConfig, PostProcessOptions};

use crate::ambient::AmbientAssetProvider;
use crate::error::{MediaError, MediaResult};
use crate::filters::FilterGraphBuilder;
use crate::fs_utils::{commit_file, DestinationLocks};
use crate::subtitle::SubtitleDetector;
use crate::toolchain::MediaToolchain;

/// Outputs smaller than this are treated as corrupt or empty.
pub const DEFAULT_MIN_OUTPUT_BYTES: u64 = 1024;

/// Default directory for ambient loop files.
pub const DEFAULT_ASSETS_DIR: &str = "assets/ambient";

/// Per-clip work description. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipJob {
    pub input: PathBuf,
    pub options: PostProcessOptions,
    /// Unique scratch output, disjoint from the destination
    pub scratch_output: PathBuf,
    pub destination: PathBuf,
}

impl ClipJob {
    /// Scratch name: `<unix-nanos>_<random>_<basename>` inside `scratch_dir`.
    pub fn new(
        input: impl Into<PathBuf>,
        options: PostProcessOptions,
        scratch_dir: impl AsRef<Path>,
    ) -> Self {
        let input = input.into();
        let basename = input
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "clip.mp4".to_string());
        let nanos = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
        let nonce = uuid::Uuid::new_v4().simple().to_string();

        let scratch_output = scratch_dir
            .as_ref()
            .join(format!("{}_{}_{}", nanos, &nonce[..8], basename));
        let destination = options
            .output_path
            .clone()
            .unwrap_or_else(|| input.clone());

        Self {
            input,
            options,
            scratch_output,
            destination,
        }
    }
}

/// Processor settings.
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    /// Scratch directory for encoder output and sampled frames
    pub scratch_dir: PathBuf,
    /// Directory holding `ambient_<category>.m4a` loops
    pub assets_dir: PathBuf,
    /// Minimum plausible output size in bytes
    pub min_output_bytes: u64,
    pub encoding: EncodingConfig,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            scratch_dir: std::env::temp_dir().join("clipfix"),
            assets_dir: PathBuf::from(DEFAULT_ASSETS_DIR),
            min_output_bytes: DEFAULT_MIN_OUTPUT_BYTES,
            encoding: EncodingConfig::default(),
        }
    }
}

impl ProcessorConfig {
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = dir.into();
        self
    }

    pub fn with_assets_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.assets_dir = dir.into();
        self
    }

    pub fn with_min_output_bytes(mut self, bytes: u64) -> Self {
        self.min_output_bytes = bytes;
        self
    }
}

/// Runs the post-processing protocol for one clip at a time.
pub struct ClipProcessor<T: MediaToolchain> {
    toolchain: Arc<T>,
    detector: SubtitleDetector<T>,
    ambient: AmbientAssetProvider<T>,
    locks: DestinationLocks,
    config: ProcessorConfig,
}

impl<T: MediaToolchain> ClipProcessor<T> {
    pub fn new(toolchain: Arc<T>, config: ProcessorConfig) -> Self {
        Self {
            detector: SubtitleDetector::new(toolchain.clone(), &config.scratch_dir),
            ambient: AmbientAssetProvider::new(
                toolchain.clone(),
                &config.assets_dir,
                &config.scratch_dir,
            ),
            toolchain,
            locks: DestinationLocks::new(),
            config,
        }
    }

    /// Process `input` and return the committed destination path.
    ///
    /// # Errors
    /// - [`MediaError::InputNotFound`] if the input is missing
    /// - [`MediaError::UnsupportedContainer`] if the destination cannot hold H.264/AAC
    /// - [`MediaError::EncodeFailure`] (or `Timeout`) if the encoder fails
    /// - [`MediaError::OutputValidationFailure`] if the output is missing or too small
    pub async fn process(
        &self,
        input: &Path,
        options: &PostProcessOptions,
    ) -> MediaResult<PathBuf> {
        options.validate()?;

        match tokio::fs::metadata(input).await {
            Ok(meta) if meta.is_file() => {}
            _ => return Err(MediaError::InputNotFound(input.to_path_buf())),
        }

        let job = ClipJob::new(input, options.clone(), &self.config.scratch_dir);
        let container_ok = job
            .destination
            .extension()
            .is_some_and(|ext| EncodingConfig::supports_container(&ext.to_string_lossy()));
        if !container_ok {
            return Err(MediaError::UnsupportedContainer(job.destination));
        }

        let _commit_guard = self.locks.acquire(&job.destination).await;

        let crop_subtitles = match options.crop_subtitle_area {
            Some(crop) => crop,
            None => self.detector.detect(input).await,
        };
        let ambient = self.ambient.resolve(options.ambient_noise).await;

        info!(
            input = %input.display(),
            speed = options.speed_factor,
            crop_subtitles,
            ambient = ?ambient.as_ref().map(|p| p.display().to_string()),
            "Post-processing clip"
        );

        let graph = FilterGraphBuilder::new(input, options.speed_factor)
            .crop_subtitles(crop_subtitles)
            .ambient(ambient, options.ambient_noise_volume_db)
            .encoding(self.config.encoding.clone())
            .build();

        tokio::fs::create_dir_all(&self.config.scratch_dir).await?;
        let cmd = graph.to_command(&job.scratch_output);
        debug!(filter_complex = %graph.filter_complex, "Filter graph built");

        if let Err(e) = self.toolchain.transcode(&cmd).await {
            discard(&job.scratch_output).await;
            return Err(e);
        }

        if let Err(e) = self.validate_output(&job.scratch_output).await {
            discard(&job.scratch_output).await;
            return Err(e);
        }

        if let Err(e) = commit_file(&job.scratch_output, &job.destination).await {
            discard(&job.scratch_output).await;
            return Err(e);
        }

        info!(
            input = %input.display(),
            destination = %job.destination.display(),
            "Clip committed"
        );
        Ok(job.destination)
    }

    async fn validate_output(&self, path: &Path) -> MediaResult<()> {
        let size = match tokio::fs::metadata(path).await {
            Ok(meta) => meta.len(),
            Err(_) => return Err(MediaError::output_invalid(path, "encoder produced no file")),
        };

        if size < self.config.min_output_bytes {
            return Err(MediaError::output_invalid(
                path,
                format!(
                    "output is {} bytes, below the {} byte minimum",
                    size, self.config.min_output_bytes
                ),
            ));
        }
        Ok(())
    }
}

/// Remove a scratch file if it exists.
async fn discard(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "Removed scratch output"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove scratch output"),
    }
}
