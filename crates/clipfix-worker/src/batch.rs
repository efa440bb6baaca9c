//! Batch orchestration over a clips directory.
//!
//! Clips are discovered by name, classified as already processed or pending,
//! and handed to the [`ClipProcessor`] one by one (or with bounded
//! parallelism). A failing clip is recorded and the batch moves on; only a
//! missing or unreadable directory stops the run.

use futures::stream::{self, StreamExt};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};
use tracing::{error, info, Instrument};

use clipfix_media::error::truncate_head;
use clipfix_media::{ClipProcessor, MediaError, MediaToolchain};
use clipfix_models::{BatchResult, PostProcessOptions};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::ClipLogger;
use crate::metrics;

/// Filename substring marking a clip as already post-processed.
pub const PROCESSED_MARKER: &str = "_pp";

/// Longest per-clip error message kept in a [`BatchResult`].
pub const MAX_ERROR_MESSAGE_CHARS: usize = 200;

static CLIP_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^clip_\d+.*\.(mp4|mov|m4v|mkv)$").expect("clip name pattern is valid")
});

/// Whether `name` follows the `clip_<NN>...` naming convention.
pub fn is_clip_name(name: &str) -> bool {
    CLIP_NAME.is_match(name)
}

/// Whether `name` carries the processed marker.
pub fn is_processed_name(name: &str) -> bool {
    name.contains(PROCESSED_MARKER)
}

/// `<stem>_pp.<ext>` next to `path`.
pub fn marked_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{}{}.{}", stem, PROCESSED_MARKER, ext.to_string_lossy()),
        None => format!("{}{}", stem, PROCESSED_MARKER),
    };
    path.with_file_name(name)
}

/// Matching clips in `dir`, sorted by file name.
pub async fn discover_clips(dir: &Path) -> WorkerResult<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| WorkerError::directory_unavailable(dir, e.to_string()))?;

    let mut clips = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| WorkerError::directory_unavailable(dir, e.to_string()))?
    {
        let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
        if is_file && is_clip_name(&entry.file_name().to_string_lossy()) {
            clips.push(entry.path());
        }
    }

    clips.sort_by_key(|path| path.file_name().map(|n| n.to_os_string()));
    Ok(clips)
}

/// Batch behaviour knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSettings {
    /// Clips in flight at once (at least 1)
    pub max_parallel: usize,
    /// Write marked siblings instead of overwriting inputs
    pub mark_output: bool,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            max_parallel: 1,
            mark_output: false,
        }
    }
}

impl From<&WorkerConfig> for BatchSettings {
    fn from(config: &WorkerConfig) -> Self {
        Self {
            max_parallel: config.max_parallel,
            mark_output: config.mark_output,
        }
    }
}

#[derive(Debug)]
enum ClipOutcome {
    Processed(PathBuf),
    Skipped(PathBuf),
    Failed(String),
}

/// Drives the clip processor over a directory.
pub struct BatchOrchestrator<T: MediaToolchain> {
    processor: Arc<ClipProcessor<T>>,
    settings: BatchSettings,
}

impl<T: MediaToolchain> BatchOrchestrator<T> {
    pub fn new(processor: Arc<ClipProcessor<T>>, settings: BatchSettings) -> Self {
        Self {
            processor,
            settings,
        }
    }

    /// Process every pending clip in `dir`.
    ///
    /// Each clip's destination is decided here: in place, or the marked
    /// sibling when `mark_output` is set. Any `output_path` in `options`
    /// is ignored.
    pub async fn run(&self, dir: &Path, options: &PostProcessOptions) -> BatchResult {
        let clips = match discover_clips(dir).await {
            Ok(clips) => clips,
            Err(e) => {
                error!(dir = %dir.display(), error = %e, "Batch aborted");
                return BatchResult::directory_error(e.to_string());
            }
        };

        info!(
            dir = %dir.display(),
            clips = clips.len(),
            max_parallel = self.settings.max_parallel,
            "Starting batch"
        );

        let outcomes: Vec<ClipOutcome> = stream::iter(clips)
            .map(|clip| self.handle_clip(clip, options))
            .buffered(self.settings.max_parallel.max(1))
            .collect()
            .await;

        let mut result = BatchResult::new();
        for outcome in outcomes {
            match outcome {
                ClipOutcome::Processed(path) => result.processed.push(path),
                ClipOutcome::Skipped(path) => result.skipped.push(path),
                ClipOutcome::Failed(message) => result.errors.push(message),
            }
        }

        info!(
            dir = %dir.display(),
            processed = result.processed.len(),
            skipped = result.skipped.len(),
            errors = result.errors.len(),
            "Batch finished"
        );
        result
    }

    /// Process a single clip outside of a batch.
    pub async fn process_clip(
        &self,
        input: &Path,
        options: &PostProcessOptions,
    ) -> WorkerResult<PathBuf> {
        let logger = ClipLogger::new(&display_name(input), "clip");
        async {
            logger.log_start(&format!("speed={}", options.speed_factor));
            match self.processor.process(input, options).await {
                Ok(path) => {
                    logger.log_completion(&path.display().to_string());
                    Ok(path)
                }
                Err(e) => {
                    logger.log_error(&e.to_string());
                    Err(WorkerError::from(e))
                }
            }
        }
        .instrument(logger.create_span())
        .await
    }

    async fn handle_clip(&self, clip: PathBuf, options: &PostProcessOptions) -> ClipOutcome {
        let name = display_name(&clip);
        let logger = ClipLogger::new(&name, "batch");

        if is_processed_name(&name) {
            logger.log_progress("already processed, skipping");
            metrics::record_clip_skipped("marked");
            return ClipOutcome::Skipped(clip);
        }

        let mut clip_options = options.clone();
        if let Some(ignored) = clip_options.output_path.take() {
            logger.log_warning(&format!(
                "output path {} ignored in batch mode",
                ignored.display()
            ));
        }
        if self.settings.mark_output {
            let marked = marked_path(&clip);
            if tokio::fs::try_exists(&marked).await.unwrap_or(false) {
                logger.log_progress("marked output exists, skipping");
                metrics::record_clip_skipped("output_exists");
                return ClipOutcome::Skipped(clip);
            }
            clip_options.output_path = Some(marked);
        }

        async {
            logger.log_start("post-processing");
            match self.processor.process(&clip, &clip_options).await {
                Ok(path) => {
                    logger.log_completion(&path.display().to_string());
                    metrics::record_clip_processed();
                    ClipOutcome::Processed(path)
                }
                Err(e) => {
                    logger.log_error(&e.to_string());
                    metrics::record_clip_failed(error_kind(&e));
                    ClipOutcome::Failed(format_clip_error(&name, &e))
                }
            }
        }
        .instrument(logger.create_span())
        .await
    }
}

/// `"<file name>: <message>"`, with the message capped.
pub fn format_clip_error(name: &str, error: &MediaError) -> String {
    format!(
        "{}: {}",
        name,
        truncate_head(&error.to_string(), MAX_ERROR_MESSAGE_CHARS)
    )
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

fn error_kind(error: &MediaError) -> &'static str {
    match error {
        MediaError::InputNotFound(_) => "input_not_found",
        MediaError::UnsupportedContainer(_) => "unsupported_container",
        MediaError::EncodeFailure { .. } => "encode_failure",
        MediaError::OutputValidationFailure { .. } => "output_validation",
        MediaError::Timeout(_) => "timeout",
        MediaError::FfmpegNotFound | MediaError::FfprobeNotFound => "toolchain_missing",
        _ => "other",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipfix_models::encoding::H264_CONTAINERS;
    use tempfile::TempDir;

    #[test]
    fn test_clip_name_pattern() {
        assert!(is_clip_name("clip_01.mp4"));
        assert!(is_clip_name("clip_2_pp.mov"));
        assert!(is_clip_name("CLIP_10.MP4"));
        assert!(is_clip_name("clip_003_take2.mkv"));

        assert!(!is_clip_name("clip_.mp4"));
        assert!(!is_clip_name("clip_01.txt"));
        // WebM cannot hold the H.264/AAC output.
        assert!(!is_clip_name("clip_04.webm"));
        assert!(!is_clip_name("intro_clip_01.mp4"));
        assert!(!is_clip_name("clip_01.mp4.partial"));
    }

    #[test]
    fn test_every_h264_container_is_a_clip() {
        for ext in H264_CONTAINERS {
            assert!(is_clip_name(&format!("clip_01.{ext}")), "{ext}");
        }
    }

    #[test]
    fn test_processed_marker() {
        assert!(is_processed_name("clip_02_pp.mp4"));
        assert!(!is_processed_name("clip_02.mp4"));
    }

    #[test]
    fn test_marked_path() {
        assert_eq!(
            marked_path(Path::new("/clips/clip_01.mp4")),
            PathBuf::from("/clips/clip_01_pp.mp4")
        );
        assert!(is_processed_name(
            &marked_path(Path::new("clip_07.mov")).to_string_lossy()
        ));
    }

    #[test]
    fn test_format_clip_error_truncates() {
        let error = MediaError::encode_failed("x".repeat(400), None, Some(1));
        let message = format_clip_error("clip_03.mp4", &error);

        assert!(message.starts_with("clip_03.mp4: Encode failed: "));
        assert!(message.ends_with("..."));
        assert_eq!(
            message.chars().count(),
            "clip_03.mp4: ".len() + MAX_ERROR_MESSAGE_CHARS + 3
        );
    }

    #[tokio::test]
    async fn test_discover_clips_filters_and_sorts() {
        let dir = TempDir::new().unwrap();
        for name in ["clip_10.mp4", "clip_02_pp.mp4", "notes.txt", "clip_01.mov"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        std::fs::create_dir(dir.path().join("clip_05.mp4")).unwrap();

        let clips = discover_clips(dir.path()).await.unwrap();
        let names: Vec<_> = clips
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();

        assert_eq!(names, vec!["clip_01.mov", "clip_02_pp.mp4", "clip_10.mp4"]);
    }

    #[tokio::test]
    async fn test_discover_missing_directory() {
        let dir = TempDir::new().unwrap();
        let result = discover_clips(&dir.path().join("absent")).await;
        assert!(matches!(
            result,
            Err(WorkerError::DirectoryUnavailable { .. })
        ));
    }
}
