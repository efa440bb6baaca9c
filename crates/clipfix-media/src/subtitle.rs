//! Burned-in subtitle presence detection.
//!
//! Best-effort heuristic, not a calibrated classifier: one frame is sampled
//! past the fade-in, the bottom band is cut out, and the mean absolute
//! luma difference between horizontally adjacent pixels is compared to a
//! fixed threshold. Caption glyphs are high-contrast strokes and score high;
//! clean footage scores low. Any probing error reports "no subtitles", so a
//! failure never crops clean footage.

use image::GrayImage;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::MediaResult;
use crate::probe::FrameDimensions;
use crate::toolchain::MediaToolchain;

/// Sample time, chosen to skip fade-ins.
pub const SAMPLE_OFFSET_SECS: f64 = 2.0;
/// Share of frame height examined at the bottom.
pub const SUBTITLE_BAND_FRACTION: f64 = 0.15;
/// Empirical cut-off for the band's mean horizontal luma difference.
pub const SUBTITLE_LUMA_DIFF_THRESHOLD: f64 = 12.0;

/// Outcome of a detection run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubtitleDetection {
    pub present: bool,
    pub statistic: f64,
}

impl SubtitleDetection {
    pub fn from_statistic(statistic: f64) -> Self {
        Self {
            present: statistic > SUBTITLE_LUMA_DIFF_THRESHOLD,
            statistic,
        }
    }
}

/// Rows `(start, height)` of the bottom band in a decoded frame.
///
/// The band height comes from the probed clip height and is rescaled when
/// the decoded frame has a different height.
pub fn band_rows(probed: FrameDimensions, frame_height: u32) -> (u32, u32) {
    if frame_height == 0 {
        return (0, 0);
    }

    let mut band = (probed.height as f64 * SUBTITLE_BAND_FRACTION).round();
    if probed.height > 0 && probed.height != frame_height {
        band = band * frame_height as f64 / probed.height as f64;
    }

    let band = (band.round() as u32).clamp(1, frame_height);
    (frame_height - band, band)
}

/// Mean absolute luma difference between horizontal neighbours in a band.
pub fn band_luma_statistic(frame: &GrayImage, start_row: u32, rows: u32) -> f64 {
    let (width, height) = frame.dimensions();
    if width < 2 || rows == 0 || start_row >= height {
        return 0.0;
    }
    let end_row = (start_row + rows).min(height);

    let mut total: u64 = 0;
    let mut count: u64 = 0;
    for y in start_row..end_row {
        for x in 1..width {
            let left = frame.get_pixel(x - 1, y).0[0] as i16;
            let right = frame.get_pixel(x, y).0[0] as i16;
            total += (left - right).unsigned_abs() as u64;
            count += 1;
        }
    }

    total as f64 / count as f64
}

/// Classify a decoded frame.
pub fn classify_frame(frame: &GrayImage, probed: FrameDimensions) -> SubtitleDetection {
    let (start, rows) = band_rows(probed, frame.height());
    SubtitleDetection::from_statistic(band_luma_statistic(frame, start, rows))
}

/// Detector sampling one frame per clip through a [`MediaToolchain`].
pub struct SubtitleDetector<T: MediaToolchain> {
    toolchain: Arc<T>,
    scratch_dir: PathBuf,
}

impl<T: MediaToolchain> SubtitleDetector<T> {
    pub fn new(toolchain: Arc<T>, scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            toolchain,
            scratch_dir: scratch_dir.into(),
        }
    }

    /// Whether `clip` shows burned-in captions. Errors count as `false`.
    pub async fn detect(&self, clip: &Path) -> bool {
        match self.analyze(clip).await {
            Ok(detection) => {
                debug!(
                    clip = %clip.display(),
                    statistic = detection.statistic,
                    threshold = SUBTITLE_LUMA_DIFF_THRESHOLD,
                    present = detection.present,
                    "Subtitle detection finished"
                );
                detection.present
            }
            Err(e) => {
                warn!(
                    clip = %clip.display(),
                    error = %e,
                    "Subtitle detection failed, assuming no subtitles"
                );
                false
            }
        }
    }

    /// Run detection and return the statistic alongside the decision.
    pub async fn analyze(&self, clip: &Path) -> MediaResult<SubtitleDetection> {
        tokio::fs::create_dir_all(&self.scratch_dir).await?;

        // Removed when dropped, on every return path.
        let frame_file = tempfile::Builder::new()
            .prefix("subtitle_probe_")
            .suffix(".png")
            .tempfile_in(&self.scratch_dir)?;

        self.toolchain
            .extract_frame(clip, SAMPLE_OFFSET_SECS, frame_file.path())
            .await?;
        let probed = self.toolchain.probe_dimensions(clip).await?;

        let bytes = tokio::fs::read(frame_file.path()).await?;
        let frame = image::load_from_memory(&bytes)?.to_luma8();

        Ok(classify_frame(&frame, probed))
    }
}
