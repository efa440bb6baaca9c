//! Ambient noise bed assets.
//!
//! Each noise category maps to a canonical loop file in the assets
//! directory. A missing file is synthesized once from a low-level noise
//! recipe. Synthesis failure is non-fatal: the category resolves to `None`
//! and the clip is processed without ambient mixing.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use clipfix_models::AmbientNoise;

use crate::command::FfmpegCommand;
use crate::error::{MediaError, MediaResult};
use crate::fs_utils::commit_file;
use crate::toolchain::MediaToolchain;

// =============================================================================
// Constants
// =============================================================================

/// Length of a synthesized loop.
pub const AMBIENT_BED_SECS: f64 = 60.0;

/// Sample rate of synthesized beds.
const AMBIENT_SAMPLE_RATE: u32 = 44_100;

/// Bitrate of synthesized beds.
const AMBIENT_BITRATE: &str = "96k";

// =============================================================================
// Synthesis recipes
// =============================================================================

/// How to synthesize a default bed for one category.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseRecipe {
    /// `anoisesrc` colour
    pub color: &'static str,
    /// Peak amplitude (0.0 to 1.0)
    pub amplitude: f64,
    /// Optional lowpass cutoff to soften the hiss
    pub lowpass_hz: Option<u32>,
}

impl NoiseRecipe {
    pub fn for_category(category: AmbientNoise) -> Option<Self> {
        let recipe = match category {
            AmbientNoise::Office => Self {
                color: "pink",
                amplitude: 0.05,
                lowpass_hz: Some(6000),
            },
            AmbientNoise::Cafe => Self {
                color: "brown",
                amplitude: 0.08,
                lowpass_hz: None,
            },
            AmbientNoise::Home => Self {
                color: "brown",
                amplitude: 0.03,
                lowpass_hz: Some(3000),
            },
            AmbientNoise::Outdoor => Self {
                color: "white",
                amplitude: 0.04,
                lowpass_hz: Some(2500),
            },
            AmbientNoise::None => return None,
        };
        Some(recipe)
    }

    fn lavfi_source(&self) -> String {
        format!(
            "anoisesrc=color={}:amplitude={}:sample_rate={}",
            self.color, self.amplitude, AMBIENT_SAMPLE_RATE
        )
    }

    /// Command rendering this recipe to `output`.
    pub fn to_command(&self, output: impl AsRef<Path>) -> FfmpegCommand {
        let mut cmd = FfmpegCommand::lavfi(self.lavfi_source(), output).duration(AMBIENT_BED_SECS);
        if let Some(hz) = self.lowpass_hz {
            cmd = cmd.audio_filter(format!("lowpass=f={}", hz));
        }
        cmd.audio_codec("aac").audio_bitrate(AMBIENT_BITRATE)
    }
}

// =============================================================================
// Provider
// =============================================================================

/// Resolves noise categories to loop files, synthesizing missing ones.
pub struct AmbientAssetProvider<T: MediaToolchain> {
    toolchain: Arc<T>,
    assets_dir: PathBuf,
    scratch_dir: PathBuf,
    /// Serializes synthesis so concurrent clips don't render the same bed twice.
    synth_lock: Mutex<()>,
}

impl<T: MediaToolchain> AmbientAssetProvider<T> {
    pub fn new(
        toolchain: Arc<T>,
        assets_dir: impl Into<PathBuf>,
        scratch_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            toolchain,
            assets_dir: assets_dir.into(),
            scratch_dir: scratch_dir.into(),
            synth_lock: Mutex::new(()),
        }
    }

    /// Canonical asset location for a category.
    pub fn asset_path(&self, category: AmbientNoise) -> Option<PathBuf> {
        if category.is_none() {
            return None;
        }
        Some(self.assets_dir.join(format!("ambient_{}.m4a", category)))
    }

    /// Resolve a category to an existing asset file, if any.
    ///
    /// Returns `None` for [`AmbientNoise::None`] and when synthesis fails.
    pub async fn resolve(&self, category: AmbientNoise) -> Option<PathBuf> {
        let path = self.asset_path(category)?;
        if path.exists() {
            return Some(path);
        }

        let _guard = self.synth_lock.lock().await;
        if path.exists() {
            return Some(path);
        }

        match self.synthesize(category, &path).await {
            Ok(()) => {
                info!(category = %category, path = %path.display(), "Synthesized ambient bed");
                Some(path)
            }
            Err(e) => {
                warn!(
                    category = %category,
                    error = %e,
                    "Ambient bed unavailable, continuing without ambient mixing"
                );
                None
            }
        }
    }

    async fn synthesize(&self, category: AmbientNoise, dest: &Path) -> MediaResult<()> {
        let recipe = NoiseRecipe::for_category(category)
            .ok_or_else(|| MediaError::asset_failed(category.as_str(), "no recipe"))?;

        tokio::fs::create_dir_all(&self.scratch_dir)
            .await
            .map_err(|e| MediaError::asset_failed(category.as_str(), e.to_string()))?;

        let scratch = self.scratch_dir.join(format!(
            "ambient_{}_{}.m4a",
            category,
            uuid::Uuid::new_v4().simple()
        ));

        debug!(category = %category, scratch = %scratch.display(), "Rendering ambient bed");

        let rendered = self.toolchain.synthesize_noise(&recipe, &scratch).await;
        let size = tokio::fs::metadata(&scratch).await.map(|m| m.len()).unwrap_or(0);

        if let Err(e) = rendered {
            let _ = tokio::fs::remove_file(&scratch).await;
            return Err(MediaError::asset_failed(category.as_str(), e.to_string()));
        }
        if size == 0 {
            let _ = tokio::fs::remove_file(&scratch).await;
            return Err(MediaError::asset_failed(
                category.as_str(),
                "synthesized file is missing or empty",
            ));
        }

        if let Err(e) = commit_file(&scratch, dest).await {
            let _ = tokio::fs::remove_file(&scratch).await;
            return Err(MediaError::asset_failed(category.as_str(), e.to_string()));
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
