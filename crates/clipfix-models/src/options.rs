//! Post-processing options.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::ambient::AmbientNoise;

/// Default time-compression factor.
pub const DEFAULT_SPEED_FACTOR: f64 = 1.4;
/// Default ambient bed level in dB (negative = quieter).
pub const DEFAULT_AMBIENT_VOLUME_DB: f64 = -28.0;

/// Options controlling how a single clip is post-processed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PostProcessOptions {
    /// Playback speed multiplier (> 0). Output duration = input / speed.
    #[serde(default = "default_speed_factor", alias = "speedFactor")]
    pub speed_factor: f64,

    /// Ambient noise category mixed under the voice track
    #[serde(default, alias = "ambientNoise")]
    pub ambient_noise: AmbientNoise,

    /// Ambient bed attenuation in dB
    #[serde(default = "default_ambient_volume_db", alias = "ambientNoiseVolume")]
    pub ambient_noise_volume_db: f64,

    /// Crop the subtitle band. `None` auto-detects per clip.
    #[serde(default, alias = "cropSubtitleArea")]
    pub crop_subtitle_area: Option<bool>,

    /// Destination path. `None` overwrites the input in place.
    #[serde(default, alias = "outputPath")]
    pub output_path: Option<PathBuf>,
}

fn default_speed_factor() -> f64 {
    DEFAULT_SPEED_FACTOR
}
fn default_ambient_volume_db() -> f64 {
    DEFAULT_AMBIENT_VOLUME_DB
}

impl Default for PostProcessOptions {
    fn default() -> Self {
        Self {
            speed_factor: DEFAULT_SPEED_FACTOR,
            ambient_noise: AmbientNoise::default(),
            ambient_noise_volume_db: DEFAULT_AMBIENT_VOLUME_DB,
            crop_subtitle_area: None,
            output_path: None,
        }
    }
}

impl PostProcessOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_speed_factor(mut self, speed_factor: f64) -> Self {
        self.speed_factor = speed_factor;
        self
    }

    pub fn with_ambient_noise(mut self, ambient_noise: AmbientNoise) -> Self {
        self.ambient_noise = ambient_noise;
        self
    }

    pub fn with_ambient_volume_db(mut self, volume_db: f64) -> Self {
        self.ambient_noise_volume_db = volume_db;
        self
    }

    /// Force the subtitle crop on or off, bypassing detection.
    pub fn with_crop_subtitle_area(mut self, crop: bool) -> Self {
        self.crop_subtitle_area = Some(crop);
        self
    }

    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(path.into());
        self
    }

    /// Validate numeric ranges.
    pub fn validate(&self) -> Result<(), OptionsError> {
        if !self.speed_factor.is_finite() || self.speed_factor <= 0.0 {
            return Err(OptionsError::InvalidSpeedFactor(self.speed_factor));
        }
        if !self.ambient_noise_volume_db.is_finite() {
            return Err(OptionsError::InvalidVolume(self.ambient_noise_volume_db));
        }
        Ok(())
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum OptionsError {
    #[error("speed factor must be a finite number > 0, got {0}")]
    InvalidSpeedFactor(f64),

    #[error("ambient volume must be a finite dB value, got {0}")]
    InvalidVolume(f64),
}
