//! FFmpeg filter graph construction.
//!
//! One clip is processed in a single transcode:
//!
//! ```text
//! [0:v] setpts=PTS/speed [,crop top 92%] ─────────────────────────► [vout]
//! [0:a] atempo=.. [,atempo=..] ─► [voice] ─┐
//! [1:a] (looped) volume=<dB>dB ─► [amb] ───┴► amix(duration=first) ► [aout]
//! ```
//!
//! Without an ambient asset the tempo chain writes `[aout]` directly.

use std::path::{Path, PathBuf};

use clipfix_models::EncodingConfig;

use crate::command::{CommandInput, FfmpegCommand};

/// Smallest factor a single `atempo` stage accepts.
pub const MIN_TEMPO_STAGE: f64 = 0.5;
/// Largest factor a single `atempo` stage accepts.
pub const MAX_TEMPO_STAGE: f64 = 2.0;
/// Share of frame height kept when cropping the subtitle band.
pub const SUBTITLE_CROP_KEEP_RATIO: f64 = 0.92;

pub const VIDEO_OUT_LABEL: &str = "vout";
pub const AUDIO_OUT_LABEL: &str = "aout";

/// Split `speed` into `atempo` stage factors.
///
/// Every stage lies in `[0.5, 2.0]` and the product equals `speed`.
/// Stages of 2.0 (or 0.5) are peeled off until the remainder is in range.
pub fn tempo_chain(speed: f64) -> Vec<f64> {
    assert!(
        speed.is_finite() && speed > 0.0,
        "tempo factor must be finite and positive, got {speed}"
    );

    let mut remainder = speed;
    let mut stages = Vec::new();

    while remainder > MAX_TEMPO_STAGE {
        stages.push(MAX_TEMPO_STAGE);
        remainder /= MAX_TEMPO_STAGE;
    }
    while remainder < MIN_TEMPO_STAGE {
        stages.push(MIN_TEMPO_STAGE);
        remainder /= MIN_TEMPO_STAGE;
    }
    stages.push(remainder);

    stages
}

/// Build the `atempo` filter chain for `speed`.
pub fn audio_tempo_filter(speed: f64) -> String {
    tempo_chain(speed)
        .into_iter()
        .map(|stage| format!("atempo={}", format_number(stage)))
        .collect::<Vec<_>>()
        .join(",")
}

/// Build the video re-time (and optional crop) chain.
pub fn video_filter(speed: f64, crop_subtitles: bool) -> String {
    let mut filter = format!("setpts=PTS/{}", format_number(speed));
    if crop_subtitles {
        filter.push(',');
        filter.push_str(&subtitle_crop_filter());
    }
    filter
}

/// Crop away the bottom band, keeping the top 92% at zero offset.
///
/// The kept height is rounded down to an even number for 4:2:0 output.
pub fn subtitle_crop_filter() -> String {
    format!(
        "crop=iw:trunc(ih*{}/2)*2:0:0",
        format_number(SUBTITLE_CROP_KEEP_RATIO)
    )
}

/// Shortest exact decimal form of a factor, always with a decimal point.
///
/// Never rounds, so tiny positive factors stay non-zero.
fn format_number(value: f64) -> String {
    let mut s = format!("{}", value);
    if !s.contains('.') {
        s.push_str(".0");
    }
    s
}

/// Ambient bed mixed under the voice track.
#[derive(Debug, Clone, PartialEq)]
pub struct AmbientMix {
    pub asset: PathBuf,
    pub volume_db: f64,
}

/// A complete single-pass transcode description for one clip.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterGraph {
    /// Inputs in `-i` order (source clip first)
    pub inputs: Vec<CommandInput>,
    /// `-filter_complex` value
    pub filter_complex: String,
    /// `-map` arguments selecting the final labels
    pub map_args: Vec<String>,
    /// Codec/quality arguments
    pub encode_args: Vec<String>,
}

impl FilterGraph {
    /// Flattened input arguments, including each `-i`.
    pub fn input_args(&self) -> Vec<String> {
        self.inputs
            .iter()
            .flat_map(|input| {
                input
                    .args
                    .iter()
                    .cloned()
                    .chain(["-i".to_string(), input.source.clone()])
            })
            .collect()
    }

    /// Whether a second (ambient) input is mixed in.
    pub fn has_ambient(&self) -> bool {
        self.inputs.len() > 1
    }

    /// Turn the graph into a runnable command writing to `output`.
    pub fn to_command(&self, output: impl AsRef<Path>) -> FfmpegCommand {
        let mut inputs = self.inputs.iter();
        let first = inputs
            .next()
            .map(|input| input.source.clone())
            .unwrap_or_default();

        let mut cmd = FfmpegCommand::new(first, output);
        for input in inputs {
            cmd = cmd.add_input(input.args.iter().cloned(), &input.source);
        }

        cmd.filter_complex(&self.filter_complex)
            .output_args(self.map_args.iter().cloned())
            .output_args(self.encode_args.iter().cloned())
    }
}

/// Builder for the per-clip filter graph.
#[derive(Debug, Clone)]
pub struct FilterGraphBuilder {
    source: PathBuf,
    speed_factor: f64,
    crop_subtitles: bool,
    ambient: Option<AmbientMix>,
    encoding: EncodingConfig,
}

impl FilterGraphBuilder {
    pub fn new(source: impl Into<PathBuf>, speed_factor: f64) -> Self {
        Self {
            source: source.into(),
            speed_factor,
            crop_subtitles: false,
            ambient: None,
            encoding: EncodingConfig::default(),
        }
    }

    pub fn crop_subtitles(mut self, crop: bool) -> Self {
        self.crop_subtitles = crop;
        self
    }

    /// Mix a looped ambient bed at `volume_db`.
    pub fn ambient(mut self, asset: Option<PathBuf>, volume_db: f64) -> Self {
        self.ambient = asset.map(|asset| AmbientMix { asset, volume_db });
        self
    }

    pub fn encoding(mut self, encoding: EncodingConfig) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn build(&self) -> FilterGraph {
        let mut inputs = vec![CommandInput {
            args: Vec::new(),
            source: self.source.to_string_lossy().to_string(),
        }];

        let mut chains = vec![format!(
            "[0:v]{}[{}]",
            video_filter(self.speed_factor, self.crop_subtitles),
            VIDEO_OUT_LABEL
        )];

        let tempo = audio_tempo_filter(self.speed_factor);

        match &self.ambient {
            Some(mix) => {
                inputs.push(CommandInput {
                    args: vec!["-stream_loop".to_string(), "-1".to_string()],
                    source: mix.asset.to_string_lossy().to_string(),
                });
                chains.push(format!("[0:a]{}[voice]", tempo));
                chains.push(format!("[1:a]volume={}dB[amb]", format_number(mix.volume_db)));
                // duration=first: the looped bed must never outlast the voice.
                chains.push(format!(
                    "[voice][amb]amix=inputs=2:duration=first:dropout_transition=0:normalize=0[{}]",
                    AUDIO_OUT_LABEL
                ));
            }
            None => {
                chains.push(format!("[0:a]{}[{}]", tempo, AUDIO_OUT_LABEL));
            }
        }

        FilterGraph {
            inputs,
            filter_complex: chains.join(";"),
            map_args: vec![
                "-map".to_string(),
                format!("[{}]", VIDEO_OUT_LABEL),
                "-map".to_string(),
                format!("[{}]", AUDIO_OUT_LABEL),
            ],
            encode_args: self.encoding.to_ffmpeg_args(),
        }
    }
}
