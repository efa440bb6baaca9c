//! `clipfix` command line entry point.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use clipfix_media::{check_ffmpeg, check_ffprobe, ClipProcessor, FfmpegToolchain};
use clipfix_models::{AmbientNoise, PostProcessOptions};
use clipfix_worker::{init_tracing, BatchOrchestrator, BatchSettings, WorkerConfig, WorkerError};

/// Post-process generated clips: re-time, mask voice artifacts, crop captions
#[derive(Parser, Debug)]
#[command(name = "clipfix", author, version, about, long_about = None)]
struct Cli {
    /// Print the result as JSON on stdout
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Process every `clip_<NN>` file in a directory
    Batch {
        /// Directory holding the clips
        dir: PathBuf,
        #[command(flatten)]
        processing: ProcessingArgs,
        /// Clips processed concurrently
        #[arg(long)]
        parallel: Option<usize>,
        /// Write `<stem>_pp.<ext>` instead of overwriting each clip
        #[arg(long)]
        mark_output: bool,
    },

    /// Process a single clip
    Clip {
        /// Clip to process
        input: PathBuf,
        /// Destination (defaults to overwriting the input)
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[command(flatten)]
        processing: ProcessingArgs,
    },
}

#[derive(Args, Debug)]
struct ProcessingArgs {
    /// Playback speed factor
    #[arg(long)]
    speed: Option<f64>,
    /// Ambient noise category (office, cafe, home, outdoor, none)
    #[arg(long)]
    ambient: Option<AmbientNoise>,
    /// Ambient bed level in dB (negative is quieter)
    #[arg(long, allow_hyphen_values = true)]
    ambient_volume: Option<f64>,
    /// Force subtitle cropping on or off instead of auto-detecting
    #[arg(long)]
    crop_subtitles: Option<bool>,
}

impl ProcessingArgs {
    fn to_options(&self) -> Result<PostProcessOptions, WorkerError> {
        let mut options = PostProcessOptions::default();
        if let Some(speed) = self.speed {
            options = options.with_speed_factor(speed);
        }
        if let Some(ambient) = self.ambient {
            options = options.with_ambient_noise(ambient);
        }
        if let Some(db) = self.ambient_volume {
            options = options.with_ambient_volume_db(db);
        }
        if let Some(crop) = self.crop_subtitles {
            options = options.with_crop_subtitle_area(crop);
        }
        options
            .validate()
            .map_err(|e| WorkerError::config_error(e.to_string()))?;
        Ok(options)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let mut config = WorkerConfig::from_env();
    info!("Worker config: {:?}", config);

    let ffmpeg = check_ffmpeg().context("ffmpeg must be installed and on PATH")?;
    let ffprobe = check_ffprobe().context("ffprobe must be installed and on PATH")?;
    info!(ffmpeg = %ffmpeg.display(), ffprobe = %ffprobe.display(), "Media toolchain found");

    let toolchain = Arc::new(FfmpegToolchain::new().with_timeout(config.encode_timeout.as_secs()));

    match cli.command {
        Commands::Batch {
            dir,
            processing,
            parallel,
            mark_output,
        } => {
            let options = processing.to_options()?;
            if let Some(parallel) = parallel {
                config.max_parallel = parallel.max(1);
            }
            config.mark_output |= mark_output;

            let processor = Arc::new(ClipProcessor::new(toolchain, config.processor_config()));
            let orchestrator = BatchOrchestrator::new(processor, BatchSettings::from(&config));
            let result = orchestrator.run(&dir, &options).await;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                for path in &result.processed {
                    println!("processed  {}", path.display());
                }
                for path in &result.skipped {
                    println!("skipped    {}", path.display());
                }
                for message in &result.errors {
                    println!("error      {}", message);
                }
            }

            if !result.is_clean() {
                std::process::exit(1);
            }
        }

        Commands::Clip {
            input,
            output,
            processing,
        } => {
            let mut options = processing.to_options()?;
            options.output_path = output;

            let processor = Arc::new(ClipProcessor::new(toolchain, config.processor_config()));
            let orchestrator = BatchOrchestrator::new(processor, BatchSettings::from(&config));
            let path = orchestrator
                .process_clip(&input, &options)
                .await
                .with_context(|| format!("failed to process {}", input.display()))?;

            if cli.json {
                println!("{}", serde_json::json!({ "output": path }));
            } else {
                println!("{}", path.display());
            }
        }
    }

    Ok(())
}
