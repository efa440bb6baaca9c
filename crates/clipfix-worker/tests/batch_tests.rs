//! Batch orchestration against a fake media toolchain.

use async_trait::async_trait;
use image::{GrayImage, Luma};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

use clipfix_media::probe::FrameDimensions;
use clipfix_media::{
    ClipProcessor, FfmpegCommand, MediaError, MediaResult, MediaToolchain, ProcessorConfig,
};
use clipfix_models::{AmbientNoise, PostProcessOptions};
use clipfix_worker::{BatchOrchestrator, BatchSettings, WorkerError};

/// Encodes any non-empty input into a 4 KiB file and rejects empty inputs
/// the way a real decoder would.
#[derive(Default)]
struct FakeToolchain {
    encodes: AtomicUsize,
}

#[async_trait]
impl MediaToolchain for FakeToolchain {
    async fn transcode(&self, cmd: &FfmpegCommand) -> MediaResult<()> {
        if cmd.output().extension().is_some_and(|e| e == "png") {
            GrayImage::from_pixel(64, 64, Luma([80])).save(cmd.output())?;
            return Ok(());
        }

        let first = &cmd.inputs()[0];
        if first.args.iter().any(|a| a == "lavfi") {
            tokio::fs::write(cmd.output(), b"synthesized bed").await?;
            return Ok(());
        }

        self.encodes.fetch_add(1, Ordering::SeqCst);
        let size = tokio::fs::metadata(&first.source).await?.len();
        if size == 0 {
            return Err(MediaError::encode_failed(
                "FFmpeg exited with non-zero status",
                Some(format!("{}: Invalid data found when processing input", first.source)),
                Some(1),
            ));
        }
        tokio::fs::write(cmd.output(), vec![1u8; 4096]).await?;
        Ok(())
    }

    async fn probe_dimensions(&self, _path: &Path) -> MediaResult<FrameDimensions> {
        Ok(FrameDimensions {
            width: 64,
            height: 64,
        })
    }
}

struct Harness {
    clips: TempDir,
    _scratch: TempDir,
    _assets: TempDir,
    toolchain: Arc<FakeToolchain>,
    orchestrator: BatchOrchestrator<FakeToolchain>,
}

impl Harness {
    fn new(settings: BatchSettings) -> Self {
        let clips = TempDir::new().unwrap();
        let scratch = TempDir::new().unwrap();
        let assets = TempDir::new().unwrap();
        let toolchain = Arc::new(FakeToolchain::default());

        let config = ProcessorConfig::default()
            .with_scratch_dir(scratch.path())
            .with_assets_dir(assets.path());
        let processor = Arc::new(ClipProcessor::new(toolchain.clone(), config));

        Self {
            clips,
            _scratch: scratch,
            _assets: assets,
            toolchain,
            orchestrator: BatchOrchestrator::new(processor, settings),
        }
    }

    fn write(&self, name: &str, bytes: &[u8]) -> PathBuf {
        let path = self.clips.path().join(name);
        std::fs::write(&path, bytes).unwrap();
        path
    }

    fn path(&self, name: &str) -> PathBuf {
        self.clips.path().join(name)
    }
}

#[tokio::test]
async fn test_mixed_directory_partitions_clips() {
    let h = Harness::new(BatchSettings::default());
    h.write("clip_01.mp4", b"valid clip bytes");
    h.write("clip_02_pp.mp4", b"already processed");
    h.write("clip_03.mp4", b"");
    h.write("notes.txt", b"not a clip");

    let result = h
        .orchestrator
        .run(h.clips.path(), &PostProcessOptions::default())
        .await;

    assert_eq!(result.processed, vec![h.path("clip_01.mp4")]);
    assert_eq!(result.skipped, vec![h.path("clip_02_pp.mp4")]);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].starts_with("clip_03.mp4: "));
    assert_eq!(result.total(), 3);

    assert_eq!(std::fs::read(h.path("clip_01.mp4")).unwrap(), vec![1u8; 4096]);
    assert_eq!(std::fs::read(h.path("clip_02_pp.mp4")).unwrap(), b"already processed");
    assert!(std::fs::read(h.path("clip_03.mp4")).unwrap().is_empty());
}

#[tokio::test]
async fn test_marked_clips_are_never_processed() {
    let h = Harness::new(BatchSettings::default());
    h.write("clip_01_pp.mp4", b"done");
    h.write("clip_02_PP_extra.mp4", b"done");
    h.write("clip_03_pp.mov", b"done");

    let result = h
        .orchestrator
        .run(h.clips.path(), &PostProcessOptions::default())
        .await;

    // The marker is case-sensitive: `_PP` is a pending clip.
    assert_eq!(result.processed, vec![h.path("clip_02_PP_extra.mp4")]);
    assert!(result.errors.is_empty());
    assert_eq!(
        result.skipped,
        vec![h.path("clip_01_pp.mp4"), h.path("clip_03_pp.mov")]
    );
    assert_eq!(h.toolchain.encodes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_missing_directory_is_a_single_error() {
    let h = Harness::new(BatchSettings::default());

    let result = h
        .orchestrator
        .run(&h.clips.path().join("missing"), &PostProcessOptions::default())
        .await;

    assert!(result.processed.is_empty());
    assert!(result.skipped.is_empty());
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].contains("missing"));
}

#[tokio::test]
async fn test_mark_output_is_idempotent() {
    let h = Harness::new(BatchSettings {
        max_parallel: 1,
        mark_output: true,
    });
    h.write("clip_01.mp4", b"raw clip");
    let options = PostProcessOptions::default().with_ambient_noise(AmbientNoise::None);

    let first = h.orchestrator.run(h.clips.path(), &options).await;
    assert_eq!(first.processed, vec![h.path("clip_01_pp.mp4")]);
    assert_eq!(std::fs::read(h.path("clip_01.mp4")).unwrap(), b"raw clip");

    let second = h.orchestrator.run(h.clips.path(), &options).await;
    assert!(second.processed.is_empty());
    assert!(second.errors.is_empty());
    assert_eq!(
        second.skipped,
        vec![h.path("clip_01.mp4"), h.path("clip_01_pp.mp4")]
    );
    assert_eq!(h.toolchain.encodes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_parallel_batch_reports_in_filename_order() {
    let h = Harness::new(BatchSettings {
        max_parallel: 3,
        mark_output: false,
    });
    let names = [
        "clip_06.mp4",
        "clip_01.mp4",
        "clip_04.mp4",
        "clip_02.mp4",
        "clip_05.mp4",
        "clip_03.mp4",
    ];
    for name in names {
        h.write(name, b"valid clip bytes");
    }
    h.write("clip_07.mp4", b"");

    let options = PostProcessOptions::default()
        .with_ambient_noise(AmbientNoise::Cafe)
        .with_crop_subtitle_area(false);
    let result = h.orchestrator.run(h.clips.path(), &options).await;

    let mut expected: Vec<_> = names.iter().map(|n| h.path(n)).collect();
    expected.sort();
    assert_eq!(result.processed, expected);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].starts_with("clip_07.mp4: "));
    assert_eq!(result.total(), 7);
}

#[tokio::test]
async fn test_process_clip_reports_missing_input() {
    let h = Harness::new(BatchSettings::default());

    let result = h
        .orchestrator
        .process_clip(&h.path("clip_09.mp4"), &PostProcessOptions::default())
        .await;

    assert!(matches!(
        result,
        Err(WorkerError::Media(MediaError::InputNotFound(_)))
    ));
}

#[tokio::test]
async fn test_process_clip_writes_requested_output() {
    let h = Harness::new(BatchSettings::default());
    let input = h.write("clip_01.mp4", b"raw clip");
    let output = h.clips.path().join("final").join("clip_01.mp4");

    let options = PostProcessOptions::default()
        .with_ambient_noise(AmbientNoise::None)
        .with_output_path(&output);
    let path = h.orchestrator.process_clip(&input, &options).await.unwrap();

    assert_eq!(path, output);
    assert_eq!(std::fs::read(&output).unwrap(), vec![1u8; 4096]);
    assert_eq!(std::fs::read(&input).unwrap(), b"raw clip");
}

#[tokio::test]
async fn test_batch_ignores_requested_output_path() {
    let h = Harness::new(BatchSettings::default());
    h.write("clip_01.mp4", b"raw clip");
    let elsewhere = h.clips.path().join("elsewhere.mp4");

    let options = PostProcessOptions::default()
        .with_ambient_noise(AmbientNoise::None)
        .with_output_path(&elsewhere);
    let result = h.orchestrator.run(h.clips.path(), &options).await;

    assert_eq!(result.processed, vec![h.path("clip_01.mp4")]);
    assert_eq!(std::fs::read(h.path("clip_01.mp4")).unwrap(), vec![1u8; 4096]);
    assert!(!elsewhere.exists());
}
