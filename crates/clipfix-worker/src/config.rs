//! Worker configuration.

use std::path::PathBuf;
use std::time::Duration;

use clipfix_media::processor::{DEFAULT_ASSETS_DIR, DEFAULT_MIN_OUTPUT_BYTES};
use clipfix_media::ProcessorConfig;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Scratch directory for encoder output and sampled frames
    pub scratch_dir: PathBuf,
    /// Directory holding ambient loop files
    pub assets_dir: PathBuf,
    /// Per-invocation encoder timeout
    pub encode_timeout: Duration,
    /// Clips processed concurrently in a batch
    pub max_parallel: usize,
    /// Outputs below this size are rejected
    pub min_output_bytes: u64,
    /// Write `<stem>_pp.<ext>` next to the input instead of overwriting it
    pub mark_output: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            scratch_dir: std::env::temp_dir().join("clipfix"),
            assets_dir: PathBuf::from(DEFAULT_ASSETS_DIR),
            encode_timeout: Duration::from_secs(600), // 10 minutes
            max_parallel: 1,
            min_output_bytes: DEFAULT_MIN_OUTPUT_BYTES,
            mark_output: false,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            scratch_dir: std::env::var("CLIPFIX_SCRATCH_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.scratch_dir),
            assets_dir: std::env::var("CLIPFIX_ASSETS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.assets_dir),
            encode_timeout: std::env::var("CLIPFIX_ENCODE_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.encode_timeout),
            max_parallel: std::env::var("CLIPFIX_MAX_PARALLEL")
                .ok()
                .and_then(|s| s.parse::<usize>().ok())
                .map(|n| n.max(1))
                .unwrap_or(defaults.max_parallel),
            min_output_bytes: std::env::var("CLIPFIX_MIN_OUTPUT_BYTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.min_output_bytes),
            mark_output: std::env::var("CLIPFIX_MARK_OUTPUT")
                .ok()
                .and_then(|s| parse_flag(&s))
                .unwrap_or(defaults.mark_output),
        }
    }

    /// Settings handed to the clip processor.
    pub fn processor_config(&self) -> ProcessorConfig {
        ProcessorConfig::default()
            .with_scratch_dir(&self.scratch_dir)
            .with_assets_dir(&self.assets_dir)
            .with_min_output_bytes(self.min_output_bytes)
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WorkerConfig::default();
        assert_eq!(config.encode_timeout, Duration::from_secs(600));
        assert_eq!(config.max_parallel, 1);
        assert_eq!(config.min_output_bytes, 1024);
        assert!(!config.mark_output);
        assert!(config.scratch_dir.ends_with("clipfix"));
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag(" 0 "), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }

    #[test]
    fn test_processor_config_carries_paths() {
        let config = WorkerConfig {
            scratch_dir: PathBuf::from("/scratch"),
            assets_dir: PathBuf::from("/assets"),
            min_output_bytes: 2048,
            ..WorkerConfig::default()
        };
        let processor = config.processor_config();
        assert_eq!(processor.scratch_dir, PathBuf::from("/scratch"));
        assert_eq!(processor.assets_dir, PathBuf::from("/assets"));
        assert_eq!(processor.min_output_bytes, 2048);
    }
}
