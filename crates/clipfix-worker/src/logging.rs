//! Structured logging.
//!
//! Subscriber setup for the binary and a per-clip logger that tags every
//! event with the clip name and operation.

use tracing::{error, info, warn, Span};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Default filter directive when `RUST_LOG` is unset.
pub const DEFAULT_LOG_DIRECTIVE: &str = "clipfix=info";

/// Install the global subscriber.
///
/// `LOG_FORMAT=json` selects the JSON formatter; otherwise human-readable
/// output goes to stderr so stdout stays free for results.
pub fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_DIRECTIVE));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}

/// Clip logger for structured logging with consistent formatting.
#[derive(Debug, Clone)]
pub struct ClipLogger {
    clip: String,
    operation: String,
}

impl ClipLogger {
    /// Create a logger for one clip and operation (e.g. `"batch"`, `"clip"`).
    pub fn new(clip: &str, operation: &str) -> Self {
        Self {
            clip: clip.to_string(),
            operation: operation.to_string(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(
            clip = %self.clip,
            operation = %self.operation,
            "Clip started: {}", message
        );
    }

    pub fn log_progress(&self, message: &str) {
        info!(
            clip = %self.clip,
            operation = %self.operation,
            "Clip progress: {}", message
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            clip = %self.clip,
            operation = %self.operation,
            "Clip warning: {}", message
        );
    }

    pub fn log_error(&self, message: &str) {
        error!(
            clip = %self.clip,
            operation = %self.operation,
            "Clip error: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            clip = %self.clip,
            operation = %self.operation,
            "Clip completed: {}", message
        );
    }

    pub fn clip(&self) -> &str {
        &self.clip
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Span wrapping all events emitted while this clip is processed.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "clip",
            clip = %self.clip,
            operation = %self.operation
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clip_logger_creation() {
        let logger = ClipLogger::new("clip_01.mp4", "batch");

        assert_eq!(logger.clip(), "clip_01.mp4");
        assert_eq!(logger.operation(), "batch");
    }

    #[test]
    fn test_default_directive_parses() {
        assert!(DEFAULT_LOG_DIRECTIVE
            .parse::<tracing_subscriber::filter::Directive>()
            .is_ok());
    }
}
