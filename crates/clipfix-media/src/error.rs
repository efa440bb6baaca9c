//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

use clipfix_models::OptionsError;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Longest encoder diagnostic carried in an error.
pub const MAX_DIAGNOSTIC_CHARS: usize = 500;

/// Errors that can occur during clip post-processing.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFprobe not found in PATH")]
    FfprobeNotFound,

    #[error("Input not found: {0}")]
    InputNotFound(PathBuf),

    #[error("Encode failed: {message}{}", format_diagnostics(.diagnostics))]
    EncodeFailure {
        message: String,
        diagnostics: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("Unsupported output container for H.264/AAC: {0}")]
    UnsupportedContainer(PathBuf),

    #[error("Output validation failed for {path}: {reason}")]
    OutputValidationFailure { path: PathBuf, reason: String },

    #[error("Ambient asset generation failed for '{category}': {message}")]
    AssetGenerationFailure { category: String, message: String },

    #[error("FFprobe failed: {message}")]
    ProbeFailed {
        message: String,
        stderr: Option<String>,
    },

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("Invalid options: {0}")]
    InvalidOptions(#[from] OptionsError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Image decode error: {0}")]
    Image(#[from] image::ImageError),
}

fn format_diagnostics(diagnostics: &Option<String>) -> String {
    match diagnostics {
        Some(d) if !d.is_empty() => format!(" ({})", d),
        _ => String::new(),
    }
}

impl MediaError {
    /// Create an encode failure, truncating the diagnostic excerpt.
    pub fn encode_failed(
        message: impl Into<String>,
        diagnostics: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::EncodeFailure {
            message: message.into(),
            diagnostics: diagnostics.map(|d| truncate_tail(d.trim(), MAX_DIAGNOSTIC_CHARS)),
            exit_code,
        }
    }

    pub fn output_invalid(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::OutputValidationFailure {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn asset_failed(category: impl Into<String>, message: impl Into<String>) -> Self {
        Self::AssetGenerationFailure {
            category: category.into(),
            message: message.into(),
        }
    }
}

/// Keep the last `max_chars` characters; FFmpeg prints the cause at the end.
pub fn truncate_tail(text: &str, max_chars: usize) -> String {
    let count = text.chars().count();
    if count <= max_chars {
        return text.to_string();
    }
    let skip = count - max_chars;
    format!("...{}", text.chars().skip(skip).collect::<String>())
}

/// Keep the first `max_chars` characters.
pub fn truncate_head(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    format!("{}...", text.chars().take(max_chars).collect::<String>())
}
