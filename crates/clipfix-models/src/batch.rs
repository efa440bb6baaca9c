//! Batch run results.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Partition of a batch run over a clips directory.
///
/// Every clip matching the naming pattern lands in exactly one list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct BatchResult {
    /// Final paths of clips processed in this run
    pub processed: Vec<PathBuf>,
    /// Clips already carrying the processed marker
    pub skipped: Vec<PathBuf>,
    /// `"<file name>: <message>"` per failed clip
    pub errors: Vec<String>,
}

impl BatchResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Result for a run aborted before any clip was looked at.
    pub fn directory_error(message: impl Into<String>) -> Self {
        Self {
            errors: vec![message.into()],
            ..Self::default()
        }
    }

    /// Number of clips accounted for.
    pub fn total(&self) -> usize {
        self.processed.len() + self.skipped.len() + self.errors.len()
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_error_has_single_error() {
        let result = BatchResult::directory_error("clips: not found");
        assert!(result.processed.is_empty());
        assert!(result.skipped.is_empty());
        assert_eq!(result.errors, vec!["clips: not found".to_string()]);
        assert!(!result.is_clean());
    }

    #[test]
    fn test_serializes_as_three_lists() {
        let result = BatchResult {
            processed: vec![PathBuf::from("clips/clip_01.mp4")],
            skipped: vec![PathBuf::from("clips/clip_02_pp.mp4")],
            errors: vec!["clip_03.mp4: boom".to_string()],
        };
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["processed"][0], "clips/clip_01.mp4");
        assert_eq!(value["skipped"][0], "clips/clip_02_pp.mp4");
        assert_eq!(value["errors"][0], "clip_03.mp4: boom");
        assert_eq!(result.total(), 3);
    }
}
