//! Batch metrics.
//!
//! Counters go through the `metrics` facade. Without an installed recorder
//! they are no-ops, so the CLI pays nothing unless an embedder opts in.

use metrics::counter;

/// Metric names as constants for consistency.
pub mod names {
    pub const CLIPS_PROCESSED_TOTAL: &str = "clipfix_clips_processed_total";
    pub const CLIPS_SKIPPED_TOTAL: &str = "clipfix_clips_skipped_total";
    pub const CLIPS_FAILED_TOTAL: &str = "clipfix_clips_failed_total";
}

pub fn record_clip_processed() {
    counter!(names::CLIPS_PROCESSED_TOTAL).increment(1);
}

pub fn record_clip_skipped(reason: &'static str) {
    counter!(names::CLIPS_SKIPPED_TOTAL, "reason" => reason).increment(1);
}

/// Record a failed clip, labelled by error kind.
pub fn record_clip_failed(kind: &'static str) {
    counter!(names::CLIPS_FAILED_TOTAL, "kind" => kind).increment(1);
}
