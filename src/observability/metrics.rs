//! Metrics for the review pipeline.
//!
//! Every metric name lives in [`MetricName`]; the phase modules below record
//! through the `metrics` facade. Without an installed recorder these calls
//! are no-ops, so library users and tests pay nothing.

use std::fmt;
use std::net::SocketAddr;

use tracing::{info, warn};

/// All metric names used in the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    // Join metrics
    JoinMetadataLines,
    JoinMetadataSkipped,
    JoinBusinessesIndexed,
    JoinReviewLines,
    JoinReviewSkipped,
    JoinUnmatchedBusiness,

    // Clean metrics
    CleanRowsIn,
    CleanRowsOut,
    CleanMissingRating,
    CleanUnparsableRating,
    CleanOutOfRangeRating,
    CleanDuplicates,

    // Label metrics
    LabelBatchesSuccess,
    LabelBatchesError,
    LabelBatchDuration,
    LabelVerdictsReceived,
    LabelRowsLabeled,
    LabelUnrecognized,

    // Whole-run metrics
    PipelineDuration,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::JoinMetadataLines => "review_join_metadata_lines_total",
            MetricName::JoinMetadataSkipped => "review_join_metadata_skipped_total",
            MetricName::JoinBusinessesIndexed => "review_join_businesses_indexed",
            MetricName::JoinReviewLines => "review_join_review_lines_total",
            MetricName::JoinReviewSkipped => "review_join_review_skipped_total",
            MetricName::JoinUnmatchedBusiness => "review_join_unmatched_business_total",

            MetricName::CleanRowsIn => "review_clean_rows_in_total",
            MetricName::CleanRowsOut => "review_clean_rows_out_total",
            MetricName::CleanMissingRating => "review_clean_missing_rating_total",
            MetricName::CleanUnparsableRating => "review_clean_unparsable_rating_total",
            MetricName::CleanOutOfRangeRating => "review_clean_out_of_range_rating_total",
            MetricName::CleanDuplicates => "review_clean_duplicates_total",

            MetricName::LabelBatchesSuccess => "review_label_batches_success_total",
            MetricName::LabelBatchesError => "review_label_batches_error_total",
            MetricName::LabelBatchDuration => "review_label_batch_duration_seconds",
            MetricName::LabelVerdictsReceived => "review_label_verdicts_received_total",
            MetricName::LabelRowsLabeled => "review_label_rows_labeled_total",
            MetricName::LabelUnrecognized => "review_label_unrecognized_total",

            MetricName::PipelineDuration => "review_pipeline_duration_seconds",
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Install the Prometheus exporter on `REVIEW_PIPELINE_METRICS_PORT`
/// (default 9898).
pub fn init_metrics() {
    let port: u16 = std::env::var("REVIEW_PIPELINE_METRICS_PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(9898);
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    let builder = metrics_exporter_prometheus::PrometheusBuilder::new().with_http_listener(addr);
    match builder.install() {
        Ok(()) => info!("Prometheus exporter listening on http://{}/metrics", addr),
        Err(e) => warn!("Prometheus exporter install failed: {}", e),
    }
}

pub mod join {
    use super::MetricName;
    use crate::pipeline::ingestion::joiner::JoinStats;

    pub fn record(stats: &JoinStats) {
        metrics::counter!(MetricName::JoinMetadataLines.as_str())
            .increment(stats.metadata_lines as u64);
        metrics::counter!(MetricName::JoinMetadataSkipped.as_str())
            .increment(stats.metadata_skipped as u64);
        metrics::gauge!(MetricName::JoinBusinessesIndexed.as_str())
            .set(stats.businesses_indexed as f64);
        metrics::counter!(MetricName::JoinReviewLines.as_str())
            .increment(stats.review_lines as u64);
        metrics::counter!(MetricName::JoinReviewSkipped.as_str())
            .increment(stats.review_skipped as u64);
        metrics::counter!(MetricName::JoinUnmatchedBusiness.as_str())
            .increment(stats.unmatched_business as u64);
    }
}

pub mod clean {
    use super::MetricName;
    use crate::pipeline::processing::clean::CleanMetrics;

    pub fn record(m: &CleanMetrics) {
        metrics::counter!(MetricName::CleanRowsIn.as_str()).increment(m.input_rows as u64);
        metrics::counter!(MetricName::CleanRowsOut.as_str()).increment(m.output_rows as u64);
        metrics::counter!(MetricName::CleanMissingRating.as_str())
            .increment(m.missing_rating as u64);
        metrics::counter!(MetricName::CleanUnparsableRating.as_str())
            .increment(m.unparsable_rating as u64);
        metrics::counter!(MetricName::CleanOutOfRangeRating.as_str())
            .increment(m.out_of_range_rating as u64);
        metrics::counter!(MetricName::CleanDuplicates.as_str()).increment(m.duplicates as u64);
    }
}

pub mod label {
    use super::MetricName;

    pub fn batch_succeeded(verdicts: usize) {
        metrics::counter!(MetricName::LabelBatchesSuccess.as_str()).increment(1);
        metrics::counter!(MetricName::LabelVerdictsReceived.as_str()).increment(verdicts as u64);
    }

    pub fn batch_failed() {
        metrics::counter!(MetricName::LabelBatchesError.as_str()).increment(1);
    }

    pub fn batch_duration(secs: f64) {
        metrics::histogram!(MetricName::LabelBatchDuration.as_str()).record(secs);
    }

    pub fn row_labeled() {
        metrics::counter!(MetricName::LabelRowsLabeled.as_str()).increment(1);
    }

    pub fn unrecognized_label() {
        metrics::counter!(MetricName::LabelUnrecognized.as_str()).increment(1);
    }
}

pub mod run {
    use super::MetricName;

    pub fn duration(secs: f64) {
        metrics::histogram!(MetricName::PipelineDuration.as_str()).record(secs);
    }
}
