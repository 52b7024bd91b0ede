// Review pipeline: ingestion, processing, and labeling

pub mod ingestion;
pub mod labeling;
pub mod processing;

use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::Serialize;
use tracing::{info, instrument};

use crate::app::ports::ChatCompletionPort;
use crate::error::Result;
use crate::observability::metrics::run as run_metrics;
use crate::storage;
use crate::types::{CleanedReview, LabeledReview};
use ingestion::joiner::{join_files, JoinStats};
use labeling::orchestrator::{LabelingOrchestrator, LabelingReport};
use processing::clean::{clean, CleanMetrics};

/// Result of a complete pipeline run
#[derive(Debug, Serialize)]
pub struct PipelineResult {
    pub join: JoinStats,
    pub clean: CleanMetrics,
    /// `None` when labeling was skipped.
    pub labeling: Option<LabelingReport>,
    pub cleaned_file: PathBuf,
    pub labeled_file: Option<PathBuf>,
}

pub struct Pipeline;

impl Pipeline {
    /// Join, clean and (optionally) label, persisting the cleaned and labeled
    /// tables under `output_dir`.
    ///
    /// File reads and writes run on the blocking pool.
    #[instrument(skip(labeler))]
    pub async fn run<C: ChatCompletionPort>(
        reviews_path: &Path,
        metadata_path: &Path,
        output_dir: &Path,
        labeler: Option<&LabelingOrchestrator<C>>,
    ) -> Result<PipelineResult> {
        let started = Instant::now();

        info!("📥 Joining reviews with business metadata");
        let (reviews, metadata) = (reviews_path.to_path_buf(), metadata_path.to_path_buf());
        let joined = blocking(move || Ok(join_files(&reviews, &metadata)?)).await?;

        info!("🧹 Cleaning {} joined rows", joined.rows.len());
        let cleaned = clean(joined.rows);
        let (cleaned_rows, cleaned_file) =
            persist_in_background(cleaned.rows, "cleaned_reviews", output_dir).await?;

        let (labeling, labeled_file) = match labeler {
            Some(orchestrator) => {
                info!("🏷️  Labeling cleaned reviews");
                let labeled = orchestrator.label_all(cleaned_rows).await;
                let (_, path) =
                    persist_in_background(labeled.rows, "labeled_reviews", output_dir).await?;
                (Some(labeled.report), Some(path))
            }
            None => {
                info!("⏭️  Labeling skipped");
                (None, None)
            }
        };

        run_metrics::duration(started.elapsed().as_secs_f64());

        Ok(PipelineResult {
            join: joined.stats,
            clean: cleaned.metrics,
            labeling,
            cleaned_file,
            labeled_file,
        })
    }

    /// Label an already-cleaned table on disk and persist the result.
    ///
    /// Like [`Pipeline::run`], file I/O runs on the blocking pool.
    pub async fn label_file<C: ChatCompletionPort>(
        input: &Path,
        output: &Path,
        labeler: &LabelingOrchestrator<C>,
    ) -> Result<LabelingReport> {
        let input = input.to_path_buf();
        let rows: Vec<CleanedReview> = blocking(move || storage::read_jsonl(&input)).await?;
        let labeled = labeler.label_all(rows).await;

        let count = labeled.rows.len();
        let destination = output.to_path_buf();
        let rows = labeled.rows;
        blocking(move || storage::write_jsonl::<LabeledReview>(&destination, &rows)).await?;
        info!("💾 Saved {} labeled rows to {}", count, output.display());
        Ok(labeled.report)
    }
}

async fn blocking<T, F>(task: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task).await?
}

/// Write a table on the blocking pool and hand the rows back.
async fn persist_in_background<T>(
    rows: Vec<T>,
    stem: &'static str,
    output_dir: &Path,
) -> Result<(Vec<T>, PathBuf)>
where
    T: Serialize + Send + 'static,
{
    let output_dir = output_dir.to_path_buf();
    blocking(move || {
        let path = storage::persist_table(&rows, stem, &output_dir)?;
        Ok((rows, path))
    })
    .await
}
