use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use review_pipeline::config::Config;
use review_pipeline::constants::{DEFAULT_SAMPLE_OFFSET, DEFAULT_SAMPLE_SEED, DEFAULT_SAMPLE_SIZE};
use review_pipeline::infra::http_client::HttpChatClient;
use review_pipeline::logging;
use review_pipeline::observability::metrics::init_metrics;
use review_pipeline::pipeline::ingestion::joiner::join_files;
use review_pipeline::pipeline::labeling::{BatchClassifier, LabelingOrchestrator, LabelingReport};
use review_pipeline::pipeline::processing::clean::{clean, CleanMetrics};
use review_pipeline::pipeline::Pipeline;
use review_pipeline::sampling::{sample_for_hand_labeling, SampleSpec};
use review_pipeline::storage;
use review_pipeline::types::{CleanedReview, CombinedReview};

#[derive(Parser)]
#[command(name = "review_pipeline")]
#[command(about = "Join, clean and LLM-label business review dumps")]
#[command(version = "0.1.0")]
struct Cli {
    /// Config file (defaults to ./config.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Serve Prometheus metrics while running
    #[arg(long, global = true)]
    metrics: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Join reviews to business names
    Join {
        #[arg(long)]
        reviews: PathBuf,
        #[arg(long)]
        metadata: PathBuf,
        /// Output JSONL (defaults to a timestamped file in the output dir)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Clean a joined table
    Clean {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Label a cleaned table with the chat model
    Label {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        batch_size: Option<usize>,
        /// Label only the first N rows (0 labels everything)
        #[arg(long)]
        max_reviews: Option<usize>,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Join, clean and label in one go
    Run {
        #[arg(long)]
        reviews: PathBuf,
        #[arg(long)]
        metadata: PathBuf,
        #[arg(long)]
        batch_size: Option<usize>,
        #[arg(long)]
        max_reviews: Option<usize>,
        /// Stop after cleaning
        #[arg(long)]
        skip_labeling: bool,
    },
    /// Export a random sample of a cleaned table for manual labeling
    Sample {
        #[arg(long)]
        input: PathBuf,
        #[arg(long, default_value_t = DEFAULT_SAMPLE_SIZE)]
        size: usize,
        /// Leading rows to skip (already labeled by the model)
        #[arg(long, default_value_t = DEFAULT_SAMPLE_OFFSET)]
        offset: usize,
        #[arg(long, default_value_t = DEFAULT_SAMPLE_SEED)]
        seed: u64,
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn apply_overrides(config: &mut Config, batch_size: Option<usize>, max_reviews: Option<usize>) -> anyhow::Result<()> {
    if let Some(batch_size) = batch_size {
        config.labeling.batch_size = batch_size;
    }
    if let Some(max_reviews) = max_reviews {
        config.labeling.max_reviews = Some(max_reviews);
    }
    config.validate()?;
    Ok(())
}

fn build_labeler(config: &Config) -> anyhow::Result<LabelingOrchestrator<HttpChatClient>> {
    let api_key = config.api_key()?;
    let client = HttpChatClient::new(config.classifier.endpoint.clone(), api_key);
    let classifier = BatchClassifier::new(client, config.classifier.clone());
    Ok(LabelingOrchestrator::new(classifier, &config.labeling)?)
}

fn output_path(out: Option<PathBuf>, config: &Config, stem: &str) -> PathBuf {
    out.unwrap_or_else(|| storage::timestamped_path(Path::new(&config.output.dir), stem))
}

fn print_clean_metrics(metrics: &CleanMetrics) {
    println!("\n🧹 Cleaning Results:");
    println!("   Input rows: {}", metrics.input_rows);
    println!("   Missing rating: {}", metrics.missing_rating);
    println!("   Unparsable rating: {}", metrics.unparsable_rating);
    println!("   Out-of-range rating: {}", metrics.out_of_range_rating);
    println!("   Duplicates: {}", metrics.duplicates);
    println!("   Output rows: {}", metrics.output_rows);
}

fn print_labeling_report(report: &LabelingReport) {
    println!("\n🏷️  Labeling Results (run {}):", report.run_id);
    println!("   Rows: {}", report.rows);
    println!("   Batches: {} ({} failed)", report.batches, report.failed_batches);
    println!("   Verdicts received: {}", report.verdicts_received);
    println!("   Rows labeled: {}", report.rows_labeled);
    println!("   Unmatched verdicts: {}", report.verdicts_unmatched);
    println!("   Unrecognized labels: {}", report.unrecognized_labels);
    if report.failed_batches > 0 {
        println!("\n⚠️  {} batches failed; their rows have no label", report.failed_batches);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load environment variables (HF_TOKEN and friends)
    dotenv::dotenv().ok();

    logging::init_logging();

    if cli.metrics {
        init_metrics();
    }

    let mut config = Config::load(cli.config.as_deref()).context("failed to load configuration")?;

    match cli.command {
        Commands::Join { reviews, metadata, out } => {
            println!("📥 Joining reviews with business metadata...");
            let joined = join_files(&reviews, &metadata)
                .with_context(|| format!("failed to join {} with {}", reviews.display(), metadata.display()))?;
            let out = output_path(out, &config, "combined_reviews");
            storage::write_jsonl(&out, &joined.rows)?;
            println!("✅ Joined {} reviews", joined.rows.len());
            println!("   Review lines skipped: {}", joined.stats.review_skipped);
            println!("   Metadata lines skipped: {}", joined.stats.metadata_skipped);
            println!("   Unknown businesses: {}", joined.stats.unmatched_business);
            println!("💾 Saved to {}", out.display());
        }
        Commands::Clean { input, out } => {
            println!("🧹 Cleaning {}...", input.display());
            let rows: Vec<CombinedReview> = storage::read_jsonl(&input)
                .with_context(|| format!("failed to read {}", input.display()))?;
            let cleaned = clean(rows);
            let out = output_path(out, &config, "cleaned_reviews");
            storage::write_jsonl(&out, &cleaned.rows)?;
            print_clean_metrics(&cleaned.metrics);
            println!("💾 Saved to {}", out.display());
        }
        Commands::Label { input, batch_size, max_reviews, out } => {
            apply_overrides(&mut config, batch_size, max_reviews)?;
            let labeler = build_labeler(&config)?;
            let out = output_path(out, &config, "labeled_reviews");
            println!("🏷️  Labeling {} with {}...", input.display(), config.classifier.model);
            let report = Pipeline::label_file(&input, &out, &labeler).await?;
            print_labeling_report(&report);
            println!("💾 Saved to {}", out.display());
        }
        Commands::Run { reviews, metadata, batch_size, max_reviews, skip_labeling } => {
            println!("🚀 Running full pipeline (join + clean + label)...");
            apply_overrides(&mut config, batch_size, max_reviews)?;
            let output_dir = PathBuf::from(&config.output.dir);

            let result = if skip_labeling {
                Pipeline::run::<HttpChatClient>(&reviews, &metadata, &output_dir, None).await?
            } else {
                let labeler = build_labeler(&config)?;
                Pipeline::run(&reviews, &metadata, &output_dir, Some(&labeler)).await?
            };

            println!("\n📊 Pipeline Results:");
            println!("   Joined rows: {}", result.clean.input_rows);
            println!("   Unknown businesses: {}", result.join.unmatched_business);
            print_clean_metrics(&result.clean);
            println!("   Cleaned file: {}", result.cleaned_file.display());
            if let Some(report) = &result.labeling {
                print_labeling_report(report);
            }
            if let Some(path) = &result.labeled_file {
                println!("   Labeled file: {}", path.display());
            }
            info!("Pipeline finished");
        }
        Commands::Sample { input, size, offset, seed, out } => {
            let rows: Vec<CleanedReview> = storage::read_jsonl(&input)
                .with_context(|| format!("failed to read {}", input.display()))?;
            if rows.len() <= offset {
                warn!("Offset {} skips the whole table of {} rows", offset, rows.len());
            }
            let sample = sample_for_hand_labeling(&rows, SampleSpec { size, offset, seed });
            let out = output_path(out, &config, "hand_label_sample");
            storage::write_jsonl(&out, &sample)?;
            println!("🎯 Exported {} rows for hand labeling to {}", sample.len(), out.display());
        }
    }

    Ok(())
}
