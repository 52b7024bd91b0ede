use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::classifier::BatchClassifier;
use crate::app::ports::ChatCompletionPort;
use crate::config::LabelingConfig;
use crate::error::{PipelineError, Result};
use crate::observability::metrics::label as label_metrics;
use crate::types::{CleanedReview, LabelVerdict, LabeledReview, ModerationLabel};

/// Outcome counts for one labeling run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelingReport {
    pub run_id: Uuid,
    pub rows: usize,
    pub batches: usize,
    pub failed_batches: usize,
    pub verdicts_received: usize,
    pub rows_labeled: usize,
    /// Verdicts whose `review` matched no row, or only a row already labeled.
    pub verdicts_unmatched: usize,
    pub unrecognized_labels: usize,
}

#[derive(Debug, Clone)]
pub struct LabelingOutput {
    pub rows: Vec<LabeledReview>,
    pub report: LabelingReport,
}

/// Walks the table in fixed-size batches, one request at a time, and writes
/// returned labels back onto the rows whose text they quote.
pub struct LabelingOrchestrator<C> {
    classifier: BatchClassifier<C>,
    batch_size: usize,
    max_reviews: Option<usize>,
    batch_delay: Duration,
}

impl<C: ChatCompletionPort> LabelingOrchestrator<C> {
    pub fn new(classifier: BatchClassifier<C>, config: &LabelingConfig) -> Result<Self> {
        if config.batch_size == 0 {
            return Err(PipelineError::Config(
                "labeling batch size must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            classifier,
            batch_size: config.batch_size,
            max_reviews: config.max_reviews,
            batch_delay: Duration::from_millis(config.batch_delay_ms),
        })
    }

    #[instrument(skip_all, fields(rows = rows.len(), batch_size = self.batch_size))]
    pub async fn label_all(&self, mut rows: Vec<CleanedReview>) -> LabelingOutput {
        if let Some(max) = self.max_reviews.filter(|max| *max > 0) {
            rows.truncate(max);
        }

        let mut report = LabelingReport {
            run_id: Uuid::new_v4(),
            rows: rows.len(),
            batches: 0,
            failed_batches: 0,
            verdicts_received: 0,
            rows_labeled: 0,
            verdicts_unmatched: 0,
            unrecognized_labels: 0,
        };
        let total_batches = rows.len().div_ceil(self.batch_size);
        info!(
            run_id = %report.run_id,
            "🏷️  Labeling {} reviews in {} batches of {}",
            rows.len(),
            total_batches,
            self.batch_size
        );

        let mut labels: Vec<Option<ModerationLabel>> = vec![None; rows.len()];
        let first_row_by_text = first_row_by_text(&rows);

        for (batch_index, batch) in rows.chunks(self.batch_size).enumerate() {
            let texts: Vec<&str> = batch.iter().map(|row| row.text.as_str()).collect();
            let started = Instant::now();
            let result = self.classifier.classify(&texts).await;
            label_metrics::batch_duration(started.elapsed().as_secs_f64());
            report.batches += 1;

            match result {
                Ok(verdicts) => {
                    label_metrics::batch_succeeded(verdicts.len());
                    report.verdicts_received += verdicts.len();
                    reconcile(verdicts, &first_row_by_text, &mut labels, &mut report);
                }
                Err(e) => {
                    label_metrics::batch_failed();
                    report.failed_batches += 1;
                    warn!(batch = batch_index, "Classification error: {}", e);
                }
            }

            if (batch_index + 1) % 10 == 0 {
                debug!("Labeled batch {}/{}", batch_index + 1, total_batches);
            }

            // Rate-limit pacing applies after every batch, failed or not
            tokio::time::sleep(self.batch_delay).await;
        }

        info!(
            run_id = %report.run_id,
            "✅ Labeled {}/{} reviews ({} failed batches, {} unmatched verdicts, {} unrecognized labels)",
            report.rows_labeled,
            report.rows,
            report.failed_batches,
            report.verdicts_unmatched,
            report.unrecognized_labels
        );

        drop(first_row_by_text);
        let rows = rows
            .into_iter()
            .zip(labels)
            .map(|(review, llm_label)| LabeledReview { review, llm_label })
            .collect();
        LabelingOutput { rows, report }
    }
}

/// Lowest row index for each distinct review text.
fn first_row_by_text(rows: &[CleanedReview]) -> HashMap<&str, usize> {
    let mut index = HashMap::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        index.entry(row.text.as_str()).or_insert(i);
    }
    index
}

/// Apply verdicts by exact text match. A row keeps the first label it gets.
fn reconcile(
    verdicts: Vec<LabelVerdict>,
    first_row_by_text: &HashMap<&str, usize>,
    labels: &mut [Option<ModerationLabel>],
    report: &mut LabelingReport,
) {
    for verdict in verdicts {
        let Some(&row) = first_row_by_text.get(verdict.review.as_str()) else {
            report.verdicts_unmatched += 1;
            continue;
        };
        if labels[row].is_some() {
            report.verdicts_unmatched += 1;
            continue;
        }
        if !verdict.label.is_recognized() {
            warn!("Model returned unrecognized label {:?}", verdict.label.as_str());
            report.unrecognized_labels += 1;
            label_metrics::unrecognized_label();
        }
        labels[row] = Some(verdict.label);
        report.rows_labeled += 1;
        label_metrics::row_labeled();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::ports::ChatRequest;
    use crate::config::ClassifierConfig;
    use crate::pipeline::labeling::classifier::ClassifyError;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replies from a script, one entry per request.
    struct ScriptedClient {
        replies: Mutex<VecDeque<std::result::Result<String, ClassifyError>>>,
        batches_seen: Mutex<Vec<usize>>,
    }

    impl ScriptedClient {
        fn new(replies: Vec<std::result::Result<String, ClassifyError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                batches_seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ChatCompletionPort for ScriptedClient {
        async fn complete(
            &self,
            request: &ChatRequest,
        ) -> std::result::Result<String, ClassifyError> {
            let bullets = request.messages[0]
                .content
                .lines()
                .filter(|l| l.starts_with("- "))
                .count();
            self.batches_seen.lock().unwrap().push(bullets);
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok("[]".to_string()))
        }
    }

    fn review(user: &str, text: &str) -> CleanedReview {
        CleanedReview {
            business_name: "Cafe X".to_string(),
            user_name: user.to_string(),
            rating: 4,
            text: text.to_string(),
            text_clean: text.to_string(),
        }
    }

    fn orchestrator(
        client: ScriptedClient,
        batch_size: usize,
        max_reviews: Option<usize>,
    ) -> LabelingOrchestrator<ScriptedClient> {
        let config = LabelingConfig {
            batch_size,
            max_reviews,
            batch_delay_ms: 0,
        };
        LabelingOrchestrator::new(BatchClassifier::new(client, ClassifierConfig::default()), &config)
            .unwrap()
    }

    fn verdicts(pairs: &[(&str, &str)]) -> String {
        let items: Vec<_> = pairs
            .iter()
            .map(|(review, label)| serde_json::json!({"review": review, "label": label}))
            .collect();
        serde_json::to_string(&items).unwrap()
    }

    #[tokio::test]
    async fn labels_rows_by_exact_text() {
        let client = ScriptedClient::new(vec![
            Ok(format!("```json\n{}\n```", verdicts(&[("good", "Valid"), ("buy now", "Advertisement")]))),
            Ok(verdicts(&[("so angry", "Rant"), ("not in table", "Irrelevant")])),
        ]);
        let orch = orchestrator(client, 2, None);

        let output = orch
            .label_all(vec![
                review("a", "good"),
                review("b", "buy now"),
                review("c", "so angry"),
            ])
            .await;

        let labels: Vec<_> = output.rows.iter().map(|r| r.llm_label.clone()).collect();
        assert_eq!(
            labels,
            vec![
                Some(ModerationLabel::Valid),
                Some(ModerationLabel::Advertisement),
                Some(ModerationLabel::Rant),
            ]
        );
        assert_eq!(output.report.batches, 2);
        assert_eq!(output.report.rows_labeled, 3);
        assert_eq!(output.report.verdicts_unmatched, 1);
        assert_eq!(*orch.classifier.client().batches_seen.lock().unwrap(), vec![2, 1]);
    }

    #[tokio::test]
    async fn failed_batch_leaves_rows_unset_and_run_continues() {
        let client = ScriptedClient::new(vec![
            Err(ClassifyError::Transport("connection reset".to_string())),
            Ok("I cannot help with that".to_string()),
            Ok(verdicts(&[("e", "Valid")])),
        ]);
        let orch = orchestrator(client, 2, None);

        let output = orch
            .label_all(vec![
                review("1", "a"),
                review("2", "b"),
                review("3", "c"),
                review("4", "d"),
                review("5", "e"),
            ])
            .await;

        let labels: Vec<_> = output.rows.iter().map(|r| r.llm_label.clone()).collect();
        assert_eq!(labels, vec![None, None, None, None, Some(ModerationLabel::Valid)]);
        assert_eq!(output.report.failed_batches, 2);
        assert_eq!(output.report.batches, 3);
    }

    #[tokio::test]
    async fn duplicate_text_labels_only_lowest_index() {
        let client = ScriptedClient::new(vec![Ok(verdicts(&[
            ("same", "Valid"),
            ("same", "Rant"),
        ]))]);
        let orch = orchestrator(client, 5, None);

        let output = orch
            .label_all(vec![review("a", "same"), review("b", "same")])
            .await;

        assert_eq!(output.rows[0].llm_label, Some(ModerationLabel::Valid));
        assert_eq!(output.rows[1].llm_label, None);
        assert_eq!(output.report.verdicts_unmatched, 1);
    }

    #[tokio::test]
    async fn never_labels_unreturned_text_and_passes_unknown_labels() {
        let client = ScriptedClient::new(vec![Ok(verdicts(&[("x", "Spam"), ("y ", "Valid")]))]);
        let orch = orchestrator(client, 3, None);

        let output = orch
            .label_all(vec![review("a", "x"), review("b", "y"), review("c", "z")])
            .await;

        assert_eq!(
            output.rows[0].llm_label,
            Some(ModerationLabel::Unrecognized("Spam".to_string()))
        );
        assert_eq!(output.rows[1].llm_label, None);
        assert_eq!(output.rows[2].llm_label, None);
        assert_eq!(output.report.unrecognized_labels, 1);
    }

    #[tokio::test]
    async fn truncates_to_strict_prefix() {
        let client = ScriptedClient::new(vec![]);
        let orch = orchestrator(client, 2, Some(3));

        let output = orch
            .label_all((0..10).map(|i| review(&i.to_string(), &format!("t{i}"))).collect())
            .await;

        let users: Vec<_> = output.rows.iter().map(|r| r.review.user_name.as_str()).collect();
        assert_eq!(users, vec!["0", "1", "2"]);
        assert_eq!(output.report.batches, 2);
        assert!(output.rows.iter().all(|r| r.llm_label.is_none()));
    }

    #[tokio::test]
    async fn zero_cap_means_no_cap() {
        let orch = orchestrator(ScriptedClient::new(vec![]), 4, Some(0));
        let output = orch
            .label_all((0..6).map(|i| review(&i.to_string(), "t")).collect())
            .await;
        assert_eq!(output.rows.len(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn pauses_after_every_batch_including_failed_ones() {
        let client = ScriptedClient::new(vec![
            Ok(verdicts(&[("a", "Valid")])),
            Err(ClassifyError::Endpoint {
                status: 503,
                body: "overloaded".to_string(),
            }),
            Ok(verdicts(&[("e", "Rant")])),
        ]);
        let config = LabelingConfig {
            batch_size: 2,
            max_reviews: None,
            batch_delay_ms: 500,
        };
        let orch = LabelingOrchestrator::new(
            BatchClassifier::new(client, ClassifierConfig::default()),
            &config,
        )
        .unwrap();

        let started = tokio::time::Instant::now();
        let output = orch
            .label_all(vec![
                review("1", "a"),
                review("2", "b"),
                review("3", "c"),
                review("4", "d"),
                review("5", "e"),
            ])
            .await;
        let elapsed = started.elapsed();

        assert_eq!(output.report.batches, 3);
        assert_eq!(output.report.failed_batches, 1);
        let expected = Duration::from_millis(500) * 3;
        assert!(
            elapsed >= expected && elapsed < expected + Duration::from_millis(10),
            "elapsed {:?}, expected {:?}",
            elapsed,
            expected
        );
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let config = LabelingConfig {
            batch_size: 0,
            max_reviews: None,
            batch_delay_ms: 0,
        };
        let classifier = BatchClassifier::new(ScriptedClient::new(vec![]), ClassifierConfig::default());
        assert!(LabelingOrchestrator::new(classifier, &config).is_err());
    }
}
