use std::fs;
use std::sync::Mutex;

use async_trait::async_trait;
use tempfile::tempdir;

use review_pipeline::app::ports::{ChatCompletionPort, ChatRequest};
use review_pipeline::config::{ClassifierConfig, LabelingConfig};
use review_pipeline::pipeline::labeling::{BatchClassifier, ClassifyError, LabelingOrchestrator};
use review_pipeline::pipeline::Pipeline;
use review_pipeline::storage::read_jsonl;
use review_pipeline::types::{CleanedReview, LabeledReview, ModerationLabel};

/// Labels every quoted review by a keyword in its text.
struct KeywordClient {
    requests: Mutex<usize>,
}

#[async_trait]
impl ChatCompletionPort for KeywordClient {
    async fn complete(&self, request: &ChatRequest) -> Result<String, ClassifyError> {
        *self.requests.lock().unwrap() += 1;
        let verdicts: Vec<_> = request.messages[0]
            .content
            .lines()
            .filter_map(|line| line.strip_prefix("- "))
            .map(|review| {
                let label = if review.contains("buy") { "Advertisement" } else { "Valid" };
                serde_json::json!({"review": review, "label": label})
            })
            .collect();
        Ok(format!("```json\n{}\n```", serde_json::to_string(&verdicts).unwrap()))
    }
}

fn labeler(batch_size: usize) -> LabelingOrchestrator<KeywordClient> {
    let client = KeywordClient {
        requests: Mutex::new(0),
    };
    let config = LabelingConfig {
        batch_size,
        max_reviews: None,
        batch_delay_ms: 0,
    };
    LabelingOrchestrator::new(BatchClassifier::new(client, ClassifierConfig::default()), &config)
        .unwrap()
}

#[tokio::test]
async fn end_to_end_join_clean_label() {
    let dir = tempdir().unwrap();
    let metadata = dir.path().join("meta.json");
    let reviews = dir.path().join("reviews.json");
    let output_dir = dir.path().join("output");

    fs::write(
        &metadata,
        "{\"id\":\"g1\",\"name\":\"Cafe X\"}\n\
         {'gmap_id': 'g2', 'name': 'Diner Y', 'price': None}\n\
         not a record\n",
    )
    .unwrap();
    fs::write(
        &reviews,
        "{\"business_id\":\"g1\",\"user_name\":\"Alice\",\"rating\":\"5\",\"text\":\"Great   coffee!!\"}\n\
         {'gmap_id': 'g2', 'name': 'Bob', 'rating': 1, 'text': 'buy cheap pills'}\n\
         {'gmap_id': 'g2', 'name': 'Bob', 'rating': 1, 'text': 'buy  cheap pills'}\n\
         {\"business_id\":\"g9\",\"rating\":7,\"text\":\"too high\"}\n\
         {broken\n",
    )
    .unwrap();

    let labeler = labeler(2);
    let result = Pipeline::run(&reviews, &metadata, &output_dir, Some(&labeler))
        .await
        .unwrap();

    assert_eq!(result.join.metadata_skipped, 1);
    assert_eq!(result.join.review_skipped, 1);
    assert_eq!(result.join.unmatched_business, 1);
    assert_eq!(result.clean.input_rows, 4);
    assert_eq!(result.clean.out_of_range_rating, 1);
    assert_eq!(result.clean.duplicates, 1);
    assert_eq!(result.clean.output_rows, 2);

    let cleaned: Vec<CleanedReview> = read_jsonl(&result.cleaned_file).unwrap();
    assert_eq!(
        cleaned[0],
        CleanedReview {
            business_name: "Cafe X".to_string(),
            user_name: "Alice".to_string(),
            rating: 5,
            text: "Great   coffee!!".to_string(),
            text_clean: "Great coffee!!".to_string(),
        }
    );
    assert_eq!(cleaned[1].text, "buy cheap pills");

    let labeled_path = result.labeled_file.expect("labeled file written");
    let labeled: Vec<LabeledReview> = read_jsonl(&labeled_path).unwrap();
    assert_eq!(labeled.len(), 2);
    assert_eq!(labeled[0].llm_label, Some(ModerationLabel::Valid));
    assert_eq!(labeled[1].llm_label, Some(ModerationLabel::Advertisement));

    let report = result.labeling.expect("labeling ran");
    assert_eq!(report.batches, 1);
    assert_eq!(report.rows_labeled, 2);
    assert_eq!(report.failed_batches, 0);
}

#[tokio::test]
async fn skip_labeling_writes_only_cleaned_table() {
    let dir = tempdir().unwrap();
    let metadata = dir.path().join("meta.json");
    let reviews = dir.path().join("reviews.json");
    let output_dir = dir.path().join("output");
    fs::write(&metadata, "{\"id\":\"g1\",\"name\":\"Cafe X\"}\n").unwrap();
    fs::write(
        &reviews,
        "{\"business_id\":\"g1\",\"user_name\":\"Alice\",\"rating\":4,\"text\":\"Fine\"}\n",
    )
    .unwrap();

    let result = Pipeline::run::<KeywordClient>(&reviews, &metadata, &output_dir, None)
        .await
        .unwrap();

    assert!(result.labeling.is_none());
    assert!(result.labeled_file.is_none());
    assert_eq!(fs::read_dir(&output_dir).unwrap().count(), 1);
}

#[tokio::test]
async fn label_file_relabels_cleaned_table() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("cleaned.jsonl");
    let output = dir.path().join("labeled.jsonl");
    fs::write(
        &input,
        "{\"business_name\":\"Cafe X\",\"user_name\":\"A\",\"rating\":5,\"text\":\"nice\",\"text_clean\":\"nice\"}\n\
         {\"business_name\":\"Cafe X\",\"user_name\":\"B\",\"rating\":2,\"text\":\"buy now\",\"text_clean\":\"buy now\"}\n\
         {\"business_name\":\"Cafe X\",\"user_name\":\"C\",\"rating\":3,\"text\":\"ok\",\"text_clean\":\"ok\"}\n",
    )
    .unwrap();

    let report = Pipeline::label_file(&input, &output, &labeler(2)).await.unwrap();
    assert_eq!(report.batches, 2);
    assert_eq!(report.rows_labeled, 3);

    let labeled: Vec<LabeledReview> = read_jsonl(&output).unwrap();
    let labels: Vec<_> = labeled.iter().map(|r| r.llm_label.clone()).collect();
    assert_eq!(
        labels,
        vec![
            Some(ModerationLabel::Valid),
            Some(ModerationLabel::Advertisement),
            Some(ModerationLabel::Valid),
        ]
    );
}

#[tokio::test]
async fn missing_input_file_is_an_error() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("nope.json");
    let result =
        Pipeline::run::<KeywordClient>(&missing, &missing, &dir.path().join("out"), None).await;
    assert!(result.is_err());
}
