use serde::Serialize;
use serde_json::Value;
use tracing::{info, instrument};

use super::dedupe::dedupe;
use super::normalize::normalize;
use crate::constants::{ANONYMOUS_USER, MAX_RATING, MIN_RATING, UNKNOWN_BUSINESS};
use crate::types::{CleanedReview, CombinedReview};

/// Rows removed at each cleaning stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanMetrics {
    pub input_rows: usize,
    pub missing_rating: usize,
    pub unparsable_rating: usize,
    pub out_of_range_rating: usize,
    pub duplicates: usize,
    pub output_rows: usize,
}

impl CleanMetrics {
    pub fn removed(&self) -> usize {
        self.missing_rating + self.unparsable_rating + self.out_of_range_rating + self.duplicates
    }
}

#[derive(Debug, Clone, Default)]
pub struct CleanOutput {
    pub rows: Vec<CleanedReview>,
    pub metrics: CleanMetrics,
}

/// Numeric value of a rating cell: numbers as-is, numeric strings parsed.
/// Anything else cannot be coerced.
pub fn coerce_rating(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Fill defaults, validate ratings, normalize text and drop duplicates.
#[instrument(skip_all, fields(rows = rows.len()))]
pub fn clean(rows: Vec<CombinedReview>) -> CleanOutput {
    let mut metrics = CleanMetrics {
        input_rows: rows.len(),
        ..CleanMetrics::default()
    };

    let mut cleaned = Vec::with_capacity(rows.len());
    for row in rows {
        let rating = match row.rating {
            None | Some(Value::Null) => {
                metrics.missing_rating += 1;
                continue;
            }
            Some(ref value) => match coerce_rating(value) {
                Some(rating) => rating,
                None => {
                    metrics.unparsable_rating += 1;
                    continue;
                }
            },
        };
        // NaN fails both comparisons and lands here too
        if !(MIN_RATING..=MAX_RATING).contains(&rating) {
            metrics.out_of_range_rating += 1;
            continue;
        }

        let text = row.text.unwrap_or_default();
        let text_clean = normalize(Some(&text));
        cleaned.push(CleanedReview {
            business_name: row
                .business_name
                .as_deref()
                .unwrap_or(UNKNOWN_BUSINESS)
                .trim()
                .to_string(),
            user_name: row
                .user_name
                .as_deref()
                .unwrap_or(ANONYMOUS_USER)
                .trim()
                .to_string(),
            rating: rating.trunc() as u8,
            text,
            text_clean,
        });
    }

    let (rows, duplicates) = dedupe(cleaned);
    metrics.duplicates = duplicates;
    metrics.output_rows = rows.len();

    info!(
        "🧹 Cleaned {} rows -> {} (missing rating: {}, unparsable rating: {}, out of range: {}, duplicates: {})",
        metrics.input_rows,
        metrics.output_rows,
        metrics.missing_rating,
        metrics.unparsable_rating,
        metrics.out_of_range_rating,
        metrics.duplicates
    );
    crate::observability::metrics::clean::record(&metrics);

    CleanOutput { rows, metrics }
}
