use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::{info, warn};

use crate::types::{CleanedReview, HandLabelRow};

/// Which rows go to manual labeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleSpec {
    /// Rows to draw.
    pub size: usize,
    /// Leading rows to skip; these are the ones already sent to the model.
    pub offset: usize,
    pub seed: u64,
}

/// Draw a reproducible random sample from `rows[offset..]` with an empty
/// `label` column.
///
/// Asking for more rows than remain after the offset returns all of them, in
/// shuffled order.
pub fn sample_for_hand_labeling(rows: &[CleanedReview], spec: SampleSpec) -> Vec<HandLabelRow> {
    let pool = rows.get(spec.offset..).unwrap_or(&[]);
    if spec.size > pool.len() {
        warn!(
            "Requested {} rows but only {} remain after skipping {}",
            spec.size,
            pool.len(),
            spec.offset
        );
    }

    let mut rng = StdRng::seed_from_u64(spec.seed);
    let sample: Vec<HandLabelRow> = pool
        .choose_multiple(&mut rng, spec.size)
        .map(|review| HandLabelRow {
            review: review.clone(),
            label: None,
        })
        .collect();

    info!(
        "🎯 Sampled {} of {} rows for hand labeling (offset {}, seed {})",
        sample.len(),
        pool.len(),
        spec.offset,
        spec.seed
    );
    sample
}
