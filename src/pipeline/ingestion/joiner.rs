use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use serde::Serialize;
use tracing::{debug, info, instrument};

use super::decoder::DualFormatDecoder;
use crate::constants::UNKNOWN_BUSINESS;
use crate::types::{BusinessRecord, CombinedReview, RawReview};

/// Line counts gathered while building the index and joining reviews.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JoinStats {
    pub metadata_lines: usize,
    pub metadata_skipped: usize,
    pub businesses_indexed: usize,
    pub review_lines: usize,
    pub review_skipped: usize,
    pub unmatched_business: usize,
}

#[derive(Debug, Clone, Default)]
pub struct JoinOutput {
    pub rows: Vec<CombinedReview>,
    pub stats: JoinStats,
}

/// Business id to display name, built from the whole metadata source.
#[derive(Debug, Default)]
pub struct BusinessIndex {
    names: HashMap<String, String>,
}

impl BusinessIndex {
    /// Reads the metadata source to the end. Later duplicates of an id
    /// overwrite earlier ones.
    pub fn build<R: BufRead>(reader: R, stats: &mut JoinStats) -> io::Result<Self> {
        let decoder = DualFormatDecoder::new();
        let mut names = HashMap::new();

        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            stats.metadata_lines += 1;
            match decoder.decode::<BusinessRecord>(&line) {
                Some(record) => {
                    let name = record.name.unwrap_or_else(|| UNKNOWN_BUSINESS.to_string());
                    names.insert(record.id, name);
                }
                None => stats.metadata_skipped += 1,
            }
        }

        stats.businesses_indexed = names.len();
        Ok(Self { names })
    }

    pub fn lookup(&self, business_id: Option<&str>) -> Option<&str> {
        business_id
            .and_then(|id| self.names.get(id))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Join a review source against a metadata source.
///
/// The metadata index is complete before the first review line is read.
/// Reviews are decoded one line at a time; only the joined rows accumulate.
pub fn join<R: BufRead, M: BufRead>(reviews: R, metadata: M) -> io::Result<JoinOutput> {
    let mut stats = JoinStats::default();
    let index = BusinessIndex::build(metadata, &mut stats)?;
    debug!("Indexed {} businesses", index.len());

    let decoder = DualFormatDecoder::new();
    let mut rows = Vec::new();

    for line in reviews.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        stats.review_lines += 1;
        let Some(review) = decoder.decode::<RawReview>(&line) else {
            stats.review_skipped += 1;
            continue;
        };

        let business_name = match index.lookup(review.business_id.as_deref()) {
            Some(name) => name.to_string(),
            None => {
                stats.unmatched_business += 1;
                UNKNOWN_BUSINESS.to_string()
            }
        };

        rows.push(CombinedReview {
            business_name: Some(business_name),
            user_name: review.user_name,
            rating: review.rating,
            text: review.text,
        });
    }

    crate::observability::metrics::join::record(&stats);
    Ok(JoinOutput { rows, stats })
}

/// File-path convenience over [`join`].
#[instrument(skip_all, fields(reviews = %reviews_path.display(), metadata = %metadata_path.display()))]
pub fn join_files(reviews_path: &Path, metadata_path: &Path) -> io::Result<JoinOutput> {
    let metadata = BufReader::new(File::open(metadata_path)?);
    let reviews = BufReader::new(File::open(reviews_path)?);
    let output = join(reviews, metadata)?;
    info!(
        "✅ Joined {} reviews against {} businesses ({} review lines skipped, {} metadata lines skipped, {} without a known business)",
        output.rows.len(),
        output.stats.businesses_indexed,
        output.stats.review_skipped,
        output.stats.metadata_skipped,
        output.stats.unmatched_business
    );
    Ok(output)
}
