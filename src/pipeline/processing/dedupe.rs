use sha2::{Digest, Sha256};
use std::collections::HashSet;

use crate::types::CleanedReview;

/// Identity of a review for duplicate detection: who wrote it, about which
/// business, and what it says after normalization.
pub fn dedupe_key(user_name: &str, business_name: &str, text_clean: &str) -> [u8; 32] {
    // Length-prefix each field so ("ab", "c") and ("a", "bc") differ
    let mut hasher = Sha256::new();
    for field in [user_name, business_name, text_clean] {
        hasher.update((field.len() as u64).to_le_bytes());
        hasher.update(field.as_bytes());
    }
    let mut key = [0u8; 32];
    key.copy_from_slice(&hasher.finalize());
    key
}

/// Hex form of [`dedupe_key`], for logs.
pub fn dedupe_key_hex(review: &CleanedReview) -> String {
    hex::encode(dedupe_key(
        &review.user_name,
        &review.business_name,
        &review.text_clean,
    ))
}

/// Drop rows whose `(user_name, business_name, text_clean)` was already seen.
/// Keeps the first occurrence and the original order; returns the number of
/// rows removed.
pub fn dedupe(rows: Vec<CleanedReview>) -> (Vec<CleanedReview>, usize) {
    let before = rows.len();
    let mut seen = HashSet::with_capacity(before);
    let kept: Vec<CleanedReview> = rows
        .into_iter()
        .filter(|row| {
            let fresh = seen.insert(dedupe_key(&row.user_name, &row.business_name, &row.text_clean));
            if !fresh {
                tracing::trace!(key = %dedupe_key_hex(row), "dropping duplicate review");
            }
            fresh
        })
        .collect();
    let removed = before - kept.len();
    (kept, removed)
}
