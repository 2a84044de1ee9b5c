//! Title matching by token-set (Jaccard) similarity.

use std::collections::HashSet;

use crate::models::MetadataRecord;

/// Lowercase alphanumeric tokens of `text`
fn tokens(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

/// Jaccard similarity of the token sets of `a` and `b`.
///
/// Returns 0.0 when either side has no tokens.
pub fn similarity(a: &str, b: &str) -> f64 {
    let left = tokens(a);
    let right = tokens(b);
    if left.is_empty() || right.is_empty() {
        return 0.0;
    }

    let shared = left.intersection(&right).count();
    let union = left.union(&right).count();
    shared as f64 / union as f64
}

/// Pick the candidate whose title is most similar to `hint_title`.
///
/// Ties keep the earlier candidate. A candidate is only selected when it
/// shares at least one token with the hint; otherwise `(None, 0.0)`.
pub fn select_best(
    hint_title: &str,
    candidates: Vec<MetadataRecord>,
) -> (Option<MetadataRecord>, f64) {
    let mut best: Option<MetadataRecord> = None;
    let mut best_score = 0.0;

    for candidate in candidates {
        let score = similarity(hint_title, candidate.title());
        if score > best_score {
            best_score = score;
            best = Some(candidate);
        }
    }

    (best, best_score)
}
