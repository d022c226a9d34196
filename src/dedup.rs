//! Duplicate detection over the recent-candidate window.
//!
//! A bounded linear scan: candidates are the submissions created within
//! the trailing dedup window (the store query enforces the time bound).
//! The scan is deliberately linear — the window keeps it small relative
//! to total history, and widening it to an unbounded index would change
//! the recency semantics of what counts as a duplicate.

use crate::config::DedupConfig;
use crate::embedding::cosine_similarity;
use crate::imagehash;
use crate::models::{DuplicateKind, Fingerprints, Submission};

/// Scan `candidates` for a near-duplicate of the given fingerprints.
///
/// The image check runs first: a perceptual-hash Hamming distance at or
/// below the configured threshold declares an image duplicate and the
/// text check never runs. Otherwise, a cosine similarity at or above the
/// text threshold declares a text duplicate. The first matching
/// candidate in iteration order wins — the caller only needs *a* match,
/// not the best one, since the action taken is identical either way.
///
/// Candidates lacking the compared fingerprint type are skipped for that
/// check only; the candidate with id `new_id` (the submission itself) is
/// never matched.
pub fn find_duplicate(
    new_id: &str,
    fingerprints: &Fingerprints,
    candidates: &[Submission],
    config: &DedupConfig,
) -> Option<(DuplicateKind, String)> {
    if let Some(new_hash) = fingerprints.image_hash.as_deref() {
        for candidate in candidates {
            if candidate.id == new_id {
                continue;
            }
            let Some(candidate_hash) = candidate.image_hash.as_deref() else {
                continue;
            };
            if let Some(dist) = imagehash::distance(new_hash, candidate_hash) {
                if dist <= config.image_hash_threshold {
                    return Some((DuplicateKind::Image, candidate.id.clone()));
                }
            }
        }
    }

    if let Some(new_embedding) = fingerprints.text_embedding.as_deref() {
        for candidate in candidates {
            if candidate.id == new_id {
                continue;
            }
            let Some(candidate_embedding) = candidate.text_embedding.as_deref() else {
                continue;
            };
            let similarity = cosine_similarity(new_embedding, candidate_embedding);
            if similarity >= config.text_similarity_threshold {
                return Some((DuplicateKind::Text, candidate.id.clone()));
            }
        }
    }

    None
}
