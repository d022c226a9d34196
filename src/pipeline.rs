//! Pipeline orchestration.
//!
//! Drives each pending submission through fingerprint extraction →
//! duplicate check → classification → terminal status, accumulating all
//! writes and committing them as one atomic batch at the end of the run.
//! Per-submission failures land in that submission's own terminal state;
//! only a commit failure aborts the run (leaving every submission
//! pending for the next scheduled attempt).

use std::collections::HashMap;

use anyhow::Result;

use crate::classify::Classifier;
use crate::config::Config;
use crate::db;
use crate::dedup;
use crate::embedding::Embedder;
use crate::fingerprint::{extract_fingerprints, ImageStore};
use crate::models::{Fingerprints, Issue, Submission};
use crate::store::{self, Write};

/// Outcome counters for one processing run.
#[derive(Debug, Default)]
pub struct ProcessSummary {
    pub scanned: u64,
    pub duplicates: u64,
    pub classified: u64,
    pub errors: u64,
    pub writes_planned: u64,
    pub writes_applied: u64,
    pub committed: bool,
}

/// Run the pipeline once over the current pending snapshot.
///
/// Submissions are processed sequentially in intake order. Nothing is
/// written until every submission has a decision; `dry_run` skips the
/// commit entirely, leaving the store untouched.
pub async fn run_process(
    config: &Config,
    embedder: Option<&dyn Embedder>,
    classifier: &dyn Classifier,
    images: &dyn ImageStore,
    limit: Option<usize>,
    dry_run: bool,
) -> Result<ProcessSummary> {
    let pool = db::connect(config).await?;

    let now = chrono::Utc::now().timestamp();
    let window_start = now - config.dedup.window_hours * 3600;

    let pending = store::query_pending(&pool, limit).await?;

    // Candidate window for duplicate detection. Submissions decided
    // earlier in this run are appended with their fresh fingerprints,
    // since those are not yet visible in the store.
    let mut candidates = store::query_recent(&pool, window_start).await?;

    let mut writes: Vec<Write> = Vec::new();
    let mut issue_ids_this_run: HashMap<String, String> = HashMap::new();
    let mut summary = ProcessSummary::default();

    for submission in &pending {
        summary.scanned += 1;

        let fingerprints = extract_fingerprints(submission, embedder, images).await;

        let text = submission
            .text
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty());

        // Neither usable text nor a readable image: nothing to match or
        // classify against.
        if text.is_none() && fingerprints.image_hash.is_none() {
            writes.push(Write::MarkError {
                submission_id: submission.id.clone(),
                fingerprints,
                message: "no usable input".to_string(),
            });
            summary.errors += 1;
            continue;
        }

        if let Some((kind, matched_id)) =
            dedup::find_duplicate(&submission.id, &fingerprints, &candidates, &config.dedup)
        {
            let original_issue_id =
                resolve_issue_id(&pool, &issue_ids_this_run, &matched_id).await?;
            println!(
                "  {}: duplicate ({}) of {}",
                submission.id,
                kind.as_str(),
                original_issue_id
            );
            writes.push(Write::MarkDuplicate {
                submission_id: submission.id.clone(),
                fingerprints: fingerprints.clone(),
                original_issue_id,
            });
            summary.duplicates += 1;
            candidates.push(with_fingerprints(submission.clone(), &fingerprints));
            continue;
        }

        let Some(text) = text else {
            // Unique image-only report: nothing to classify.
            writes.push(Write::MarkError {
                submission_id: submission.id.clone(),
                fingerprints: fingerprints.clone(),
                message: "no text input to classify".to_string(),
            });
            summary.errors += 1;
            candidates.push(with_fingerprints(submission.clone(), &fingerprints));
            continue;
        };

        match classifier.classify(text).await {
            Ok(classified) => {
                let issue = Issue {
                    id: uuid::Uuid::new_v4().to_string(),
                    category: classified.category,
                    subcategory: classified.subcategory,
                    priority: classified.priority,
                    description: classified.description,
                    status: classified.status,
                    image_hash: fingerprints.image_hash.clone(),
                    text_embedding: fingerprints.text_embedding.clone(),
                    original_submission_id: submission.id.clone(),
                    created_at: now,
                };
                issue_ids_this_run.insert(submission.id.clone(), issue.id.clone());
                writes.push(Write::CreateIssue(issue));
                writes.push(Write::MarkProcessed {
                    submission_id: submission.id.clone(),
                    fingerprints: fingerprints.clone(),
                });
                summary.classified += 1;
            }
            Err(e) => {
                eprintln!("Warning: classification failed for {}: {}", submission.id, e);
                writes.push(Write::MarkError {
                    submission_id: submission.id.clone(),
                    fingerprints: fingerprints.clone(),
                    message: e.to_string(),
                });
                summary.errors += 1;
            }
        }

        candidates.push(with_fingerprints(submission.clone(), &fingerprints));
    }

    summary.writes_planned = writes.len() as u64;

    if dry_run {
        println!("process (dry-run)");
        print_counts(&summary);
        println!("  writes planned: {}", summary.writes_planned);
        println!("ok");
        pool.close().await;
        return Ok(summary);
    }

    summary.writes_applied = store::commit_batch(&pool, &writes).await?;
    summary.committed = true;

    println!("process");
    print_counts(&summary);
    println!("  writes committed: {}", summary.writes_applied);
    println!("ok");

    pool.close().await;
    Ok(summary)
}

fn print_counts(summary: &ProcessSummary) {
    println!("  scanned: {}", summary.scanned);
    println!("  duplicates: {}", summary.duplicates);
    println!("  classified: {}", summary.classified);
    println!("  errors: {}", summary.errors);
}

/// Resolve a matched submission id to its derived issue id.
///
/// Issues created earlier in this run are not yet committed, so the
/// in-run map is consulted before the store. A matched submission with
/// no issue at all (itself a duplicate, or errored) is cited directly.
async fn resolve_issue_id(
    pool: &sqlx::SqlitePool,
    issue_ids_this_run: &HashMap<String, String>,
    matched_submission_id: &str,
) -> Result<String> {
    if let Some(issue_id) = issue_ids_this_run.get(matched_submission_id) {
        return Ok(issue_id.clone());
    }
    if let Some(issue_id) = store::find_issue_id_for_submission(pool, matched_submission_id).await? {
        return Ok(issue_id);
    }
    Ok(matched_submission_id.to_string())
}

fn with_fingerprints(mut submission: Submission, fingerprints: &Fingerprints) -> Submission {
    submission.image_hash = fingerprints.image_hash.clone();
    submission.text_embedding = fingerprints.text_embedding.clone();
    submission
}
