//! Submission and issue storage.
//!
//! All pipeline writes funnel through [`commit_batch`], which applies an
//! ordered list of [`Write`] ops inside a single transaction: either the
//! whole run's decisions land, or none do. Status updates are guarded
//! with `WHERE status = 'pending'` so a terminal status is written
//! exactly once and never overwritten.

use anyhow::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::embedding::{blob_to_vec, vec_to_blob};
use crate::models::{Fingerprints, Issue, Priority, Submission, SubmissionStatus};

/// One pending write, decided before the commit step runs.
#[derive(Debug, Clone)]
pub enum Write {
    MarkDuplicate {
        submission_id: String,
        fingerprints: Fingerprints,
        original_issue_id: String,
    },
    MarkProcessed {
        submission_id: String,
        fingerprints: Fingerprints,
    },
    MarkError {
        submission_id: String,
        fingerprints: Fingerprints,
        message: String,
    },
    CreateIssue(Issue),
}

/// Insert a new pending submission (intake).
///
/// Input is normalized here, once: the caller passes explicitly-typed
/// text and image fields, and the pipeline never guesses among
/// alternative field names.
pub async fn insert_submission(
    pool: &SqlitePool,
    text: Option<&str>,
    image_ref: Option<&str>,
    created_at: i64,
) -> Result<Submission> {
    let id = Uuid::new_v4().to_string();

    sqlx::query(
        r#"
        INSERT INTO submissions (id, text, image_ref, created_at, processed, status)
        VALUES (?, ?, ?, ?, 0, 'pending')
        "#,
    )
    .bind(&id)
    .bind(text)
    .bind(image_ref)
    .bind(created_at)
    .execute(pool)
    .await?;

    Ok(Submission {
        id,
        text: text.map(|s| s.to_string()),
        image_ref: image_ref.map(|s| s.to_string()),
        created_at,
        processed: false,
        status: SubmissionStatus::Pending,
        image_hash: None,
        text_embedding: None,
        original_issue_id: None,
        error_message: None,
    })
}

/// Fetch unprocessed submissions in intake order.
pub async fn query_pending(pool: &SqlitePool, limit: Option<usize>) -> Result<Vec<Submission>> {
    // SQLite treats a negative LIMIT as unlimited
    let limit_val = limit.map(|l| l as i64).unwrap_or(-1);

    let rows = sqlx::query(
        "SELECT * FROM submissions WHERE processed = 0 ORDER BY created_at ASC, id ASC LIMIT ?",
    )
    .bind(limit_val)
    .fetch_all(pool)
    .await?;

    rows.iter().map(submission_from_row).collect()
}

/// Fetch the duplicate-candidate window: all submissions created at or
/// after `window_start`, regardless of status.
pub async fn query_recent(pool: &SqlitePool, window_start: i64) -> Result<Vec<Submission>> {
    let rows = sqlx::query(
        "SELECT * FROM submissions WHERE created_at >= ? ORDER BY created_at ASC, id ASC",
    )
    .bind(window_start)
    .fetch_all(pool)
    .await?;

    rows.iter().map(submission_from_row).collect()
}

/// Look up the issue derived from a submission, if one exists.
pub async fn find_issue_id_for_submission(
    pool: &SqlitePool,
    submission_id: &str,
) -> Result<Option<String>> {
    let id: Option<String> =
        sqlx::query_scalar("SELECT id FROM issues WHERE original_submission_id = ? LIMIT 1")
            .bind(submission_id)
            .fetch_optional(pool)
            .await?;
    Ok(id)
}

/// List classified issues, newest first.
pub async fn list_issues(pool: &SqlitePool, limit: Option<i64>) -> Result<Vec<Issue>> {
    let limit_val = limit.unwrap_or(-1);

    let rows = sqlx::query("SELECT * FROM issues ORDER BY created_at DESC, id ASC LIMIT ?")
        .bind(limit_val)
        .fetch_all(pool)
        .await?;

    rows.iter().map(issue_from_row).collect()
}

/// Count submissions grouped by status.
pub async fn submission_status_counts(pool: &SqlitePool) -> Result<Vec<(String, i64)>> {
    let rows = sqlx::query(
        "SELECT status, COUNT(*) AS n FROM submissions GROUP BY status ORDER BY n DESC",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| (row.get("status"), row.get("n")))
        .collect())
}

pub async fn count_issues(pool: &SqlitePool) -> Result<i64> {
    Ok(sqlx::query_scalar("SELECT COUNT(*) FROM issues")
        .fetch_one(pool)
        .await?)
}

/// Apply a batch of writes in one transaction.
///
/// Returns the number of rows actually written. An op that fails rolls
/// back the entire batch — a partially applied run is never observable.
/// Submission updates touch only rows still in `pending`, so re-applying
/// a batch against already-terminal rows writes nothing.
pub async fn commit_batch(pool: &SqlitePool, writes: &[Write]) -> Result<u64> {
    let mut tx = pool.begin().await?;
    let mut applied = 0u64;

    for write in writes {
        match write {
            Write::MarkDuplicate {
                submission_id,
                fingerprints,
                original_issue_id,
            } => {
                let result = sqlx::query(
                    r#"
                    UPDATE submissions
                    SET processed = 1, status = 'duplicate',
                        image_hash = ?, text_embedding = ?, original_issue_id = ?
                    WHERE id = ? AND status = 'pending'
                    "#,
                )
                .bind(&fingerprints.image_hash)
                .bind(fingerprints.text_embedding.as_deref().map(vec_to_blob))
                .bind(original_issue_id)
                .bind(submission_id)
                .execute(&mut *tx)
                .await?;
                applied += result.rows_affected();
            }
            Write::MarkProcessed {
                submission_id,
                fingerprints,
            } => {
                let result = sqlx::query(
                    r#"
                    UPDATE submissions
                    SET processed = 1, status = 'processed_ok',
                        image_hash = ?, text_embedding = ?
                    WHERE id = ? AND status = 'pending'
                    "#,
                )
                .bind(&fingerprints.image_hash)
                .bind(fingerprints.text_embedding.as_deref().map(vec_to_blob))
                .bind(submission_id)
                .execute(&mut *tx)
                .await?;
                applied += result.rows_affected();
            }
            Write::MarkError {
                submission_id,
                fingerprints,
                message,
            } => {
                let result = sqlx::query(
                    r#"
                    UPDATE submissions
                    SET processed = 1, status = 'error',
                        image_hash = ?, text_embedding = ?, error_message = ?
                    WHERE id = ? AND status = 'pending'
                    "#,
                )
                .bind(&fingerprints.image_hash)
                .bind(fingerprints.text_embedding.as_deref().map(vec_to_blob))
                .bind(message)
                .bind(submission_id)
                .execute(&mut *tx)
                .await?;
                applied += result.rows_affected();
            }
            Write::CreateIssue(issue) => {
                let result = sqlx::query(
                    r#"
                    INSERT INTO issues (id, category, subcategory, priority, description,
                                        status, image_hash, text_embedding,
                                        original_submission_id, created_at)
                    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(&issue.id)
                .bind(&issue.category)
                .bind(&issue.subcategory)
                .bind(issue.priority.as_str())
                .bind(&issue.description)
                .bind(&issue.status)
                .bind(&issue.image_hash)
                .bind(issue.text_embedding.as_deref().map(vec_to_blob))
                .bind(&issue.original_submission_id)
                .bind(issue.created_at)
                .execute(&mut *tx)
                .await?;
                applied += result.rows_affected();
            }
        }
    }

    tx.commit().await?;
    Ok(applied)
}

fn submission_from_row(row: &SqliteRow) -> Result<Submission> {
    let status_str: String = row.get("status");
    let embedding_blob: Option<Vec<u8>> = row.get("text_embedding");
    let processed: i64 = row.get("processed");

    Ok(Submission {
        id: row.get("id"),
        text: row.get("text"),
        image_ref: row.get("image_ref"),
        created_at: row.get("created_at"),
        processed: processed != 0,
        status: SubmissionStatus::parse(&status_str)?,
        image_hash: row.get("image_hash"),
        text_embedding: embedding_blob.map(|b| blob_to_vec(&b)),
        original_issue_id: row.get("original_issue_id"),
        error_message: row.get("error_message"),
    })
}

fn issue_from_row(row: &SqliteRow) -> Result<Issue> {
    let priority_str: String = row.get("priority");
    let embedding_blob: Option<Vec<u8>> = row.get("text_embedding");

    Ok(Issue {
        id: row.get("id"),
        category: row.get("category"),
        subcategory: row.get("subcategory"),
        priority: Priority::parse(&priority_str)?,
        description: row.get("description"),
        status: row.get("status"),
        image_hash: row.get("image_hash"),
        text_embedding: embedding_blob.map(|b| blob_to_vec(&b)),
        original_submission_id: row.get("original_submission_id"),
        created_at: row.get("created_at"),
    })
}
