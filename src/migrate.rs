use anyhow::Result;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;

    // Create submissions table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS submissions (
            id TEXT PRIMARY KEY,
            text TEXT,
            image_ref TEXT,
            created_at INTEGER NOT NULL,
            processed INTEGER NOT NULL DEFAULT 0,
            status TEXT NOT NULL DEFAULT 'pending',
            image_hash TEXT,
            text_embedding BLOB,
            original_issue_id TEXT,
            error_message TEXT
        )
        "#,
    )
    .execute(&pool)
    .await?;

    // Create issues table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS issues (
            id TEXT PRIMARY KEY,
            category TEXT NOT NULL,
            subcategory TEXT NOT NULL,
            priority TEXT NOT NULL,
            description TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'new',
            image_hash TEXT,
            text_embedding BLOB,
            original_submission_id TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            FOREIGN KEY (original_submission_id) REFERENCES submissions(id)
        )
        "#,
    )
    .execute(&pool)
    .await?;

    // Create indexes
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_submissions_processed ON submissions(processed)")
        .execute(&pool)
        .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_submissions_created_at ON submissions(created_at DESC)",
    )
    .execute(&pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_issues_original_submission ON issues(original_submission_id)",
    )
    .execute(&pool)
    .await?;

    pool.close().await;
    Ok(())
}
