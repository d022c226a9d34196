//! # Civic Triage CLI (`triage`)
//!
//! The `triage` binary drives the report pipeline. It provides commands
//! for database initialization, report intake, batch processing, and
//! inspecting the resulting issues.
//!
//! ## Usage
//!
//! ```bash
//! triage --config ./config/triage.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `triage init` | Create the SQLite database and run schema migrations |
//! | `triage submit` | Record one citizen report (text and/or image) as pending |
//! | `triage process` | Run the dedup + classify pipeline over pending reports |
//! | `triage issues` | List classified issues |
//! | `triage stats` | Show submission status counts and issue totals |
//!
//! ## Examples
//!
//! ```bash
//! # Initialize the database
//! triage init --config ./config/triage.toml
//!
//! # Record a report
//! triage submit --text "There's a big pothole near Sector 14 crossing"
//!
//! # Record a report with a photo (relative to [images].root)
//! triage submit --text "Overflowing bin" --image bin-42.jpg
//!
//! # Process pending reports (scheduled batch entry point)
//! triage process
//!
//! # Decide without writing
//! triage process --dry-run
//! ```

use anyhow::bail;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use civic_triage::classify::create_classifier;
use civic_triage::config::load_config;
use civic_triage::db;
use civic_triage::embedding::create_embedder;
use civic_triage::fingerprint::FsImageStore;
use civic_triage::migrate;
use civic_triage::pipeline;
use civic_triage::store;

/// Civic Triage CLI — deduplicate and classify citizen-submitted civic
/// issue reports.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/triage.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "triage",
    about = "Civic Triage — deduplicate and classify citizen-submitted civic issue reports",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/triage.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and the submissions/issues
    /// tables. This command is idempotent — running it multiple times
    /// is safe.
    Init,

    /// Record one citizen report as a pending submission.
    ///
    /// At least one of `--text` or `--image` is required. Input is
    /// normalized here, once; the pipeline core only ever sees typed
    /// fields.
    Submit {
        /// Free-form report text.
        #[arg(long)]
        text: Option<String>,

        /// Image reference, resolved under `[images].root` unless absolute.
        #[arg(long)]
        image: Option<String>,
    },

    /// Run the pipeline once over all pending submissions.
    ///
    /// Each pending report is fingerprinted, checked against the recent
    /// candidate window for duplicates, and classified if unique. All
    /// resulting writes are committed as one atomic batch.
    Process {
        /// Maximum number of pending submissions to process.
        #[arg(long)]
        limit: Option<usize>,

        /// Decide everything but commit nothing.
        #[arg(long)]
        dry_run: bool,
    },

    /// List classified issues, newest first.
    Issues {
        /// Maximum number of issues to list.
        #[arg(long)]
        limit: Option<i64>,
    },

    /// Show submission status counts and issue totals.
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Submit { text, image } => {
            let text = text.as_deref().map(str::trim).filter(|t| !t.is_empty());
            if text.is_none() && image.is_none() {
                bail!("Nothing to submit: provide --text and/or --image");
            }

            let pool = db::connect(&cfg).await?;
            let created_at = chrono::Utc::now().timestamp();
            let submission =
                store::insert_submission(&pool, text, image.as_deref(), created_at).await?;
            println!("submitted {}", submission.id);
            pool.close().await;
        }
        Commands::Process { limit, dry_run } => {
            let Some(classifier) = create_classifier(&cfg.classifier)? else {
                bail!("Classifier provider is disabled. Set [classifier] provider in config.");
            };
            let embedder = create_embedder(&cfg.embedding)?;
            if embedder.is_none() {
                eprintln!(
                    "Warning: embedding provider is disabled; duplicate detection uses image fingerprints only"
                );
            }
            let images = FsImageStore::new(cfg.images.root.clone());

            pipeline::run_process(
                &cfg,
                embedder.as_deref(),
                classifier.as_ref(),
                &images,
                limit,
                dry_run,
            )
            .await?;
        }
        Commands::Issues { limit } => {
            let pool = db::connect(&cfg).await?;
            let issues = store::list_issues(&pool, limit).await?;

            if issues.is_empty() {
                println!("No issues.");
            } else {
                for issue in &issues {
                    println!(
                        "{}  [{}/{}] {}  {}",
                        issue.id,
                        issue.category,
                        issue.subcategory,
                        issue.priority.as_str(),
                        issue.description
                    );
                }
            }
            pool.close().await;
        }
        Commands::Stats => {
            let pool = db::connect(&cfg).await?;

            let counts = store::submission_status_counts(&pool).await?;
            let total: i64 = counts.iter().map(|(_, n)| n).sum();
            let issues = store::count_issues(&pool).await?;
            let db_size = std::fs::metadata(&cfg.db.path).map(|m| m.len()).unwrap_or(0);

            println!("Civic Triage — Database Stats");
            println!("=============================");
            println!();
            println!("  Database:     {}", cfg.db.path.display());
            println!("  Size:         {}", format_bytes(db_size));
            println!();
            println!("  Submissions:  {}", total);
            for (status, n) in &counts {
                println!("    {:<12} {}", status, n);
            }
            println!("  Issues:       {}", issues);
            println!();

            pool.close().await;
        }
    }

    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
