//! # Civic Triage
//!
//! A deduplication and classification pipeline for citizen-submitted
//! civic issue reports.
//!
//! Reports arrive as free text and/or a photo. Each processing run
//! fingerprints the pending submissions (perceptual image hash + text
//! embedding), flags near-duplicates of anything seen within a trailing
//! recency window, classifies the unique ones into structured issue
//! records via a generative model, and commits every decision in a
//! single atomic batch.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────┐   ┌───────────┐   ┌──────────┐
//! │ Submissions │──▶│ Fingerprints │──▶│ Duplicate │──▶│ Classify │
//! │  (pending)  │   │ hash + embed │   │   check   │   │ (unique) │
//! └─────────────┘   └──────────────┘   └─────┬─────┘   └────┬─────┘
//!                                            │              │
//!                                            ▼              ▼
//!                                      ┌──────────────────────────┐
//!                                      │  atomic batch commit     │
//!                                      │  (SQLite: statuses +     │
//!                                      │   new issues)            │
//!                                      └──────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`fingerprint`] | Fingerprint extraction (text + image paths) |
//! | [`imagehash`] | Perceptual hashing and Hamming distance |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`dedup`] | Windowed duplicate detection |
//! | [`classify`] | Structured issue classification |
//! | [`pipeline`] | Run orchestration and batch commit |
//! | [`store`] | Submission/issue storage |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod classify;
pub mod config;
pub mod db;
pub mod dedup;
pub mod embedding;
pub mod fingerprint;
pub mod imagehash;
pub mod migrate;
pub mod models;
pub mod pipeline;
pub mod store;
