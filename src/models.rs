//! Core data models used throughout the triage pipeline.
//!
//! These types represent the submissions, fingerprints, and classified
//! issues that flow through the deduplication and classification pipeline.

use anyhow::{bail, Result};
use serde::Deserialize;

/// Processing state of a submission.
///
/// A submission transitions `pending → {duplicate, processed_ok, error}`
/// exactly once; terminal states are never overwritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionStatus {
    Pending,
    Duplicate,
    ProcessedOk,
    Error,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::Pending => "pending",
            SubmissionStatus::Duplicate => "duplicate",
            SubmissionStatus::ProcessedOk => "processed_ok",
            SubmissionStatus::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(SubmissionStatus::Pending),
            "duplicate" => Ok(SubmissionStatus::Duplicate),
            "processed_ok" => Ok(SubmissionStatus::ProcessedOk),
            "error" => Ok(SubmissionStatus::Error),
            other => bail!("Unknown submission status: '{}'", other),
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, SubmissionStatus::Pending)
    }
}

/// A raw intake record as stored in SQLite.
#[derive(Debug, Clone)]
pub struct Submission {
    pub id: String,
    pub text: Option<String>,
    pub image_ref: Option<String>,
    pub created_at: i64,
    pub processed: bool,
    pub status: SubmissionStatus,
    pub image_hash: Option<String>,
    pub text_embedding: Option<Vec<f32>>,
    pub original_issue_id: Option<String>,
    pub error_message: Option<String>,
}

/// Fingerprints derived from a submission's text and/or image.
///
/// Either field may be absent: a missing or unreadable image yields no
/// image hash, and a submission without text yields no embedding.
#[derive(Debug, Clone, Default)]
pub struct Fingerprints {
    pub image_hash: Option<String>,
    pub text_embedding: Option<Vec<f32>>,
}

impl Fingerprints {
    pub fn is_empty(&self) -> bool {
        self.image_hash.is_none() && self.text_embedding.is_none()
    }
}

/// Which fingerprint check declared a duplicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateKind {
    Image,
    Text,
}

impl DuplicateKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DuplicateKind::Image => "image",
            DuplicateKind::Text => "text",
        }
    }
}

/// Issue priority assigned by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "high" => Ok(Priority::High),
            "medium" => Ok(Priority::Medium),
            "low" => Ok(Priority::Low),
            other => bail!("Unknown priority: '{}'", other),
        }
    }
}

/// Structured classification returned by the model, before it becomes a
/// stored [`Issue`]. All fields are required; a response missing any of
/// them is rejected rather than stored half-populated.
#[derive(Debug, Clone, Deserialize)]
pub struct ClassifiedIssue {
    pub category: String,
    pub subcategory: String,
    pub priority: Priority,
    pub description: String,
    pub status: String,
}

/// A classified civic-issue record derived from a unique submission.
#[derive(Debug, Clone)]
pub struct Issue {
    pub id: String,
    pub category: String,
    pub subcategory: String,
    pub priority: Priority,
    pub description: String,
    pub status: String,
    pub image_hash: Option<String>,
    pub text_embedding: Option<Vec<f32>>,
    pub original_submission_id: String,
    pub created_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_roundtrip() {
        for s in ["pending", "duplicate", "processed_ok", "error"] {
            assert_eq!(SubmissionStatus::parse(s).unwrap().as_str(), s);
        }
        assert!(SubmissionStatus::parse("done").is_err());
    }

    #[test]
    fn test_terminal_states() {
        assert!(!SubmissionStatus::Pending.is_terminal());
        assert!(SubmissionStatus::Duplicate.is_terminal());
        assert!(SubmissionStatus::ProcessedOk.is_terminal());
        assert!(SubmissionStatus::Error.is_terminal());
    }

    #[test]
    fn test_priority_parse() {
        assert_eq!(Priority::parse("high").unwrap(), Priority::High);
        assert!(Priority::parse("urgent").is_err());
    }

    #[test]
    fn test_empty_fingerprints() {
        assert!(Fingerprints::default().is_empty());
        let fp = Fingerprints {
            image_hash: Some("AAAAAAAAAAA=".to_string()),
            text_embedding: None,
        };
        assert!(!fp.is_empty());
    }
}
