//! Fingerprint extraction for incoming submissions.
//!
//! Derives up to two fingerprints per submission: a text embedding when
//! non-empty text is present, and a perceptual image hash when the image
//! reference resolves to readable bytes. Extraction never fails the
//! pipeline — an unreadable image or a transient embedding error just
//! leaves that fingerprint absent.

use std::path::PathBuf;

use crate::embedding::Embedder;
use crate::imagehash;
use crate::models::{Fingerprints, Submission};

/// Resolves image references to raw bytes.
pub trait ImageStore: Send + Sync {
    /// Returns the image bytes, or `None` when the reference does not
    /// resolve to readable data.
    fn resolve(&self, image_ref: &str) -> Option<Vec<u8>>;
}

/// Filesystem-backed image store.
///
/// Relative references resolve under the configured root; absolute
/// paths are used as-is.
pub struct FsImageStore {
    root: PathBuf,
}

impl FsImageStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }
}

impl ImageStore for FsImageStore {
    fn resolve(&self, image_ref: &str) -> Option<Vec<u8>> {
        let path = PathBuf::from(image_ref);
        let path = if path.is_absolute() {
            path
        } else {
            self.root.join(path)
        };
        std::fs::read(path).ok()
    }
}

/// Compute the fingerprints for one submission.
///
/// Each input modality present runs its extraction path exactly once.
/// Returns an empty [`Fingerprints`] when the submission carries neither
/// usable text nor a readable image; the orchestrator routes that case
/// to an error status.
pub async fn extract_fingerprints(
    submission: &Submission,
    embedder: Option<&dyn Embedder>,
    images: &dyn ImageStore,
) -> Fingerprints {
    let mut fingerprints = Fingerprints::default();

    if let Some(text) = submission.text.as_deref() {
        if !text.trim().is_empty() {
            if let Some(embedder) = embedder {
                match embedder.embed(text).await {
                    Ok(vector) => fingerprints.text_embedding = Some(vector),
                    Err(e) => {
                        eprintln!(
                            "Warning: could not embed text for submission {}: {}",
                            submission.id, e
                        );
                    }
                }
            }
        }
    }

    if let Some(image_ref) = submission.image_ref.as_deref() {
        match images.resolve(image_ref) {
            Some(bytes) => match imagehash::hash_image_bytes(&bytes) {
                Ok(hash) => fingerprints.image_hash = Some(hash),
                Err(e) => {
                    eprintln!("Warning: could not hash image '{}': {}", image_ref, e);
                }
            },
            None => {
                eprintln!(
                    "Warning: image '{}' for submission {} is unreadable, skipping image fingerprint",
                    image_ref, submission.id
                );
            }
        }
    }

    fingerprints
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SubmissionStatus;
    use anyhow::Result;
    use async_trait::async_trait;

    struct FixedEmbedder;

    #[async_trait]
    impl Embedder for FixedEmbedder {
        fn model_name(&self) -> &str {
            "fixed"
        }
        fn dims(&self) -> usize {
            3
        }
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![1.0, 0.0, 0.0])
        }
    }

    struct FailingEmbedder;

    #[async_trait]
    impl Embedder for FailingEmbedder {
        fn model_name(&self) -> &str {
            "failing"
        }
        fn dims(&self) -> usize {
            3
        }
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            anyhow::bail!("embedding service unavailable")
        }
    }

    struct EmptyImageStore;

    impl ImageStore for EmptyImageStore {
        fn resolve(&self, _image_ref: &str) -> Option<Vec<u8>> {
            None
        }
    }

    fn submission(text: Option<&str>, image_ref: Option<&str>) -> Submission {
        Submission {
            id: "s1".to_string(),
            text: text.map(|s| s.to_string()),
            image_ref: image_ref.map(|s| s.to_string()),
            created_at: 0,
            processed: false,
            status: SubmissionStatus::Pending,
            image_hash: None,
            text_embedding: None,
            original_issue_id: None,
            error_message: None,
        }
    }

    #[tokio::test]
    async fn test_text_path() {
        let sub = submission(Some("pothole on main street"), None);
        let fp = extract_fingerprints(&sub, Some(&FixedEmbedder), &EmptyImageStore).await;
        assert_eq!(fp.text_embedding, Some(vec![1.0, 0.0, 0.0]));
        assert!(fp.image_hash.is_none());
    }

    #[tokio::test]
    async fn test_blank_text_skipped() {
        let sub = submission(Some("   "), None);
        let fp = extract_fingerprints(&sub, Some(&FixedEmbedder), &EmptyImageStore).await;
        assert!(fp.is_empty());
    }

    #[tokio::test]
    async fn test_embed_failure_degrades() {
        let sub = submission(Some("pothole"), None);
        let fp = extract_fingerprints(&sub, Some(&FailingEmbedder), &EmptyImageStore).await;
        assert!(fp.is_empty());
    }

    #[tokio::test]
    async fn test_unreadable_image_degrades() {
        let sub = submission(None, Some("missing.jpg"));
        let fp = extract_fingerprints(&sub, None, &EmptyImageStore).await;
        assert!(fp.is_empty());
    }

    #[tokio::test]
    async fn test_no_embedder_no_text_fingerprint() {
        let sub = submission(Some("pothole"), None);
        let fp = extract_fingerprints(&sub, None, &EmptyImageStore).await;
        assert!(fp.text_embedding.is_none());
    }

    #[test]
    fn test_fs_store_missing_file() {
        let store = FsImageStore::new(PathBuf::from("/nonexistent"));
        assert!(store.resolve("nope.jpg").is_none());
    }
}
