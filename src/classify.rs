//! Classification of unique report text into structured issues.
//!
//! Defines the [`Classifier`] trait and the OpenAI chat-completions
//! implementation. The model is asked for a strict JSON object; anything
//! that does not parse into a complete [`ClassifiedIssue`] is a
//! classification failure, never a partial result.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::time::Duration;

use crate::config::ClassifierConfig;
use crate::models::ClassifiedIssue;

/// Few-shot instruction template. The model must answer with a single
/// JSON object carrying exactly the fields we store on an issue.
const FEW_SHOT_PROMPT: &str = r#"You are a civic issue classification assistant. Given a user report, output a structured JSON object.
Examples:
User: "There's a big pothole near Sector 14 crossing"
Output: { "category": "road", "subcategory": "pothole", "priority": "high", "description": "There's a big pothole near Sector 14 crossing", "status": "new" }
User: "Streetlight is flickering outside my house in Block C"
Output: { "category": "electrical", "subcategory": "streetlight", "priority": "medium", "description": "Streetlight is flickering outside my house in Block C", "status": "new" }
Now classify:
User: "{input}"
Output:"#;

/// Trait for classification backends.
///
/// A classifier is a pure function of its input text: it mutates no
/// pipeline state, and its failures are captured per submission.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Returns the model identifier (e.g. `"gpt-4o-mini"`).
    fn model_name(&self) -> &str;
    /// Classify free-form report text into a structured issue.
    async fn classify(&self, text: &str) -> Result<ClassifiedIssue>;
}

/// Create the appropriate [`Classifier`] based on configuration.
///
/// Returns `None` when the provider is `"disabled"`; the pipeline
/// refuses to run without one.
pub fn create_classifier(config: &ClassifierConfig) -> Result<Option<Box<dyn Classifier>>> {
    match config.provider.as_str() {
        "disabled" => Ok(None),
        "openai" => Ok(Some(Box::new(OpenAIClassifier::new(config)?))),
        other => bail!("Unknown classifier provider: {}", other),
    }
}

/// Classifier using the OpenAI chat-completions API in JSON mode.
///
/// Requires the `OPENAI_API_KEY` environment variable to be set. Uses
/// the same retry policy as the embedding provider: exponential backoff
/// on 429/5xx and network errors, immediate failure on other 4xx. The
/// request timeout counts as a classification failure.
pub struct OpenAIClassifier {
    model: String,
    max_retries: u32,
    timeout_secs: u64,
}

impl OpenAIClassifier {
    pub fn new(config: &ClassifierConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("classifier.model required for OpenAI provider"))?;

        if std::env::var("OPENAI_API_KEY").is_err() {
            bail!("OPENAI_API_KEY environment variable not set");
        }

        Ok(Self {
            model,
            max_retries: config.max_retries,
            timeout_secs: config.timeout_secs,
        })
    }
}

#[async_trait]
impl Classifier for OpenAIClassifier {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn classify(&self, text: &str) -> Result<ClassifiedIssue> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY not set"))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .build()?;

        let prompt = FEW_SHOT_PROMPT.replace("{input}", text);
        let body = serde_json::json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "response_format": { "type": "json_object" },
            "temperature": 0.0,
        });

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = client
                .post("https://api.openai.com/v1/chat/completions")
                .header("Authorization", format!("Bearer {}", api_key))
                .header("Content-Type", "application/json")
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: serde_json::Value = response.json().await?;
                        let content = json
                            .get("choices")
                            .and_then(|c| c.as_array())
                            .and_then(|c| c.first())
                            .and_then(|c| c.get("message"))
                            .and_then(|m| m.get("content"))
                            .and_then(|c| c.as_str())
                            .ok_or_else(|| {
                                anyhow::anyhow!("Invalid chat response: missing message content")
                            })?;
                        return parse_classified(content);
                    }

                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        last_err = Some(anyhow::anyhow!(
                            "OpenAI API error {}: {}",
                            status,
                            body_text
                        ));
                        continue;
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    bail!("OpenAI API error {}: {}", status, body_text);
                }
                Err(e) => {
                    last_err = Some(e.into());
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("Classification failed after retries")))
    }
}

/// Parse raw model output into a [`ClassifiedIssue`].
///
/// Strips Markdown code fences some models wrap around JSON even in
/// JSON mode, then requires every field to be present and well-formed.
pub fn parse_classified(raw: &str) -> Result<ClassifiedIssue> {
    let trimmed = strip_code_fences(raw);

    let issue: ClassifiedIssue = serde_json::from_str(trimmed)
        .with_context(|| format!("Classifier returned malformed JSON: {}", truncate(raw, 200)))?;

    if issue.category.trim().is_empty() || issue.subcategory.trim().is_empty() {
        bail!("Classifier returned empty category or subcategory");
    }

    Ok(issue)
}

fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let without_open = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    without_open
        .strip_suffix("```")
        .unwrap_or(without_open)
        .trim()
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Priority;

    #[test]
    fn test_parse_valid() {
        let raw = r#"{ "category": "road", "subcategory": "pothole", "priority": "high",
                       "description": "Big pothole near Sector 14", "status": "new" }"#;
        let issue = parse_classified(raw).unwrap();
        assert_eq!(issue.category, "road");
        assert_eq!(issue.subcategory, "pothole");
        assert_eq!(issue.priority, Priority::High);
        assert_eq!(issue.status, "new");
    }

    #[test]
    fn test_parse_fenced() {
        let raw = "```json\n{ \"category\": \"water\", \"subcategory\": \"leak\", \"priority\": \"medium\", \"description\": \"leaking main\", \"status\": \"new\" }\n```";
        let issue = parse_classified(raw).unwrap();
        assert_eq!(issue.category, "water");
    }

    #[test]
    fn test_parse_missing_field_rejected() {
        // No priority — must not become a half-populated issue.
        let raw = r#"{ "category": "road", "subcategory": "pothole",
                       "description": "pothole", "status": "new" }"#;
        assert!(parse_classified(raw).is_err());
    }

    #[test]
    fn test_parse_invalid_priority_rejected() {
        let raw = r#"{ "category": "road", "subcategory": "pothole", "priority": "urgent",
                       "description": "pothole", "status": "new" }"#;
        assert!(parse_classified(raw).is_err());
    }

    #[test]
    fn test_parse_empty_category_rejected() {
        let raw = r#"{ "category": " ", "subcategory": "pothole", "priority": "low",
                       "description": "pothole", "status": "new" }"#;
        assert!(parse_classified(raw).is_err());
    }

    #[test]
    fn test_parse_non_json_rejected() {
        assert!(parse_classified("the category is road").is_err());
    }
}
