use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub images: ImagesConfig,
    #[serde(default)]
    pub dedup: DedupConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ImagesConfig {
    pub root: PathBuf,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./data/images"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DedupConfig {
    /// Trailing candidate window in hours. Duplicates are a recency
    /// phenomenon; the same issue reported again outside the window is a
    /// legitimate re-report.
    #[serde(default = "default_window_hours")]
    pub window_hours: i64,
    /// Maximum Hamming distance (in bits) for two perceptual hashes to
    /// count as the same image.
    #[serde(default = "default_image_hash_threshold")]
    pub image_hash_threshold: u32,
    /// Minimum cosine similarity for two embeddings to count as the
    /// same report text.
    #[serde(default = "default_text_similarity_threshold")]
    pub text_similarity_threshold: f32,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            window_hours: 24,
            image_hash_threshold: 5,
            text_similarity_threshold: 0.90,
        }
    }
}

fn default_window_hours() -> i64 {
    24
}
fn default_image_hash_threshold() -> u32 {
    5
}
fn default_text_similarity_threshold() -> f32 {
    0.90
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    #[serde(default = "default_embed_retries")]
    pub max_retries: u32,
    #[serde(default = "default_embed_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "disabled".to_string(),
            model: None,
            dims: None,
            max_retries: 5,
            timeout_secs: 30,
        }
    }
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_embed_retries() -> u32 {
    5
}
fn default_embed_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct ClassifierConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_classify_retries")]
    pub max_retries: u32,
    #[serde(default = "default_classify_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            provider: "disabled".to_string(),
            model: None,
            max_retries: 3,
            timeout_secs: 60,
        }
    }
}

impl ClassifierConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

fn default_classify_retries() -> u32 {
    3
}
fn default_classify_timeout_secs() -> u64 {
    60
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Validate dedup
    if config.dedup.window_hours < 1 {
        anyhow::bail!("dedup.window_hours must be >= 1");
    }

    if config.dedup.image_hash_threshold > 64 {
        anyhow::bail!("dedup.image_hash_threshold must be <= 64 (the hash is 64 bits)");
    }

    if !(0.0..=1.0).contains(&config.dedup.text_similarity_threshold) {
        anyhow::bail!("dedup.text_similarity_threshold must be in [0.0, 1.0]");
    }

    // Validate embedding
    if config.embedding.is_enabled() {
        if config.embedding.dims.is_none() || config.embedding.dims == Some(0) {
            anyhow::bail!(
                "embedding.dims must be > 0 when provider is '{}'",
                config.embedding.provider
            );
        }
        if config.embedding.model.is_none() {
            anyhow::bail!(
                "embedding.model must be specified when provider is '{}'",
                config.embedding.provider
            );
        }
    }

    match config.embedding.provider.as_str() {
        "disabled" | "openai" => {}
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be disabled or openai.",
            other
        ),
    }

    // Validate classifier
    if config.classifier.is_enabled() && config.classifier.model.is_none() {
        anyhow::bail!(
            "classifier.model must be specified when provider is '{}'",
            config.classifier.provider
        );
    }

    match config.classifier.provider.as_str() {
        "disabled" | "openai" => {}
        other => anyhow::bail!(
            "Unknown classifier provider: '{}'. Must be disabled or openai.",
            other
        ),
    }

    Ok(config)
}
