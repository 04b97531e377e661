//! TOML configuration.
//!
//! Every section is optional; a missing file or missing section falls back
//! to the built-in defaults, which reproduce the classic layout:
//!
//! ```text
//! data/notes.json      note store
//! uploads/             stored copies of uploaded PDFs
//! generated_pdfs/      combined class PDFs
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_notes_file")]
    pub notes_file: PathBuf,
    #[serde(default = "default_uploads_dir")]
    pub uploads_dir: PathBuf,
    #[serde(default = "default_generated_dir")]
    pub generated_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            notes_file: default_notes_file(),
            uploads_dir: default_uploads_dir(),
            generated_dir: default_generated_dir(),
        }
    }
}

fn default_notes_file() -> PathBuf {
    PathBuf::from("data/notes.json")
}
fn default_uploads_dir() -> PathBuf {
    PathBuf::from("uploads")
}
fn default_generated_dir() -> PathBuf {
    PathBuf::from("generated_pdfs")
}

/// Settings for the Anthropic Messages API.
#[derive(Debug, Deserialize, Clone)]
pub struct AiConfig {
    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    /// Model used for the document (vision) transcription request.
    #[serde(default = "default_transcription_model")]
    pub transcription_model: String,
    /// Model used for the analysis prompt.
    #[serde(default = "default_analysis_model")]
    pub analysis_model: String,
    #[serde(default = "default_transcription_max_tokens")]
    pub transcription_max_tokens: u32,
    #[serde(default = "default_analysis_max_tokens")]
    pub analysis_max_tokens: u32,
    /// Extracted text beyond this many characters is not sent for analysis.
    #[serde(default = "default_max_prompt_chars")]
    pub max_prompt_chars: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            base_url: default_base_url(),
            api_version: default_api_version(),
            transcription_model: default_transcription_model(),
            analysis_model: default_analysis_model(),
            transcription_max_tokens: default_transcription_max_tokens(),
            analysis_max_tokens: default_analysis_max_tokens(),
            max_prompt_chars: default_max_prompt_chars(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_api_key_env() -> String {
    "ANTHROPIC_API_KEY".to_string()
}
fn default_base_url() -> String {
    "https://api.anthropic.com".to_string()
}
fn default_api_version() -> String {
    "2023-06-01".to_string()
}
fn default_transcription_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}
fn default_analysis_model() -> String {
    "claude-opus-4-1-20250805".to_string()
}
fn default_transcription_max_tokens() -> u32 {
    4000
}
fn default_analysis_max_tokens() -> u32 {
    1000
}
fn default_max_prompt_chars() -> usize {
    8000
}
fn default_timeout_secs() -> u64 {
    120
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExtractionConfig {
    /// Text-layer output at or below this many characters (after trimming)
    /// is treated as a scanned document.
    #[serde(default = "default_min_text_chars")]
    pub min_text_chars: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            min_text_chars: default_min_text_chars(),
        }
    }
}

fn default_min_text_chars() -> usize {
    50
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8501".to_string()
}
fn default_max_upload_bytes() -> usize {
    50 * 1024 * 1024
}

impl Config {
    /// Defaults rooted at `dir` instead of the working directory.
    pub fn rooted_at(dir: &Path) -> Self {
        let mut config = Config::default();
        config.storage.notes_file = dir.join(default_notes_file());
        config.storage.uploads_dir = dir.join(default_uploads_dir());
        config.storage.generated_dir = dir.join(default_generated_dir());
        config
    }

    /// Reads the API key named by `ai.api_key_env` from the environment.
    pub fn api_key(&self) -> Result<String> {
        match std::env::var(&self.ai.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => anyhow::bail!(
                "{} not found in environment variables. Export it before starting sbnotes:\n  export {}=your_api_key_here",
                self.ai.api_key_env,
                self.ai.api_key_env
            ),
        }
    }

    /// Creates the storage directories if they do not exist yet.
    pub fn ensure_dirs(&self) -> Result<()> {
        if let Some(parent) = self.storage.notes_file.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create data directory: {}", parent.display())
                })?;
            }
        }
        for dir in [&self.storage.uploads_dir, &self.storage.generated_dir] {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        }
        Ok(())
    }
}

/// Loads and validates the configuration. A missing file yields the defaults.
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "config file not found, using defaults");
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.ai.max_prompt_chars == 0 {
        anyhow::bail!("ai.max_prompt_chars must be > 0");
    }
    if config.ai.transcription_max_tokens == 0 || config.ai.analysis_max_tokens == 0 {
        anyhow::bail!("ai max_tokens settings must be > 0");
    }
    if config.ai.api_key_env.trim().is_empty() {
        anyhow::bail!("ai.api_key_env must not be empty");
    }
    if !(config.ai.base_url.starts_with("http://") || config.ai.base_url.starts_with("https://")) {
        anyhow::bail!("ai.base_url must be an http(s) URL");
    }
    if config.server.max_upload_bytes == 0 {
        anyhow::bail!("server.max_upload_bytes must be > 0");
    }
    Ok(())
}
