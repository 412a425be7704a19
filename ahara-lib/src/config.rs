//! Runtime settings
//!
//! Settings are resolved in three layers, later layers winning:
//!
//! 1. compiled defaults
//! 2. an optional JSON settings file (any subset of fields)
//! 3. environment variables
//!
//! | Variable                   | Field                    |
//! |----------------------------|--------------------------|
//! | `AHARA_ARTIFACTS`          | `artifacts`              |
//! | `AHARA_RULES`              | `rules_path`             |
//! | `AHARA_CHUNK_SIZE`         | `chunk_size`             |
//! | `AHARA_CHUNK_OVERLAP`      | `chunk_overlap`          |
//! | `AHARA_TOP_K`              | `top_k`                  |
//! | `AHARA_MODEL`              | `model`                  |
//! | `AHARA_MAX_OUTPUT_TOKENS`  | `max_output_tokens`      |
//! | `AHARA_TIMEOUT_SECS`       | `generation_timeout_secs`|
//! | `AHARA_MODEL_CACHE`        | `model_cache_dir`        |
//! | `GEMINI_API_KEY`           | `api_key`                |
//!
//! The API key is only ever read from the environment.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::chat::ChatConfig;
use crate::chunk::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use crate::generate::{DEFAULT_GEMINI_MODEL, DEFAULT_MAX_OUTPUT_TOKENS};
use crate::prompt::SYSTEM_PROMPT;
use crate::search::DEFAULT_TOP_K;
use crate::{Error, Result};

pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Base path of the persisted index pair (`<base>.index`, `<base>.chunks.json`)
    pub artifacts: PathBuf,
    pub rules_path: PathBuf,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k: usize,
    pub model: String,
    pub max_output_tokens: u32,
    pub generation_timeout_secs: u64,
    /// Where the embedding model is downloaded to; fastembed's default if unset
    pub model_cache_dir: Option<PathBuf>,
    #[serde(skip)]
    pub api_key: Option<SecretString>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            artifacts: PathBuf::from("data/ayurveda"),
            rules_path: PathBuf::from("data/dosha_rules.json"),
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            top_k: DEFAULT_TOP_K,
            model: DEFAULT_GEMINI_MODEL.to_string(),
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            generation_timeout_secs: 60,
            model_cache_dir: None,
            api_key: None,
        }
    }
}

impl Settings {
    /// Resolve settings from defaults, an optional file and the environment.
    ///
    /// A missing file falls back to defaults; an unreadable or malformed one
    /// is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = match path {
            Some(path) if path.exists() => {
                debug!(?path, "loading settings from file");
                let content = std::fs::read_to_string(path)?;
                Self::from_json(&content)?
            }
            Some(path) => {
                debug!(?path, "settings file not found, using defaults");
                Self::default()
            }
            None => Self::default(),
        };

        settings.apply_overrides(|name| std::env::var(name).ok());
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| Error::Config(format!("invalid settings: {e}")))
    }

    /// Apply overrides from a variable lookup. Empty or unparsable values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(v) = read("AHARA_ARTIFACTS") {
            self.artifacts = PathBuf::from(v);
        }
        if let Some(v) = read("AHARA_RULES") {
            self.rules_path = PathBuf::from(v);
        }
        if let Some(v) = parse_var(&read, "AHARA_CHUNK_SIZE") {
            self.chunk_size = v;
        }
        if let Some(v) = parse_var(&read, "AHARA_CHUNK_OVERLAP") {
            self.chunk_overlap = v;
        }
        if let Some(v) = parse_var(&read, "AHARA_TOP_K") {
            self.top_k = v;
        }
        if let Some(v) = read("AHARA_MODEL") {
            self.model = v;
        }
        if let Some(v) = parse_var(&read, "AHARA_MAX_OUTPUT_TOKENS") {
            self.max_output_tokens = v;
        }
        if let Some(v) = parse_var(&read, "AHARA_TIMEOUT_SECS") {
            self.generation_timeout_secs = v;
        }
        if let Some(v) = read("AHARA_MODEL_CACHE") {
            self.model_cache_dir = Some(PathBuf::from(v));
        }
        if let Some(v) = read(API_KEY_ENV) {
            self.api_key = Some(SecretString::from(v));
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::Config("chunk_size must be positive".to_string()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(Error::Config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.top_k == 0 {
            return Err(Error::Config("top_k must be positive".to_string()));
        }
        if self.generation_timeout_secs == 0 {
            return Err(Error::Config("generation_timeout_secs must be positive".to_string()));
        }
        Ok(())
    }

    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.generation_timeout_secs)
    }

    pub fn chat_config(&self) -> ChatConfig {
        ChatConfig {
            system_prompt: SYSTEM_PROMPT.to_string(),
            top_k: self.top_k,
            generation_timeout: self.generation_timeout(),
        }
    }
}

fn parse_var<T: FromStr>(read: &impl Fn(&str) -> Option<String>, name: &str) -> Option<T> {
    let raw = read(name)?;
    let parsed = raw.trim().parse().ok();
    if parsed.is_none() {
        warn!(key = name, value = %raw, "invalid numeric env var, ignoring");
    }
    parsed
}
