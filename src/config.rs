use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::dispatch::ApiFormat;

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Config file looked up in the working directory when `MOCKCAT_CONFIG` is unset.
const DEFAULT_CONFIG_FILE: &str = "mockcat.toml";

/// Limits and retry tuning for one generation request.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GenerationConfig {
    /// Safety ceiling applied to the requested record count.
    pub max_records: usize,
    /// Largest number of records asked of the backend in one call.
    pub max_chunk_size: usize,
    /// Attempts per chunk, including the first.
    pub max_attempts: u32,
    /// Backoff before retry `n` is `backoff_base_ms * n`.
    pub backoff_base_ms: u64,
    /// Chunk calls allowed per request, as a multiple of the ideal count.
    pub max_chunk_calls_factor: usize,
    /// Upper bound on a single backend call.
    pub attempt_timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_records: 200,
            max_chunk_size: 20,
            max_attempts: 3,
            backoff_base_ms: 1000,
            max_chunk_calls_factor: 3,
            attempt_timeout_secs: 120,
        }
    }
}

impl GenerationConfig {
    /// Zero values would stall or disable the driver; floor them at 1.
    fn normalized(mut self) -> Self {
        self.max_records = self.max_records.max(1);
        self.max_chunk_size = self.max_chunk_size.max(1);
        self.max_attempts = self.max_attempts.max(1);
        self.max_chunk_calls_factor = self.max_chunk_calls_factor.max(1);
        self.attempt_timeout_secs = self.attempt_timeout_secs.max(1);
        self
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }

    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.attempt_timeout_secs)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ModelSection {
    name: Option<String>,
    api_format: Option<ApiFormat>,
    base_url: Option<String>,
    temperature: Option<f64>,
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    generation: GenerationConfig,
    model: ModelSection,
}

/// Resolved backend settings. Only present when a credential was found.
#[derive(Clone)]
pub struct BackendConfig {
    pub model: String,
    pub provider: String,
    pub api_format: ApiFormat,
    pub base_url: String,
    pub api_key: String,
    pub temperature: f64,
    pub max_output_tokens: u32,
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("model", &self.model)
            .field("provider", &self.provider)
            .field("api_format", &self.api_format)
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .field("temperature", &self.temperature)
            .field("max_output_tokens", &self.max_output_tokens)
            .finish()
    }
}

#[derive(Clone, Debug, Default)]
pub struct Config {
    pub backend: Option<BackendConfig>,
    pub generation: GenerationConfig,
}

impl Config {
    /// Load from the optional TOML file and the process environment.
    pub fn load() -> Self {
        let path = env::var("MOCKCAT_CONFIG")
            .ok()
            .map(PathBuf::from)
            .or_else(|| {
                let p = PathBuf::from(DEFAULT_CONFIG_FILE);
                p.exists().then_some(p)
            });

        let file = path.as_deref().and_then(read_config_file);
        let config = Self::from_sources(file.as_deref(), |k| env::var(k).ok());

        match &config.backend {
            Some(b) => tracing::info!(
                model = b.model,
                provider = b.provider,
                "backend configured"
            ),
            None => tracing::warn!(
                "GEMINI_API_KEY / MOCKCAT_API_KEY not set, generation unavailable"
            ),
        }

        config
    }

    /// Build a config from TOML text and an environment lookup.
    /// A malformed file falls back to defaults rather than aborting startup.
    pub fn from_sources(toml_text: Option<&str>, env: impl Fn(&str) -> Option<String>) -> Self {
        let file = match toml_text.map(toml::from_str::<FileConfig>) {
            Some(Ok(file)) => file,
            Some(Err(e)) => {
                tracing::warn!("invalid config file, using defaults: {e}");
                FileConfig::default()
            }
            None => FileConfig::default(),
        };

        let api_format = file.model.api_format.unwrap_or_default();
        let api_key = env("MOCKCAT_API_KEY")
            .or_else(|| match api_format {
                ApiFormat::Gemini => env("GEMINI_API_KEY"),
                ApiFormat::OpenAi => None,
            })
            .filter(|k| !k.trim().is_empty());

        let backend = api_key.map(|api_key| {
            let default_url = match api_format {
                ApiFormat::Gemini => GEMINI_BASE_URL,
                ApiFormat::OpenAi => OPENAI_BASE_URL,
            };
            BackendConfig {
                model: env("MOCKCAT_MODEL")
                    .or(file.model.name.clone())
                    .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
                provider: api_format.provider().to_string(),
                api_format,
                base_url: env("MOCKCAT_BASE_URL")
                    .or(file.model.base_url.clone())
                    .unwrap_or_else(|| default_url.to_string()),
                api_key,
                temperature: file.model.temperature.unwrap_or(0.2),
                max_output_tokens: file.model.max_output_tokens.unwrap_or(8192),
            }
        });

        Self {
            backend,
            generation: file.generation.normalized(),
        }
    }
}

fn read_config_file(path: &Path) -> Option<String> {
    match std::fs::read_to_string(path) {
        Ok(text) => Some(text),
        Err(e) => {
            tracing::warn!(path = %path.display(), "cannot read config file: {e}");
            None
        }
    }
}
