use std::fmt::Write as _;

use serde::Serialize;

use crate::config::{BackendConfig, GenerationConfig};

#[derive(Debug, Serialize)]
pub struct ModelInfo {
    pub name: String,
    pub provider: String,
    pub api_format: String,
    pub temperature: f64,
    pub max_output_tokens: u32,
}

impl From<&BackendConfig> for ModelInfo {
    fn from(backend: &BackendConfig) -> Self {
        Self {
            name: backend.model.clone(),
            provider: backend.provider.clone(),
            api_format: backend.api_format.provider().to_string(),
            temperature: backend.temperature,
            max_output_tokens: backend.max_output_tokens,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ListModelsResponse {
    pub model: Option<ModelInfo>,
    pub max_records: usize,
    pub max_chunk_size: usize,
    pub max_attempts: u32,
}

impl ListModelsResponse {
    pub fn new(backend: Option<&BackendConfig>, generation: &GenerationConfig) -> Self {
        Self {
            model: backend.map(ModelInfo::from),
            max_records: generation.max_records,
            max_chunk_size: generation.max_chunk_size,
            max_attempts: generation.max_attempts,
        }
    }

    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        match &self.model {
            Some(m) => {
                let _ = writeln!(out, "## {}\n", m.name);
                let _ = writeln!(out, "- provider: {}", m.provider);
                let _ = writeln!(out, "- api format: {}", m.api_format);
                let _ = writeln!(out, "- temperature: {}", m.temperature);
                let _ = writeln!(out, "- max output tokens: {}", m.max_output_tokens);
            }
            None => {
                out.push_str("No model configured. Set GEMINI_API_KEY or MOCKCAT_API_KEY.\n");
            }
        }
        let _ = writeln!(
            out,
            "\nLimits: up to {} records per request, {} per model call, {} attempts per call.",
            self.max_records, self.max_chunk_size, self.max_attempts
        );
        out
    }
}
