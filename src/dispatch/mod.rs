pub mod http;

use std::future::Future;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::MockcatError;

/// Wire format spoken by an HTTP backend.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ApiFormat {
    /// Gemini `generateContent` (default, matches the default model).
    #[default]
    Gemini,
    /// OpenAI-compatible chat completions.
    OpenAi,
}

impl ApiFormat {
    pub fn provider(&self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::OpenAi => "openai",
        }
    }
}

/// One instruction sent to the generative backend.
#[derive(Clone, Debug)]
pub struct ModelRequest {
    pub prompt: String,
    pub model: String,
    /// Sampling temperature (0 = deterministic, 1 = creative).
    pub temperature: f64,
    /// Output length ceiling in tokens.
    pub max_output_tokens: u32,
    pub deadline: Instant,
    /// Aborts the in-flight call when cancelled.
    pub cancellation_token: Option<CancellationToken>,
}

/// Free-text reply from the backend.
#[derive(Debug)]
pub struct ModelResponse {
    pub text: String,
    pub model: String,
    pub provider: String,
    pub latency_ms: u64,
}

/// A single request / single response text generation service.
pub trait TextBackend: Send + Sync {
    /// Model name reported in tool metadata.
    fn model(&self) -> &str;

    /// Provider name reported in tool metadata and errors.
    fn provider(&self) -> &str;

    fn complete(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<ModelResponse, MockcatError>> + Send;
}
