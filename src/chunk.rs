use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::dispatch::{ModelRequest, TextBackend};
use crate::error::MockcatError;
use crate::parsers::{self, Record};
use crate::prompt::PromptParams;

/// Sampling parameters sent with every chunk request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sampling {
    pub temperature: f64,
    pub max_output_tokens: u32,
}

impl Default for Sampling {
    /// Low randomness, output ceiling large enough for a full chunk.
    fn default() -> Self {
        Self {
            temperature: 0.2,
            max_output_tokens: 8192,
        }
    }
}

/// One backend call plus response parsing for a single chunk.
pub struct ChunkGenerator<B> {
    backend: B,
    sampling: Sampling,
    attempt_timeout: Duration,
}

impl<B: TextBackend> ChunkGenerator<B> {
    pub fn new(backend: B, sampling: Sampling, attempt_timeout: Duration) -> Self {
        Self {
            backend,
            sampling,
            attempt_timeout,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Ask the backend for `params.chunk_size` records and parse the reply.
    /// Fails with a model-call error or `Parse`; a reply with no records is
    /// a `Parse` failure as well.
    pub async fn generate_chunk(
        &self,
        params: &PromptParams<'_>,
        cancel: &CancellationToken,
    ) -> Result<Vec<Record>, MockcatError> {
        let req = ModelRequest {
            prompt: params.render(),
            model: self.backend.model().to_string(),
            temperature: self.sampling.temperature,
            max_output_tokens: self.sampling.max_output_tokens,
            deadline: Instant::now() + self.attempt_timeout,
            cancellation_token: Some(cancel.clone()),
        };

        let response = self.backend.complete(&req).await?;
        tracing::debug!(
            provider = response.provider,
            latency_ms = response.latency_ms,
            bytes = response.text.len(),
            "model responded"
        );

        let records = parsers::parse_records(&response.text)?;
        if records.is_empty() {
            return Err(MockcatError::Parse("model returned an empty array".to_string()));
        }
        Ok(records)
    }
}
