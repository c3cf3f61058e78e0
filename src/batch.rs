use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::chunk::{ChunkGenerator, Sampling};
use crate::config::GenerationConfig;
use crate::dispatch::TextBackend;
use crate::error::MockcatError;
use crate::parsers::Record;
use crate::prompt::{InputFormat, PromptParams};
use crate::retry::{RetryPolicy, with_retry};

/// Records requested per backend call unless the request says otherwise.
pub const DEFAULT_MAX_CHUNK_SIZE: usize = 20;

/// One generation job. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    structure_text: String,
    total_records: usize,
    language_tag: String,
    max_chunk_size: usize,
    input_format: InputFormat,
}

impl GenerationRequest {
    /// `structure_text` must already be sanitized. Empty structure or a zero
    /// record count is rejected before any backend call.
    pub fn new(
        structure_text: impl Into<String>,
        total_records: usize,
        language_tag: impl Into<String>,
    ) -> Result<Self, MockcatError> {
        let structure_text = structure_text.into();
        if structure_text.trim().is_empty() {
            return Err(MockcatError::Validation(
                "table structure is required".to_string(),
            ));
        }
        if total_records == 0 {
            return Err(MockcatError::Validation(
                "record count must be at least 1".to_string(),
            ));
        }

        let language_tag = language_tag.into();
        let language_tag = if language_tag.trim().is_empty() {
            "en".to_string()
        } else {
            language_tag.trim().to_string()
        };

        Ok(Self {
            structure_text,
            total_records,
            language_tag,
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
            input_format: InputFormat::default(),
        })
    }

    pub fn with_max_chunk_size(mut self, max_chunk_size: usize) -> Self {
        self.max_chunk_size = max_chunk_size.max(1);
        self
    }

    pub fn with_input_format(mut self, input_format: InputFormat) -> Self {
        self.input_format = input_format;
        self
    }

    pub fn structure_text(&self) -> &str {
        &self.structure_text
    }

    pub fn total_records(&self) -> usize {
        self.total_records
    }

    pub fn language_tag(&self) -> &str {
        &self.language_tag
    }

    pub fn max_chunk_size(&self) -> usize {
        self.max_chunk_size
    }

    pub fn input_format(&self) -> InputFormat {
        self.input_format
    }
}

/// Why the chunk loop ended.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The (clamped) target was reached.
    Completed,
    /// A later chunk exhausted its retries; earlier records were kept.
    ChunkFailed,
    /// The per-request chunk call budget ran out while the backend kept
    /// returning short chunks.
    ChunkBudgetExhausted,
}

/// Outcome of a generation job.
///
/// `produced_count` is usually at most `requested_count`, but not always: a
/// chunk that returns more records than it asked for is kept whole, so the
/// final chunk can push the total past the request.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GenerationResult {
    pub records: Vec<Record>,
    /// Record count after clamping to the safety ceiling.
    pub requested_count: usize,
    /// Always `records.len()`. May exceed `requested_count` on overshoot.
    pub produced_count: usize,
    pub stop_reason: StopReason,
}

impl GenerationResult {
    /// True when fewer records came back than were requested. Overshoot is
    /// never partial.
    pub fn is_partial(&self) -> bool {
        self.produced_count < self.requested_count
    }
}

/// Drives chunked generation: sequential chunk calls, per-chunk retry,
/// partial success once any records are banked.
pub struct BatchOrchestrator<B> {
    chunks: ChunkGenerator<B>,
    retry: RetryPolicy,
    max_records: usize,
    max_chunk_calls_factor: usize,
}

impl<B: TextBackend> BatchOrchestrator<B> {
    pub fn new(backend: B, sampling: Sampling, config: &GenerationConfig) -> Self {
        Self {
            chunks: ChunkGenerator::new(backend, sampling, config.attempt_timeout()),
            retry: RetryPolicy::from_config(config),
            max_records: config.max_records.max(1),
            max_chunk_calls_factor: config.max_chunk_calls_factor.max(1),
        }
    }

    pub fn backend(&self) -> &B {
        self.chunks.backend()
    }

    pub fn max_records(&self) -> usize {
        self.max_records
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Generate `request.total_records()` records (clamped to the safety
    /// ceiling). Fails only when no records at all could be produced, or
    /// when `cancel` fires.
    pub async fn generate(
        &self,
        request: &GenerationRequest,
        cancel: &CancellationToken,
    ) -> Result<GenerationResult, MockcatError> {
        let total = request.total_records().min(self.max_records);
        if total < request.total_records() {
            tracing::info!(
                requested = request.total_records(),
                ceiling = self.max_records,
                "record count clamped"
            );
        }

        let chunk_ceiling = request.max_chunk_size().max(1);
        let max_calls = total.div_ceil(chunk_ceiling) * self.max_chunk_calls_factor;

        let mut records: Vec<Record> = Vec::with_capacity(total);
        let mut remaining = total;
        let mut calls = 0usize;
        let mut stop_reason = StopReason::Completed;

        while remaining > 0 {
            if calls >= max_calls {
                tracing::warn!(
                    calls = calls,
                    produced = records.len(),
                    requested = total,
                    "chunk call budget exhausted, returning partial result"
                );
                stop_reason = StopReason::ChunkBudgetExhausted;
                break;
            }

            let chunk_size = remaining.min(chunk_ceiling);
            calls += 1;
            let params = PromptParams::new(
                request.structure_text(),
                chunk_size,
                request.language_tag(),
            )
            .with_input_format(request.input_format());

            let chunk = with_retry(&self.retry, cancel, |attempt| {
                tracing::debug!(
                    chunk = calls,
                    chunk_size = chunk_size,
                    attempt = attempt,
                    "requesting chunk"
                );
                self.chunks.generate_chunk(&params, cancel)
            })
            .await;

            match chunk {
                Ok(chunk) => {
                    tracing::info!(
                        chunk = calls,
                        chunk_size = chunk_size,
                        returned = chunk.len(),
                        "chunk generated"
                    );
                    remaining = remaining.saturating_sub(chunk.len());
                    records.extend(chunk);
                }
                Err(MockcatError::Cancelled) => return Err(MockcatError::Cancelled),
                Err(e) if records.is_empty() => {
                    tracing::error!(chunk = calls, "generation failed: {e}");
                    return Err(e);
                }
                Err(e) => {
                    tracing::warn!(
                        chunk = calls,
                        produced = records.len(),
                        requested = total,
                        "chunk failed, returning partial result: {e}"
                    );
                    stop_reason = StopReason::ChunkFailed;
                    break;
                }
            }
        }

        Ok(GenerationResult {
            produced_count: records.len(),
            records,
            requested_count: total,
            stop_reason,
        })
    }
}
