use std::time::Instant;

use schemars::JsonSchema;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::batch::{BatchOrchestrator, GenerationRequest, GenerationResult};
use crate::dispatch::TextBackend;
use crate::error::MockcatError;
use crate::prompt::InputFormat;
use crate::render;
use crate::response::{ToolMetadata, ToolResponse};
use crate::sanitize::sanitize_input;
use crate::tools::enums::OutputFormat;

const TOOL_NAME: &str = "generate";

/// Records generated when the caller gives no count (or 0).
pub const DEFAULT_RECORD_COUNT: usize = 5;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GenerateRequest {
    /// Table structure: `column: type` list (e.g. "id: number, name: string")
    /// or a SQL CREATE TABLE statement. Markup is stripped server-side.
    pub table_structure: String,
    /// Number of records to generate (default 5, capped at the server's safety limit, 200 by default).
    pub record_count: Option<usize>,
    /// Language tag for free-text fields, e.g. "en" (default) or "zh-CN".
    pub language: Option<String>,
    /// "simple" (default) for `column: type` lists, "sql" for CREATE TABLE statements.
    pub input_format: Option<InputFormat>,
    /// "json" (default), "table" (markdown) or "sql" (INSERT statements).
    pub output_format: Option<OutputFormat>,
}

impl GenerateRequest {
    pub fn record_count_or_default(&self) -> usize {
        self.record_count
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_RECORD_COUNT)
    }

    pub fn language_or_default(&self) -> &str {
        self.language
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .unwrap_or("en")
    }

    pub fn output_format(&self) -> OutputFormat {
        self.output_format.unwrap_or_default()
    }

    /// Sanitize the structure text and build the core request.
    pub fn to_generation_request(
        &self,
        max_chunk_size: usize,
    ) -> Result<GenerationRequest, MockcatError> {
        let structure = sanitize_input(&self.table_structure);
        Ok(GenerationRequest::new(
            structure,
            self.record_count_or_default(),
            self.language_or_default(),
        )?
        .with_max_chunk_size(max_chunk_size)
        .with_input_format(self.input_format.unwrap_or_default()))
    }
}

/// Run one generation and wrap the outcome in the tool envelope.
pub async fn execute<B: TextBackend>(
    orchestrator: &BatchOrchestrator<B>,
    request: &GenerationRequest,
    output_format: OutputFormat,
    cancel: &CancellationToken,
) -> ToolResponse {
    let start = Instant::now();
    let backend = orchestrator.backend();
    let metadata = |elapsed: f64| {
        ToolMetadata::new(TOOL_NAME, backend.model(), backend.provider(), elapsed)
    };

    match orchestrator.generate(request, cancel).await {
        Ok(result) => {
            let content = render_records(&result, request, output_format);
            let meta = metadata(start.elapsed().as_secs_f64())
                .with_counts(result.requested_count, result.produced_count);
            if result.is_partial() {
                ToolResponse::partial(content, output_format.content_type(), meta)
            } else {
                ToolResponse::success(content, output_format.content_type(), meta)
            }
        }
        Err(e) => {
            tracing::warn!("generate failed: {e}");
            let provider = e.provider().unwrap_or(backend.provider()).to_string();
            let mut meta = metadata(start.elapsed().as_secs_f64());
            meta.provider_used = provider;
            ToolResponse::error(e.user_message(), meta)
        }
    }
}

fn render_records(
    result: &GenerationResult,
    request: &GenerationRequest,
    output_format: OutputFormat,
) -> String {
    match output_format {
        OutputFormat::Json => render::to_json(&result.records),
        OutputFormat::Table => render::to_markdown_table(&result.records),
        OutputFormat::Sql => {
            let table = render::table_name_from_structure(request.structure_text())
                .unwrap_or_else(|| render::DEFAULT_TABLE_NAME.to_string());
            render::to_sql_inserts(&result.records, &table)
        }
    }
}
