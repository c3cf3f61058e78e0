use std::sync::Arc;

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{CallToolResult, Implementation, ServerCapabilities, ServerInfo};
use rmcp::service::RequestContext;
use rmcp::{ErrorData as McpError, RoleServer, ServerHandler, tool, tool_handler, tool_router};

use crate::batch::BatchOrchestrator;
use crate::chunk::Sampling;
use crate::config::{Config, GenerationConfig};
use crate::dispatch::http::HttpBackend;
use crate::error::MockcatError;
use crate::response::{ToolMetadata, ToolResponse};
use crate::tools::generate::{self, GenerateRequest};
use crate::tools::listmodels::ListModelsResponse;

#[derive(Clone)]
pub struct MockcatServer {
    config: Arc<Config>,
    orchestrator: Option<Arc<BatchOrchestrator<HttpBackend>>>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl MockcatServer {
    pub fn new(config: Config) -> Self {
        let orchestrator = config.backend.clone().and_then(|backend| {
            let sampling = Sampling {
                temperature: backend.temperature,
                max_output_tokens: backend.max_output_tokens,
            };
            match HttpBackend::new(backend) {
                Ok(http) => Some(Arc::new(BatchOrchestrator::new(
                    http,
                    sampling,
                    &config.generation,
                ))),
                Err(e) => {
                    tracing::error!("failed to build HTTP client: {e}");
                    None
                }
            }
        });

        Self {
            config: Arc::new(config),
            orchestrator,
            tool_router: Self::tool_router(),
        }
    }

    /// True when a backend is configured and generation can run.
    pub fn is_ready(&self) -> bool {
        self.orchestrator.is_some()
    }

    pub fn generation_config(&self) -> &GenerationConfig {
        &self.config.generation
    }

    #[tool(
        name = "generate",
        description = "Generate realistic mock rows for a table. Accepts a `column: type` list or a SQL CREATE TABLE statement; returns JSON, a markdown table, or SQL INSERT statements. Large counts are generated in chunks; if a later chunk fails the rows already generated are returned with status \"partial\".",
        annotations(read_only_hint = true)
    )]
    async fn generate(
        &self,
        Parameters(req): Parameters<GenerateRequest>,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let Some(orchestrator) = self.orchestrator.as_deref() else {
            let err = MockcatError::Configuration(
                "GEMINI_API_KEY is not set in the environment".to_string(),
            );
            tracing::warn!("generate rejected: {err}");
            let response =
                ToolResponse::error(err.user_message(), ToolMetadata::new("generate", "none", "none", 0.0));
            return Ok(response.into_call_tool_result());
        };

        let request = req
            .to_generation_request(self.config.generation.max_chunk_size)
            .map_err(|e| McpError::invalid_params(e.user_message(), None))?;

        tracing::info!(
            records = request.total_records(),
            language = request.language_tag(),
            "generate request"
        );

        let response =
            generate::execute(orchestrator, &request, req.output_format(), &context.ct).await;

        Ok(response.into_call_tool_result())
    }

    #[tool(
        name = "listmodels",
        description = "Show the configured generation model and request limits.",
        annotations(read_only_hint = true)
    )]
    async fn listmodels(&self) -> Result<CallToolResult, McpError> {
        let list = ListModelsResponse::new(self.config.backend.as_ref(), &self.config.generation);

        let (model, provider) = match &self.config.backend {
            Some(b) => (b.model.as_str(), b.provider.as_str()),
            None => ("none", "none"),
        };
        let response = ToolResponse::success(
            list.to_markdown(),
            "markdown",
            ToolMetadata::new("listmodels", model, provider, 0.0),
        );

        Ok(response.into_call_tool_result())
    }
}

#[tool_handler]
impl ServerHandler for MockcatServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "mockcat".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Default::default()
            },
            instructions: Some(
                "Mockcat: mock table data from a structure description.\n\n\
                 Call `generate` with `table_structure` (e.g. \"id: number, name: string\" or a \
                 CREATE TABLE statement), an optional `record_count` (default 5, max 200), \
                 `language` (\"en\", \"zh-CN\", ...) and `output_format` (json, table, sql).\n\
                 A `partial` status means fewer rows than requested were produced; the rows \
                 returned are still usable."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}
