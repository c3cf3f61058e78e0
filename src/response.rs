use rmcp::model::{CallToolResult, Content};
use serde::Serialize;

/// JSON envelope returned by every tool as a single text content item.
#[derive(Debug, Serialize)]
pub struct ToolResponse {
    pub status: &'static str,
    pub content: String,
    pub content_type: &'static str,
    pub metadata: ToolMetadata,
}

#[derive(Debug, Serialize)]
pub struct ToolMetadata {
    pub tool_name: String,
    pub model_used: String,
    pub provider_used: String,
    #[serde(serialize_with = "serialize_finite_f64")]
    pub duration_seconds: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_count: Option<usize>,
    /// Human-readable notice shown alongside partial results.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}

impl ToolMetadata {
    pub fn new(tool_name: &str, model_used: &str, provider_used: &str, duration_seconds: f64) -> Self {
        Self {
            tool_name: tool_name.to_string(),
            model_used: model_used.to_string(),
            provider_used: provider_used.to_string(),
            duration_seconds,
            requested_count: None,
            generated_count: None,
            notice: None,
        }
    }

    pub fn with_counts(mut self, requested: usize, generated: usize) -> Self {
        self.requested_count = Some(requested);
        self.generated_count = Some(generated);
        self
    }
}

/// Serialize f64, clamping non-finite values (NaN, Inf) to 0.0.
fn serialize_finite_f64<S: serde::Serializer>(v: &f64, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(if v.is_finite() { *v } else { 0.0 })
}

impl ToolResponse {
    pub fn success(content: String, content_type: &'static str, metadata: ToolMetadata) -> Self {
        Self {
            status: "success",
            content,
            content_type,
            metadata,
        }
    }

    /// Fewer records than requested; the notice says how many.
    pub fn partial(content: String, content_type: &'static str, mut metadata: ToolMetadata) -> Self {
        if let (Some(requested), Some(generated)) =
            (metadata.requested_count, metadata.generated_count)
        {
            metadata.notice = Some(format!(
                "generated {generated} of {requested} requested records"
            ));
        }
        Self {
            status: "partial",
            content,
            content_type,
            metadata,
        }
    }

    pub fn error(message: String, metadata: ToolMetadata) -> Self {
        Self {
            status: "error",
            content: message,
            content_type: "text",
            metadata,
        }
    }

    /// Convert to MCP CallToolResult.
    /// Always returns success at the MCP transport level; error info is in
    /// the JSON payload (`"status": "error"`).
    pub fn into_call_tool_result(self) -> CallToolResult {
        match serde_json::to_string(&self) {
            Ok(json) => CallToolResult::success(vec![Content::text(json)]),
            Err(e) => {
                let escaped = e.to_string().replace('\\', "\\\\").replace('"', "\\\"");
                CallToolResult::success(vec![Content::text(format!(
                    r#"{{"status":"error","content":"serialization failed: {escaped}","content_type":"text","metadata":{{}}}}"#
                ))])
            }
        }
    }
}
