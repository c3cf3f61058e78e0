use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// How generated records are rendered in the tool response.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Pretty-printed JSON array.
    #[default]
    Json,
    /// Markdown table, columns from the first record.
    Table,
    /// One SQL INSERT statement per record.
    Sql,
}

impl OutputFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Table => "markdown",
            Self::Sql => "sql",
        }
    }
}
