use std::fmt::Write as _;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// How the caller wrote the table structure.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InputFormat {
    /// `column: type` list.
    #[default]
    Simple,
    /// SQL `CREATE TABLE` statement.
    Sql,
}

impl InputFormat {
    fn describe(&self) -> &'static str {
        match self {
            Self::Simple => "a list of `column: type` pairs",
            Self::Sql => "a SQL CREATE TABLE statement",
        }
    }
}

/// Textual format mandated for temporal fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DateFormat {
    #[default]
    Iso,
}

impl DateFormat {
    fn describe(&self) -> &'static str {
        match self {
            Self::Iso => "YYYY-MM-DD for dates and YYYY-MM-DD HH:MM:SS for datetimes",
        }
    }
}

/// Language directive for free-text fields, keyed by a BCP 47-ish tag.
pub fn language_directive(tag: &str) -> String {
    let tag = tag.trim();
    if tag.eq_ignore_ascii_case("zh-CN") || tag.eq_ignore_ascii_case("zh") {
        format!(
            "Write all free text (names, addresses, descriptions) in the \"{tag}\" language: \
             use Chinese names, Chinese addresses and Chinese text."
        )
    } else if tag.is_empty() || tag.eq_ignore_ascii_case("en") {
        "Write all free text (names, addresses, descriptions) in the \"en\" language: \
         use English names, addresses and text."
            .to_string()
    } else {
        format!(
            "Write all free text (names, addresses, descriptions) in the \"{tag}\" language, \
             following that language's own conventions for names and addresses."
        )
    }
}

/// Everything that varies in the per-chunk instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptParams<'a> {
    pub structure: &'a str,
    pub chunk_size: usize,
    pub language: &'a str,
    pub input_format: InputFormat,
    pub date_format: DateFormat,
    /// Ask for unique integer values in identifier / primary-key columns.
    pub unique_ids: bool,
}

impl<'a> PromptParams<'a> {
    pub fn new(structure: &'a str, chunk_size: usize, language: &'a str) -> Self {
        Self {
            structure,
            chunk_size,
            language,
            input_format: InputFormat::default(),
            date_format: DateFormat::default(),
            unique_ids: true,
        }
    }

    pub fn with_input_format(mut self, input_format: InputFormat) -> Self {
        self.input_format = input_format;
        self
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "You generate realistic mock data for database tables.\n\n\
             Table structure (usually {}, but accept any common notation):\n{}\n",
            self.input_format.describe(),
            self.structure
        );
        let _ = writeln!(
            out,
            "Generate exactly {} records that fit this structure. \
             Each record is a JSON object whose keys match the column names exactly.\n",
            self.chunk_size
        );
        out.push_str("Rules:\n");
        out.push_str("- Keep values realistic, varied and mutually consistent.\n");
        let _ = writeln!(
            out,
            "- Format temporal fields as {}.",
            self.date_format.describe()
        );
        out.push_str("- Keep numeric fields within plausible ranges.\n");
        out.push_str("- Personal data (names, emails, phones) must look real but be fake.\n");
        let _ = writeln!(out, "- {}", language_directive(self.language));
        if self.unique_ids {
            out.push_str(
                "- Columns that look like an ID or primary key hold unique integers within this batch.\n",
            );
        }
        out.push_str(
            "\nRespond with ONLY the JSON array of records: no explanation, no markdown, no code fences.",
        );
        out
    }
}
