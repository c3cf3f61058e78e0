use std::fmt::Write as _;

use serde_json::Value;

use crate::parsers::Record;

/// Table name used for INSERT statements when none can be inferred.
pub const DEFAULT_TABLE_NAME: &str = "mock_data";

pub fn to_json(records: &[Record]) -> String {
    serde_json::to_string_pretty(records).unwrap_or_else(|_| "[]".to_string())
}

/// Markdown table with columns taken from the first record.
pub fn to_markdown_table(records: &[Record]) -> String {
    let Some(first) = records.first() else {
        return "No data to display".to_string();
    };
    let columns: Vec<&String> = first.keys().collect();

    let mut out = String::new();
    let header: Vec<String> = columns.iter().map(|c| escape_cell(c)).collect();
    let _ = writeln!(out, "| {} |", header.join(" | "));
    let _ = writeln!(out, "|{}", " --- |".repeat(columns.len()));
    for record in records {
        let cells: Vec<String> = columns
            .iter()
            .map(|c| escape_cell(&cell_text(record.get(c.as_str()))))
            .collect();
        let _ = writeln!(out, "| {} |", cells.join(" | "));
    }
    out
}

fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

/// Table name from a leading `CREATE TABLE [IF NOT EXISTS] <name>`.
pub fn table_name_from_structure(structure: &str) -> Option<String> {
    let mut words = structure.split_whitespace();
    if !words.next()?.eq_ignore_ascii_case("create") {
        return None;
    }
    if !words.next()?.eq_ignore_ascii_case("table") {
        return None;
    }
    let mut name = words.next()?;
    if name.eq_ignore_ascii_case("if") {
        // IF NOT EXISTS
        words.next()?;
        words.next()?;
        name = words.next()?;
    }
    let name = name.split('(').next().unwrap_or_default();
    let name: String = name
        .chars()
        .filter(|c| !matches!(c, '`' | '"' | '[' | ']'))
        .collect();
    (!name.is_empty()).then_some(name)
}

/// One `INSERT` statement per record, columns from each record's own keys.
pub fn to_sql_inserts(records: &[Record], table: &str) -> String {
    let mut out = String::new();
    for record in records {
        let columns: Vec<&str> = record.keys().map(String::as_str).collect();
        let values: Vec<String> = record.values().map(sql_literal).collect();
        let _ = writeln!(
            out,
            "INSERT INTO {table} ({}) VALUES ({});",
            columns.join(", "),
            values.join(", ")
        );
    }
    out
}

fn sql_literal(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(b) => b.to_string().to_uppercase(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => quote(s),
        nested => quote(&nested.to_string()),
    }
}

fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}
