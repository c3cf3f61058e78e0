use crate::parsers::{ParseOutcome, RecordParser, records_from_json};

/// Treats the whole response as a JSON array of objects.
pub struct StrictParser;

impl RecordParser for StrictParser {
    fn name(&self) -> &'static str {
        "strict"
    }

    fn parse(&self, text: &str) -> ParseOutcome {
        records_from_json(text.trim())
    }
}
