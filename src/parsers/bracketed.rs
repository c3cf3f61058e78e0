use crate::parsers::{ParseFailure, ParseOutcome, RecordParser, records_from_json};

/// Extracts the span from the first `[` to the last `]` and parses that.
/// Recovers arrays wrapped in prose or code fences.
pub struct BracketedParser;

impl BracketedParser {
    /// Greedy bracket span, or None when no `[ ... ]` pair exists.
    pub fn extract(text: &str) -> Option<&str> {
        let start = text.find('[')?;
        let end = text.rfind(']')?;
        (end > start).then(|| &text[start..=end])
    }
}

impl RecordParser for BracketedParser {
    fn name(&self) -> &'static str {
        "bracketed"
    }

    fn parse(&self, text: &str) -> ParseOutcome {
        match Self::extract(text) {
            Some(span) => records_from_json(span),
            None => ParseOutcome::Failed(ParseFailure::NoBracketedArray),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_from_code_fence() {
        let text = "```json\n[{\"id\": 1, \"tags\": [\"a\"]}]\n```";
        assert_eq!(
            BracketedParser::extract(text),
            Some("[{\"id\": 1, \"tags\": [\"a\"]}]")
        );
        let ParseOutcome::Parsed(records) = BracketedParser.parse(text) else {
            panic!("fenced array should parse");
        };
        assert_eq!(records[0]["tags"][0], "a");
    }

    #[test]
    fn no_brackets_reports_missing_array() {
        assert_eq!(
            BracketedParser.parse("nothing to see"),
            ParseOutcome::Failed(ParseFailure::NoBracketedArray)
        );
    }

    #[test]
    fn reversed_brackets_are_not_a_span() {
        assert_eq!(BracketedParser::extract("] oops ["), None);
    }

    #[test]
    fn truncated_array_is_invalid_json() {
        let outcome = BracketedParser.parse("[{\"id\": 1}, {\"id\": ]");
        assert!(matches!(
            outcome,
            ParseOutcome::Failed(ParseFailure::InvalidJson(_))
        ));
    }
}
