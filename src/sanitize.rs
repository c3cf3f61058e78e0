//! Markup stripping for caller-supplied table structure text.

use std::sync::LazyLock;

use regex::Regex;

// `.*?` stops at the first closing tag, matching across lines.
static SCRIPT_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script\b.*?</script>").expect("valid script pattern"));
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid tag pattern"));
static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace pattern"));

/// Strip `<script>` blocks and all other tags, then collapse whitespace.
///
/// A `<script>` with no closing tag is not a block: only the opening tag is
/// removed and the text after it is kept.
pub fn sanitize_input(input: &str) -> String {
    let without_scripts = SCRIPT_BLOCK.replace_all(input, "");
    let without_tags = TAG.replace_all(&without_scripts, "");
    WHITESPACE.replace_all(&without_tags, " ").trim().to_string()
}
