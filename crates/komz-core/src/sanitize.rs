//! Prompt cleanup.

use std::sync::LazyLock;

use regex::Regex;

/// Longest prompt, in characters, forwarded upstream.
pub const MAX_INPUT_CHARS: usize = 1000;

// An unterminated `<` swallows the rest of the input.
static TAG_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"<[^>]*>?").expect("tag pattern is valid")
});

/// Strips markup, trims whitespace, and caps the length of a visitor prompt.
///
/// ```
/// use komz_core::sanitize_input;
///
/// assert_eq!(sanitize_input("  <b>Hello</b> there "), "Hello there");
/// ```
pub fn sanitize_input(input: &str) -> String {
    if input.is_empty() {
        return String::new();
    }

    let stripped = TAG_PATTERN.replace_all(input, "");
    stripped.trim().chars().take(MAX_INPUT_CHARS).collect()
}
