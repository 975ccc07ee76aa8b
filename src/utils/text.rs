//! Pure string helpers used by the result formatter.

use crate::core::constants::MAX_HYPHENATED_WORD_LEN;
use once_cell::sync::Lazy;
use regex::{NoExpand, Regex};

// Shared regex patterns
pub static DOTS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.{4,}").expect("static regex"));
pub static MIDDOTS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"·{4,}").expect("static regex"));
pub static UNDERSCORE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"_{4,}").expect("static regex"));
pub static ESCAPED_UNDERSCORE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:\\_){4,}").expect("static regex"));
pub static PAREN_LIST_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[(（](\d+|[A-Za-z])[)）]").expect("static regex"));
pub static NUMBERED_LIST_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z]|\d+)([.)）])").expect("static regex"));

/// Removes leading whitespace (including newlines).
pub fn trim_leading_whitespace(text: &str) -> &str {
    text.trim_start()
}

/// Removes trailing whitespace (including newlines).
pub fn trim_trailing_whitespace(text: &str) -> &str {
    text.trim_end()
}

/// Collapses runs of `.`, `·`, `_` and the escaped `\_` to at most three repetitions.
pub fn limit_repeats(text: &str) -> String {
    let result = DOTS_RE.replace_all(text, "...");
    let result = MIDDOTS_RE.replace_all(&result, "···");
    let result = UNDERSCORE_RE.replace_all(&result, "___");
    ESCAPED_UNDERSCORE_RE
        .replace_all(&result, NoExpand(r"\_\_\_"))
        .into_owned()
}

/// Normalizes raw recognizer output.
///
/// Strips repeated literal `\t` markers at both ends, collapses repeated
/// characters and trims whitespace.
pub fn clean_content(text: &str) -> String {
    let mut output = text;
    while let Some(rest) = output.strip_prefix("\\t") {
        output = rest;
    }
    output = output.trim_start();
    while let Some(rest) = output.strip_suffix("\\t") {
        output = rest;
    }
    output = output.trim_end();

    limit_repeats(output).trim().to_string()
}

/// Strips leading `#` characters and the whitespace that follows them.
pub fn strip_leading_hashes(text: &str) -> &str {
    text.trim_start_matches('#').trim_start()
}

/// Formats a `doc_title` as a level-1 heading.
pub fn format_doc_title(text: &str) -> String {
    format!("# {}", strip_leading_hashes(text))
}

/// Formats a `paragraph_title` as a level-2 heading, dropping a leading bullet first.
pub fn format_paragraph_title(text: &str) -> String {
    let text = match text.strip_prefix("- ").or_else(|| text.strip_prefix("* ")) {
        Some(rest) => rest.trim_start(),
        None => text,
    };
    format!("## {}", strip_leading_hashes(text).trim_start())
}

/// Wraps a formula in a `$$` display block.
///
/// An existing `$$…$$`, `\[…\]` or `\(…\)` wrapper is removed first so
/// already-wrapped content is not wrapped twice.
pub fn format_formula(text: &str) -> String {
    let stripped = text.trim();
    format!("$$\n{}\n$$", strip_math_wrappers(stripped))
}

/// Removes one `$$…$$`, `\[…\]` or `\(…\)` wrapper and trims the inside.
pub fn strip_math_wrappers(input: &str) -> &str {
    const WRAPPERS: [(&str, &str); 3] = [("$$", "$$"), ("\\[", "\\]"), ("\\(", "\\)")];
    if input.chars().count() < 4 {
        return input;
    }
    for (open, close) in WRAPPERS {
        if let Some(inner) = input
            .strip_prefix(open)
            .and_then(|rest| rest.strip_suffix(close))
        {
            return inner.trim();
        }
    }
    input
}

/// Normalizes text-kind content: bullets, list prefixes and paragraph breaks.
pub fn format_text(text: &str) -> String {
    let mut output = text.to_string();

    if output.starts_with('·') || output.starts_with('•') || output.starts_with("* ") {
        let mut chars = output.chars();
        chars.next();
        output = format!("- {}", chars.as_str().trim_start());
    }

    if let Some((symbol, rest)) = parse_paren_list_prefix(&output) {
        output = format!("({symbol}) {}", rest.trim_start());
    } else if let Some((symbol, separator, rest)) = parse_numbered_list_prefix(&output) {
        output = format!("{symbol}{separator} {}", rest.trim_start());
    }

    double_single_newlines(&output)
}

/// Parses a `(a)` / `（1）` list prefix into `(symbol, rest)`.
pub fn parse_paren_list_prefix(text: &str) -> Option<(&str, &str)> {
    let caps = PAREN_LIST_RE.captures(text)?;
    let whole = caps.get(0)?;
    let symbol = caps.get(1)?.as_str();
    Some((symbol, &text[whole.end()..]))
}

/// Parses a `1.` / `a)` / `1）` list prefix into `(symbol, separator, rest)`.
///
/// The full-width `）` separator is normalized to `)`.
pub fn parse_numbered_list_prefix(text: &str) -> Option<(&str, &'static str, &str)> {
    let caps = NUMBERED_LIST_RE.captures(text)?;
    let whole = caps.get(0)?;
    let symbol = caps.get(1)?.as_str();
    let separator = match caps.get(2)?.as_str() {
        "." => ".",
        _ => ")",
    };
    Some((symbol, separator, &text[whole.end()..]))
}

/// Turns a lone `\n` into a blank line; existing blank lines are left alone.
pub fn double_single_newlines(text: &str) -> String {
    if !text.contains('\n') {
        return text.to_string();
    }
    let chars: Vec<char> = text.chars().collect();
    let mut output = String::with_capacity(text.len() + 8);
    for (i, &ch) in chars.iter().enumerate() {
        if ch != '\n' {
            output.push(ch);
            continue;
        }
        let prev_is_newline = i > 0 && chars[i - 1] == '\n';
        let next_is_newline = chars.get(i + 1) == Some(&'\n');
        if prev_is_newline || next_is_newline {
            output.push('\n');
        } else {
            output.push_str("\n\n");
        }
    }
    output
}

/// Strips one pair of surrounding `()` or `（）` from a formula number.
pub fn clean_formula_number(text: &str) -> &str {
    let trimmed = text.trim();
    trimmed
        .strip_prefix('(')
        .and_then(|rest| rest.strip_suffix(')'))
        .or_else(|| {
            trimmed
                .strip_prefix('（')
                .and_then(|rest| rest.strip_suffix('）'))
        })
        .unwrap_or(trimmed)
}

/// Appends `\tag{number}` before the closing `$$` of a formatted formula.
///
/// Returns `None` when the formula does not end in `\n$$`.
pub fn attach_formula_tag(formula: &str, number: &str) -> Option<String> {
    let body = formula.strip_suffix("\n$$")?;
    Some(format!("{body} \\tag{{{number}}}\n$$"))
}

/// Whether a word split across a hyphenated line break should be rejoined.
///
/// Both fragments must be non-empty, purely alphabetic and at most 64 letters combined.
pub fn should_merge_hyphenated_word(before: &str, after: &str) -> bool {
    if before.is_empty() || after.is_empty() {
        return false;
    }
    before.chars().count() + after.chars().count() <= MAX_HYPHENATED_WORD_LEN
        && before.chars().chain(after.chars()).all(char::is_alphabetic)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_content() {
        assert_eq!(clean_content("\\t\\t  hello \\t"), "hello");
        assert_eq!(clean_content("a.......b"), "a...b");
        assert_eq!(clean_content("x______y····z"), "x___y···z");
        assert_eq!(clean_content(r"\_\_\_\_\_ name"), r"\_\_\_ name");
        assert_eq!(clean_content("  \n spaced \n "), "spaced");
    }

    #[test]
    fn test_titles() {
        assert_eq!(format_doc_title("## Document Title"), "# Document Title");
        assert_eq!(format_doc_title("Plain"), "# Plain");
        assert_eq!(format_paragraph_title("- Section Title"), "## Section Title");
        assert_eq!(format_paragraph_title("* ### Deep"), "## Deep");
        assert_eq!(format_paragraph_title("## Already"), "## Already");
    }

    #[test]
    fn test_format_formula_unwraps_once() {
        assert_eq!(format_formula("E = mc^2"), "$$\nE = mc^2\n$$");
        assert_eq!(format_formula("$$ x $$"), "$$\nx\n$$");
        assert_eq!(format_formula("\\[a+b\\]"), "$$\na+b\n$$");
        assert_eq!(format_formula("\\(y\\)"), "$$\ny\n$$");
        let once = format_formula("x^2");
        assert_eq!(format_formula(&once), once);
    }

    #[test]
    fn test_format_text_bullets_and_lists() {
        assert_eq!(format_text("• item"), "- item");
        assert_eq!(format_text("·item"), "- item");
        assert_eq!(format_text("* item"), "- item");
        assert_eq!(format_text("(a)first"), "(a) first");
        assert_eq!(format_text("（1）第一"), "(1) 第一");
        assert_eq!(format_text("1.step"), "1. step");
        assert_eq!(format_text("12)  twelve"), "12) twelve");
        assert_eq!(format_text("b）bee"), "b) bee");
        assert_eq!(format_text("Hello world"), "Hello world");
    }

    #[test]
    fn test_double_single_newlines() {
        assert_eq!(double_single_newlines("a\nb"), "a\n\nb");
        assert_eq!(double_single_newlines("a\n\nb"), "a\n\nb");
        assert_eq!(double_single_newlines("a\n\n\nb"), "a\n\n\nb");
        assert_eq!(double_single_newlines("plain"), "plain");
    }

    #[test]
    fn test_formula_number_helpers() {
        assert_eq!(clean_formula_number(" (1) "), "1");
        assert_eq!(clean_formula_number("（2.3）"), "2.3");
        assert_eq!(clean_formula_number("4"), "4");
        assert_eq!(
            attach_formula_tag("$$\nx\n$$", "1").as_deref(),
            Some("$$\nx \\tag{1}\n$$")
        );
        assert_eq!(attach_formula_tag("x", "1"), None);
    }

    #[test]
    fn test_should_merge_hyphenated_word() {
        assert!(should_merge_hyphenated_word("inter", "national"));
        assert!(!should_merge_hyphenated_word("", "national"));
        assert!(!should_merge_hyphenated_word("covid", "19"));
        assert!(!should_merge_hyphenated_word(&"a".repeat(40), &"b".repeat(25)));
        assert!(should_merge_hyphenated_word(&"a".repeat(40), &"b".repeat(24)));
    }
}
