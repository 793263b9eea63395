//! Cleanup of text extracted from PDFs before it becomes plan text.
//!
//! `pdf-extract` returns text in reading order but with layout debris:
//! form feeds between pages, `\r\n` from Windows producers, lines padded
//! with spaces to their column width, runs of empty lines where tables or
//! images were, and invisible characters (BOM, zero-width spaces, soft
//! hyphens, NUL). None of that helps the model, and all of it counts
//! against the plan length cap.
//!
//! ## Rule Order
//!
//! Line endings are normalised first so the per-line rules see `\n` only;
//! invisible characters go before whitespace trimming so a line holding just
//! a zero-width space becomes blank and is collapsed with its neighbours.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all cleanup rules to extracted PDF text.
///
/// Rules (applied in order):
/// 1. Normalise line endings and page breaks (CRLF, CR, form feed → LF)
/// 2. Strip invisible Unicode and NUL characters
/// 3. Collapse runs of spaces/tabs inside lines to one space
/// 4. Trim trailing whitespace per line
/// 5. Collapse 3+ consecutive newlines down to a single blank line
/// 6. Trim the whole text
pub fn clean_plan_text(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = remove_invisible_chars(&s);
    let s = collapse_inline_whitespace(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    s.trim().to_string()
}

// ── Rule 1: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input
        .replace("\r\n", "\n")
        .replace(['\r', '\u{000C}'], "\n")
}

// ── Rule 2: Remove invisible characters ──────────────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{0000}', '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Rule 3: Collapse inline whitespace ───────────────────────────────────────

static RE_INLINE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t\u{00A0}]{2,}").unwrap());

fn collapse_inline_whitespace(input: &str) -> String {
    RE_INLINE_WS.replace_all(input, " ").to_string()
}

// ── Rule 4: Trim trailing whitespace per line ────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 5: Collapse excessive blank lines ───────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n").to_string()
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalise_line_endings() {
        assert_eq!(normalise_line_endings("a\r\nb\rc\u{000C}d"), "a\nb\nc\nd");
    }

    #[test]
    fn test_remove_invisible() {
        let input = "hello\u{200B}world\u{FEFF}foo\u{00AD}bar\u{0000}";
        assert_eq!(remove_invisible_chars(input), "helloworldfoobar");
    }

    #[test]
    fn test_collapse_inline_whitespace() {
        assert_eq!(
            collapse_inline_whitespace("Mål:    lære\t\tRust"),
            "Mål: lære Rust"
        );
        assert_eq!(collapse_inline_whitespace("a b"), "a b");
    }

    #[test]
    fn test_trim_trailing_whitespace() {
        assert_eq!(
            trim_trailing_whitespace("  hello   \nworld  "),
            "  hello\nworld"
        );
    }

    #[test]
    fn test_collapse_blank_lines() {
        assert_eq!(collapse_blank_lines("a\n\n\n\n\nb"), "a\n\nb");
        assert_eq!(collapse_blank_lines("a\n\nb"), "a\n\nb");
    }

    #[test]
    fn test_clean_plan_text_full_pipeline() {
        let input = "\u{FEFF}  Læringsplan 2025   \r\n\r\n\r\n\u{200B}\r\nUge 1:  læs kapitel 1\u{000C}Uge 2: byg projekt   \n\n";
        assert_eq!(
            clean_plan_text(input),
            "Læringsplan 2025\n\nUge 1: læs kapitel 1\nUge 2: byg projekt"
        );
    }

    #[test]
    fn test_clean_plan_text_only_noise_is_empty() {
        assert_eq!(clean_plan_text(" \u{200B}\n\u{000C}\n\t "), "");
    }
}
