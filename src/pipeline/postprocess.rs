//! Deterministic cleanup of extracted page text.
//!
//! Text coming out of pdfium and out of the vision model carries artefacts
//! that confuse sentence segmentation: CRLF line endings, zero-width
//! characters, words hyphenated across line breaks, runs of blank lines and
//! (for the model) markdown fences around the whole answer.
//!
//! ## Rule Order
//!
//! Line endings are normalised first so every later rule only sees `\n`.
//! Dehyphenation runs after trailing-whitespace trimming so `"trans- \n"`
//! is recognised.

use once_cell::sync::Lazy;
use regex::Regex;

/// Clean text read from a PDF text layer.
///
/// Rules (applied in order):
/// 1. Normalise line endings (CRLF, CR, form feed → LF)
/// 2. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens, etc.)
/// 3. Trim trailing whitespace per line
/// 4. Re-join words hyphenated across a line break
/// 5. Collapse 2+ consecutive blank lines down to 1
/// 6. Trim the whole text
pub fn clean_page_text(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = remove_invisible_chars(&s);
    let s = trim_trailing_whitespace(&s);
    let s = join_hyphenated_words(&s);
    let s = collapse_blank_lines(&s);
    s.trim().to_string()
}

/// Clean a vision-model transcription: strip an outer fence, then apply
/// [`clean_page_text`].
pub fn clean_transcription(input: &str) -> String {
    clean_page_text(&strip_outer_fences(input))
}

// ── Rule 0: Strip outer fences (model output only) ──────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:markdown|text|plaintext)?\n(.*)\n```\s*$").unwrap());

fn strip_outer_fences(input: &str) -> String {
    if let Some(caps) = RE_OUTER_FENCES.captures(input.trim()) {
        caps[1].to_string()
    } else {
        input.to_string()
    }
}

// ── Rule 1: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input
        .replace("\r\n", "\n")
        .replace(['\r', '\u{000C}'], "\n")
}

// ── Rule 2: Strip invisible characters ──────────────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input
        .chars()
        .filter(|c| {
            !matches!(
                c,
                '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{2060}' | '\u{FEFF}' | '\u{00AD}'
            )
        })
        .collect()
}

// ── Rule 3: Trim trailing whitespace per line ────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 4: Re-join hyphenated words ─────────────────────────────────────────

static RE_LINE_HYPHEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\p{Ll})-\n[ \t]*(\p{Ll})").unwrap());

fn join_hyphenated_words(input: &str) -> String {
    RE_LINE_HYPHEN.replace_all(input, "$1$2").to_string()
}

// ── Rule 5: Collapse blank lines ─────────────────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_fences() {
        let input = "```markdown\nThe page text\n```";
        assert_eq!(strip_outer_fences(input), "The page text");
    }

    #[test]
    fn test_strip_fences_no_lang() {
        assert_eq!(strip_outer_fences("```\nHello\n```\n"), "Hello");
    }

    #[test]
    fn test_no_fences_passthrough() {
        assert_eq!(strip_outer_fences("Plain text"), "Plain text");
    }

    #[test]
    fn test_normalise_line_endings() {
        assert_eq!(normalise_line_endings("a\r\nb\rc\u{000C}d"), "a\nb\nc\nd");
    }

    #[test]
    fn test_remove_invisible() {
        assert_eq!(remove_invisible_chars("Hel\u{200B}lo\u{FEFF} wor\u{00AD}ld"), "Hello world");
    }

    #[test]
    fn test_join_hyphenated() {
        assert_eq!(join_hyphenated_words("mem-\nbrane trans-\n  port"), "membrane transport");
        // Capitalised continuation is a real dash, keep it
        assert_eq!(join_hyphenated_words("pre-\nWar"), "pre-\nWar");
    }

    #[test]
    fn test_collapse_blank_lines() {
        assert_eq!(collapse_blank_lines("a\n\n\n\n\nb"), "a\n\nb");
        assert_eq!(collapse_blank_lines("a\n\nb"), "a\n\nb");
    }

    #[test]
    fn test_clean_page_text_full_pipeline() {
        let input = "  Title \r\n\r\n\r\n\r\nThe mito-\r\nchondria   \r\nis\u{200B} here.  \r\n";
        assert_eq!(clean_page_text(input), "Title\n\nThe mitochondria\nis here.");
    }

    #[test]
    fn test_clean_transcription() {
        let input = "```text\nQ.1 Define osmosis. [5 Marks]\n```";
        assert_eq!(clean_transcription(input), "Q.1 Define osmosis. [5 Marks]");
    }
}
