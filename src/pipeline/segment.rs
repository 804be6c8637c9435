//! Sentence segmentation.
//!
//! The chunker never cuts through a sentence, so everything downstream
//! depends on where this module draws sentence boundaries. The segmenter is
//! a trait so a statistical model can be dropped in; [`RuleSegmenter`] is the
//! default and needs no model files.

/// One sentence, borrowed from the text it was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sentence<'a> {
    pub text: &'a str,
    /// Byte offset of the first character in the source text.
    pub start: usize,
    /// Byte offset one past the last character in the source text.
    pub end: usize,
    /// Whitespace-separated tokens.
    pub words: usize,
}

/// Splits text into ordered, non-overlapping sentences.
///
/// Implementations must return sentences in source order with
/// `text == &source[start..end]` and no leading or trailing whitespace.
pub trait SentenceSegmenter: Send + Sync {
    fn segment<'a>(&self, text: &'a str) -> Vec<Sentence<'a>>;
}

/// Lower-cased tokens that end with a period without ending a sentence.
const ABBREVIATIONS: &[&str] = &[
    "mr", "mrs", "ms", "dr", "prof", "sr", "jr", "st", "vs", "etc", "e.g", "i.e", "cf", "fig",
    "figs", "no", "nos", "vol", "pp", "p", "al", "inc", "ltd", "co", "corp", "approx", "dept",
    "eq", "eqs", "sec", "ch", "ref", "refs", "viz", "jan", "feb", "mar", "apr", "jun", "jul",
    "aug", "sep", "sept", "oct", "nov", "dec",
];

/// Characters allowed between terminal punctuation and the following space.
const CLOSERS: &[char] = &['"', '\'', '\u{201D}', '\u{2019}', ')', ']'];

/// Punctuation-driven segmenter.
///
/// A sentence ends at `.`, `!` or `?` (plus any closing quotes or brackets)
/// followed by whitespace, or at a blank line. A period does not end a
/// sentence after a known abbreviation, after a single capital letter
/// (initials), or when the next word starts in lower case.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleSegmenter;

impl RuleSegmenter {
    pub fn new() -> Self {
        Self
    }

    fn is_break(chars: &[(usize, char)], punct: usize, after: usize) -> bool {
        if chars[punct].1 != '.' {
            return true;
        }

        let next_word = chars[after..].iter().map(|&(_, c)| c).find(|c| !c.is_whitespace());
        if next_word.is_some_and(char::is_lowercase) {
            return false;
        }

        let word_start = chars[..punct]
            .iter()
            .rposition(|&(_, c)| !(c.is_alphanumeric() || c == '.'))
            .map_or(0, |k| k + 1);
        let word: String = chars[word_start..punct].iter().map(|&(_, c)| c).collect();
        let mut letters = word.chars();
        if let (Some(only), None) = (letters.next(), letters.next()) {
            if only.is_uppercase() {
                return false;
            }
        }
        !ABBREVIATIONS.contains(&word.to_lowercase().as_str())
    }
}

impl SentenceSegmenter for RuleSegmenter {
    fn segment<'a>(&self, text: &'a str) -> Vec<Sentence<'a>> {
        let chars: Vec<(usize, char)> = text.char_indices().collect();
        let mut sentences = Vec::new();
        let mut start: Option<usize> = None;
        let mut i = 0;

        while i < chars.len() {
            let (pos, c) = chars[i];
            let Some(sentence_start) = start else {
                if !c.is_whitespace() {
                    start = Some(pos);
                } else {
                    i += 1;
                }
                continue;
            };

            if c == '\n' {
                let mut j = i + 1;
                while j < chars.len() && chars[j].1 != '\n' && chars[j].1.is_whitespace() {
                    j += 1;
                }
                if j < chars.len() && chars[j].1 == '\n' {
                    push_sentence(&mut sentences, text, sentence_start, pos);
                    start = None;
                    i = j + 1;
                    continue;
                }
            }

            if matches!(c, '.' | '!' | '?') {
                let mut j = i + 1;
                while j < chars.len()
                    && (matches!(chars[j].1, '.' | '!' | '?') || CLOSERS.contains(&chars[j].1))
                {
                    j += 1;
                }
                let at_boundary = j == chars.len() || chars[j].1.is_whitespace();
                if at_boundary && Self::is_break(&chars, i, j) {
                    let end = chars.get(j).map_or(text.len(), |&(p, _)| p);
                    push_sentence(&mut sentences, text, sentence_start, end);
                    start = None;
                }
                i = j;
                continue;
            }

            i += 1;
        }

        if let Some(sentence_start) = start {
            push_sentence(&mut sentences, text, sentence_start, text.len());
        }
        sentences
    }
}

fn push_sentence<'a>(out: &mut Vec<Sentence<'a>>, text: &'a str, start: usize, end: usize) {
    let slice = text[start..end].trim_end();
    if slice.is_empty() {
        return;
    }
    out.push(Sentence {
        text: slice,
        start,
        end: start + slice.len(),
        words: slice.split_whitespace().count(),
    });
}
