//! Sentence-aligned chunking.
//!
//! Greedy packing: sentences are added to the running chunk until the next
//! one would push it past `max_words`. A sentence longer than `max_words`
//! becomes a chunk on its own; sentences are never split.

use crate::pipeline::segment::{RuleSegmenter, SentenceSegmenter};
use std::sync::Arc;

/// Whitespace-separated token count, the unit for every size limit.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// A contiguous run of whole sentences borrowed from the pass text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk<'a> {
    /// Slice from the first sentence's start to the last sentence's end,
    /// original spacing included.
    pub text: &'a str,
    pub words: usize,
    pub sentences: usize,
}

#[derive(Clone)]
pub struct Chunker {
    segmenter: Arc<dyn SentenceSegmenter>,
}

impl Default for Chunker {
    fn default() -> Self {
        Self::new(Arc::new(RuleSegmenter::new()))
    }
}

impl std::fmt::Debug for Chunker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chunker")
            .field("segmenter", &"<dyn SentenceSegmenter>")
            .finish()
    }
}

impl Chunker {
    pub fn new(segmenter: Arc<dyn SentenceSegmenter>) -> Self {
        Self { segmenter }
    }

    /// Split `text` into chunks of at most `max_words` words.
    ///
    /// `max_words == 0` is treated as 1. Blank input yields no chunks.
    pub fn chunk<'a>(&self, text: &'a str, max_words: usize) -> Vec<Chunk<'a>> {
        let max_words = max_words.max(1);
        let sentences = self.segmenter.segment(text);

        let mut chunks = Vec::new();
        // (start byte, end byte, words, sentences) of the chunk being built.
        let mut open: Option<(usize, usize, usize, usize)> = None;

        for sentence in sentences {
            open = match open {
                Some((start, end, words, count)) if words + sentence.words > max_words => {
                    chunks.push(Chunk {
                        text: &text[start..end],
                        words,
                        sentences: count,
                    });
                    Some((sentence.start, sentence.end, sentence.words, 1))
                }
                Some((start, _, words, count)) => {
                    Some((start, sentence.end, words + sentence.words, count + 1))
                }
                None => Some((sentence.start, sentence.end, sentence.words, 1)),
            };
        }

        if let Some((start, end, words, count)) = open {
            chunks.push(Chunk {
                text: &text[start..end],
                words,
                sentences: count,
            });
        }
        chunks
    }
}
