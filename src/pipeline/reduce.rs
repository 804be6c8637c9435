//! Recursive chunk-and-reduce.
//!
//! One pass over a text:
//!
//! ```text
//! pass text ──▶ chunk ──▶ [context] ──▶ partial(chunk, context) × N ──▶ join "\n\n"
//!                              ▲                                          │
//!                              └──── combined > 2 × max_words ◀───────────┤
//!                                                                         ▼
//!                                                               final(combined)
//! ```
//!
//! The context is a partial transform of the pass text's first
//! `context_chars` characters, computed before the chunk loop and shared
//! read-only by every chunk of that pass. Chunk calls run concurrently but
//! their results are joined in chunk order.

use crate::config::DistillConfig;
use crate::error::{DistillError, TransformError};
use crate::pipeline::chunk::{word_count, Chunk, Chunker};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use futures::FutureExt;
use serde::Serialize;
use tracing::{debug, info, warn};

/// A structured transform applied by the reducer.
#[async_trait]
pub trait Transform: Send + Sync {
    type Output: Serialize + Send;

    /// Transform one section, optionally grounded by the pass context.
    async fn partial(&self, text: &str, context: Option<&str>) -> Result<Self::Output, TransformError>;

    /// Transform the joined partial results of the last pass.
    async fn finalize(&self, combined: &str) -> Result<Self::Output, TransformError>;

    /// Sentinel standing in for a failed transform.
    fn degraded(&self, error: &TransformError) -> Self::Output;
}

/// Map-reduce driver; cheap to clone.
#[derive(Debug, Clone)]
pub struct RecursiveReducer {
    chunker: Chunker,
    context_chars: usize,
    max_passes: usize,
    concurrency: usize,
}

impl RecursiveReducer {
    pub fn new(chunker: Chunker, config: &DistillConfig) -> Self {
        Self {
            chunker,
            context_chars: config.context_chars,
            max_passes: config.max_passes.max(1),
            concurrency: config.concurrency.max(1),
        }
    }

    /// Reduce `text` until one transform of at most `2 × max_words` input
    /// words yields the result.
    ///
    /// Chunk and context failures degrade to the sentinel. In the final
    /// step only backend outages are fatal.
    pub async fn reduce<T: Transform>(
        &self,
        text: &str,
        max_words: usize,
        transform: &T,
    ) -> Result<T::Output, DistillError> {
        if text.trim().is_empty() {
            return Err(DistillError::EmptyDocument);
        }
        let max_words = max_words.max(1);
        let mut current = text.to_string();

        for pass in 1..=self.max_passes {
            let combined = {
                let chunks = self.chunker.chunk(&current, max_words);
                info!(
                    "Pass {}: {} words → {} chunks",
                    pass,
                    word_count(&current),
                    chunks.len()
                );
                let context = self.global_context(&current, transform).await;
                self.map_chunks(&chunks, context.as_deref(), transform)
                    .await
                    .join("\n\n")
            };

            let combined_words = word_count(&combined);
            if combined_words > max_words * 2 {
                debug!(
                    "Pass {}: combined {} words > {}, reducing again",
                    pass,
                    combined_words,
                    max_words * 2
                );
                current = combined;
                continue;
            }

            info!("Pass {}: combined {} words, finalising", pass, combined_words);
            return match transform.finalize(&combined).await {
                Ok(output) => Ok(output),
                Err(e) if e.is_fatal() => Err(e.into_fatal()),
                Err(e) => {
                    warn!("Final transform degraded: {}", e);
                    Ok(transform.degraded(&e))
                }
            };
        }

        Err(DistillError::ReductionDepthExceeded {
            passes: self.max_passes,
        })
    }

    async fn global_context<T: Transform>(&self, text: &str, transform: &T) -> Option<String> {
        let prefix = char_prefix(text, self.context_chars);
        match transform.partial(prefix, None).await {
            Ok(output) => Some(stringify(&output)),
            Err(e) => {
                warn!("Global context unavailable, continuing without: {}", e);
                None
            }
        }
    }

    async fn map_chunks<T: Transform>(
        &self,
        chunks: &[Chunk<'_>],
        context: Option<&str>,
        transform: &T,
    ) -> Vec<String> {
        stream::iter(chunks.iter().enumerate())
            .map(|(idx, chunk)| {
                async move {
                    let output = match transform.partial(chunk.text, context).await {
                        Ok(output) => output,
                        Err(e) => {
                            warn!("Chunk {}: transform degraded: {}", idx + 1, e);
                            transform.degraded(&e)
                        }
                    };
                    debug!("Chunk {}: {} words in", idx + 1, chunk.words);
                    stringify(&output)
                }
                .boxed()
            })
            .buffered(self.concurrency)
            .collect::<Vec<_>>()
            .boxed()
            .await
    }
}

/// First `max_chars` characters of `text`, cut on a char boundary.
pub fn char_prefix(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte, _)) => &text[..byte],
        None => text,
    }
}

fn stringify<O: Serialize>(output: &O) -> String {
    serde_json::to_string(output).unwrap_or_default()
}
