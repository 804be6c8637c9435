//! Exam question generation.
//!
//! The document is chunked once; every chunk asks the model for up to
//! `max_questions` question records. When the document is longer than one
//! chunk, the first two chunks are shared as context so later chunks know
//! what the document is about. Results are flattened and de-duplicated.

use crate::config::GenerationParams;
use crate::error::{DistillError, TransformError};
use crate::output::QuestionRecord;
use crate::pipeline::chunk::{word_count, Chunker};
use crate::pipeline::llm::ModelInvoker;
use crate::pipeline::structured::extract_array;
use crate::prompts;
use crate::tasks::settle;
use futures::stream::{self, StreamExt};
use futures::FutureExt;
use std::collections::HashSet;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct QuestionGenerator {
    invoker: ModelInvoker,
    chunker: Chunker,
    params: GenerationParams,
    concurrency: usize,
}

impl QuestionGenerator {
    pub fn new(invoker: ModelInvoker, chunker: Chunker, params: GenerationParams, concurrency: usize) -> Self {
        Self {
            invoker,
            chunker,
            params,
            concurrency: concurrency.max(1),
        }
    }

    pub async fn generate(
        &self,
        text: &str,
        max_words: usize,
        max_questions: usize,
    ) -> Result<Vec<QuestionRecord>, DistillError> {
        if text.trim().is_empty() {
            return Err(DistillError::EmptyDocument);
        }
        let max_words = max_words.max(1);
        let max_questions = max_questions.max(1);

        let chunks = self.chunker.chunk(text, max_words);
        let context = (word_count(text) > max_words).then(|| {
            chunks
                .iter()
                .take(2)
                .map(|c| c.text)
                .collect::<Vec<_>>()
                .join(" ")
        });
        info!(
            "Generating up to {} questions for each of {} chunks",
            max_questions,
            chunks.len()
        );

        let context = context.as_deref();
        let results: Vec<Result<Vec<QuestionRecord>, TransformError>> = stream::iter(chunks.iter().enumerate())
            .map(|(idx, chunk)| {
                async move {
                    let result = self.for_chunk(chunk.text, context, max_questions).await;
                    if let Ok(records) = &result {
                        debug!("Chunk {}: {} questions", idx + 1, records.len());
                    }
                    result
                }
                .boxed()
            })
            .buffered(self.concurrency)
            .collect::<Vec<_>>()
            .boxed()
            .await;

        let batches = settle(results, |_| Vec::new())?;
        Ok(dedup_questions(batches.into_iter().flatten()))
    }

    async fn for_chunk(
        &self,
        text: &str,
        context: Option<&str>,
        max_questions: usize,
    ) -> Result<Vec<QuestionRecord>, TransformError> {
        let prompt = prompts::exam_questions(text, context, max_questions);
        let raw = self.invoker.invoke(&prompt, &self.params).await?;
        let items = extract_array(&raw)?;
        Ok(items
            .iter()
            .filter_map(QuestionRecord::from_value)
            .take(max_questions)
            .collect())
    }
}

/// Drop repeated questions, comparing trimmed lower-cased text. The first
/// occurrence wins and order is kept.
pub fn dedup_questions(questions: impl IntoIterator<Item = QuestionRecord>) -> Vec<QuestionRecord> {
    let mut seen = HashSet::new();
    questions
        .into_iter()
        .filter(|q| seen.insert(q.dedup_key()))
        .collect()
}
