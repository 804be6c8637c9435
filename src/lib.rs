//! # docdistill
//!
//! Turn uploaded documents into summaries, exam questions and academic
//! answers with a Large Language Model.
//!
//! ## Why recursive reduction?
//!
//! A lecture pack or a textbook chapter rarely fits one prompt. The text is
//! split at sentence boundaries into chunks of at most `max_words` words,
//! each chunk is distilled on its own, and the partial results are combined
//! and distilled again until the combined text is small enough for one final
//! synthesis call. Every chunk prompt also carries a short prefix of the
//! document so later sections are read in context.
//!
//! ## Pipeline Overview
//!
//! ```text
//! upload (PDF / image)
//!  │
//!  ├─ 1. Input    stage the upload in a temp file, check type and magic
//!  ├─ 2. Extract  pdfium text layer, vision transcription for images
//!  │              and pages without text
//!  ├─ 3. Chunk    sentence-aligned chunks of ≤ max_words words
//!  ├─ 4. Reduce   concurrent chunk calls, combine, repeat, synthesise
//!  └─ 5. Output   typed summary / question / answer records
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use docdistill::{resolve_provider, DistillConfig, Distiller};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / GEMINI_API_KEY
//!     let (provider, label) = resolve_provider(None, None)?;
//!     let distiller = Distiller::from_provider(provider, label, DistillConfig::default());
//!
//!     let text = std::fs::read_to_string("lecture.txt")?;
//!     let summary = distiller.summarize(&text).await?;
//!     println!("{}", serde_json::to_string_pretty(&summary)?);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `docdistill-server` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when embedding the library or the router in another service:
//! ```toml
//! docdistill = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod distill;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod prompts;
pub mod server;
pub mod tasks;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{DistillConfig, DistillConfigBuilder, GenerationParams};
pub use distill::{resolve_provider, Distiller, DEFAULT_MODEL};
pub use error::{DistillError, ExtractionError, ModelError, TransformError};
pub use output::{Answer, AnswerRecord, Distilled, ExtractedDocument, Field, QuestionRecord, Summary};
pub use pipeline::chunk::{Chunk, Chunker};
pub use pipeline::llm::{ImageTranscriber, TextGenerator};
pub use pipeline::reduce::{RecursiveReducer, Transform};
pub use pipeline::segment::{RuleSegmenter, SentenceSegmenter};
pub use tasks::academic::{QuestionPaper, QuestionSpan};
