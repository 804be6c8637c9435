//! Pipeline stages for document distillation.
//!
//! Each submodule implements one step and is testable on its own.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ postprocess ──▶ segment/chunk ──▶ reduce ──▶ structured
//! (upload)  (pdfium)   (cleanup)       (sentences)       (LLM)      (JSON)
//!              │
//!              └──▶ encode ──▶ llm (vision transcription for pages without text)
//! ```
//!
//! 1. [`input`]: stage the upload in a temp file, classify it, check the PDF magic
//! 2. [`render`]: read the text layer and rasterise blank pages; runs in
//!    `spawn_blocking` because pdfium is not async-safe
//! 3. [`encode`]: PNG-encode and base64-wrap images for the vision request
//! 4. [`postprocess`]: normalise extracted and transcribed text
//! 5. [`segment`] / [`chunk`]: sentence boundaries and word-budget chunks
//! 6. [`llm`]: model calls with timeout and empty-answer retries
//! 7. [`reduce`]: the recursive chunk → combine → synthesise loop
//! 8. [`structured`]: pull JSON out of free-form model output

pub mod chunk;
pub mod encode;
pub mod input;
pub mod llm;
pub mod postprocess;
pub mod reduce;
pub mod render;
pub mod segment;
pub mod structured;
