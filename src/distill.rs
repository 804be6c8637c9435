//! The [`Distiller`]: one immutable handle over the whole pipeline.
//!
//! Built once at startup and shared behind an `Arc`. Every method takes
//! `&self`; per-request state lives on the stack.

use crate::config::DistillConfig;
use crate::error::DistillError;
use crate::output::{AnswerRecord, Distilled, ExtractedDocument, QuestionRecord, Summary};
use crate::pipeline::chunk::Chunker;
use crate::pipeline::encode;
use crate::pipeline::input::{DocumentKind, StagedUpload};
use crate::pipeline::llm::{ImageTranscriber, ModelInvoker, ProviderGenerator, TextGenerator};
use crate::pipeline::postprocess::{clean_page_text, clean_transcription};
use crate::pipeline::reduce::RecursiveReducer;
use crate::pipeline::render::{self, PageText};
use crate::pipeline::segment::SentenceSegmenter;
use crate::tasks::academic::{AcademicAssistant, QuestionPaper};
use crate::tasks::questions::QuestionGenerator;
use crate::tasks::summary::SummaryTransform;
use edgequake_llm::{LLMProvider, ProviderFactory};
use futures::stream::{self, StreamExt};
use futures::FutureExt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Default model when a provider is named without one.
pub const DEFAULT_MODEL: &str = "gpt-4.1-mini";

#[derive(Debug, Clone)]
pub struct Distiller {
    config: DistillConfig,
    invoker: ModelInvoker,
    chunker: Chunker,
    pdfium_library: Option<PathBuf>,
}

impl Distiller {
    /// Text-only distiller. Image uploads and scanned pages need
    /// [`with_transcriber`](Self::with_transcriber).
    pub fn new(generator: Arc<dyn TextGenerator>, config: DistillConfig) -> Self {
        let invoker = ModelInvoker::new(generator, &config);
        Self {
            config,
            invoker,
            chunker: Chunker::default(),
            pdfium_library: None,
        }
    }

    /// Use one `edgequake_llm` provider for both text and vision calls.
    pub fn from_provider(provider: Arc<dyn LLMProvider>, label: impl Into<String>, config: DistillConfig) -> Self {
        let backend = Arc::new(ProviderGenerator::new(provider, label));
        Self::new(backend.clone(), config).with_transcriber(backend)
    }

    pub fn with_transcriber(mut self, transcriber: Arc<dyn ImageTranscriber>) -> Self {
        self.invoker = self.invoker.with_transcriber(transcriber);
        self
    }

    pub fn with_segmenter(mut self, segmenter: Arc<dyn SentenceSegmenter>) -> Self {
        self.chunker = Chunker::new(segmenter);
        self
    }

    /// Path to libpdfium (file or directory). Defaults to the system search path.
    pub fn with_pdfium_library(mut self, path: impl Into<PathBuf>) -> Self {
        self.pdfium_library = Some(path.into());
        self
    }

    pub fn config(&self) -> &DistillConfig {
        &self.config
    }

    // ── Text operations ──────────────────────────────────────────────────

    /// Summarise `text` with the configured `max_words`.
    pub async fn summarize(&self, text: &str) -> Result<Distilled<Summary>, DistillError> {
        self.summarize_with(text, self.config.max_words).await
    }

    pub async fn summarize_with(&self, text: &str, max_words: usize) -> Result<Distilled<Summary>, DistillError> {
        let start = Instant::now();
        let reducer = RecursiveReducer::new(self.chunker.clone(), &self.config);
        let transform = SummaryTransform::new(self.invoker.clone(), self.config.summary_params);
        let summary = reducer.reduce(text, max_words, &transform).await?;
        info!("Summary ready in {}ms", start.elapsed().as_millis());
        Ok(summary)
    }

    pub async fn generate_questions(
        &self,
        text: &str,
        max_words: usize,
        max_questions: usize,
    ) -> Result<Vec<QuestionRecord>, DistillError> {
        let generator = QuestionGenerator::new(
            self.invoker.clone(),
            self.chunker.clone(),
            self.config.question_params,
            self.config.concurrency,
        );
        let questions = generator.generate(text, max_words, max_questions).await?;
        info!("{} distinct questions generated", questions.len());
        Ok(questions)
    }

    pub async fn answer_paper(&self, paper: &QuestionPaper) -> Result<Vec<AnswerRecord>, DistillError> {
        AcademicAssistant::new(
            self.invoker.clone(),
            self.config.answer_params,
            self.config.concurrency,
        )
        .answer_all(paper)
        .await
    }

    // ── Document extraction ──────────────────────────────────────────────

    /// Pull the text out of a staged upload.
    ///
    /// PDFs are read through their text layer; pages without one are
    /// transcribed by the vision model when OCR fallback is enabled. Images
    /// are always transcribed. A document with no text at all is an
    /// [`DistillError::EmptyDocument`].
    pub async fn extract_document(&self, upload: &StagedUpload) -> Result<ExtractedDocument, DistillError> {
        let start = Instant::now();
        let document = match upload.kind() {
            DocumentKind::Pdf => self.extract_pdf(upload).await?,
            DocumentKind::Image { mime_type } => self.extract_image(upload, mime_type).await?,
        };

        if document.is_blank() {
            return Err(DistillError::EmptyDocument);
        }
        info!(
            "Extracted {} pages from '{}' in {}ms",
            document.pages.len(),
            upload.filename(),
            start.elapsed().as_millis()
        );
        Ok(document)
    }

    async fn extract_pdf(&self, upload: &StagedUpload) -> Result<ExtractedDocument, DistillError> {
        let mut pages = render::extract_text(upload.path(), self.pdfium_library.as_deref()).await?;
        for page in &mut pages {
            page.text = clean_page_text(&page.text);
        }

        let blank: Vec<usize> = pages
            .iter()
            .filter(|p| p.is_blank())
            .map(|p| p.number - 1)
            .collect();
        if !blank.is_empty() {
            if self.config.ocr_fallback && self.invoker.can_transcribe() {
                self.transcribe_pages(upload, &blank, &mut pages).await;
            } else {
                debug!("{} pages without a text layer left blank", blank.len());
            }
        }

        Ok(ExtractedDocument::from_pages(
            pages.into_iter().map(|p| (p.number, p.text)),
        ))
    }

    /// Fill blank pages in place with vision transcriptions. Failures leave
    /// the page blank.
    async fn transcribe_pages(&self, upload: &StagedUpload, indices: &[usize], pages: &mut [PageText]) {
        info!("OCR fallback for {} pages without a text layer", indices.len());
        let rendered = match render::render_pages(
            upload.path(),
            self.pdfium_library.as_deref(),
            self.config.max_rendered_pixels,
            indices,
        )
        .await
        {
            Ok(rendered) => rendered,
            Err(e) => {
                warn!("OCR fallback skipped: {}", e);
                return;
            }
        };

        let params = self.config.transcription_params;
        let transcripts: Vec<(usize, Option<String>)> = stream::iter(rendered)
            .map(|(idx, image)| {
                async move {
                    let image = match encode::encode_page(&image) {
                        Ok(data) => data,
                        Err(e) => {
                            warn!("Page {}: image encoding failed: {}", idx + 1, e);
                            return (idx, None);
                        }
                    };
                    match self.invoker.transcribe(&image, &params).await {
                        Ok(text) => (idx, Some(clean_transcription(&text))),
                        Err(e) => {
                            warn!("Page {}: transcription failed: {}", idx + 1, e);
                            (idx, None)
                        }
                    }
                }
                .boxed()
            })
            .buffer_unordered(self.config.concurrency)
            .collect::<Vec<_>>()
            .boxed()
            .await;

        for (idx, text) in transcripts {
            if let (Some(page), Some(text)) = (pages.get_mut(idx), text) {
                page.text = text;
            }
        }
    }

    async fn extract_image(&self, upload: &StagedUpload, mime_type: &'static str) -> Result<ExtractedDocument, DistillError> {
        let bytes = tokio::fs::read(upload.path())
            .await
            .map_err(|source| DistillError::Staging {
                filename: upload.filename().to_string(),
                source,
            })?;
        let image = encode::encode_upload(&bytes, mime_type);
        let text = self
            .invoker
            .transcribe(&image, &self.config.transcription_params)
            .await?;
        Ok(ExtractedDocument::from_pages([(1, clean_transcription(&text))]))
    }
}

// ── Provider resolution ──────────────────────────────────────────────────

fn create_provider(provider_name: &str, model: &str) -> Result<(Arc<dyn LLMProvider>, String), DistillError> {
    let provider = ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        DistillError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })?;
    Ok((provider, format!("{provider_name}/{model}")))
}

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// 1. **Named provider + model**: explicit arguments (CLI flags).
/// 2. **Environment pair** (`EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`):
///    both set means the deployment chose a provider and model.
/// 3. **OpenAI key present**: prefer OpenAI when `OPENAI_API_KEY` is set.
/// 4. **Full auto-detection** (`ProviderFactory::from_env`).
///
/// Returns the provider and a `provider/model` label for logs.
pub fn resolve_provider(
    provider_name: Option<&str>,
    model: Option<&str>,
) -> Result<(Arc<dyn LLMProvider>, String), DistillError> {
    if let Some(name) = provider_name {
        return create_provider(name, model.unwrap_or(DEFAULT_MODEL));
    }

    if let (Ok(prov), Ok(env_model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !env_model.is_empty() {
            return create_provider(&prov, model.unwrap_or(&env_model));
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            return create_provider("openai", model.unwrap_or(DEFAULT_MODEL));
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| DistillError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok((llm_provider, "auto".to_string()))
}
