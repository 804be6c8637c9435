//! Request handlers.
//!
//! Every upload endpoint reads the multipart `file` field, stages it in a
//! temporary file that lives for the duration of the request, extracts the
//! document text and then runs one task over it.

use std::collections::BTreeMap;

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::QueryRejection,
        Multipart, Query, State,
    },
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::error::{Result, ServerError};
use super::state::AppState;
use crate::error::DistillError;
use crate::output::{AnswerRecord, Distilled, QuestionRecord, Summary};
use crate::pipeline::input::StagedUpload;
use crate::tasks::academic::QuestionPaper;

/// Name of the multipart field carrying the document.
pub const FILE_FIELD: &str = "file";

#[derive(Debug, Serialize)]
pub struct SummarizeResponse {
    /// Cleaned text per page, keyed by 1-based page number.
    pub text: BTreeMap<usize, String>,
    pub summary: Distilled<Summary>,
}

#[derive(Debug, Serialize)]
pub struct QuestionsResponse {
    pub questions: Vec<QuestionRecord>,
}

#[derive(Debug, Serialize)]
pub struct Solutions {
    pub solutions: Vec<AnswerRecord>,
}

#[derive(Debug, Serialize)]
pub struct AcademicResponse {
    pub extracted_text: String,
    pub preprocessed_text: QuestionPaper,
    pub answer: Solutions,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Query string of `/generate-questions`. Absent values fall back to the
/// distiller configuration.
#[derive(Debug, Default, Deserialize)]
pub struct QuestionParams {
    pub max_questions: Option<usize>,
    pub max_words: Option<usize>,
}

// ── Handlers ─────────────────────────────────────────────────────────────

/// `POST /extract-text` and `POST /summarize`.
pub async fn summarize_handler(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<SummarizeResponse>> {
    let upload = read_upload(&state, multipart).await?;
    require_pdf(&upload)?;

    let document = state.distiller.extract_document(&upload).await?;
    let summary = state.distiller.summarize(&document.text).await?;

    Ok(Json(SummarizeResponse {
        text: document.pages,
        summary,
    }))
}

/// `POST /generate-questions`.
pub async fn generate_questions_handler(
    State(state): State<AppState>,
    query: std::result::Result<Query<QuestionParams>, QueryRejection>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<QuestionsResponse>> {
    let Query(params) = query.map_err(|e| ServerError::BadRequest(e.body_text()))?;
    let defaults = state.distiller.config();
    let max_questions = params.max_questions.unwrap_or(defaults.max_questions);
    let max_words = params.max_words.unwrap_or(defaults.max_words);
    if max_questions == 0 || max_words == 0 {
        return Err(ServerError::BadRequest(
            "max_questions and max_words must be at least 1".to_string(),
        ));
    }

    let upload = read_upload(&state, multipart).await?;
    require_pdf(&upload)?;

    let document = state.distiller.extract_document(&upload).await?;
    let questions = state
        .distiller
        .generate_questions(&document.text, max_words, max_questions)
        .await?;

    Ok(Json(QuestionsResponse { questions }))
}

/// `POST /academic-assistant`. Accepts PDFs and images.
pub async fn academic_assistant_handler(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<AcademicResponse>> {
    let upload = read_upload(&state, multipart).await?;

    let document = state.distiller.extract_document(&upload).await?;
    let paper = QuestionPaper::parse(&document.text);
    info!("Question paper has {} questions", paper.questions.len());
    let solutions = state.distiller.answer_paper(&paper).await?;

    Ok(Json(AcademicResponse {
        extracted_text: document.text,
        preprocessed_text: paper,
        answer: Solutions { solutions },
    }))
}

/// `GET /test`.
pub async fn test_handler() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "Hello, World!".to_string(),
    })
}

/// `GET /health`.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ── Upload helpers ───────────────────────────────────────────────────────

/// Find the `file` field and stage it on disk.
async fn read_upload(
    state: &AppState,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<StagedUpload> {
    let mut multipart = multipart.map_err(|e| ServerError::BadRequest(e.body_text()))?;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        if filename.trim().is_empty() {
            return Err(ServerError::BadRequest("No file selected".to_string()));
        }

        let bytes = field.bytes().await.map_err(multipart_error)?;
        debug!("Received '{}' ({} bytes)", filename, bytes.len());

        let dir = state
            .config
            .upload_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir);
        let upload =
            tokio::task::spawn_blocking(move || StagedUpload::stage_in(&dir, &filename, &bytes))
                .await
                .map_err(|e| ServerError::Internal(format!("staging task failed: {e}")))??;
        return Ok(upload);
    }

    Err(ServerError::BadRequest("No file provided".to_string()))
}

fn multipart_error(e: MultipartError) -> ServerError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ServerError::PayloadTooLarge("Uploaded file exceeds the size limit".to_string())
    } else {
        ServerError::BadRequest(e.body_text())
    }
}

fn require_pdf(upload: &StagedUpload) -> std::result::Result<(), DistillError> {
    if upload.kind().is_pdf() {
        Ok(())
    } else {
        Err(DistillError::PdfRequired {
            filename: upload.filename().to_string(),
        })
    }
}
