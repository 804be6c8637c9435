//! Error types for the docdistill library.
//!
//! Failures fall into two layers:
//!
//! * [`DistillError`] is **fatal**: the request cannot produce a result at
//!   all (unsupported upload, unreadable PDF, backend outage, runaway
//!   reduction). Returned as `Err(DistillError)` from [`crate::Distiller`]
//!   and mapped to an HTTP status by the server.
//!
//! * [`TransformError`] is **non-fatal**: a single chunk or question failed
//!   (empty generation, unparseable model output). The pipeline replaces the
//!   item with the `{"error": ...}` sentinel and keeps going.
//!
//! [`ModelError`] and [`ExtractionError`] are the leaf errors of the model
//! invoker and the structured-output extractor; both fold into
//! [`TransformError`].

use std::path::PathBuf;
use thiserror::Error;

/// Message carried by [`ExtractionError::NoJson`] and surfaced to clients
/// inside the `{"error": ...}` sentinel.
pub const NO_JSON_MESSAGE: &str = "Could not extract valid JSON from response";

/// All fatal errors returned by the docdistill library.
#[derive(Debug, Error)]
pub enum DistillError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Upload had a filename but no bytes.
    #[error("Uploaded file '{filename}' is empty")]
    EmptyUpload { filename: String },

    /// File extension is not one of the accepted document or image types.
    #[error("Unsupported file type '{filename}'. Accepted: .pdf, .jpg, .jpeg, .png, .gif, .bmp, .webp")]
    UnsupportedFileType { filename: String },

    /// The endpoint only accepts PDFs but got something else.
    #[error("Only PDF files are supported by this endpoint, got '{filename}'")]
    PdfRequired { filename: String },

    /// The upload claims to be a PDF but lacks the `%PDF` header.
    #[error("File is not a valid PDF: '{filename}'\nFirst bytes: {magic:?}")]
    NotAPdf { filename: String, magic: [u8; 4] },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// Encrypted PDFs are not accepted; there is no way to pass a password.
    #[error("PDF '{path}' is encrypted and cannot be read")]
    PasswordProtected { path: PathBuf },

    /// pdfium-render returned an error while rasterising a page for OCR.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    /// Extraction finished but produced no usable text.
    #[error("No text could be extracted from the document")]
    EmptyDocument,

    // ── Model errors ──────────────────────────────────────────────────────
    /// The text generator could not be reached or timed out.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// Reduction kept producing combined text above the target size.
    #[error("Reduction did not converge after {passes} passes")]
    ReductionDepthExceeded { passes: usize },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not write the upload to a temporary file.
    #[error("Failed to stage upload '{filename}': {source}")]
    Staging {
        filename: String,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium (file or directory) or install pdfium system-wide."
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DistillError {
    /// `true` when the error was caused by what the client sent, so the
    /// server answers 400 instead of 500.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::EmptyUpload { .. }
                | Self::UnsupportedFileType { .. }
                | Self::PdfRequired { .. }
                | Self::NotAPdf { .. }
                | Self::CorruptPdf { .. }
                | Self::PasswordProtected { .. }
                | Self::EmptyDocument
        )
    }
}

/// Errors from a single text-generation call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ModelError {
    /// The backend answered, but only with whitespace, on every attempt.
    #[error("Model returned an empty response after {attempts} attempts")]
    EmptyGeneration { attempts: u32 },

    /// Transport or API failure reported by the backend.
    #[error("Model backend '{backend}' unavailable: {detail}")]
    Unavailable { backend: String, detail: String },

    /// No response within the configured deadline.
    #[error("Model call timed out after {secs}s")]
    Timeout { secs: u64 },
}

impl ModelError {
    /// Outages that retrying the same request will not fix.
    pub fn is_outage(&self) -> bool {
        matches!(self, Self::Unavailable { .. } | Self::Timeout { .. })
    }
}

/// The model answered but no JSON value of the expected shape was found.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("Could not extract valid JSON from response")]
    NoJson,
}

/// A non-fatal failure for one chunk, question or page.
#[derive(Debug, Clone, Error)]
pub enum TransformError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),
}

impl TransformError {
    /// `true` when the failure is a backend outage rather than a bad answer.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Model(e) if e.is_outage())
    }

    /// Convert into the request-level error. Only meaningful for
    /// [`is_fatal`](Self::is_fatal) errors.
    pub fn into_fatal(self) -> DistillError {
        match self {
            Self::Model(e) => DistillError::Model(e),
            Self::Extraction(e) => DistillError::Internal(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_json_message_matches_constant() {
        assert_eq!(ExtractionError::NoJson.to_string(), NO_JSON_MESSAGE);
    }

    #[test]
    fn empty_generation_display() {
        let e = ModelError::EmptyGeneration { attempts: 3 };
        assert!(e.to_string().contains("3 attempts"), "got: {e}");
    }

    #[test]
    fn unavailable_display_names_backend() {
        let e = ModelError::Unavailable {
            backend: "openai/gpt-4.1-nano".into(),
            detail: "connection refused".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("openai/gpt-4.1-nano"));
        assert!(msg.contains("connection refused"));
    }

    #[test]
    fn outage_classification() {
        assert!(ModelError::Timeout { secs: 5 }.is_outage());
        assert!(!ModelError::EmptyGeneration { attempts: 3 }.is_outage());

        let empty: TransformError = ModelError::EmptyGeneration { attempts: 3 }.into();
        assert!(!empty.is_fatal());
        let parse: TransformError = ExtractionError::NoJson.into();
        assert!(!parse.is_fatal());
        let down: TransformError = ModelError::Timeout { secs: 1 }.into();
        assert!(down.is_fatal());
        assert!(matches!(down.into_fatal(), DistillError::Model(ModelError::Timeout { secs: 1 })));
    }

    #[test]
    fn input_errors_are_client_errors() {
        assert!(DistillError::EmptyDocument.is_input_error());
        assert!(DistillError::UnsupportedFileType { filename: "a.docx".into() }.is_input_error());
        assert!(!DistillError::ReductionDepthExceeded { passes: 10 }.is_input_error());
        assert!(!DistillError::Model(ModelError::Timeout { secs: 1 }).is_input_error());
    }

    #[test]
    fn depth_exceeded_display() {
        let e = DistillError::ReductionDepthExceeded { passes: 10 };
        assert!(e.to_string().contains("10 passes"));
    }
}
