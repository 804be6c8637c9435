//! Upload staging: classify an uploaded file and park it on disk.
//!
//! pdfium needs a file-system path, so every upload is written to a
//! [`NamedTempFile`]. The file is deleted when the [`StagedUpload`] is
//! dropped, on success, on error and on panic alike. PDF magic bytes
//! (`%PDF`) are checked before anything touches pdfium.

use crate::error::DistillError;
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

/// What kind of document an upload is, decided by its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Pdf,
    Image { mime_type: &'static str },
}

impl DocumentKind {
    /// Classify by file extension, case-insensitively.
    pub fn from_filename(filename: &str) -> Option<Self> {
        let (_, ext) = filename.rsplit_once('.')?;
        let kind = match ext.to_ascii_lowercase().as_str() {
            "pdf" => DocumentKind::Pdf,
            "jpg" | "jpeg" => DocumentKind::Image { mime_type: "image/jpeg" },
            "png" => DocumentKind::Image { mime_type: "image/png" },
            "gif" => DocumentKind::Image { mime_type: "image/gif" },
            "bmp" => DocumentKind::Image { mime_type: "image/bmp" },
            "webp" => DocumentKind::Image { mime_type: "image/webp" },
            _ => return None,
        };
        Some(kind)
    }

    pub fn is_pdf(self) -> bool {
        matches!(self, DocumentKind::Pdf)
    }
}

/// An uploaded file written to a temporary location.
#[derive(Debug)]
pub struct StagedUpload {
    file: NamedTempFile,
    kind: DocumentKind,
    filename: String,
}

impl StagedUpload {
    /// Validate `bytes` against the declared `filename` and write them to a
    /// temp file that lives as long as the returned value.
    pub fn stage(filename: &str, bytes: &[u8]) -> Result<Self, DistillError> {
        Self::stage_in(&std::env::temp_dir(), filename, bytes)
    }

    /// [`stage`](Self::stage) into `dir` instead of the system temp directory.
    pub fn stage_in(dir: &Path, filename: &str, bytes: &[u8]) -> Result<Self, DistillError> {
        let kind = DocumentKind::from_filename(filename).ok_or_else(|| {
            DistillError::UnsupportedFileType {
                filename: filename.to_string(),
            }
        })?;

        if bytes.is_empty() {
            return Err(DistillError::EmptyUpload {
                filename: filename.to_string(),
            });
        }

        if kind.is_pdf() && !bytes.starts_with(b"%PDF") {
            let mut magic = [0u8; 4];
            let n = bytes.len().min(4);
            magic[..n].copy_from_slice(&bytes[..n]);
            return Err(DistillError::NotAPdf {
                filename: filename.to_string(),
                magic,
            });
        }

        let staging = |source| DistillError::Staging {
            filename: filename.to_string(),
            source,
        };
        let suffix = filename
            .rsplit_once('.')
            .map(|(_, ext)| format!(".{}", ext.to_ascii_lowercase()))
            .unwrap_or_default();
        let mut file = tempfile::Builder::new()
            .prefix("docdistill-")
            .suffix(&suffix)
            .tempfile_in(dir)
            .map_err(staging)?;
        file.write_all(bytes).map_err(staging)?;
        file.flush().map_err(staging)?;

        debug!(
            "Staged upload '{}' ({} bytes) at {}",
            filename,
            bytes.len(),
            file.path().display()
        );
        Ok(Self {
            file,
            kind,
            filename: filename.to_string(),
        })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_extensions() {
        assert_eq!(DocumentKind::from_filename("notes.PDF"), Some(DocumentKind::Pdf));
        assert_eq!(
            DocumentKind::from_filename("scan.Jpeg"),
            Some(DocumentKind::Image { mime_type: "image/jpeg" })
        );
        assert_eq!(
            DocumentKind::from_filename("paper.webp"),
            Some(DocumentKind::Image { mime_type: "image/webp" })
        );
        assert_eq!(DocumentKind::from_filename("essay.docx"), None);
        assert_eq!(DocumentKind::from_filename("README"), None);
    }

    #[test]
    fn rejects_unsupported_and_empty() {
        let err = StagedUpload::stage("slides.pptx", b"data").unwrap_err();
        assert!(matches!(err, DistillError::UnsupportedFileType { .. }));

        let err = StagedUpload::stage("scan.png", b"").unwrap_err();
        assert!(matches!(err, DistillError::EmptyUpload { .. }));
    }

    #[test]
    fn rejects_pdf_without_magic() {
        let err = StagedUpload::stage("fake.pdf", b"PK\x03\x04zip").unwrap_err();
        match err {
            DistillError::NotAPdf { magic, .. } => assert_eq!(&magic, b"PK\x03\x04"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn temp_file_removed_on_drop() {
        let staged = StagedUpload::stage("doc.pdf", b"%PDF-1.7\n%%EOF").unwrap();
        let path = staged.path().to_path_buf();
        assert!(path.exists());
        assert!(path.to_string_lossy().ends_with(".pdf"));
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.7\n%%EOF");
        assert!(staged.kind().is_pdf());
        drop(staged);
        assert!(!path.exists());
    }

    #[test]
    fn stages_into_given_directory() {
        let dir = tempfile::tempdir().unwrap();
        let staged = StagedUpload::stage_in(dir.path(), "scan.PNG", b"\x89PNG").unwrap();
        assert_eq!(staged.path().parent(), Some(dir.path()));
        assert!(staged.path().to_string_lossy().ends_with(".png"));

        let err = StagedUpload::stage_in(dir.path(), "empty.pdf", b"").unwrap_err();
        assert!(matches!(err, DistillError::EmptyUpload { .. }));
        drop(staged);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
