//! PDF access via pdfium: per-page text and page rasterisation.
//!
//! ## Why spawn_blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which uses
//! thread-local state internally and is not safe to call from async contexts.
//! Every entry point here moves the work onto tokio's blocking pool.
//!
//! Pages that have no text layer (scans, photographed handouts) come back
//! blank from [`extract_text`]; [`render_pages`] rasterises them so the
//! vision model can read them instead.

use crate::error::DistillError;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Text layer of one page. `number` is 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    pub number: usize,
    pub text: String,
}

impl PageText {
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Bind to pdfium.
///
/// `library` may name the shared library itself or the directory holding
/// it; without it the system library search path is used.
pub fn bind_pdfium(library: Option<&Path>) -> Result<Pdfium, DistillError> {
    let bindings = match library {
        Some(dir) if dir.is_dir() => {
            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(&dir.to_path_buf()))
        }
        Some(file) => Pdfium::bind_to_library(file.to_path_buf()),
        None => Pdfium::bind_to_system_library(),
    }
    .map_err(|e| DistillError::PdfiumBindingFailed(format!("{:?}", e)))?;
    Ok(Pdfium::new(bindings))
}

/// Read the text layer of every page.
pub async fn extract_text(
    pdf_path: &Path,
    library: Option<&Path>,
) -> Result<Vec<PageText>, DistillError> {
    let path = pdf_path.to_path_buf();
    let library = library.map(Path::to_path_buf);

    tokio::task::spawn_blocking(move || extract_text_blocking(&path, library.as_deref()))
        .await
        .map_err(|e| DistillError::Internal(format!("Text extraction task panicked: {}", e)))?
}

fn extract_text_blocking(
    pdf_path: &Path,
    library: Option<&Path>,
) -> Result<Vec<PageText>, DistillError> {
    let pdfium = bind_pdfium(library)?;
    let document = pdfium
        .load_pdf_from_file(pdf_path, None)
        .map_err(|e| open_error(pdf_path, e))?;

    let pages = document.pages();
    info!("PDF loaded: {} pages", pages.len());

    let mut results = Vec::with_capacity(pages.len() as usize);
    for (idx, page) in pages.iter().enumerate() {
        let text = match page.text() {
            Ok(text) => text.all(),
            Err(e) => {
                warn!("Page {}: no text layer ({:?})", idx + 1, e);
                String::new()
            }
        };
        debug!("Page {}: {} chars of text", idx + 1, text.len());
        results.push(PageText {
            number: idx + 1,
            text,
        });
    }

    Ok(results)
}

/// Rasterise selected pages (0-based indices) for OCR.
///
/// # Returns
/// A vector of `(page_index_0based, DynamicImage)` tuples.
pub async fn render_pages(
    pdf_path: &Path,
    library: Option<&Path>,
    max_pixels: u32,
    page_indices: &[usize],
) -> Result<Vec<(usize, DynamicImage)>, DistillError> {
    let path = pdf_path.to_path_buf();
    let library: Option<PathBuf> = library.map(Path::to_path_buf);
    let indices = page_indices.to_vec();

    tokio::task::spawn_blocking(move || {
        render_pages_blocking(&path, library.as_deref(), max_pixels, &indices)
    })
    .await
    .map_err(|e| DistillError::Internal(format!("Render task panicked: {}", e)))?
}

fn render_pages_blocking(
    pdf_path: &Path,
    library: Option<&Path>,
    max_pixels: u32,
    page_indices: &[usize],
) -> Result<Vec<(usize, DynamicImage)>, DistillError> {
    let pdfium = bind_pdfium(library)?;
    let document = pdfium
        .load_pdf_from_file(pdf_path, None)
        .map_err(|e| open_error(pdf_path, e))?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;

    let render_config = PdfRenderConfig::new()
        .set_target_width(max_pixels as i32)
        .set_maximum_height(max_pixels as i32);

    let mut results = Vec::with_capacity(page_indices.len());

    for &idx in page_indices {
        if idx >= total_pages {
            warn!(
                "Skipping page {} (out of range, total={})",
                idx + 1,
                total_pages
            );
            continue;
        }

        let page = pages
            .get(idx as u16)
            .map_err(|e| DistillError::RasterisationFailed {
                page: idx + 1,
                detail: format!("{:?}", e),
            })?;

        let bitmap = page.render_with_config(&render_config).map_err(|e| {
            DistillError::RasterisationFailed {
                page: idx + 1,
                detail: format!("{:?}", e),
            }
        })?;

        let image = bitmap.as_image();
        debug!(
            "Rendered page {} → {}x{} px",
            idx + 1,
            image.width(),
            image.height()
        );

        results.push((idx, image));
    }

    Ok(results)
}

fn open_error(pdf_path: &Path, e: PdfiumError) -> DistillError {
    let detail = format!("{:?}", e);
    if detail.contains("Password") || detail.contains("password") {
        DistillError::PasswordProtected {
            path: pdf_path.to_path_buf(),
        }
    } else {
        DistillError::CorruptPdf {
            path: pdf_path.to_path_buf(),
            detail,
        }
    }
}
