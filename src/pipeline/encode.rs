//! Image encoding: pixels or uploaded bytes → base64 `ImageData`.
//!
//! Rendered PDF pages are re-encoded as PNG so text edges stay crisp.
//! Uploaded images are passed through untouched with their own MIME type.
//! `detail: "high"` asks GPT-4-class models to use the full tile budget;
//! without it small print on scanned question papers is lost.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Encode a rasterised page as a base64 PNG ready for the vision model.
pub fn encode_page(img: &DynamicImage) -> Result<ImageData, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;

    let b64 = STANDARD.encode(&buf);
    debug!("Encoded page image → {} bytes base64", b64.len());

    Ok(ImageData::new(b64, "image/png").with_detail("high"))
}

/// Wrap an uploaded image file without decoding it.
pub fn encode_upload(bytes: &[u8], mime_type: &'static str) -> ImageData {
    let b64 = STANDARD.encode(bytes);
    debug!("Encoded {} upload → {} bytes base64", mime_type, b64.len());
    ImageData::new(b64, mime_type).with_detail("high")
}
