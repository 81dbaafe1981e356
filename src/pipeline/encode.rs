//! Image encoding: `DynamicImage` → PNG bytes, PNG bytes → base64 payloads.
//!
//! PNG everywhere: handwriting strokes and rendered report text are thin,
//! high-contrast edges that JPEG artefacts smear.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Losslessly encode `img` as PNG.
pub fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    Ok(buf)
}

/// Base64 text of `bytes`, as expected in JSON request bodies.
pub fn to_base64(bytes: &[u8]) -> String {
    let b64 = STANDARD.encode(bytes);
    debug!("Encoded image → {} bytes base64", b64.len());
    b64
}

/// Wrap encoded image bytes as a multimodal chat attachment.
///
/// `detail: "high"` keeps small handwriting legible for GPT-4-class models,
/// which otherwise downsample to a single 512 px tile.
pub fn to_image_data(bytes: &[u8], mime_type: &str) -> ImageData {
    ImageData::new(to_base64(bytes), mime_type).with_detail("high")
}

/// Best-effort MIME type of encoded image bytes; defaults to PNG.
pub fn sniff_mime(bytes: &[u8]) -> &'static str {
    match image::guess_format(bytes) {
        Ok(image::ImageFormat::Jpeg) => "image/jpeg",
        _ => "image/png",
    }
}
