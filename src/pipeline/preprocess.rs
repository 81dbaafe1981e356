//! Image filter collaborator: resize, grayscale and sharpen before OCR.
//!
//! Phone photos of notebooks are large, colour-cast and slightly soft.
//! Normalising width to ~1200 px keeps upload size predictable, grayscale
//! drops paper tint, and an unsharp mask crisps pencil strokes. Decoding and
//! filtering are CPU-bound, so the async entry point moves them onto the
//! blocking pool.

use crate::config::PreprocessOptions;
use crate::error::MathSnapError;
use crate::pipeline::encode;
use image::imageops::FilterType;
use image::DynamicImage;
use tracing::debug;

/// Unsharp-mask blur sigma.
const SHARPEN_SIGMA: f32 = 1.0;
/// Unsharp-mask threshold: differences below this are left alone.
const SHARPEN_THRESHOLD: i32 = 2;

/// Apply `options` to encoded image bytes and return PNG bytes.
pub async fn filter_image(
    bytes: Vec<u8>,
    options: PreprocessOptions,
) -> Result<Vec<u8>, MathSnapError> {
    tokio::task::spawn_blocking(move || filter_image_blocking(&bytes, &options))
        .await
        .map_err(|e| MathSnapError::Internal(format!("Preprocess task panicked: {}", e)))?
}

/// Blocking implementation of [`filter_image`].
pub fn filter_image_blocking(
    bytes: &[u8],
    options: &PreprocessOptions,
) -> Result<Vec<u8>, MathSnapError> {
    let img = image::load_from_memory(bytes).map_err(|e| MathSnapError::InvalidImage {
        source_name: "input".into(),
        detail: e.to_string(),
    })?;

    let img = apply(img, options);
    debug!("Preprocessed image → {}x{} px", img.width(), img.height());

    encode::encode_png(&img).map_err(|e| MathSnapError::InvalidImage {
        source_name: "preprocessed".into(),
        detail: e.to_string(),
    })
}

fn apply(img: DynamicImage, options: &PreprocessOptions) -> DynamicImage {
    let img = if img.width() != options.target_width && img.width() > 0 {
        let ratio = options.target_width as f64 / img.width() as f64;
        let height = ((img.height() as f64 * ratio).round() as u32).max(1);
        img.resize_exact(options.target_width, height, FilterType::Lanczos3)
    } else {
        img
    };

    let img = if options.grayscale {
        DynamicImage::ImageLuma8(img.to_luma8())
    } else {
        img
    };

    if options.sharpen {
        img.unsharpen(SHARPEN_SIGMA, SHARPEN_THRESHOLD)
    } else {
        img
    }
}
