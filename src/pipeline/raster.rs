//! Raster backend: execute a [`LayoutPlan`] onto an RGB canvas.
//!
//! Text is drawn with `imageproc::drawing::draw_text_mut` using `ab_glyph`
//! fonts. The same [`FontSet`] doubles as the [`TextMeasure`] the layout
//! engine wraps against, so wrap decisions and drawn widths always agree.
//!
//! Font sizes in [`TextStyle::px`] are em sizes (as in CSS `18px Arial`);
//! ab_glyph scales by ascent-to-descent height, so each size is converted
//! through the face's `units_per_em`.

use crate::error::MathSnapError;
use crate::pipeline::encode;
use crate::pipeline::layout::{self, DrawCommand, LayoutPlan, Report, TextMeasure, TextStyle};
use crate::config::LayoutStrategy;
use ab_glyph::{Font, FontVec, PxScale, ScaleFont};
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const TEXT_COLOR: Rgb<u8> = Rgb([0, 0, 0]);

const REGULAR_FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

const BOLD_FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/TTF/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf",
    "/usr/share/fonts/liberation/LiberationSans-Bold.ttf",
    "/System/Library/Fonts/Supplemental/Arial Bold.ttf",
    "/Library/Fonts/Arial Bold.ttf",
    "C:\\Windows\\Fonts\\arialbd.ttf",
];

/// Regular and (optional) bold faces used for one report.
pub struct FontSet {
    regular: FontVec,
    bold: Option<FontVec>,
}

impl FontSet {
    /// Build from raw TTF/OTF bytes.
    pub fn from_bytes(regular: Vec<u8>, bold: Option<Vec<u8>>) -> Result<Self, MathSnapError> {
        let regular = FontVec::try_from_vec(regular)
            .map_err(|e| MathSnapError::render(format!("invalid regular font: {e}")))?;
        let bold = bold
            .map(FontVec::try_from_vec)
            .transpose()
            .map_err(|e| MathSnapError::render(format!("invalid bold font: {e}")))?;
        Ok(Self { regular, bold })
    }

    /// Load fonts from explicit paths, falling back to well-known system
    /// locations for whichever face was not given.
    pub fn load(regular: Option<&Path>, bold: Option<&Path>) -> Result<Self, MathSnapError> {
        let regular_bytes = match regular {
            Some(p) => read_font(p)?,
            None => first_readable(REGULAR_FONT_CANDIDATES).ok_or_else(|| {
                MathSnapError::FontUnavailable {
                    tried: REGULAR_FONT_CANDIDATES.join(", "),
                }
            })?,
        };
        let bold_bytes = match bold {
            Some(p) => Some(read_font(p)?),
            None => first_readable(BOLD_FONT_CANDIDATES),
        };
        if bold_bytes.is_none() {
            debug!("No bold face found; titles use the regular face");
        }
        Self::from_bytes(regular_bytes, bold_bytes)
    }

    /// Load system fonts only, or `None` when none are installed.
    pub fn system() -> Option<Self> {
        Self::load(None, None).ok()
    }

    fn face(&self, style: TextStyle) -> &FontVec {
        match (&self.bold, style.is_bold()) {
            (Some(bold), true) => bold,
            _ => &self.regular,
        }
    }

    fn scale(&self, style: TextStyle) -> PxScale {
        let font = self.face(style);
        let em = style.px();
        match font.units_per_em() {
            Some(upem) if upem > 0.0 => PxScale::from(em * font.height_unscaled() / upem),
            _ => PxScale::from(em),
        }
    }
}

impl TextMeasure for FontSet {
    fn text_width(&self, text: &str, style: TextStyle) -> f32 {
        let scaled = self.face(style).as_scaled(self.scale(style));
        let mut width = 0.0;
        let mut prev = None;
        for ch in text.chars() {
            let id = scaled.glyph_id(ch);
            if let Some(p) = prev {
                width += scaled.kern(p, id);
            }
            width += scaled.h_advance(id);
            prev = Some(id);
        }
        width
    }
}

fn read_font(path: &Path) -> Result<Vec<u8>, MathSnapError> {
    std::fs::read(path).map_err(|e| MathSnapError::FontUnavailable {
        tried: format!("{} ({e})", path.display()),
    })
}

fn first_readable(candidates: &[&str]) -> Option<Vec<u8>> {
    candidates.iter().find_map(|p| {
        let bytes = std::fs::read(PathBuf::from(p)).ok()?;
        info!("Loaded system font: {}", p);
        Some(bytes)
    })
}

/// Paint every command of `plan` onto a fresh canvas.
pub fn rasterize(plan: &LayoutPlan, fonts: &FontSet) -> RgbImage {
    let mut img = RgbImage::new(plan.width, plan.height);

    for cmd in &plan.commands {
        match cmd {
            DrawCommand::Fill { rgb } => {
                let rect = Rect::at(0, 0).of_size(plan.width, plan.height);
                draw_filled_rect_mut(&mut img, rect, Rgb(*rgb));
            }
            DrawCommand::Text {
                x,
                baseline_y,
                style,
                text,
            } => {
                let font = fonts.face(*style);
                let scale = fonts.scale(*style);
                let ascent = font.as_scaled(scale).ascent().round() as i32;
                draw_text_mut(&mut img, TEXT_COLOR, *x, baseline_y - ascent, scale, font, text);
            }
        }
    }

    img
}

/// A laid-out, rasterised and PNG-encoded report.
#[derive(Debug, Clone)]
pub struct RenderedReport {
    pub width: u32,
    pub height: u32,
    pub wrapped_lines: usize,
    pub clipped: bool,
    pub png: Vec<u8>,
}

/// Lay out, rasterise and PNG-encode `report`.
///
/// CPU-bound; call from `spawn_blocking` in async contexts.
pub fn render_report(
    report: &Report,
    fonts: &FontSet,
    strategy: LayoutStrategy,
) -> Result<RenderedReport, MathSnapError> {
    let plan = layout::compile(report, fonts, strategy);
    let canvas = rasterize(&plan, fonts);
    let png = encode::encode_png(&DynamicImage::ImageRgb8(canvas))
        .map_err(|e| MathSnapError::render(format!("PNG encoding failed: {e}")))?;

    debug!(
        "Rendered report {}x{} px → {} bytes PNG",
        plan.width,
        plan.height,
        png.len()
    );

    Ok(RenderedReport {
        width: plan.width,
        height: plan.height,
        wrapped_lines: plan.wrapped_lines,
        clipped: plan.is_clipped(),
        png,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::layout::{CANVAS_WIDTH, MIN_HEIGHT};

    macro_rules! fonts_or_skip {
        () => {
            match FontSet::system() {
                Some(f) => f,
                None => {
                    println!("SKIP — no system font installed");
                    return;
                }
            }
        };
    }

    #[test]
    fn garbage_font_bytes_are_render_errors() {
        let err = FontSet::from_bytes(vec![0, 1, 2, 3], None).err().unwrap();
        assert!(matches!(err, MathSnapError::Render { .. }));
    }

    #[test]
    fn missing_font_path_is_font_unavailable() {
        let err = FontSet::load(Some(Path::new("/definitely/not/here.ttf")), None)
            .err()
            .unwrap();
        assert!(matches!(err, MathSnapError::FontUnavailable { .. }));
    }

    #[test]
    fn measured_width_grows_with_text() {
        let fonts = fonts_or_skip!();
        let short = fonts.text_width("x = 2", TextStyle::Body);
        let long = fonts.text_width("x = 2 because 2x = 4", TextStyle::Body);
        assert!(short > 0.0);
        assert!(long > short);
    }

    #[test]
    fn rendered_report_is_800_wide_png() {
        let fonts = fonts_or_skip!();
        let report = Report::solution("2x + 3 = 7", "Subtract 3 from both sides.\nx = 2");
        let out = render_report(&report, &fonts, LayoutStrategy::WrapAware).unwrap();
        assert_eq!(out.width, CANVAS_WIDTH);
        assert_eq!(out.height, MIN_HEIGHT);
        assert_eq!(&out.png[..8], b"\x89PNG\r\n\x1a\n");

        let decoded = image::load_from_memory(&out.png).unwrap();
        assert_eq!(decoded.width(), CANVAS_WIDTH);
        assert_eq!(decoded.height(), MIN_HEIGHT);
    }

    #[test]
    fn text_pixels_are_drawn_below_heading_baseline_region() {
        let fonts = fonts_or_skip!();
        let plan = layout::compile(
            &Report::solution("1 + 1", "2"),
            &fonts,
            LayoutStrategy::WrapAware,
        );
        let img = rasterize(&plan, &fonts);
        let dark = img
            .enumerate_pixels()
            .filter(|(_, y, p)| *y < 60 && p.0[0] < 128)
            .count();
        assert!(dark > 0, "heading should leave ink near the top");
        assert_eq!(img.get_pixel(799, 599).0, [255, 255, 255]);
    }

    #[test]
    fn rendering_is_deterministic() {
        let fonts = fonts_or_skip!();
        let report = Report::feedback("x=1", "guess", "Show your steps.");
        let a = render_report(&report, &fonts, LayoutStrategy::WrapAware).unwrap();
        let b = render_report(&report, &fonts, LayoutStrategy::WrapAware).unwrap();
        assert_eq!(a.png, b.png);
    }
}
