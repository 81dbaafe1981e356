//! Pipeline stages for photo-to-report solving.
//!
//! Each submodule implements exactly one step. The pure stages (dispatch,
//! postprocess, layout) have no I/O and are tested in isolation; the
//! collaborator stages (ocr, llm) sit behind traits so the controller in
//! [`crate::solve`] can run against stubs.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ preprocess ──▶ ocr ──▶ dispatch ──▶ llm ──▶ postprocess ──▶ layout ──▶ raster ──▶ output
//! (path/URL)  (resize,     (text)   (QTAR/     (plain   (fallback,     (wrap,     (ab_glyph  (atomic
//!              gray,                 CTAR)      text)    strip $)       height)    → PNG)     write)
//!              sharpen)
//! ```
//!
//! 1. [`input`]      — read a local file or download a URL; PNG/JPEG only
//! 2. [`preprocess`] — optional resize/grayscale/sharpen in `spawn_blocking`
//! 3. [`ocr`]        — Google Vision or vision-LLM text extraction
//! 4. [`dispatch`]   — marker token classification
//! 5. [`llm`]        — completion with retry/backoff and timeout
//! 6. [`postprocess`] — completion cleanup and fallback sentinels
//! 7. [`layout`]     — word wrap and canvas sizing into a draw plan
//! 8. [`raster`]     — execute the draw plan with real fonts
//! 9. [`encode`]     — PNG and base64 encoding helpers
//! 10. [`output`]    — artifact path derivation and atomic writes

pub mod dispatch;
pub mod encode;
pub mod input;
pub mod layout;
pub mod llm;
pub mod ocr;
pub mod output;
pub mod postprocess;
pub mod preprocess;
pub mod raster;
