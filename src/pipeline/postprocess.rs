//! Post-processing: turn a raw completion into report-ready [`GeneratedText`].
//!
//! Models asked for plain text still slip into LaTeX habits, wrapping answers
//! in `$…$` or `\boxed{…}`. The report is rendered with an ordinary text font,
//! so those delimiters would show up literally. SOLVE-mode output therefore
//! gets the markup stripped; CHECK-mode output quotes the student's own
//! notation and is left alone apart from whitespace cleanup.
//!
//! An absent or blank completion is never an error here: it becomes the
//! mode's fallback sentinel, tagged so callers can tell the difference.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Fallback shown when the model returns nothing in SOLVE mode.
pub const SOLUTION_FALLBACK: &str = "Solution unavailable.";
/// Fallback shown when the model returns nothing in CHECK mode.
pub const FEEDBACK_FALLBACK: &str = "No feedback available.";

/// Which explanation is being generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationMode {
    Solve,
    Check,
}

impl GenerationMode {
    pub fn fallback(&self) -> &'static str {
        match self {
            GenerationMode::Solve => SOLUTION_FALLBACK,
            GenerationMode::Check => FEEDBACK_FALLBACK,
        }
    }
}

/// Normalised completion: either real model text or the mode's fallback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum GeneratedText {
    Present(String),
    Fallback(String),
}

impl GeneratedText {
    pub fn as_str(&self) -> &str {
        match self {
            GeneratedText::Present(s) | GeneratedText::Fallback(s) => s,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, GeneratedText::Fallback(_))
    }
}

/// Normalise a raw completion for `mode`.
///
/// 1. Absent or whitespace-only → [`GeneratedText::Fallback`]
/// 2. Strip outer Markdown fences, normalise line endings, trim trailing
///    whitespace per line
/// 3. SOLVE only: [`strip_math_markup`]
/// 4. Anything left empty after cleanup also falls back
pub fn normalize_completion(raw: Option<&str>, mode: GenerationMode) -> GeneratedText {
    let Some(raw) = raw.filter(|s| !s.trim().is_empty()) else {
        return GeneratedText::Fallback(mode.fallback().to_string());
    };

    let s = strip_markdown_fences(raw);
    let s = normalise_line_endings(&s);
    let s = trim_trailing_whitespace(&s);
    let s = match mode {
        GenerationMode::Solve => strip_math_markup(&s),
        GenerationMode::Check => s,
    };

    let s = s.trim().to_string();
    if s.is_empty() {
        GeneratedText::Fallback(mode.fallback().to_string())
    } else {
        GeneratedText::Present(s)
    }
}

// ── Math markup ──────────────────────────────────────────────────────────────

static RE_DOLLARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$\$?").unwrap());

static RE_BOXED: Lazy<Regex> = Lazy::new(|| Regex::new(r"\\boxed\{([^}]*)\}").unwrap());

/// Remove `$`/`$$` delimiters and unwrap `\boxed{X}` to `X`.
///
/// The boxed rewrite is a global non-overlapping replace repeated until no
/// match remains, so `\boxed{\boxed{1}}` ends up as `1` and a second call is
/// always a no-op.
///
/// The boxed body stops at the first `}`, so nested braces are not balanced:
/// `\boxed{\frac{1}{2}}` becomes `\frac{1{2}}`.
pub fn strip_math_markup(input: &str) -> String {
    let mut s = RE_DOLLARS.replace_all(input, "").into_owned();
    while RE_BOXED.is_match(&s) {
        s = RE_BOXED.replace_all(&s, "$1").into_owned();
    }
    s
}

// ── Whitespace rules ─────────────────────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[a-zA-Z]*\n(.*)\n```\s*$").unwrap());

fn strip_markdown_fences(input: &str) -> String {
    if let Some(caps) = RE_OUTER_FENCES.captures(input.trim()) {
        caps[1].to_string()
    } else {
        input.to_string()
    }
}

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}
