//! Report layout: word-wrap titled sections into a fixed-width column and
//! compile them into a list of draw commands.
//!
//! This module knows nothing about pixels or fonts beyond the [`TextMeasure`]
//! trait. It produces a [`LayoutPlan`], a declarative description of the
//! canvas that [`crate::pipeline::raster`] turns into an image. Swapping the
//! raster backend, or measuring with a fixed-advance stub in tests, never
//! touches the wrap and sizing logic.
//!
//! ## Geometry
//!
//! ```text
//!  x=50                                         x=750
//!   │ Heading (bold 24)                  y = 50   │
//!   │                                             │
//!   │ Title (bold 20)                    y = 100  │
//!   │ body line (18)                     y += 30  │
//!   │ body line                          y += 30  │
//!   │                                    gap 20   │
//!   │ Title                                       │
//!   │ …                                           │
//!   └──────────── width 800, content 700 ─────────┘
//! ```
//!
//! All y values are text baselines.

use crate::config::LayoutStrategy;
use tracing::{debug, warn};

/// Fixed canvas width in pixels.
pub const CANVAS_WIDTH: u32 = 800;
/// Left margin; the right margin is the same.
pub const MARGIN_X: i32 = 50;
/// Wrap boundary: canvas width minus both margins.
pub const CONTENT_WIDTH: f32 = (CANVAS_WIDTH as i32 - 2 * MARGIN_X) as f32;
/// Baseline of the report heading.
pub const HEADING_Y: i32 = 50;
/// Baseline of the first section title.
pub const FIRST_SECTION_Y: i32 = 100;
/// Vertical advance per title or body line.
pub const LINE_HEIGHT: i32 = 30;
/// Extra space between the end of one section and the next title.
pub const SECTION_GAP: i32 = 20;
/// Space kept below the last line in wrap-aware sizing.
pub const BOTTOM_MARGIN: i32 = 50;
/// Canvas height never drops below this.
pub const MIN_HEIGHT: u32 = 600;
/// Fixed allowance for heading and titles in pre-measured sizing.
pub const PRE_MEASURED_BASE: u32 = 200;

/// Canvas background colour.
pub const BACKGROUND: [u8; 3] = [255, 255, 255];

/// Typographic role of a run of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextStyle {
    Heading,
    SectionTitle,
    Body,
}

impl TextStyle {
    /// Nominal font size in pixels.
    pub fn px(&self) -> f32 {
        match self {
            TextStyle::Heading => 24.0,
            TextStyle::SectionTitle => 20.0,
            TextStyle::Body => 18.0,
        }
    }

    pub fn is_bold(&self) -> bool {
        !matches!(self, TextStyle::Body)
    }
}

/// Anything that can report the rendered width of a string.
pub trait TextMeasure {
    fn text_width(&self, text: &str, style: TextStyle) -> f32;
}

/// A titled block of body text. Body may contain `\n`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub title: String,
    pub body: String,
}

impl Section {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }
}

pub const SOLUTION_HEADING: &str = "Math Equation Solution";
pub const FEEDBACK_HEADING: &str = "Math Work Evaluation";

/// Heading plus ordered sections. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    heading: String,
    sections: Vec<Section>,
}

impl Report {
    pub fn new(heading: impl Into<String>, sections: Vec<Section>) -> Self {
        Self {
            heading: heading.into(),
            sections,
        }
    }

    /// SOLVE-mode report: the equation and its worked solution.
    pub fn solution(problem: &str, solution: &str) -> Self {
        Self::new(
            SOLUTION_HEADING,
            vec![
                Section::new("Equation:", problem),
                Section::new("Solution:", solution),
            ],
        )
    }

    /// CHECK-mode report: problem, the student's attempt, and feedback.
    pub fn feedback(problem: &str, student_work: &str, feedback: &str) -> Self {
        Self::new(
            FEEDBACK_HEADING,
            vec![
                Section::new("Problem Given:", problem),
                Section::new("Student's Work:", student_work),
                Section::new("Feedback & Corrections:", feedback),
            ],
        )
    }

    pub fn heading(&self) -> &str {
        &self.heading
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }
}

// ── Word wrap ────────────────────────────────────────────────────────────────

/// Greedy-wrap one logical line (no `\n`) to `max_width`.
///
/// Always returns at least one line; an empty or all-whitespace input yields
/// a single empty line so blank lines keep their vertical space. A word wider
/// than `max_width` is never split and ends up alone on its line.
pub fn wrap_line<M: TextMeasure + ?Sized>(
    line: &str,
    measure: &M,
    style: TextStyle,
    max_width: f32,
) -> Vec<String> {
    let mut out = Vec::new();
    let mut acc = String::new();

    for word in line.split_whitespace() {
        let candidate = format!("{acc}{word} ");
        // The trailing space is never drawn, so it does not count against the width.
        if measure.text_width(candidate.trim_end(), style) > max_width && !acc.is_empty() {
            out.push(acc.trim_end().to_string());
            acc = format!("{word} ");
        } else {
            acc = candidate;
        }
    }

    out.push(acc.trim_end().to_string());
    out
}

/// Wrap every embedded line of `body` independently.
pub fn wrap_text<M: TextMeasure + ?Sized>(
    body: &str,
    measure: &M,
    style: TextStyle,
    max_width: f32,
) -> Vec<String> {
    body.split('\n')
        .flat_map(|line| wrap_line(line, measure, style, max_width))
        .collect()
}

/// Number of lines in `body` counting only embedded breaks.
pub fn raw_line_count(body: &str) -> usize {
    body.split('\n').count()
}

// ── Sizing ───────────────────────────────────────────────────────────────────

/// Height from raw line counts: `max(600, 200 + lines × 30)`.
pub fn pre_measured_height(raw_body_lines: usize) -> u32 {
    let estimated = PRE_MEASURED_BASE as usize + raw_body_lines * LINE_HEIGHT as usize;
    (estimated as u32).max(MIN_HEIGHT)
}

/// Cursor position after the last body line of the last section.
pub fn terminal_cursor(section_count: usize, wrapped_body_lines: usize) -> i32 {
    let sections = section_count as i32;
    let gaps = (sections - 1).max(0);
    FIRST_SECTION_Y
        + sections * LINE_HEIGHT
        + wrapped_body_lines as i32 * LINE_HEIGHT
        + gaps * SECTION_GAP
}

/// Height from the terminal cursor: `max(600, cursor + 50)`.
pub fn wrap_aware_height(terminal_y: i32) -> u32 {
    ((terminal_y + BOTTOM_MARGIN).max(0) as u32).max(MIN_HEIGHT)
}

// ── Draw commands ────────────────────────────────────────────────────────────

/// One drawing instruction for the raster backend.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    /// Paint the whole canvas.
    Fill { rgb: [u8; 3] },
    /// Draw `text` with its baseline at `baseline_y`.
    Text {
        x: i32,
        baseline_y: i32,
        style: TextStyle,
        text: String,
    },
}

/// Canvas size plus the ordered commands that paint it.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutPlan {
    pub width: u32,
    pub height: u32,
    pub commands: Vec<DrawCommand>,
    /// Body lines after wrapping, across all sections.
    pub wrapped_lines: usize,
    /// Cursor after the last line; greater than `height` means clipping.
    pub content_bottom: i32,
}

impl LayoutPlan {
    /// True when some content falls below the canvas (pre-measured sizing only).
    pub fn is_clipped(&self) -> bool {
        self.content_bottom > self.height as i32
    }

    /// Text commands only, in draw order.
    pub fn texts(&self) -> impl Iterator<Item = (i32, TextStyle, &str)> + '_ {
        self.commands.iter().filter_map(|c| match c {
            DrawCommand::Text {
                baseline_y,
                style,
                text,
                ..
            } => Some((*baseline_y, *style, text.as_str())),
            DrawCommand::Fill { .. } => None,
        })
    }
}

/// Compile `report` into a [`LayoutPlan`].
///
/// Every section body is wrapped first; the canvas height is fixed only once
/// all wrapped line counts are known, then commands are emitted from those
/// same breaks.
pub fn compile<M: TextMeasure + ?Sized>(
    report: &Report,
    measure: &M,
    strategy: LayoutStrategy,
) -> LayoutPlan {
    let wrapped: Vec<Vec<String>> = report
        .sections()
        .iter()
        .map(|s| wrap_text(&s.body, measure, TextStyle::Body, CONTENT_WIDTH))
        .collect();

    let wrapped_lines: usize = wrapped.iter().map(Vec::len).sum();
    let raw_lines: usize = report
        .sections()
        .iter()
        .map(|s| raw_line_count(&s.body))
        .sum();

    let mut commands = Vec::with_capacity(2 + report.sections().len() + wrapped_lines);
    commands.push(DrawCommand::Fill { rgb: BACKGROUND });
    commands.push(DrawCommand::Text {
        x: MARGIN_X,
        baseline_y: HEADING_Y,
        style: TextStyle::Heading,
        text: report.heading().to_string(),
    });

    let mut y = FIRST_SECTION_Y;
    for (i, (section, lines)) in report.sections().iter().zip(&wrapped).enumerate() {
        if i > 0 {
            y += SECTION_GAP;
        }
        commands.push(DrawCommand::Text {
            x: MARGIN_X,
            baseline_y: y,
            style: TextStyle::SectionTitle,
            text: section.title.clone(),
        });
        y += LINE_HEIGHT;

        for line in lines {
            if !line.is_empty() {
                commands.push(DrawCommand::Text {
                    x: MARGIN_X,
                    baseline_y: y,
                    style: TextStyle::Body,
                    text: line.clone(),
                });
            }
            y += LINE_HEIGHT;
        }
    }

    debug_assert_eq!(y, terminal_cursor(report.sections().len(), wrapped_lines));

    let height = match strategy {
        LayoutStrategy::WrapAware => wrap_aware_height(y),
        LayoutStrategy::PreMeasured => {
            if wrapped_lines > raw_lines {
                warn!(
                    "Pre-measured sizing counted {} lines but wrapping produced {}; \
                     the report may be clipped",
                    raw_lines, wrapped_lines
                );
            }
            pre_measured_height(raw_lines)
        }
    };

    debug!(
        "Layout: {} sections, {} wrapped lines, {}x{} px",
        report.sections().len(),
        wrapped_lines,
        CANVAS_WIDTH,
        height
    );

    LayoutPlan {
        width: CANVAS_WIDTH,
        height,
        commands,
        wrapped_lines,
        content_bottom: y,
    }
}
