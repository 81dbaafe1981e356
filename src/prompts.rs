//! Prompt templates for the completion and vision-OCR collaborators.
//!
//! Every instruction string the crate sends to a model lives here, so tests
//! can inspect prompts directly and a wording change touches one file.
//! The builders are total: empty fragments still yield the full template.

/// Instruction prefix for SOLVE mode. The problem text follows a blank line.
pub const SOLVE_INSTRUCTIONS: &str = "Solve the following math problem and provide \
step-by-step explanations in plain text. Do not use LaTeX, Markdown, or any other \
special math notation; write every step as ordinary sentences and equations.";

/// Instruction prefix for CHECK mode.
pub const CHECK_INSTRUCTIONS: &str = "A student attempted to solve the problem below. \
Analyze their work against the problem, identify every error, and explain how to \
correct each one. Answer in plain text without LaTeX or Markdown.";

/// System prompt for the vision-LLM OCR backend.
///
/// The marker tokens must survive transcription untouched, otherwise the
/// dispatcher never sees them.
pub const VISION_OCR_PROMPT: &str = r#"You are a meticulous OCR engine for handwritten mathematics.

Transcribe ALL text in the image exactly as written:
- Keep the reading order, one line of output per line of handwriting
- Write math with plain ASCII (x^2, sqrt(x), 3/4); never use LaTeX
- Copy upper-case control words such as QTAR or CTAR exactly where they appear
- Do NOT solve, correct, or comment on anything
- If the image contains no text, output nothing"#;

/// Build the SOLVE-mode prompt for `problem`.
pub fn build_solve_prompt(problem: &str) -> String {
    format!("{SOLVE_INSTRUCTIONS}\n\n{problem}")
}

/// Build the CHECK-mode prompt for `problem` and the student's attempt.
pub fn build_check_prompt(problem: &str, student_work: &str) -> String {
    format!(
        "{CHECK_INSTRUCTIONS}\n\nProblem:\n{problem}\n\nStudent's work:\n{student_work}"
    )
}
