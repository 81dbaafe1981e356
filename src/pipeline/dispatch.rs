//! Marker dispatch: decide which branch handles the recognized text.
//!
//! Students mark a page with a reserved upper-case token:
//!
//! | Token  | Mode  | Meaning                                         |
//! |--------|-------|-------------------------------------------------|
//! | `QTAR` | Solve | "solve this problem for me"                     |
//! | `CTAR` | Check | "problem before the token, my attempt after it" |
//!
//! Matching is case-sensitive and literal. When both tokens appear, SOLVE
//! wins because it is checked first.

use serde::{Deserialize, Serialize};

/// Token selecting SOLVE mode.
pub const SOLVE_TOKEN: &str = "QTAR";
/// Token selecting CHECK mode.
pub const CHECK_TOKEN: &str = "CTAR";

/// Mode tag without payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Marker {
    Solve,
    Check,
    None,
}

impl Marker {
    /// Suffix appended to the input file stem for this mode's report.
    pub fn artifact_suffix(&self) -> Option<&'static str> {
        match self {
            Marker::Solve => Some("solution"),
            Marker::Check => Some("feedback"),
            Marker::None => None,
        }
    }
}

/// Result of classifying extracted text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Dispatch {
    Solve {
        problem: String,
    },
    Check {
        problem: String,
        student_work: String,
    },
    NoMatch,
}

impl Dispatch {
    pub fn marker(&self) -> Marker {
        match self {
            Dispatch::Solve { .. } => Marker::Solve,
            Dispatch::Check { .. } => Marker::Check,
            Dispatch::NoMatch => Marker::None,
        }
    }
}

/// Classify `text` by its marker token.
pub fn classify(text: &str) -> Dispatch {
    if text.contains(SOLVE_TOKEN) {
        let problem = text.replacen(SOLVE_TOKEN, "", 1).trim().to_string();
        return Dispatch::Solve { problem };
    }

    if let Some((before, after)) = text.split_once(CHECK_TOKEN) {
        return Dispatch::Check {
            problem: before.trim().to_string(),
            student_work: after.trim().to_string(),
        };
    }

    Dispatch::NoMatch
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solve_marker_with_padding() {
        assert_eq!(
            classify("QTAR  2x + 3 = 7"),
            Dispatch::Solve {
                problem: "2x + 3 = 7".into()
            }
        );
    }

    #[test]
    fn check_marker_splits_problem_and_work() {
        assert_eq!(
            classify("x=1 CTAR I did x=1 by guessing"),
            Dispatch::Check {
                problem: "x=1".into(),
                student_work: "I did x=1 by guessing".into(),
            }
        );
    }

    #[test]
    fn no_marker_is_no_match() {
        assert_eq!(classify("hello world"), Dispatch::NoMatch);
        assert_eq!(classify(""), Dispatch::NoMatch);
    }

    #[test]
    fn markers_are_case_sensitive() {
        assert_eq!(classify("qtar 1+1"), Dispatch::NoMatch);
        assert_eq!(classify("Ctar 1+1"), Dispatch::NoMatch);
    }

    #[test]
    fn solve_wins_when_both_tokens_present() {
        let d = classify("CTAR a QTAR b");
        assert_eq!(
            d,
            Dispatch::Solve {
                problem: "CTAR a  b".into()
            }
        );
        assert_eq!(d.marker(), Marker::Solve);
    }

    #[test]
    fn only_first_solve_token_is_removed() {
        assert_eq!(
            classify("QTAR x QTAR"),
            Dispatch::Solve {
                problem: "x QTAR".into()
            }
        );
    }

    #[test]
    fn solve_problem_equals_first_removal_trimmed() {
        for input in ["QTAR", "  QTAR  ", "a QTAR b", "\nQTAR\n3x=9\n", "QTARQTAR"] {
            let expected = input.replacen(SOLVE_TOKEN, "", 1).trim().to_string();
            assert_eq!(classify(input), Dispatch::Solve { problem: expected }, "{input:?}");
        }
    }

    #[test]
    fn bare_tokens_yield_empty_fragments() {
        assert_eq!(classify("QTAR"), Dispatch::Solve { problem: String::new() });
        assert_eq!(
            classify("CTAR"),
            Dispatch::Check {
                problem: String::new(),
                student_work: String::new(),
            }
        );
    }

    #[test]
    fn check_splits_on_first_token_only() {
        assert_eq!(
            classify("p CTAR w1 CTAR w2"),
            Dispatch::Check {
                problem: "p".into(),
                student_work: "w1 CTAR w2".into(),
            }
        );
    }

    #[test]
    fn artifact_suffix_per_marker() {
        assert_eq!(Marker::Solve.artifact_suffix(), Some("solution"));
        assert_eq!(Marker::Check.artifact_suffix(), Some("feedback"));
        assert_eq!(Marker::None.artifact_suffix(), None);
    }
}
