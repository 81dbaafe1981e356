//! Progress-callback trait for pipeline stage events.
//!
//! Inject an [`Arc<dyn SolveProgressCallback>`] via
//! [`crate::config::SolverConfigBuilder::progress_callback`] to observe each
//! run as it moves through the controller's states:
//!
//! ```text
//! Idle ─▶ Extracting ─▶ Dispatching ─┬─▶ Solving  ─┐
//!                                    ├─▶ Checking ─┴─▶ Rendering ─▶ Done
//!                                    └─▶ NoMatch
//! ```
//!
//! Events are informational only; a callback can never alter control flow.
//!
//! # Example
//!
//! ```rust
//! use edgequake_mathsnap::{PipelineStage, SolveProgressCallback, SolverConfig};
//! use std::sync::Arc;
//!
//! struct PrintStages;
//!
//! impl SolveProgressCallback for PrintStages {
//!     fn on_stage(&self, source: &str, stage: PipelineStage) {
//!         eprintln!("{source}: {stage}");
//!     }
//! }
//!
//! let config = SolverConfig::builder()
//!     .progress_callback(Arc::new(PrintStages) as Arc<dyn SolveProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// States of one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Idle,
    Preprocessing,
    Extracting,
    Dispatching,
    Solving,
    Checking,
    NoMatch,
    Rendering,
    Done,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PipelineStage::Idle => "idle",
            PipelineStage::Preprocessing => "preprocessing",
            PipelineStage::Extracting => "extracting text",
            PipelineStage::Dispatching => "dispatching",
            PipelineStage::Solving => "solving",
            PipelineStage::Checking => "checking work",
            PipelineStage::NoMatch => "no marker found",
            PipelineStage::Rendering => "rendering report",
            PipelineStage::Done => "done",
        };
        f.write_str(s)
    }
}

/// Called by the pipeline controller as a run advances.
///
/// Implementations must be `Send + Sync`: batch runs drive several images
/// concurrently and may call into the same callback from different tasks.
/// All methods default to no-ops.
pub trait SolveProgressCallback: Send + Sync {
    /// Called once before the input is read.
    fn on_run_start(&self, source: &str) {
        let _ = source;
    }

    /// Called on every state transition.
    fn on_stage(&self, source: &str, stage: PipelineStage) {
        let _ = (source, stage);
    }

    /// Called when a run finishes without error.
    ///
    /// `artifact` is the written report path, or `None` for NoMatch and
    /// in-memory runs.
    fn on_run_complete(&self, source: &str, artifact: Option<&str>) {
        let _ = (source, artifact);
    }

    /// Called when a run aborts with an error.
    fn on_run_error(&self, source: &str, error: &str) {
        let _ = (source, error);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl SolveProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::SolverConfig`].
pub type ProgressCallback = Arc<dyn SolveProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        stages: Mutex<Vec<PipelineStage>>,
        errors: Mutex<Vec<String>>,
    }

    impl SolveProgressCallback for Recorder {
        fn on_stage(&self, _source: &str, stage: PipelineStage) {
            self.stages.lock().unwrap().push(stage);
        }

        fn on_run_error(&self, _source: &str, error: &str) {
            self.errors.lock().unwrap().push(error.to_string());
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_run_start("a.png");
        cb.on_stage("a.png", PipelineStage::Extracting);
        cb.on_run_complete("a.png", Some("a_solution.png"));
        cb.on_run_error("a.png", "boom");
    }

    #[test]
    fn recorder_receives_events_in_order() {
        let rec = Recorder::default();
        rec.on_stage("x", PipelineStage::Extracting);
        rec.on_stage("x", PipelineStage::Dispatching);
        rec.on_stage("x", PipelineStage::NoMatch);
        rec.on_run_error("x", "late failure");
        assert_eq!(
            *rec.stages.lock().unwrap(),
            vec![
                PipelineStage::Extracting,
                PipelineStage::Dispatching,
                PipelineStage::NoMatch
            ]
        );
        assert_eq!(rec.errors.lock().unwrap().len(), 1);
    }

    #[test]
    fn stage_display_is_human_readable() {
        assert_eq!(PipelineStage::Checking.to_string(), "checking work");
        assert_eq!(PipelineStage::Rendering.to_string(), "rendering report");
    }
}
