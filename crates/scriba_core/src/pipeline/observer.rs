//! Pipeline lifecycle observation and dry-run decisions.

use std::path::PathBuf;

use super::context::PipelineContext;

/// Observer notified at pipeline lifecycle points.
///
/// All methods default to no-ops so implementors override only what
/// they care about. Observers must not fail: the engine calls them as
/// plain methods with no error channel.
pub trait PipelineObserver: Send + Sync {
    /// The pipeline is about to run the named steps, in order.
    fn on_pipeline_start(&self, _step_names: &[&str], _ctx: &PipelineContext) {}

    /// A step is about to execute.
    fn on_step_start(&self, _name: &str, _ctx: &PipelineContext) {}

    /// A step finished; `ctx` is the context it produced.
    fn on_step_end(&self, _name: &str, _ctx: &PipelineContext) {}

    /// A step was skipped (`reason` is `"already_done"` for existing
    /// outputs).
    fn on_step_skipped(&self, _name: &str, _reason: &str, _ctx: &PipelineContext) {}

    /// Progress within a step: `done` of `total` units.
    fn on_step_progress(&self, _name: &str, _done: u64, _total: u64) {}

    /// The pipeline finished. Fires even when a step failed, with the
    /// last good context, so observers can flush state.
    fn on_pipeline_end(&self, _ctx: &PipelineContext) {}
}

/// Why a dry run decided a step would or would not run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionReason {
    /// Declared output already exists; the step would be skipped.
    OutputExists,
    /// Declared output is missing; the step would run.
    OutputMissing,
    /// Force flag set; the step would run regardless.
    Forced,
    /// No declared output; the step always runs.
    NoDeclaredOutput,
}

impl DecisionReason {
    /// Stable string form used in reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionReason::OutputExists => "exists",
            DecisionReason::OutputMissing => "not_exists",
            DecisionReason::Forced => "force",
            DecisionReason::NoDeclaredOutput => "no_declared_output",
        }
    }
}

impl std::fmt::Display for DecisionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of a dry-run report.
#[derive(Debug, Clone)]
pub struct StepDecision {
    /// Step name.
    pub name: String,
    /// Whether a real run would execute this step.
    pub would_run: bool,
    /// The step's declared output for this context, if any.
    pub output_path: Option<PathBuf>,
    /// Why the decision came out this way.
    pub reason: DecisionReason,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reason_strings_are_stable() {
        assert_eq!(DecisionReason::OutputExists.as_str(), "exists");
        assert_eq!(DecisionReason::OutputMissing.as_str(), "not_exists");
        assert_eq!(DecisionReason::Forced.as_str(), "force");
        assert_eq!(
            DecisionReason::NoDeclaredOutput.as_str(),
            "no_declared_output"
        );
    }

    #[test]
    fn default_observer_methods_are_no_ops() {
        struct Silent;
        impl PipelineObserver for Silent {}

        let ob = Silent;
        let ctx = PipelineContext::new("/a/b.mp3");
        ob.on_pipeline_start(&["x"], &ctx);
        ob.on_step_progress("x", 1, 2);
        ob.on_pipeline_end(&ctx);
    }
}
