//! Pipeline step trait definition.
//!
//! All pipeline steps implement this trait, providing a consistent
//! interface for execution and skip-if-exists resume.

use std::path::{Path, PathBuf};

use super::context::PipelineContext;
use crate::errors::StepResult;

/// Trait for pipeline steps.
///
/// A step declares WHERE its output would land for a given context,
/// separately from the work itself. Before executing, the engine
/// evaluates `output_path`: if the path exists and the context's force
/// flag is off, the step is skipped and `hydrate` populates the context
/// from the existing artifact instead.
///
/// # Example
///
/// ```ignore
/// struct SrtStep;
///
/// impl PipelineStep for SrtStep {
///     fn name(&self) -> &str { "srt" }
///
///     fn output_path(&self, ctx: &PipelineContext) -> Option<PathBuf> {
///         Some(ctx.artifact_path("_timestamps.srt"))
///     }
///
///     fn hydrate(&self, ctx: PipelineContext, artifact: &Path) -> PipelineContext {
///         ctx.with_srt(artifact.to_path_buf())
///     }
///
///     fn run(&self, ctx: PipelineContext) -> StepResult<PipelineContext> {
///         // Read the word JSON, group, write the SRT...
///         Ok(ctx.with_srt(srt_path))
///     }
/// }
/// ```
pub trait PipelineStep: Send + Sync {
    /// Get the step name (for logging, skip reports, and timing keys).
    fn name(&self) -> &str;

    /// Execute the step's work, returning the updated context.
    ///
    /// Use `ctx.report_progress()` for coarse progress. Errors propagate
    /// to the engine unmodified; the engine neither retries nor swallows
    /// them.
    fn run(&self, ctx: PipelineContext) -> StepResult<PipelineContext>;

    /// Where this step's output artifact would land for `ctx`.
    ///
    /// Returning a path opts the step into skip-if-exists resume. The
    /// default `None` means the step always runs.
    fn output_path(&self, _ctx: &PipelineContext) -> Option<PathBuf> {
        None
    }

    /// Populate the context from an existing artifact when the step is
    /// skipped. Default: context unchanged.
    fn hydrate(&self, ctx: PipelineContext, _artifact: &Path) -> PipelineContext {
        ctx
    }

    /// Preflight steps run before everything else, in list order, and
    /// are never skip-evaluated (the cache check).
    fn is_preflight(&self) -> bool {
        false
    }

    /// Human-readable description of what this step does.
    fn description(&self) -> &str {
        self.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockStep {
        name: &'static str,
        output: Option<PathBuf>,
    }

    impl PipelineStep for MockStep {
        fn name(&self) -> &str {
            self.name
        }

        fn run(&self, ctx: PipelineContext) -> StepResult<PipelineContext> {
            Ok(ctx)
        }

        fn output_path(&self, _ctx: &PipelineContext) -> Option<PathBuf> {
            self.output.clone()
        }
    }

    #[test]
    fn step_trait_object_works() {
        let step: Box<dyn PipelineStep> = Box::new(MockStep {
            name: "test_step",
            output: None,
        });

        assert_eq!(step.name(), "test_step");
        assert_eq!(step.description(), "test_step");
        assert!(!step.is_preflight());
    }

    #[test]
    fn default_hydrate_returns_context_unchanged() {
        let step = MockStep {
            name: "s",
            output: Some(PathBuf::from("/out.srt")),
        };

        let ctx = PipelineContext::new("/a/b.mp3");
        let hydrated = step.hydrate(ctx, Path::new("/out.srt"));
        assert_eq!(hydrated.srt, None);
    }

    #[test]
    fn default_output_path_is_none() {
        let step = MockStep {
            name: "s",
            output: None,
        };
        let ctx = PipelineContext::new("/a/b.mp3");
        assert_eq!(step.output_path(&ctx), None);
    }
}
