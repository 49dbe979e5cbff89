//! Pipeline runner that executes steps in sequence.

use std::sync::Arc;
use std::time::Instant;

use tracing::debug;

use super::context::{PipelineContext, ProgressFn};
use super::observer::{DecisionReason, PipelineObserver, StepDecision};
use super::step::PipelineStep;
use crate::errors::{PipelineError, PipelineResult};

/// Pipeline that runs a sequence of steps over one context.
///
/// Steps execute strictly in order, each receiving the context the
/// previous one produced. A step whose declared output already exists
/// is skipped (unless the context is forced) and hydrates the context
/// from the artifact instead. Preflight steps are hoisted to the front
/// and always execute.
pub struct Pipeline {
    /// Steps to execute.
    steps: Vec<Box<dyn PipelineStep>>,
    /// Lifecycle observers, notified in registration order.
    observers: Vec<Arc<dyn PipelineObserver>>,
}

impl Pipeline {
    /// Create a new empty pipeline.
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            observers: Vec::new(),
        }
    }

    /// Add a step to the pipeline.
    pub fn add_step<S: PipelineStep + 'static>(&mut self, step: S) -> &mut Self {
        self.steps.push(Box::new(step));
        self
    }

    /// Add a step (builder pattern).
    pub fn with_step<S: PipelineStep + 'static>(mut self, step: S) -> Self {
        self.add_step(step);
        self
    }

    /// Add pre-built boxed steps (builder pattern).
    pub fn with_steps(mut self, steps: Vec<Box<dyn PipelineStep>>) -> Self {
        self.steps.extend(steps);
        self
    }

    /// Register an observer.
    pub fn add_observer(&mut self, observer: Arc<dyn PipelineObserver>) -> &mut Self {
        self.observers.push(observer);
        self
    }

    /// Register an observer (builder pattern).
    pub fn with_observer(mut self, observer: Arc<dyn PipelineObserver>) -> Self {
        self.add_observer(observer);
        self
    }

    /// Run the pipeline, threading the context through every step.
    ///
    /// For each non-preflight step, the engine first evaluates the
    /// declared output path: if it exists and `ctx.force` is off, the
    /// step is skipped and its `hydrate` populates the context. An
    /// executing step gets a step-scoped progress reporter, an
    /// `on_step_start` notification before and `on_step_end` after.
    ///
    /// The first error aborts the remainder and propagates, but
    /// `on_pipeline_end` still fires with the last good context so
    /// observers can flush state.
    pub fn run(&self, ctx: PipelineContext) -> PipelineResult<PipelineContext> {
        let ordered = self.execution_order();
        let names: Vec<&str> = ordered.iter().map(|s| s.name()).collect();
        self.notify(|ob| ob.on_pipeline_start(&names, &ctx));

        let mut current = ctx;
        let outcome = self.run_steps(&ordered, &mut current);
        self.notify(|ob| ob.on_pipeline_end(&current));
        outcome.map(|()| current)
    }

    fn run_steps(
        &self,
        ordered: &[&dyn PipelineStep],
        ctx: &mut PipelineContext,
    ) -> PipelineResult<()> {
        let job_name = ctx.job_name();

        for step in ordered {
            let step_name = step.name();

            if !step.is_preflight() {
                if let Some(out) = step.output_path(ctx) {
                    if !ctx.force && out.exists() {
                        debug!("skipping '{}': {} already exists", step_name, out.display());
                        *ctx = step.hydrate(ctx.clone(), &out);
                        self.notify(|ob| ob.on_step_skipped(step_name, "already_done", ctx));
                        continue;
                    }
                }
            }

            *ctx = ctx
                .clone()
                .with_step_progress(Some(self.make_progress(step_name)));
            self.notify(|ob| ob.on_step_start(step_name, ctx));

            debug!("executing '{}'", step_name);
            let started = Instant::now();
            let next = step
                .run(ctx.clone())
                .map_err(|e| PipelineError::step_failed(&job_name, step_name, e))?;
            *ctx = next.with_timing(step_name, started.elapsed().as_secs_f64());

            self.notify(|ob| ob.on_step_end(step_name, ctx));
        }

        Ok(())
    }

    /// Mirror `run` without executing anything, reporting what each
    /// step would do for this context.
    pub fn dry_run(&self, ctx: &PipelineContext) -> Vec<StepDecision> {
        self.execution_order()
            .into_iter()
            .map(|step| {
                if step.is_preflight() {
                    return StepDecision {
                        name: step.name().to_string(),
                        would_run: true,
                        output_path: None,
                        reason: DecisionReason::NoDeclaredOutput,
                    };
                }

                match step.output_path(ctx) {
                    None => StepDecision {
                        name: step.name().to_string(),
                        would_run: true,
                        output_path: None,
                        reason: DecisionReason::NoDeclaredOutput,
                    },
                    Some(path) => {
                        let (would_run, reason) = if ctx.force {
                            (true, DecisionReason::Forced)
                        } else if path.exists() {
                            (false, DecisionReason::OutputExists)
                        } else {
                            (true, DecisionReason::OutputMissing)
                        };
                        StepDecision {
                            name: step.name().to_string(),
                            would_run,
                            output_path: Some(path),
                            reason,
                        }
                    }
                }
            })
            .collect()
    }

    /// Steps in the order `run` executes them: preflight first, then
    /// the rest, each group in list order.
    fn execution_order(&self) -> Vec<&dyn PipelineStep> {
        let mut ordered: Vec<&dyn PipelineStep> = Vec::with_capacity(self.steps.len());
        ordered.extend(
            self.steps
                .iter()
                .filter(|s| s.is_preflight())
                .map(|s| s.as_ref()),
        );
        ordered.extend(
            self.steps
                .iter()
                .filter(|s| !s.is_preflight())
                .map(|s| s.as_ref()),
        );
        ordered
    }

    fn notify<F: Fn(&dyn PipelineObserver)>(&self, action: F) {
        for ob in &self.observers {
            action(ob.as_ref());
        }
    }

    /// Build the progress reporter injected into the context for one
    /// step: a single call fans out to every observer.
    fn make_progress(&self, step_name: &str) -> ProgressFn {
        let observers = self.observers.clone();
        let name = step_name.to_string();
        Arc::new(move |done, total| {
            for ob in &observers {
                ob.on_step_progress(&name, done, total);
            }
        })
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}
