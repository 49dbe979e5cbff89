//! Step-based pipeline engine.
//!
//! A [`Pipeline`] holds an ordered list of [`PipelineStep`]s and runs
//! them over a shared [`PipelineContext`]. Steps that declare an output
//! path participate in resume: when the artifact already exists the
//! engine skips the step and hydrates the context from the file on disk
//! instead of re-running. [`PipelineObserver`]s receive lifecycle and
//! progress notifications.

pub mod context;
pub mod engine;
pub mod observer;
pub mod step;

pub use context::{PipelineContext, ProgressFn};
pub use engine::Pipeline;
pub use observer::{DecisionReason, PipelineObserver, StepDecision};
pub use step::PipelineStep;
