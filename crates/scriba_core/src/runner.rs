//! Batch runner that drives source files through the pipeline.
//!
//! The runner owns everything one invocation shares across files: the
//! settings, the engine factory (so a model or API client is set up
//! once per batch, not per file) and the run options. Each file gets
//! its own job logger and pipeline.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crate::config::Settings;
use crate::engines::EngineFactory;
use crate::errors::{PipelineError, StepError};
use crate::logging::{JobLogger, LogCallback, LogConfig, LogObserver};
use crate::models::GroupingLimits;
use crate::pipeline::{Pipeline, PipelineContext, StepDecision};
use crate::steps::{build_steps, RunOptions};

/// Result of processing a single source file.
#[derive(Debug, Clone)]
pub struct JobResult {
    /// Source file that was processed.
    pub file: PathBuf,
    /// Whether the pipeline completed.
    pub ok: bool,
    /// Wall-clock seconds spent on this file.
    pub elapsed: f64,
    /// Subtitle file, when the run got that far.
    pub srt: Option<PathBuf>,
    /// Compressed video, when one was produced.
    pub compressed: Option<PathBuf>,
    /// Error message, when the run failed.
    pub error: Option<String>,
}

impl JobResult {
    fn success(file: PathBuf, elapsed: f64, ctx: &PipelineContext) -> Self {
        Self {
            file,
            ok: true,
            elapsed,
            srt: ctx.srt.clone(),
            compressed: ctx.video_compressed.clone(),
            error: None,
        }
    }

    fn failure(file: PathBuf, elapsed: f64, error: impl Into<String>) -> Self {
        Self {
            file,
            ok: false,
            elapsed,
            srt: None,
            compressed: None,
            error: Some(error.into()),
        }
    }
}

/// Runs files through the transcription pipeline.
pub struct Runner {
    settings: Settings,
    options: RunOptions,
    engines: Arc<EngineFactory>,
    log_dir: PathBuf,
}

impl Runner {
    pub fn new(settings: Settings, options: RunOptions) -> Self {
        let engines = Arc::new(EngineFactory::new(&settings));
        let log_dir = PathBuf::from(&settings.paths.logs_folder);
        Self {
            settings,
            options,
            engines,
            log_dir,
        }
    }

    /// Process one source file end to end.
    ///
    /// Failures are captured in the result rather than returned, so a
    /// batch keeps going when one file breaks.
    pub fn process_file(&self, src: &Path, callback: Option<LogCallback>) -> JobResult {
        let started = Instant::now();

        if !src.exists() {
            return JobResult::failure(
                src.to_path_buf(),
                0.0,
                format!("file not found: {}", src.display()),
            );
        }

        let ctx = self.context_for(src);
        let logger = match JobLogger::new(
            ctx.job_name(),
            &self.log_dir,
            LogConfig::from(&self.settings.logging),
            callback,
        ) {
            Ok(logger) => Arc::new(logger),
            Err(e) => {
                let error = PipelineError::setup_failed(
                    ctx.job_name(),
                    format!("could not create log file: {e}"),
                );
                return JobResult::failure(
                    src.to_path_buf(),
                    started.elapsed().as_secs_f64(),
                    error.to_string(),
                );
            }
        };

        if self.enhancement_misconfigured() {
            logger.warn("enhancement is enabled but no tool is configured; running without it");
        }

        let mut pipeline = self.pipeline_for();
        pipeline.add_observer(Arc::new(LogObserver::new(logger.clone())));
        match pipeline.run(ctx) {
            Ok(final_ctx) => {
                let elapsed = started.elapsed().as_secs_f64();
                logger.success(&format!("{} finished in {elapsed:.1}s", final_ctx.job_name()));
                JobResult::success(src.to_path_buf(), elapsed, &final_ctx)
            }
            Err(e) => {
                report_failure(&logger, &e);
                JobResult::failure(src.to_path_buf(), started.elapsed().as_secs_f64(), e.to_string())
            }
        }
    }

    /// Process files in order, collecting per-file results.
    pub fn process_batch(&self, files: &[PathBuf]) -> Vec<JobResult> {
        let mut results = Vec::with_capacity(files.len());
        for (i, file) in files.iter().enumerate() {
            tracing::info!("processing {}/{}: {}", i + 1, files.len(), file.display());
            results.push(self.process_file(file, None));
        }
        results
    }

    /// Decision table for one file without running anything.
    pub fn dry_run(&self, src: &Path) -> Vec<StepDecision> {
        let ctx = self.context_for(src);
        self.pipeline_for().dry_run(&ctx)
    }

    fn pipeline_for(&self) -> Pipeline {
        let steps = build_steps(&self.options, &self.engines, &self.settings.paths.cache_file);
        Pipeline::new().with_steps(steps)
    }

    fn context_for(&self, src: &Path) -> PipelineContext {
        let opts = &self.options;
        let transcription = &self.settings.transcription;
        let grouping = &self.settings.grouping;

        let language = opts
            .language
            .clone()
            .or_else(|| transcription.language_hint().map(str::to_string));
        let speakers = opts.speakers.or_else(|| transcription.speakers_hint());
        let limits = GroupingLimits {
            max_chars: grouping.max_chars,
            max_duration_s: grouping.max_duration_s,
        };

        PipelineContext::new(src)
            .with_force(opts.force)
            .with_language(language)
            .with_speakers(speakers)
            .with_speaker_names(opts.speaker_names.clone())
            .with_srt_mode(opts.srt_mode.unwrap_or(grouping.srt_mode))
            .with_grouping(limits)
            .with_write_vtt(opts.write_vtt)
            .with_compress_ratio(opts.compress_ratio)
    }

    fn enhancement_misconfigured(&self) -> bool {
        !self.options.skip_enhance
            && self.settings.enhancement.enabled
            && self.settings.enhancement.tool.is_empty()
    }
}

/// Log a pipeline failure, surfacing a failing tool's output tail.
fn report_failure(logger: &JobLogger, error: &PipelineError) {
    if let PipelineError::StepFailed {
        step_name, source, ..
    } = error
    {
        if let StepError::CommandFailed { tool, message, .. } = source {
            for line in message.lines() {
                logger.output_line(line, true);
            }
            logger.show_tail(tool);
        }
        logger.error(&format!("{step_name} failed: {source}"));
    } else {
        logger.error(&error.to_string());
    }
}
