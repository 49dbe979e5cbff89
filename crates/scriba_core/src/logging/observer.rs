//! Pipeline observer that renders lifecycle events through a `JobLogger`.

use std::sync::Arc;

use crate::pipeline::{PipelineContext, PipelineObserver};

use super::JobLogger;

/// Renders pipeline lifecycle events as job log lines.
///
/// Step starts become `=== name ===` phase markers, skipped steps
/// become `[SKIP]` lines, and step progress flows through the logger's
/// compact-mode filter.
pub struct LogObserver {
    logger: Arc<JobLogger>,
}

impl LogObserver {
    pub fn new(logger: Arc<JobLogger>) -> Self {
        Self { logger }
    }
}

impl PipelineObserver for LogObserver {
    fn on_pipeline_start(&self, step_names: &[&str], ctx: &PipelineContext) {
        self.logger
            .info(&format!("processing {}", ctx.src.display()));
        self.logger.info(&format!("steps: {}", step_names.join(" -> ")));
    }

    fn on_step_start(&self, name: &str, _ctx: &PipelineContext) {
        self.logger.phase(name);
    }

    fn on_step_end(&self, name: &str, ctx: &PipelineContext) {
        match ctx.timings.get(name) {
            Some(elapsed) => self.logger.info(&format!("{name} done in {elapsed:.1}s")),
            None => self.logger.info(&format!("{name} done")),
        }
    }

    fn on_step_skipped(&self, name: &str, reason: &str, _ctx: &PipelineContext) {
        self.logger.skip(&format!("{name}: {reason}"));
    }

    fn on_step_progress(&self, _name: &str, done: u64, total: u64) {
        if total == 0 {
            return;
        }
        let percent = (done.min(total) * 100 / total) as u32;
        self.logger.progress(percent);
    }

    fn on_pipeline_end(&self, ctx: &PipelineContext) {
        let artifacts = [
            ("normalized", &ctx.normalized),
            ("enhanced", &ctx.enhanced),
            ("transcript json", &ctx.transcript_json),
            ("transcript txt", &ctx.transcript_txt),
            ("srt", &ctx.srt),
            ("video", &ctx.video_out),
            ("compressed", &ctx.video_compressed),
        ];

        if artifacts.iter().any(|(_, path)| path.is_some()) {
            self.logger.section("artifacts");
            for (label, path) in artifacts {
                if let Some(path) = path {
                    self.logger.info(&format!("{label}: {}", path.display()));
                }
            }
        }
        self.logger.flush();
    }
}
