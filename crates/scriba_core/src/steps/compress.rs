//! Source video compression.

use std::path::{Path, PathBuf};

use crate::errors::StepResult;
use crate::media::{
    compress_video, detect_best_encoder, gain_for_lufs, measure_lufs, probe_media,
    target_video_bitrate_kbps,
};
use crate::pipeline::{PipelineContext, PipelineStep};

use super::{COMPRESSED_SUFFIX, DEFAULT_COMPRESS_RATIO};

/// Re-encodes the source video to a fraction of its size, lifting the
/// audio to broadcast loudness along the way.
///
/// The loudness correction is measured on the enhanced audio when one
/// exists, so the compressed video matches what the transcript heard.
/// Sources without a video stream pass through untouched.
pub struct CompressStep;

impl PipelineStep for CompressStep {
    fn name(&self) -> &str {
        "compress"
    }

    fn description(&self) -> &str {
        "compress the source video"
    }

    fn output_path(&self, ctx: &PipelineContext) -> Option<PathBuf> {
        Some(ctx.artifact_path(COMPRESSED_SUFFIX))
    }

    fn hydrate(&self, ctx: PipelineContext, artifact: &Path) -> PipelineContext {
        ctx.with_compressed(artifact.to_path_buf())
    }

    fn run(&self, ctx: PipelineContext) -> StepResult<PipelineContext> {
        let out = ctx.artifact_path(COMPRESSED_SUFFIX);

        let info = match probe_media(&ctx.src) {
            Ok(info) if info.has_video => info,
            Ok(_) => {
                tracing::debug!("{} has no video stream, nothing to compress", ctx.src.display());
                return Ok(ctx);
            }
            Err(e) => {
                tracing::debug!("could not probe {}: {e}", ctx.src.display());
                return Ok(ctx);
            }
        };

        ctx.report_progress(0, 100);

        let audio_source = ctx.enhanced.clone().unwrap_or_else(|| ctx.src.clone());
        let gain_db = if info.has_audio {
            gain_for_lufs(measure_lufs(&audio_source))
        } else {
            0.0
        };
        let encoder = detect_best_encoder(None);
        let ratio = ctx.compress_ratio.unwrap_or(DEFAULT_COMPRESS_RATIO);
        let bitrate = target_video_bitrate_kbps(info.size_bytes, info.duration_s, ratio);

        let progress = |done, total| ctx.report_progress(done, total);
        compress_video(&info, gain_db, &encoder, bitrate, &out, Some(&progress))?;

        Ok(ctx.with_compressed(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_source_passes_through() {
        let ctx = PipelineContext::new("/nonexistent/talk.mp4").with_compress_ratio(Some(0.4));
        let ctx = CompressStep.run(ctx).unwrap();
        assert!(ctx.video_compressed.is_none());
    }

    #[test]
    fn declares_the_compressed_artifact() {
        let ctx = PipelineContext::new("/tmp/talk.mp4");
        assert_eq!(
            CompressStep.output_path(&ctx).unwrap(),
            Path::new("/tmp/talk_compressed.mp4")
        );
    }

    #[test]
    fn hydrate_restores_the_artifact_path() {
        let ctx = PipelineContext::new("/tmp/talk.mp4");
        let artifact = Path::new("/tmp/talk_compressed.mp4");
        let ctx = CompressStep.hydrate(ctx, artifact);
        assert_eq!(ctx.video_compressed.unwrap(), artifact);
    }
}
