//! Black-frame video rendering.

use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{StepError, StepResult};
use crate::media::{
    audio_to_black_video, compress_video, detect_best_encoder, gain_for_lufs, measure_lufs,
    probe_media, target_video_bitrate_kbps,
};
use crate::pipeline::{PipelineContext, PipelineStep};

use super::{sibling_with_suffix, COMPRESSED_SUFFIX, VIDEO_SUFFIX};

/// Renders the best available audio under a black frame so the
/// subtitles can be reviewed in a normal video player.
///
/// With a compression ratio set, the rendered file is re-encoded to
/// the target size and replaced in place; the declared artifact path
/// stays the same either way.
pub struct VideoStep;

impl VideoStep {
    fn audio_source(ctx: &PipelineContext) -> PathBuf {
        ctx.enhanced
            .clone()
            .or_else(|| ctx.normalized.clone())
            .unwrap_or_else(|| ctx.src.clone())
    }
}

impl PipelineStep for VideoStep {
    fn name(&self) -> &str {
        "video"
    }

    fn description(&self) -> &str {
        "render the audio under a black frame"
    }

    fn output_path(&self, ctx: &PipelineContext) -> Option<PathBuf> {
        Some(sibling_with_suffix(&Self::audio_source(ctx), VIDEO_SUFFIX))
    }

    fn hydrate(&self, ctx: PipelineContext, artifact: &Path) -> PipelineContext {
        ctx.with_video(artifact.to_path_buf())
    }

    fn run(&self, ctx: PipelineContext) -> StepResult<PipelineContext> {
        let audio = Self::audio_source(&ctx);
        let out = sibling_with_suffix(&audio, VIDEO_SUFFIX);

        audio_to_black_video(&audio, &out)?;
        if let Some(ratio) = ctx.compress_ratio {
            shrink_in_place(&ctx, &out, ratio)?;
        }

        Ok(ctx.with_video(out))
    }
}

fn shrink_in_place(ctx: &PipelineContext, video: &Path, ratio: f64) -> StepResult<()> {
    let info = probe_media(video)?;
    let gain_db = if info.has_audio {
        gain_for_lufs(measure_lufs(video))
    } else {
        0.0
    };
    let encoder = detect_best_encoder(None);
    let bitrate = target_video_bitrate_kbps(info.size_bytes, info.duration_s, ratio);

    let compressed = sibling_with_suffix(video, COMPRESSED_SUFFIX);
    let progress = |done, total| ctx.report_progress(done, total);
    compress_video(&info, gain_db, &encoder, bitrate, &compressed, Some(&progress))?;
    fs::rename(&compressed, video)
        .map_err(|e| StepError::io_error(format!("rename into {}", video.display()), e))?;
    Ok(())
}
