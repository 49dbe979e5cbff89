//! Loudness normalization.

use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{StepError, StepResult};
use crate::media::{encode_aac, extract_to_wav, normalize_loudness};
use crate::pipeline::{PipelineContext, PipelineStep};

use super::{remove_temp_files, NORMALIZED_SUFFIX};

/// Extracts the audio track, normalizes it to broadcast loudness and
/// encodes the result as `{stem}_normalized.m4a` next to the source.
pub struct NormalizeStep;

impl PipelineStep for NormalizeStep {
    fn name(&self) -> &str {
        "normalize"
    }

    fn description(&self) -> &str {
        "normalize loudness to the broadcast target"
    }

    fn output_path(&self, ctx: &PipelineContext) -> Option<PathBuf> {
        Some(ctx.artifact_path(NORMALIZED_SUFFIX))
    }

    fn hydrate(&self, ctx: PipelineContext, artifact: &Path) -> PipelineContext {
        ctx.with_normalized(Some(artifact.to_path_buf()))
    }

    fn run(&self, ctx: PipelineContext) -> StepResult<PipelineContext> {
        let out = ctx.artifact_path(NORMALIZED_SUFFIX);
        if ctx.cache_hit || out.exists() {
            if out.exists() {
                return Ok(ctx.with_normalized(Some(out)));
            }
            return Ok(ctx);
        }

        let stem = ctx
            .src
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let tmp_raw = ctx.src.with_file_name(format!("{stem}._tmp_raw.wav"));
        let tmp_norm = ctx.src.with_file_name(format!("{stem}._tmp_norm.wav"));

        let result = normalize_into(&ctx, &tmp_raw, &tmp_norm, &out);
        remove_temp_files(&[&tmp_raw, &tmp_norm]);
        result?;

        Ok(ctx.with_normalized(Some(out)))
    }
}

fn normalize_into(
    ctx: &PipelineContext,
    tmp_raw: &Path,
    tmp_norm: &Path,
    out: &Path,
) -> StepResult<()> {
    ctx.report_progress(0, 3);
    extract_to_wav(&ctx.src, tmp_raw)?;
    ctx.report_progress(1, 3);
    normalize_loudness(tmp_raw, tmp_norm)?;
    ctx.report_progress(2, 3);

    let tmp_out = out.with_extension("m4a.tmp");
    encode_aac(tmp_norm, &tmp_out)?;
    fs::rename(&tmp_out, out)
        .map_err(|e| StepError::io_error(format!("rename into {}", out.display()), e))?;
    ctx.report_progress(3, 3);
    Ok(())
}
