//! Speech enhancement.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::engines::{EngineFactory, Enhancer};
use crate::errors::{StepError, StepResult};
use crate::media::encode_aac;
use crate::pipeline::{PipelineContext, PipelineStep};

use super::{remove_temp_files, ENHANCED_SUFFIX};

/// Runs the configured enhancement tool over the normalized audio (or
/// the source when normalization was skipped) and encodes the result
/// as `{stem}_enhanced.m4a`.
///
/// An engine that declines the input leaves the context unchanged so
/// later steps fall back to the unenhanced audio.
pub struct EnhanceStep {
    engines: Arc<EngineFactory>,
}

impl EnhanceStep {
    pub fn new(engines: Arc<EngineFactory>) -> Self {
        Self { engines }
    }
}

impl PipelineStep for EnhanceStep {
    fn name(&self) -> &str {
        "enhance"
    }

    fn description(&self) -> &str {
        "run the speech enhancement tool"
    }

    fn output_path(&self, ctx: &PipelineContext) -> Option<PathBuf> {
        Some(ctx.artifact_path(ENHANCED_SUFFIX))
    }

    fn hydrate(&self, ctx: PipelineContext, artifact: &Path) -> PipelineContext {
        ctx.with_enhanced(Some(artifact.to_path_buf()))
    }

    fn run(&self, ctx: PipelineContext) -> StepResult<PipelineContext> {
        if ctx.cache_hit && ctx.enhanced.is_some() {
            return Ok(ctx);
        }
        let Some(enhancer) = self.engines.enhancer()? else {
            return Ok(ctx);
        };
        enhance_into(ctx, enhancer.as_ref())
    }
}

fn enhance_into(ctx: PipelineContext, enhancer: &dyn Enhancer) -> StepResult<PipelineContext> {
    let out = ctx.artifact_path(ENHANCED_SUFFIX);
    let input = ctx.normalized.clone().unwrap_or_else(|| ctx.src.clone());
    let stem = ctx
        .src
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp_enh = ctx.src.with_file_name(format!("{stem}._tmp_enh.wav"));

    let result = run_enhancer(&ctx, enhancer, &input, &tmp_enh, &out);
    remove_temp_files(&[&tmp_enh]);

    match result? {
        true => Ok(ctx.with_enhanced(Some(out))),
        false => Ok(ctx),
    }
}

fn run_enhancer(
    ctx: &PipelineContext,
    enhancer: &dyn Enhancer,
    input: &Path,
    tmp_enh: &Path,
    out: &Path,
) -> StepResult<bool> {
    let progress = |done, total| ctx.report_progress(done, total);
    if !enhancer.enhance(input, tmp_enh, Some(&progress))? {
        tracing::debug!("{} declined {}", enhancer.name(), input.display());
        return Ok(false);
    }

    let tmp_out = out.with_extension("m4a.tmp");
    encode_aac(tmp_enh, &tmp_out)?;
    fs::rename(&tmp_out, out)
        .map_err(|e| StepError::io_error(format!("rename into {}", out.display()), e))?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use std::fs;
    use tempfile::TempDir;

    struct DecliningEnhancer;

    impl Enhancer for DecliningEnhancer {
        fn name(&self) -> &str {
            "declining"
        }

        fn enhance(
            &self,
            _src: &Path,
            _dst: &Path,
            _progress: Option<&dyn Fn(u64, u64)>,
        ) -> StepResult<bool> {
            Ok(false)
        }
    }

    struct FailingEnhancer;

    impl Enhancer for FailingEnhancer {
        fn name(&self) -> &str {
            "failing"
        }

        fn enhance(
            &self,
            _src: &Path,
            _dst: &Path,
            _progress: Option<&dyn Fn(u64, u64)>,
        ) -> StepResult<bool> {
            Err(StepError::other("model blew up"))
        }
    }

    fn step() -> EnhanceStep {
        EnhanceStep::new(Arc::new(EngineFactory::new(&Settings::default())))
    }

    #[test]
    fn cache_hit_with_enhanced_audio_is_a_no_op() {
        let ctx = PipelineContext::new("/tmp/talk.mp3")
            .with_enhanced(Some(PathBuf::from("/tmp/talk_enhanced.m4a")))
            .with_cache_hit(true);
        let ctx = step().run(ctx).unwrap();
        assert_eq!(ctx.enhanced.unwrap(), Path::new("/tmp/talk_enhanced.m4a"));
    }

    #[test]
    fn missing_tool_leaves_the_context_unchanged() {
        // Default settings carry no enhancement tool.
        let ctx = step().run(PipelineContext::new("/tmp/talk.mp3")).unwrap();
        assert!(ctx.enhanced.is_none());
    }

    #[test]
    fn declined_input_falls_back_to_unenhanced_audio() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("talk.mp3");
        fs::write(&src, b"audio").unwrap();

        let ctx = enhance_into(PipelineContext::new(&src), &DecliningEnhancer).unwrap();
        assert!(ctx.enhanced.is_none());
        assert!(!dir.path().join("talk_enhanced.m4a").exists());
    }

    #[test]
    fn engine_failure_propagates_and_cleans_temps() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("talk.mp3");
        fs::write(&src, b"audio").unwrap();
        fs::write(dir.path().join("talk._tmp_enh.wav"), b"junk").unwrap();

        let err = enhance_into(PipelineContext::new(&src), &FailingEnhancer).unwrap_err();
        assert!(err.to_string().contains("model blew up"));
        assert!(!dir.path().join("talk._tmp_enh.wav").exists());
    }

    #[test]
    fn declares_the_enhanced_artifact() {
        let ctx = PipelineContext::new("/tmp/talk.mp3");
        assert_eq!(
            step().output_path(&ctx).unwrap(),
            Path::new("/tmp/talk_enhanced.m4a")
        );
    }

    #[test]
    fn hydrate_restores_the_artifact_path() {
        let ctx = PipelineContext::new("/tmp/talk.mp3");
        let artifact = Path::new("/tmp/talk_enhanced.m4a");
        let ctx = step().hydrate(ctx, artifact);
        assert_eq!(ctx.enhanced.unwrap(), artifact);
    }
}
