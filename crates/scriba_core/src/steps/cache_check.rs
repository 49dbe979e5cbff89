//! Enhancement cache lookup.

use crate::cache::file_key;
use crate::errors::StepResult;
use crate::pipeline::{PipelineContext, PipelineStep};

use super::{cache_store_for, ENHANCED_SUFFIX, NORMALIZED_SUFFIX};

/// Preflight step that checks for previously enhanced audio.
///
/// A hit fills the context with the existing artifact paths so that
/// the expensive steps fall through. Three sources are consulted in
/// order: the cache file entry for the source, an enhanced artifact
/// next to the source, and finally a normalized-only artifact.
pub struct CacheCheckStep {
    cache_file: String,
}

impl CacheCheckStep {
    pub fn new(cache_file: impl Into<String>) -> Self {
        Self {
            cache_file: cache_file.into(),
        }
    }
}

impl PipelineStep for CacheCheckStep {
    fn name(&self) -> &str {
        "cache_check"
    }

    fn description(&self) -> &str {
        "look up previously enhanced audio"
    }

    fn is_preflight(&self) -> bool {
        true
    }

    fn run(&self, ctx: PipelineContext) -> StepResult<PipelineContext> {
        if ctx.force {
            return Ok(ctx.with_cache_hit(false));
        }

        let store = cache_store_for(&ctx.src, &self.cache_file);
        let key = file_key(&ctx.src)?;

        if let Some(output) = store.lookup_output(&key) {
            let enhanced = ctx.src.with_file_name(output);
            if enhanced.exists() {
                tracing::debug!("cache entry hit for {}", ctx.src.display());
                return Ok(hydrate_from_enhanced(ctx, enhanced));
            }
        }

        let enhanced = ctx.artifact_path(ENHANCED_SUFFIX);
        if enhanced.exists() {
            tracing::debug!("found enhanced artifact {}", enhanced.display());
            return Ok(hydrate_from_enhanced(ctx, enhanced));
        }

        let normalized = ctx.artifact_path(NORMALIZED_SUFFIX);
        if normalized.exists() {
            tracing::debug!("found normalized artifact {}", normalized.display());
            return Ok(ctx.with_normalized(Some(normalized)).with_cache_hit(true));
        }

        Ok(ctx.with_cache_hit(false))
    }
}

fn hydrate_from_enhanced(
    ctx: PipelineContext,
    enhanced: std::path::PathBuf,
) -> PipelineContext {
    let normalized = ctx.artifact_path(NORMALIZED_SUFFIX);
    let normalized = normalized.exists().then_some(normalized);
    ctx.with_enhanced(Some(enhanced))
        .with_normalized(normalized)
        .with_cache_hit(true)
}
