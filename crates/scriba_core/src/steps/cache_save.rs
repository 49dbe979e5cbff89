//! Enhancement cache recording.

use crate::cache::file_key;
use crate::errors::StepResult;
use crate::pipeline::{PipelineContext, PipelineStep};

use super::cache_store_for;

/// Records freshly enhanced audio in the cache file next to the source.
///
/// Nothing is written on a cache hit or when enhancement produced no
/// output; only the artifact file name is stored, so entries survive
/// moving the whole folder.
pub struct CacheSaveStep {
    cache_file: String,
}

impl CacheSaveStep {
    pub fn new(cache_file: impl Into<String>) -> Self {
        Self {
            cache_file: cache_file.into(),
        }
    }
}

impl PipelineStep for CacheSaveStep {
    fn name(&self) -> &str {
        "cache_save"
    }

    fn description(&self) -> &str {
        "record enhanced audio in the cache"
    }

    fn run(&self, ctx: PipelineContext) -> StepResult<PipelineContext> {
        if ctx.cache_hit {
            return Ok(ctx);
        }
        let Some(name) = ctx
            .enhanced
            .as_deref()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
        else {
            return Ok(ctx);
        };

        let store = cache_store_for(&ctx.src, &self.cache_file);
        let key = file_key(&ctx.src)?;
        store.record_output(&key, &name)?;
        tracing::debug!("cached {name} for {}", ctx.src.display());
        Ok(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    const CACHE_FILE: &str = ".scriba_cache.json";

    #[test]
    fn records_the_enhanced_file_name() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("talk.mp3");
        fs::write(&src, b"audio").unwrap();
        let enhanced = dir.path().join("talk_enhanced.m4a");

        let ctx = PipelineContext::new(&src).with_enhanced(Some(enhanced));
        CacheSaveStep::new(CACHE_FILE).run(ctx).unwrap();

        let store = cache_store_for(&src, CACHE_FILE);
        let key = file_key(&src).unwrap();
        assert_eq!(store.lookup_output(&key).unwrap(), "talk_enhanced.m4a");
    }

    #[test]
    fn cache_hit_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("talk.mp3");
        fs::write(&src, b"audio").unwrap();

        let ctx = PipelineContext::new(&src)
            .with_enhanced(Some(PathBuf::from("talk_enhanced.m4a")))
            .with_cache_hit(true);
        CacheSaveStep::new(CACHE_FILE).run(ctx).unwrap();

        assert!(!dir.path().join(CACHE_FILE).exists());
    }

    #[test]
    fn missing_enhanced_audio_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("talk.mp3");
        fs::write(&src, b"audio").unwrap();

        CacheSaveStep::new(CACHE_FILE)
            .run(PipelineContext::new(&src))
            .unwrap();
        assert!(!dir.path().join(CACHE_FILE).exists());
    }
}
