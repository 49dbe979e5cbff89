//! Pipeline step implementations.
//!
//! Each step lives in its own module and implements
//! [`PipelineStep`](crate::pipeline::PipelineStep). [`build_steps`]
//! assembles the ordered list for a run:
//!
//! ```text
//! cache_check -> [normalize] -> [enhance -> cache_save]
//!             -> transcribe -> srt -> [video] -> [compress]
//! ```
//!
//! Artifacts land next to the source file, named after the stem of the
//! audio that produced them.

mod cache_check;
mod cache_save;
mod compress;
mod enhance;
mod normalize;
mod srt;
mod transcribe;
mod video;

pub use cache_check::CacheCheckStep;
pub use cache_save::CacheSaveStep;
pub use compress::CompressStep;
pub use enhance::EnhanceStep;
pub use normalize::NormalizeStep;
pub use srt::SrtStep;
pub use transcribe::TranscribeStep;
pub use video::VideoStep;

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cache::CacheStore;
use crate::engines::EngineFactory;
use crate::errors::{StepError, StepResult};
use crate::models::SrtMode;
use crate::pipeline::{PipelineContext, PipelineStep};

/// Suffix for loudness-normalized audio, appended to the source stem.
pub const NORMALIZED_SUFFIX: &str = "_normalized.m4a";
/// Suffix for enhanced audio, appended to the source stem.
pub const ENHANCED_SUFFIX: &str = "_enhanced.m4a";
/// Suffix for the word-level timestamp JSON.
pub const TIMESTAMPS_JSON_SUFFIX: &str = "_timestamps.json";
/// Suffix for the plain-text transcript.
pub const TRANSCRIPT_TXT_SUFFIX: &str = "_transcript.txt";
/// Suffix for the SRT subtitle file.
pub const SRT_SUFFIX: &str = "_timestamps.srt";
/// Suffix for the VTT subtitle file.
pub const VTT_SUFFIX: &str = "_timestamps.vtt";
/// Suffix for the black-frame video.
pub const VIDEO_SUFFIX: &str = "_timestamps.mp4";
/// Suffix for the compressed copy of the source video.
pub const COMPRESSED_SUFFIX: &str = "_compressed.mp4";

/// Compression ratio used when a step needs one and none was given.
pub const DEFAULT_COMPRESS_RATIO: f64 = 0.40;

/// Per-run request, usually assembled from command-line flags.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Language code passed to the transcription engine.
    pub language: Option<String>,
    /// Expected number of speakers.
    pub speakers: Option<u32>,
    /// Subtitle grouping mode; `None` uses the configured default.
    pub srt_mode: Option<SrtMode>,
    /// Speaker label to display name mapping.
    pub speaker_names: BTreeMap<String, String>,
    /// Skip the loudness normalization step.
    pub skip_normalize: bool,
    /// Skip enhancement even when a tool is configured.
    pub skip_enhance: bool,
    /// Re-run every step, ignoring existing artifacts and the cache.
    pub force: bool,
    /// Render a black-frame video alongside the subtitles.
    pub video_output: bool,
    /// Compress the source video to this fraction of its size.
    pub compress_ratio: Option<f64>,
    /// Also write a VTT file next to the SRT.
    pub write_vtt: bool,
}

/// Assemble the ordered step list for a run.
///
/// The cache steps bracket enhancement and are only present when an
/// enhancement tool is configured and not skipped for this run.
pub fn build_steps(
    options: &RunOptions,
    engines: &Arc<EngineFactory>,
    cache_file: &str,
) -> Vec<Box<dyn PipelineStep>> {
    let enhancing = !options.skip_enhance && engines.enhancement_configured();
    let mut steps: Vec<Box<dyn PipelineStep>> = Vec::new();

    if enhancing {
        steps.push(Box::new(CacheCheckStep::new(cache_file)));
    }
    if !options.skip_normalize {
        steps.push(Box::new(NormalizeStep));
    }
    if enhancing {
        steps.push(Box::new(EnhanceStep::new(engines.clone())));
        steps.push(Box::new(CacheSaveStep::new(cache_file)));
    }
    steps.push(Box::new(TranscribeStep::new(engines.clone())));
    steps.push(Box::new(SrtStep::new(engines.clone())));
    if options.video_output {
        steps.push(Box::new(VideoStep));
    }
    if options.compress_ratio.is_some() {
        steps.push(Box::new(CompressStep));
    }
    steps
}

/// Path of `{stem}{suffix}` next to `path`.
pub(crate) fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("{stem}{suffix}"))
}

/// The audio transcription consumes: enhanced when present, else the source.
pub(crate) fn transcription_audio(ctx: &PipelineContext) -> PathBuf {
    ctx.enhanced.clone().unwrap_or_else(|| ctx.src.clone())
}

/// Cache store resolved next to the source file.
pub(crate) fn cache_store_for(src: &Path, cache_file: &str) -> CacheStore {
    CacheStore::new(src.with_file_name(cache_file))
}

/// Write a text artifact through a same-directory temp file.
pub(crate) fn write_text_atomic(path: &Path, content: &str) -> StepResult<()> {
    let tmp = path.with_extension("tmp");
    let mut file = fs::File::create(&tmp)
        .map_err(|e| StepError::io_error(format!("create {}", tmp.display()), e))?;
    file.write_all(content.as_bytes())
        .map_err(|e| StepError::io_error(format!("write {}", tmp.display()), e))?;
    file.sync_all()
        .map_err(|e| StepError::io_error(format!("sync {}", tmp.display()), e))?;
    fs::rename(&tmp, path)
        .map_err(|e| StepError::io_error(format!("rename into {}", path.display()), e))?;
    Ok(())
}

/// Best-effort removal of intermediate files.
pub(crate) fn remove_temp_files(paths: &[&Path]) {
    for path in paths {
        if path.exists() {
            if let Err(e) = fs::remove_file(path) {
                tracing::debug!("could not remove {}: {e}", path.display());
            }
        }
    }
}
