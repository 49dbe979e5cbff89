//! Subtitle generation.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::align::assign_speakers;
use crate::engines::{Diarizer, EngineFactory};
use crate::errors::{StepError, StepResult};
use crate::models::{words_to_chunks, Word};
use crate::pipeline::{PipelineContext, PipelineStep};
use crate::segment::group_chunks;
use crate::subtitles::{segments_to_srt, segments_to_vtt};

use super::{sibling_with_suffix, transcription_audio, write_text_atomic, SRT_SUFFIX};

/// Turns the word-level timestamp JSON into an SRT file (and a VTT
/// file when requested).
///
/// When the provider left the words unlabeled and a diarization tool
/// is configured, a diarization pass fills the speaker labels in
/// before grouping.
pub struct SrtStep {
    engines: Arc<EngineFactory>,
}

impl SrtStep {
    pub fn new(engines: Arc<EngineFactory>) -> Self {
        Self { engines }
    }
}

impl PipelineStep for SrtStep {
    fn name(&self) -> &str {
        "srt"
    }

    fn description(&self) -> &str {
        "build subtitles from the word timestamps"
    }

    fn output_path(&self, ctx: &PipelineContext) -> Option<PathBuf> {
        Some(sibling_with_suffix(&transcription_audio(ctx), SRT_SUFFIX))
    }

    fn hydrate(&self, ctx: PipelineContext, artifact: &Path) -> PipelineContext {
        ctx.with_srt(artifact.to_path_buf())
    }

    fn run(&self, ctx: PipelineContext) -> StepResult<PipelineContext> {
        let diarizer = self.engines.diarizer()?;
        build_subtitles(ctx, diarizer.as_deref())
    }
}

fn build_subtitles(
    ctx: PipelineContext,
    diarizer: Option<&dyn Diarizer>,
) -> StepResult<PipelineContext> {
    let json_path = ctx.transcript_json.clone().ok_or_else(|| {
        StepError::precondition_failed("no word timestamps in context; transcribe must run first")
    })?;
    let content = fs::read_to_string(&json_path)
        .map_err(|e| StepError::io_error(format!("read {}", json_path.display()), e))?;
    let words: Vec<Word> = serde_json::from_str(&content)
        .map_err(|e| StepError::parse_error(json_path.display().to_string(), e.to_string()))?;

    let mut chunks = words_to_chunks(&words);
    let unlabeled = chunks.first().map(|c| c.speaker.is_none()).unwrap_or(false);
    if unlabeled {
        if let Some(diarizer) = diarizer {
            let audio = transcription_audio(&ctx);
            tracing::debug!("labeling speakers with {}", diarizer.name());
            let turns = diarizer.diarize(&audio, ctx.speakers)?;
            if !turns.is_empty() {
                chunks = assign_speakers(&chunks, &turns);
            }
        }
    }

    let segments = group_chunks(&chunks, ctx.srt_mode, ctx.grouping);

    let srt_path = json_path.with_extension("srt");
    write_text_atomic(&srt_path, &segments_to_srt(&segments, &ctx.speaker_names))?;

    if ctx.write_vtt {
        let vtt_path = json_path.with_extension("vtt");
        write_text_atomic(&vtt_path, &segments_to_vtt(&segments, &ctx.speaker_names))?;
    }

    Ok(ctx.with_srt(srt_path))
}
