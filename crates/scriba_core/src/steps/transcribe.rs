//! Speech-to-text transcription.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::engines::{EngineFactory, Transcriber};
use crate::errors::{StepError, StepResult};
use crate::pipeline::{PipelineContext, PipelineStep};
use crate::subtitles::words_to_transcript_txt;

use super::{
    sibling_with_suffix, transcription_audio, write_text_atomic, TIMESTAMPS_JSON_SUFFIX,
    TRANSCRIPT_TXT_SUFFIX,
};

/// Sends the best available audio to the transcription engine and
/// writes two artifacts named after that audio's stem: the word-level
/// timestamp JSON and a readable transcript.
pub struct TranscribeStep {
    engines: Arc<EngineFactory>,
}

impl TranscribeStep {
    pub fn new(engines: Arc<EngineFactory>) -> Self {
        Self { engines }
    }
}

impl PipelineStep for TranscribeStep {
    fn name(&self) -> &str {
        "transcribe"
    }

    fn description(&self) -> &str {
        "transcribe the audio with word timestamps"
    }

    fn output_path(&self, ctx: &PipelineContext) -> Option<PathBuf> {
        Some(sibling_with_suffix(
            &transcription_audio(ctx),
            TIMESTAMPS_JSON_SUFFIX,
        ))
    }

    fn hydrate(&self, ctx: PipelineContext, artifact: &Path) -> PipelineContext {
        let name = artifact
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let txt_name = name.replace(TIMESTAMPS_JSON_SUFFIX, TRANSCRIPT_TXT_SUFFIX);
        let txt = artifact.with_file_name(txt_name);
        ctx.with_transcripts(artifact.to_path_buf(), txt)
    }

    fn run(&self, ctx: PipelineContext) -> StepResult<PipelineContext> {
        let transcriber = self.engines.transcriber()?;
        transcribe_into(ctx, transcriber.as_ref())
    }
}

fn transcribe_into(
    ctx: PipelineContext,
    transcriber: &dyn Transcriber,
) -> StepResult<PipelineContext> {
    let audio = transcription_audio(&ctx);
    tracing::debug!("transcribing {} with {}", audio.display(), transcriber.name());

    let output = transcriber.transcribe(&audio, ctx.language.as_deref(), ctx.speakers)?;

    let json_path = sibling_with_suffix(&audio, TIMESTAMPS_JSON_SUFFIX);
    let json = serde_json::to_string_pretty(&output.words)
        .map_err(|e| StepError::parse_error("word timestamps", e.to_string()))?;
    write_text_atomic(&json_path, &json)?;

    let txt_path = sibling_with_suffix(&audio, TRANSCRIPT_TXT_SUFFIX);
    write_text_atomic(&txt_path, &words_to_transcript_txt(&output.words, &ctx.speaker_names))?;

    Ok(ctx.with_transcripts(json_path, txt_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::engines::TranscriptionOutput;
    use crate::models::Word;
    use std::fs;
    use tempfile::TempDir;

    struct CannedTranscriber {
        words: Vec<Word>,
    }

    impl Transcriber for CannedTranscriber {
        fn name(&self) -> &str {
            "canned"
        }

        fn transcribe(
            &self,
            _audio: &Path,
            _language: Option<&str>,
            _speakers: Option<u32>,
        ) -> StepResult<TranscriptionOutput> {
            Ok(TranscriptionOutput {
                words: self.words.clone(),
                text: self.words.iter().map(|w| w.text.as_str()).collect::<Vec<_>>().join(" "),
            })
        }
    }

    fn word(text: &str, start: u64, end: u64, speaker: &str) -> Word {
        Word {
            text: text.to_string(),
            start,
            end,
            confidence: 1.0,
            speaker: Some(speaker.to_string()),
        }
    }

    fn step() -> TranscribeStep {
        TranscribeStep::new(Arc::new(EngineFactory::new(&Settings::default())))
    }

    #[test]
    fn writes_both_artifacts_next_to_the_audio() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("talk.mp3");
        fs::write(&src, b"audio").unwrap();

        let engine = CannedTranscriber {
            words: vec![word("Hello", 0, 400, "A"), word("there.", 450, 900, "A")],
        };
        let ctx = transcribe_into(PipelineContext::new(&src), &engine).unwrap();

        let json_path = dir.path().join("talk_timestamps.json");
        let txt_path = dir.path().join("talk_transcript.txt");
        assert_eq!(ctx.transcript_json.as_deref(), Some(json_path.as_path()));
        assert_eq!(ctx.transcript_txt.as_deref(), Some(txt_path.as_path()));

        let words: Vec<Word> =
            serde_json::from_str(&fs::read_to_string(&json_path).unwrap()).unwrap();
        assert_eq!(words.len(), 2);
        assert_eq!(words[0].text, "Hello");

        let txt = fs::read_to_string(&txt_path).unwrap();
        assert!(txt.contains("Speaker A: Hello there."));
    }

    #[test]
    fn enhanced_audio_names_the_artifacts() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("talk.mp3");
        let enhanced = dir.path().join("talk_enhanced.m4a");
        fs::write(&enhanced, b"audio").unwrap();

        let engine = CannedTranscriber {
            words: vec![word("Hi", 0, 200, "A")],
        };
        let ctx = PipelineContext::new(&src).with_enhanced(Some(enhanced));
        let ctx = transcribe_into(ctx, &engine).unwrap();

        assert_eq!(
            ctx.transcript_json.unwrap(),
            dir.path().join("talk_enhanced_timestamps.json")
        );
    }

    #[test]
    fn output_path_follows_the_enhanced_audio() {
        let ctx = PipelineContext::new("/tmp/talk.mp3");
        assert_eq!(
            step().output_path(&ctx).unwrap(),
            Path::new("/tmp/talk_timestamps.json")
        );

        let ctx = ctx.with_enhanced(Some(PathBuf::from("/tmp/talk_enhanced.m4a")));
        assert_eq!(
            step().output_path(&ctx).unwrap(),
            Path::new("/tmp/talk_enhanced_timestamps.json")
        );
    }

    #[test]
    fn hydrate_restores_both_transcript_paths() {
        let ctx = PipelineContext::new("/tmp/talk.mp3");
        let ctx = step().hydrate(ctx, Path::new("/tmp/talk_timestamps.json"));
        assert_eq!(
            ctx.transcript_json.as_deref(),
            Some(Path::new("/tmp/talk_timestamps.json"))
        );
        assert_eq!(
            ctx.transcript_txt.as_deref(),
            Some(Path::new("/tmp/talk_transcript.txt"))
        );
    }
}
