//! Transcription engine abstraction.

use std::fmt;
use std::path::Path;

use crate::errors::StepResult;
use crate::models::Word;

/// What a transcription engine returns: timestamped words plus the
/// plain transcript text.
#[derive(Debug, Clone, Default)]
pub struct TranscriptionOutput {
    /// Word-level timestamps, in milliseconds.
    pub words: Vec<Word>,
    /// Full transcript text.
    pub text: String,
}

/// A speech-to-text engine.
pub trait Transcriber: Send + Sync {
    /// Engine name for logs.
    fn name(&self) -> &str;

    /// Transcribe an audio file.
    ///
    /// `language` is an ISO code; `None` asks the engine to detect it.
    /// `speakers` hints how many distinct voices to expect.
    fn transcribe(
        &self,
        audio: &Path,
        language: Option<&str>,
        speakers: Option<u32>,
    ) -> StepResult<TranscriptionOutput>;
}

impl fmt::Debug for dyn Transcriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transcriber")
            .field("name", &self.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CannedTranscriber;

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
                words: vec![Word {
                    text: "hola".to_string(),
                    start: 0,
                    end: 400,
                    confidence: 0.99,
                    speaker: Some("A".to_string()),
                }],
                text: "hola".to_string(),
            })
        }
    }

    #[test]
    fn trait_object_is_usable() {
        let engine: Box<dyn Transcriber> = Box::new(CannedTranscriber);
        let output = engine
            .transcribe(Path::new("/tmp/a.m4a"), Some("es"), Some(2))
            .unwrap();
        assert_eq!(engine.name(), "canned");
        assert_eq!(output.words.len(), 1);
        assert_eq!(output.text, "hola");
    }
}
