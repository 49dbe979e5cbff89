//! Speaker diarization engine abstraction.

use std::path::Path;
use std::process::Command;

use super::expand_placeholders;
use crate::errors::{StepError, StepResult};
use crate::media::run_tool;
use crate::models::DiarSegment;

/// A speaker diarization engine.
pub trait Diarizer: Send + Sync {
    /// Engine name for logs.
    fn name(&self) -> &str;

    /// Split an audio file into per-speaker time intervals.
    ///
    /// `speakers` hints how many distinct voices to expect.
    fn diarize(&self, audio: &Path, speakers: Option<u32>) -> StepResult<Vec<DiarSegment>>;
}

/// Diarization through a configured external tool that prints the
/// segment list as JSON on stdout:
/// `[{"start": 0.0, "end": 4.2, "speaker": "SPEAKER_00"}, ...]`.
///
/// The argument template may use an `{input}` placeholder.
pub struct CommandDiarizer {
    program: String,
    args: Vec<String>,
    speakers_flag: Option<String>,
}

impl CommandDiarizer {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            speakers_flag: None,
        }
    }

    /// Flag to pass the expected speaker count with (e.g.
    /// `--num-speakers`); without it the hint is dropped.
    pub fn with_speakers_flag(mut self, flag: impl Into<String>) -> Self {
        self.speakers_flag = Some(flag.into());
        self
    }

    fn build_command(&self, audio: &Path, speakers: Option<u32>) -> Command {
        let audio = audio.to_string_lossy();
        let mut cmd = Command::new(&self.program);
        cmd.args(expand_placeholders(
            &self.args,
            &[("{input}", audio.as_ref())],
        ));
        if let (Some(flag), Some(n)) = (&self.speakers_flag, speakers) {
            cmd.arg(flag).arg(n.to_string());
        }
        cmd
    }
}

impl Diarizer for CommandDiarizer {
    fn name(&self) -> &str {
        &self.program
    }

    fn diarize(&self, audio: &Path, speakers: Option<u32>) -> StepResult<Vec<DiarSegment>> {
        if !audio.exists() {
            return Err(StepError::file_not_found(audio.display().to_string()));
        }

        let mut cmd = self.build_command(audio, speakers);
        let output = run_tool(&self.program, &mut cmd)?;

        serde_json::from_slice(&output.stdout)
            .map_err(|e| StepError::parse_error("diarization output", e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn command_includes_speakers_flag_only_when_hinted() {
        let diarizer = CommandDiarizer::new("diarize", vec!["{input}".to_string()])
            .with_speakers_flag("--num-speakers");

        let with_hint = diarizer.build_command(Path::new("/tmp/a.wav"), Some(2));
        let args: Vec<String> = with_hint
            .get_args()
            .map(|a| a.to_string_lossy().to_string())
            .collect();
        assert_eq!(args, vec!["/tmp/a.wav", "--num-speakers", "2"]);

        let without_hint = diarizer.build_command(Path::new("/tmp/a.wav"), None);
        assert_eq!(without_hint.get_args().count(), 1);
    }

    #[test]
    fn parses_segment_json_from_stdout() {
        let dir = tempdir().unwrap();
        let audio = dir.path().join("a.wav");
        fs::write(&audio, b"fake audio").unwrap();

        let diarizer = CommandDiarizer::new(
            "sh",
            vec![
                "-c".to_string(),
                r#"echo '[{"start": 0.0, "end": 4.2, "speaker": "SPEAKER_00"}]'"#.to_string(),
            ],
        );

        let segments = diarizer.diarize(&audio, None).unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].speaker, "SPEAKER_00");
        assert_eq!(segments[0].end, 4.2);
    }

    #[test]
    fn garbage_stdout_is_a_parse_error() {
        let dir = tempdir().unwrap();
        let audio = dir.path().join("a.wav");
        fs::write(&audio, b"fake audio").unwrap();

        let diarizer = CommandDiarizer::new(
            "sh",
            vec!["-c".to_string(), "echo not json".to_string()],
        );

        let result = diarizer.diarize(&audio, None);
        assert!(matches!(result, Err(StepError::ParseError { .. })));
    }

    #[test]
    fn missing_audio_is_rejected() {
        let diarizer = CommandDiarizer::new("diarize", Vec::new());
        let result = diarizer.diarize(Path::new("/nonexistent/a.wav"), None);
        assert!(matches!(result, Err(StepError::FileNotFound { .. })));
    }
}
