//! AssemblyAI transcription over its HTTP API.
//!
//! Three calls: upload the audio, submit a transcript job, poll until
//! it reaches a terminal status.

use std::fs;
use std::path::Path;
use std::thread;
use std::time::Duration;

use reqwest::blocking::{Client, Response};
use serde_json::{json, Value};

use super::transcriber::{Transcriber, TranscriptionOutput};
use crate::errors::{StepError, StepResult};
use crate::models::Word;

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "ASSEMBLY_AI_KEY";

const API_BASE: &str = "https://api.assemblyai.com/v2";

/// Uploads can take a while on slow links.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(600);

const POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Transcription through AssemblyAI's `best` speech model with speaker
/// labels enabled.
pub struct AssemblyAiTranscriber {
    api_key: String,
    client: Client,
}

impl AssemblyAiTranscriber {
    /// Create a transcriber with an explicit API key.
    pub fn new(api_key: impl Into<String>) -> StepResult<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| StepError::http_error(API_BASE, format!("failed to build client: {e}")))?;

        Ok(Self {
            api_key: api_key.into(),
            client,
        })
    }

    /// Create a transcriber from the `ASSEMBLY_AI_KEY` environment
    /// variable.
    pub fn from_env() -> StepResult<Self> {
        let api_key = std::env::var(API_KEY_ENV)
            .map_err(|_| StepError::precondition_failed(format!("{API_KEY_ENV} env var not set")))?;
        Self::new(api_key)
    }

    /// Upload the audio file; returns the URL the API assigned to it.
    fn upload(&self, audio: &Path) -> StepResult<String> {
        let url = format!("{API_BASE}/upload");
        let bytes = fs::read(audio).map_err(|e| StepError::io_error("read audio for upload", e))?;

        tracing::debug!("uploading {} bytes to {}", bytes.len(), url);
        let response = self
            .client
            .post(&url)
            .header("authorization", &self.api_key)
            .body(bytes)
            .send()
            .map_err(|e| StepError::http_error(&url, e.to_string()))?;
        let json = read_json(response, &url)?;

        json.get("upload_url")
            .and_then(|u| u.as_str())
            .map(str::to_string)
            .ok_or_else(|| StepError::parse_error("upload response", "missing upload_url"))
    }

    /// Submit a transcript job; returns its id.
    fn submit(
        &self,
        audio_url: &str,
        language: Option<&str>,
        speakers: Option<u32>,
    ) -> StepResult<String> {
        let url = format!("{API_BASE}/transcript");
        let body = build_submit_body(audio_url, language, speakers);

        let response = self
            .client
            .post(&url)
            .header("authorization", &self.api_key)
            .json(&body)
            .send()
            .map_err(|e| StepError::http_error(&url, e.to_string()))?;
        let json = read_json(response, &url)?;

        json.get("id")
            .and_then(|i| i.as_str())
            .map(str::to_string)
            .ok_or_else(|| StepError::parse_error("transcript response", "missing id"))
    }

    /// Poll until the transcript completes or errors out.
    fn poll(&self, transcript_id: &str) -> StepResult<Value> {
        let url = format!("{API_BASE}/transcript/{transcript_id}");

        loop {
            let response = self
                .client
                .get(&url)
                .header("authorization", &self.api_key)
                .send()
                .map_err(|e| StepError::http_error(&url, e.to_string()))?;
            let json = read_json(response, &url)?;

            match json.get("status").and_then(|s| s.as_str()) {
                Some("completed") => return Ok(json),
                Some("error") => {
                    let message = json
                        .get("error")
                        .and_then(|e| e.as_str())
                        .unwrap_or("unknown transcription error");
                    return Err(StepError::http_error(&url, message));
                }
                status => {
                    tracing::debug!(
                        "transcript {} status: {}",
                        transcript_id,
                        status.unwrap_or("unknown")
                    );
                    thread::sleep(POLL_INTERVAL);
                }
            }
        }
    }
}

impl Transcriber for AssemblyAiTranscriber {
    fn name(&self) -> &str {
        "assemblyai"
    }

    fn transcribe(
        &self,
        audio: &Path,
        language: Option<&str>,
        speakers: Option<u32>,
    ) -> StepResult<TranscriptionOutput> {
        if !audio.exists() {
            return Err(StepError::file_not_found(audio.display().to_string()));
        }

        let audio_url = self.upload(audio)?;
        let transcript_id = self.submit(&audio_url, language, speakers)?;
        tracing::debug!("transcript {} submitted, polling", transcript_id);
        let transcript = self.poll(&transcript_id)?;

        parse_completed_transcript(transcript)
    }
}

/// Build the transcript request body.
///
/// Language detection is on exactly when no language is given.
fn build_submit_body(audio_url: &str, language: Option<&str>, speakers: Option<u32>) -> Value {
    let mut body = json!({
        "audio_url": audio_url,
        "speech_model": "best",
        "speaker_labels": true,
        "language_detection": language.is_none(),
    });
    if let Some(lang) = language {
        body["language_code"] = json!(lang);
    }
    if let Some(n) = speakers {
        body["speakers_expected"] = json!(n);
    }
    body
}

/// Extract words and text from a completed transcript.
fn parse_completed_transcript(mut transcript: Value) -> StepResult<TranscriptionOutput> {
    let words: Vec<Word> = match transcript.get_mut("words") {
        Some(words) => serde_json::from_value(words.take())
            .map_err(|e| StepError::parse_error("transcript words", e.to_string()))?,
        None => Vec::new(),
    };

    let text = transcript
        .get("text")
        .and_then(|t| t.as_str())
        .unwrap_or_default()
        .to_string();

    Ok(TranscriptionOutput { words, text })
}

/// Turn a response into JSON, mapping HTTP-level failures.
fn read_json(response: Response, url: &str) -> StepResult<Value> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().unwrap_or_default();
        let snippet: String = body.chars().take(200).collect();
        return Err(StepError::http_error(url, format!("{status}: {snippet}")));
    }
    response
        .json()
        .map_err(|e| StepError::http_error(url, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submit_body_with_language_disables_detection() {
        let body = build_submit_body("https://cdn/upload/abc", Some("es"), Some(2));

        assert_eq!(body["speech_model"], "best");
        assert_eq!(body["speaker_labels"], true);
        assert_eq!(body["language_code"], "es");
        assert_eq!(body["language_detection"], false);
        assert_eq!(body["speakers_expected"], 2);
    }

    #[test]
    fn submit_body_without_language_enables_detection() {
        let body = build_submit_body("https://cdn/upload/abc", None, None);

        assert_eq!(body["language_detection"], true);
        assert!(body.get("language_code").is_none());
        assert!(body.get("speakers_expected").is_none());
    }

    #[test]
    fn parses_completed_transcript() {
        let transcript = json!({
            "status": "completed",
            "text": "Hola a todos.",
            "words": [
                {"text": "Hola", "start": 0, "end": 380, "confidence": 0.98, "speaker": "A"},
                {"text": "a", "start": 380, "end": 450, "confidence": 0.99, "speaker": "A"},
                {"text": "todos.", "start": 450, "end": 900, "confidence": 0.97, "speaker": "A"}
            ]
        });

        let output = parse_completed_transcript(transcript).unwrap();
        assert_eq!(output.text, "Hola a todos.");
        assert_eq!(output.words.len(), 3);
        assert_eq!(output.words[0].text, "Hola");
        assert_eq!(output.words[0].start, 0);
        assert_eq!(output.words[2].speaker.as_deref(), Some("A"));
    }

    #[test]
    fn tolerates_missing_words_and_text() {
        let output = parse_completed_transcript(json!({"status": "completed"})).unwrap();
        assert!(output.words.is_empty());
        assert!(output.text.is_empty());
    }

    #[test]
    fn missing_audio_is_rejected_before_any_request() {
        let engine = AssemblyAiTranscriber::new("test-key").unwrap();
        let result = engine.transcribe(Path::new("/nonexistent/a.m4a"), None, None);
        assert!(matches!(result, Err(StepError::FileNotFound { .. })));
    }
}
