//! Core data types shared by the transcription, alignment, and
//! segmentation engines.

use serde::{Deserialize, Serialize};

use crate::errors::StepError;

/// Speaker label used when no diarization information is available.
pub const UNKNOWN_SPEAKER: &str = "UNKNOWN";

/// A single recognized word with millisecond timing, as emitted by the
/// transcription provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
    pub text: String,
    /// Start offset in milliseconds.
    pub start: u64,
    /// End offset in milliseconds.
    pub end: u64,
    #[serde(default)]
    pub confidence: f64,
    /// Diarized speaker label ("A", "B", ...) when the provider emits one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
}

/// A timed piece of transcript text in seconds.
///
/// Chunks are the unit the alignment and segmentation engines operate on.
/// Timestamps are optional because some providers emit words they could
/// not place; such chunks are dropped by the engines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub start: Option<f64>,
    pub end: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
}

impl Chunk {
    /// Create a chunk with a known interval and no speaker.
    pub fn new(text: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            text: text.into(),
            start: Some(start),
            end: Some(end),
            speaker: None,
        }
    }

    /// Create a chunk with a known interval and speaker label.
    pub fn labeled(text: impl Into<String>, start: f64, end: f64, speaker: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            start: Some(start),
            end: Some(end),
            speaker: Some(speaker.into()),
        }
    }

    /// Midpoint of the interval, if both endpoints are present.
    pub fn midpoint(&self) -> Option<f64> {
        match (self.start, self.end) {
            (Some(s), Some(e)) => Some((s + e) / 2.0),
            _ => None,
        }
    }
}

/// Convert provider words (millisecond timing) into chunks (second timing).
///
/// The speaker label passes through untouched; unlabeled words produce
/// unlabeled chunks so diarization alignment can fill them in later.
pub fn words_to_chunks(words: &[Word]) -> Vec<Chunk> {
    words
        .iter()
        .map(|w| Chunk {
            text: w.text.clone(),
            start: Some(w.start as f64 / 1000.0),
            end: Some(w.end as f64 / 1000.0),
            speaker: w.speaker.clone(),
        })
        .collect()
}

/// A diarization turn: one speaker active over one interval (seconds).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiarSegment {
    pub start: f64,
    pub end: f64,
    pub speaker: String,
}

/// A finished subtitle segment produced by the segmentation engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub speaker: String,
    pub start: f64,
    pub end: f64,
    /// Space-joined, individually trimmed member texts.
    pub text: String,
}

/// Limits for the sentence grouping policy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroupingLimits {
    /// Preferred maximum characters per segment.
    pub max_chars: usize,
    /// Preferred maximum duration per segment, in seconds.
    pub max_duration_s: f64,
}

impl Default for GroupingLimits {
    fn default() -> Self {
        Self {
            max_chars: 80,
            max_duration_s: 10.0,
        }
    }
}

/// Segmentation policy for subtitle output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SrtMode {
    /// Split only on speaker changes.
    SpeakerOnly,
    /// Split on sentence boundaries with length/duration limits.
    #[default]
    Sentences,
}

impl std::fmt::Display for SrtMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SrtMode::SpeakerOnly => write!(f, "speaker-only"),
            SrtMode::Sentences => write!(f, "sentences"),
        }
    }
}

impl std::str::FromStr for SrtMode {
    type Err = StepError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "speaker-only" => Ok(SrtMode::SpeakerOnly),
            "sentences" => Ok(SrtMode::Sentences),
            other => Err(StepError::invalid_input(format!(
                "Invalid srt mode '{other}'. Use 'sentences' or 'speaker-only'"
            ))),
        }
    }
}
