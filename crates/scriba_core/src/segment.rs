//! Chunk grouping into display segments.
//!
//! Two interchangeable policies turn an ordered chunk stream into
//! subtitle-ready segments: speaker-only (split on speaker changes) and
//! sentences (split on sentence boundaries, with character and duration
//! limits as fallbacks). Both drop chunks with empty text or malformed
//! intervals before grouping.

use crate::models::{Chunk, GroupingLimits, Segment, SrtMode, UNKNOWN_SPEAKER};

const CLOSING_WRAPPERS: &[char] = &['"', '\'', ')'];
const SENTENCE_TERMINATORS: &[char] = &['.', '!', '?', ';'];
const STRONG_PAUSES: &[char] = &[',', ':'];

/// Returns true if text ends with a sentence terminator (`. ! ? ;`),
/// optionally followed by closing quotes or parens.
pub fn is_sentence_end(text: &str) -> bool {
    ends_with_any(text, SENTENCE_TERMINATORS)
}

/// Returns true if text ends with a strong pause mark (`,` or `:`),
/// optionally followed by closing quotes or parens.
pub fn is_strong_pause(text: &str) -> bool {
    ends_with_any(text, STRONG_PAUSES)
}

fn ends_with_any(text: &str, marks: &[char]) -> bool {
    text.trim_end().trim_end_matches(CLOSING_WRAPPERS).ends_with(marks)
}

/// Group chunks under the given policy.
pub fn group_chunks(chunks: &[Chunk], mode: SrtMode, limits: GroupingLimits) -> Vec<Segment> {
    match mode {
        SrtMode::SpeakerOnly => group_speaker_only(chunks),
        SrtMode::Sentences => group_sentences(chunks, limits),
    }
}

/// Group chunks, splitting only when the speaker changes.
///
/// Chunks without a speaker label continue the current segment.
pub fn group_speaker_only(chunks: &[Chunk]) -> Vec<Segment> {
    if chunks.is_empty() {
        return Vec::new();
    }

    let mut segments = Vec::new();
    let mut current = Accumulator::new(chunks[0].speaker.clone());

    for chunk in chunks {
        let (text, start, end, speaker) = match extract(chunk) {
            Some(parts) => parts,
            None => continue,
        };

        if speaker_changed(&speaker, &current) {
            current.flush_into(&mut segments);
            current = Accumulator::new(speaker);
        }
        current.push(&text, start, end);
    }

    current.flush_into(&mut segments);
    segments
}

/// Group chunks into segments bounded by complete sentences.
///
/// Four prioritized rules decide per incoming chunk, first match wins:
///
/// 1. Speaker change: flush, start fresh with the incoming chunk.
/// 2. Sentence end: append the incoming chunk, then flush.
/// 3. Appending would exceed a limit and the accumulator ends on a
///    strong pause: flush without appending, start fresh.
/// 4. Appending would exceed 1.5x a limit: flush without appending,
///    start fresh (hard ceiling).
pub fn group_sentences(chunks: &[Chunk], limits: GroupingLimits) -> Vec<Segment> {
    if chunks.is_empty() {
        return Vec::new();
    }

    let mut segments = Vec::new();
    let mut current = Accumulator::new(chunks[0].speaker.clone());

    for chunk in chunks {
        let (text, start, end, speaker) = match extract(chunk) {
            Some(parts) => parts,
            None => continue,
        };

        // Rule 1: speaker change always starts a new segment.
        if speaker_changed(&speaker, &current) {
            current.flush_into(&mut segments);
            current = Accumulator::new(speaker);
            current.push(&text, start, end);
            continue;
        }

        let (candidate_chars, candidate_duration) = current.candidate_metrics(&text, end);

        // Rule 2: a finished sentence closes the segment.
        if is_sentence_end(&text) {
            current.push(&text, start, end);
            current.flush_into(&mut segments);
            current = Accumulator::new(speaker);
            continue;
        }

        // Rule 3: over a limit, prefer splitting at a trailing pause.
        if !current.is_empty()
            && (candidate_chars > limits.max_chars || candidate_duration > limits.max_duration_s)
            && is_strong_pause(current.last_text())
        {
            current.flush_into(&mut segments);
            current = Accumulator::new(speaker);
            current.push(&text, start, end);
            continue;
        }

        // Rule 4: hard ceiling at 1.5x the limits.
        if candidate_chars as f64 > limits.max_chars as f64 * 1.5
            || candidate_duration > limits.max_duration_s * 1.5
        {
            current.flush_into(&mut segments);
            current = Accumulator::new(speaker);
            current.push(&text, start, end);
            continue;
        }

        current.push(&text, start, end);
    }

    current.flush_into(&mut segments);
    segments
}

/// Validate a chunk for grouping: non-empty trimmed text and a complete
/// interval. Returns None for chunks that must be dropped.
fn extract(chunk: &Chunk) -> Option<(String, f64, f64, Option<String>)> {
    let text = chunk.text.trim();
    if text.is_empty() {
        return None;
    }
    match (chunk.start, chunk.end) {
        (Some(start), Some(end)) => Some((text.to_string(), start, end, chunk.speaker.clone())),
        _ => None,
    }
}

/// A labeled chunk with a different speaker than the accumulator forces
/// a split; unlabeled chunks never do.
fn speaker_changed(speaker: &Option<String>, current: &Accumulator) -> bool {
    match speaker {
        Some(s) => current.speaker.as_deref() != Some(s.as_str()),
        None => false,
    }
}

/// Accumulates trimmed chunk texts until a rule flushes them as one segment.
struct Accumulator {
    texts: Vec<String>,
    speaker: Option<String>,
    start: Option<f64>,
    end: Option<f64>,
}

impl Accumulator {
    fn new(speaker: Option<String>) -> Self {
        Self {
            texts: Vec::new(),
            speaker,
            start: None,
            end: None,
        }
    }

    fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }

    fn last_text(&self) -> &str {
        self.texts.last().map(String::as_str).unwrap_or("")
    }

    fn push(&mut self, text: &str, start: f64, end: f64) {
        if self.texts.is_empty() {
            self.start = Some(start);
        }
        self.texts.push(text.to_string());
        self.end = Some(end);
    }

    /// Joined length (in chars) and spanned duration if `text` were appended.
    fn candidate_metrics(&self, text: &str, end: f64) -> (usize, f64) {
        let chars: usize = self.texts.iter().map(|t| t.chars().count()).sum::<usize>()
            + self.texts.len()
            + text.chars().count();
        let duration = match self.start {
            Some(start) => end - start,
            None => 0.0,
        };
        (chars, duration)
    }

    /// Emit the accumulated segment, if any. Callers start a fresh
    /// accumulator after flushing.
    fn flush_into(&mut self, segments: &mut Vec<Segment>) {
        if self.texts.is_empty() {
            return;
        }
        segments.push(Segment {
            speaker: self
                .speaker
                .clone()
                .unwrap_or_else(|| UNKNOWN_SPEAKER.to_string()),
            start: self.start.unwrap_or(0.0),
            end: self.end.unwrap_or(0.0),
            text: self.texts.join(" "),
        });
        self.texts.clear();
    }
}
