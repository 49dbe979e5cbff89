//! Human-readable transcript writer.
//!
//! Renders provider words as one line per speaker turn:
//!
//! ```text
//! [00:12] Speaker A: Buenas tardes a todos.
//! [01:03] Speaker B: Gracias por venir.
//! ```
//!
//! The hour field appears only once the recording passes one hour. A
//! mapped speaker name replaces the whole `Speaker X` prefix.

use std::collections::BTreeMap;

use crate::models::{Word, UNKNOWN_SPEAKER};

/// Render words as a plain-text transcript grouped into speaker turns.
///
/// A new turn starts whenever the word's speaker label differs from the
/// previous word's. Lines are newline-joined without a trailing newline.
pub fn words_to_transcript_txt(words: &[Word], speaker_names: &BTreeMap<String, String>) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut turn: Vec<&str> = Vec::new();
    let mut turn_speaker: Option<&str> = None;
    let mut turn_start_ms: u64 = 0;

    for word in words {
        let speaker = word.speaker.as_deref();
        if turn.is_empty() {
            turn_speaker = speaker;
            turn_start_ms = word.start;
        } else if speaker != turn_speaker {
            lines.push(render_turn(turn_start_ms, turn_speaker, &turn, speaker_names));
            turn.clear();
            turn_speaker = speaker;
            turn_start_ms = word.start;
        }
        turn.push(word.text.as_str());
    }

    if !turn.is_empty() {
        lines.push(render_turn(turn_start_ms, turn_speaker, &turn, speaker_names));
    }

    lines.join("\n")
}

fn render_turn(
    start_ms: u64,
    speaker: Option<&str>,
    words: &[&str],
    speaker_names: &BTreeMap<String, String>,
) -> String {
    let label = speaker.unwrap_or(UNKNOWN_SPEAKER);
    let prefix = match speaker_names.get(label) {
        Some(name) => name.clone(),
        None => format!("Speaker {label}"),
    };
    format!("[{}] {}: {}", format_clock(start_ms), prefix, words.join(" "))
}

/// Format milliseconds as `MM:SS`, or `HH:MM:SS` from one hour on.
fn format_clock(ms: u64) -> String {
    let total_secs = ms / 1000;
    let hours = total_secs / 3600;
    let mins = (total_secs % 3600) / 60;
    let secs = total_secs % 60;

    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, mins, secs)
    } else {
        format!("{:02}:{:02}", mins, secs)
    }
}
