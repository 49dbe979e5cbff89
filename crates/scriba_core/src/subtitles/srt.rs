//! SRT subtitle writer.
//!
//! # Timing Precision
//!
//! SRT uses millisecond timing (HH:MM:SS,mmm). Segment times are float
//! seconds internally and are rounded to the nearest millisecond at
//! write time; negative times clamp to zero.

use std::collections::BTreeMap;

use super::speakers::display_name;
use crate::models::Segment;

/// Write segments to an SRT format string.
///
/// Each segment becomes one cue: a 1-based index line, a timing line,
/// and a `[Speaker] text` payload, with a blank line between cues. The
/// speaker label is mapped through `speaker_names` when present.
pub fn segments_to_srt(segments: &[Segment], speaker_names: &BTreeMap<String, String>) -> String {
    let mut output = String::new();

    for (i, segment) in segments.iter().enumerate() {
        if i > 0 {
            output.push('\n');
        }

        output.push_str(&format!("{}\n", i + 1));
        output.push_str(&format!(
            "{} --> {}\n",
            format_srt_time(segment.start),
            format_srt_time(segment.end)
        ));
        output.push_str(&format!(
            "[{}] {}\n",
            display_name(&segment.speaker, speaker_names),
            segment.text
        ));
    }

    output
}

/// Format seconds as an SRT timestamp (HH:MM:SS,mmm).
pub fn format_srt_time(seconds: f64) -> String {
    let total_ms = (seconds * 1000.0).round().max(0.0) as u64;

    let millis = total_ms % 1000;
    let total_secs = total_ms / 1000;
    let secs = total_secs % 60;
    let total_mins = total_secs / 60;
    let mins = total_mins % 60;
    let hours = total_mins / 60;

    format!("{:02}:{:02}:{:02},{:03}", hours, mins, secs, millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(speaker: &str, start: f64, end: f64, text: &str) -> Segment {
        Segment {
            speaker: speaker.to_string(),
            start,
            end,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_format_srt_time() {
        assert_eq!(format_srt_time(0.0), "00:00:00,000");
        assert_eq!(format_srt_time(1.5), "00:00:01,500");
        assert_eq!(format_srt_time(61.0), "00:01:01,000");
        assert_eq!(format_srt_time(3661.5), "01:01:01,500");
        assert_eq!(format_srt_time(-2.0), "00:00:00,000");
    }

    #[test]
    fn test_write_basic_srt() {
        let segments = vec![
            seg("A", 0.0, 2.5, "Hola a todos."),
            seg("B", 3.0, 5.0, "Buenas tardes."),
        ];

        let output = segments_to_srt(&segments, &BTreeMap::new());
        let expected = "1\n00:00:00,000 --> 00:00:02,500\n[A] Hola a todos.\n\n2\n00:00:03,000 --> 00:00:05,000\n[B] Buenas tardes.\n";
        assert_eq!(output, expected);
    }

    #[test]
    fn test_speaker_names_are_mapped() {
        let segments = vec![seg("A", 0.0, 1.0, "Hola.")];
        let mut names = BTreeMap::new();
        names.insert("A".to_string(), "Marcel".to_string());

        let output = segments_to_srt(&segments, &names);
        assert!(output.contains("[Marcel] Hola."));
        assert!(!output.contains("[A]"));
    }

    #[test]
    fn test_unmapped_speaker_keeps_raw_label() {
        let segments = vec![seg("C", 0.0, 1.0, "Hola.")];
        let mut names = BTreeMap::new();
        names.insert("A".to_string(), "Marcel".to_string());

        let output = segments_to_srt(&segments, &names);
        assert!(output.contains("[C] Hola."));
    }

    #[test]
    fn test_empty_segments_give_empty_string() {
        assert_eq!(segments_to_srt(&[], &BTreeMap::new()), "");
    }
}
