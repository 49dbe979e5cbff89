//! WebVTT subtitle writer.
//!
//! Same cue content as the SRT writer, but with the `WEBVTT` header,
//! no index lines, and `.` as the millisecond separator.

use std::collections::BTreeMap;

use super::speakers::display_name;
use crate::models::Segment;

/// Write segments to a WebVTT format string.
pub fn segments_to_vtt(segments: &[Segment], speaker_names: &BTreeMap<String, String>) -> String {
    let mut output = String::from("WEBVTT\n\n");

    for segment in segments {
        output.push_str(&format!(
            "{} --> {}\n",
            format_vtt_time(segment.start),
            format_vtt_time(segment.end)
        ));
        output.push_str(&format!(
            "[{}] {}\n\n",
            display_name(&segment.speaker, speaker_names),
            segment.text
        ));
    }

    output
}

/// Format seconds as a WebVTT timestamp (HH:MM:SS.mmm).
pub fn format_vtt_time(seconds: f64) -> String {
    let total_ms = (seconds * 1000.0).round().max(0.0) as u64;

    let millis = total_ms % 1000;
    let total_secs = total_ms / 1000;
    let secs = total_secs % 60;
    let total_mins = total_secs / 60;
    let mins = total_mins % 60;
    let hours = total_mins / 60;

    format!("{:02}:{:02}:{:02}.{:03}", hours, mins, secs, millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_vtt_time() {
        assert_eq!(format_vtt_time(0.0), "00:00:00.000");
        assert_eq!(format_vtt_time(61.5), "00:01:01.500");
        assert_eq!(format_vtt_time(3661.5), "01:01:01.500");
    }

    #[test]
    fn test_vtt_has_header_and_no_index() {
        let segments = vec![Segment {
            speaker: "A".to_string(),
            start: 61.5,
            end: 63.0,
            text: "Un minuto ya.".to_string(),
        }];

        let output = segments_to_vtt(&segments, &BTreeMap::new());
        assert!(output.starts_with("WEBVTT\n\n"));
        assert!(output.contains("00:01:01.500 --> 00:01:03.000\n[A] Un minuto ya.\n"));
        assert!(!output.contains("\n1\n"));
    }
}
