//! Subtitle and transcript writers.
//!
//! Each writer is a pure function from segments (or provider words) to a
//! formatted string; the steps handle file placement.

mod speakers;
mod srt;
mod transcript;
mod vtt;

pub use speakers::{display_name, parse_speaker_names};
pub use srt::{format_srt_time, segments_to_srt};
pub use transcript::words_to_transcript_txt;
pub use vtt::{format_vtt_time, segments_to_vtt};
