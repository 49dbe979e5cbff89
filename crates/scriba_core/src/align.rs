//! Diarization-to-transcript alignment.
//!
//! Assigns each transcript chunk the speaker of the diarization segment
//! covering the chunk's midpoint. A single forward cursor walks the
//! time-sorted segment list alongside the chunks (two-pointer merge,
//! linear time, cursor never rewinds).

use std::cmp::Ordering;

use crate::models::{Chunk, DiarSegment};

/// Label each chunk with the speaker active at its midpoint.
///
/// Returns an empty vec when either input is empty. If the first chunk
/// already carries a speaker label the input is returned unchanged, so
/// backends that diarize internally pass through untouched. Chunks
/// without a usable interval are dropped. Once the cursor reaches the
/// last segment, every remaining chunk takes that segment's speaker.
pub fn assign_speakers(chunks: &[Chunk], segments: &[DiarSegment]) -> Vec<Chunk> {
    if chunks.is_empty() || segments.is_empty() {
        return Vec::new();
    }

    // Already aligned upstream.
    if chunks[0].speaker.is_some() {
        return chunks.to_vec();
    }

    let mut sorted: Vec<&DiarSegment> = segments.iter().collect();
    sorted.sort_by(|a, b| a.start.partial_cmp(&b.start).unwrap_or(Ordering::Equal));

    let mut aligned = Vec::with_capacity(chunks.len());
    let mut cursor = 0usize;

    for chunk in chunks {
        let midpoint = match chunk.midpoint() {
            Some(m) => m,
            None => continue,
        };

        while cursor < sorted.len() - 1 && sorted[cursor].end < midpoint {
            cursor += 1;
        }

        let mut labeled = chunk.clone();
        labeled.speaker = Some(sorted[cursor].speaker.clone());
        aligned.push(labeled);
    }

    aligned
}
