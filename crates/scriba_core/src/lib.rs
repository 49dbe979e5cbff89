//! Scriba Core - resumable transcription pipelines.
//!
//! This crate contains all business logic with zero UI dependencies:
//! the step/pipeline orchestrator, the pure alignment and segmentation
//! algorithms, subtitle writers, the enhancement cache, and the
//! ffmpeg/transcription engine wrappers. It can be used by the CLI
//! binary or embedded in another frontend.

pub mod align;
pub mod cache;
pub mod config;
pub mod engines;
pub mod errors;
pub mod logging;
pub mod media;
pub mod models;
pub mod pipeline;
pub mod runner;
pub mod segment;
pub mod steps;
pub mod subtitles;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_returns_value() {
        assert!(!version().is_empty());
    }
}
