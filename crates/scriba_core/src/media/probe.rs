//! Media probing via ffprobe.

use std::path::{Path, PathBuf};
use std::process::Command;

use serde_json::Value;

use super::run_tool;
use crate::errors::{StepError, StepResult};

/// Container-level facts about a media file.
#[derive(Debug, Clone)]
pub struct MediaInfo {
    pub path: PathBuf,
    /// Container duration in seconds.
    pub duration_s: f64,
    /// File size in bytes.
    pub size_bytes: u64,
    /// Video width, when a video stream exists.
    pub width: Option<u32>,
    /// Video height, when a video stream exists.
    pub height: Option<u32>,
    /// Average frame rate as ffprobe reports it (e.g. "30000/1001").
    pub fps: Option<String>,
    pub has_video: bool,
    pub has_audio: bool,
}

/// Probe a media file with ffprobe.
pub fn probe_media(path: &Path) -> StepResult<MediaInfo> {
    if !path.exists() {
        return Err(StepError::file_not_found(path.display().to_string()));
    }

    let mut cmd = Command::new("ffprobe");
    cmd.args(["-v", "error", "-show_format", "-show_streams", "-of", "json"])
        .arg(path);

    let output = run_tool("ffprobe", &mut cmd)?;
    let json: Value = serde_json::from_slice(&output.stdout)
        .map_err(|e| StepError::parse_error("ffprobe output", e.to_string()))?;

    Ok(parse_media_json(&json, path))
}

/// Parse ffprobe's JSON into a [`MediaInfo`].
fn parse_media_json(json: &Value, path: &Path) -> MediaInfo {
    let format = json.get("format");

    let duration_s = format
        .and_then(|f| f.get("duration"))
        .and_then(|d| d.as_str())
        .and_then(|s| s.parse().ok())
        .unwrap_or(0.0);

    let size_bytes = format
        .and_then(|f| f.get("size"))
        .and_then(|s| s.as_str())
        .and_then(|s| s.parse().ok())
        .unwrap_or(0);

    let streams = json
        .get("streams")
        .and_then(|s| s.as_array())
        .cloned()
        .unwrap_or_default();

    let video_stream = streams
        .iter()
        .find(|s| s.get("codec_type").and_then(|t| t.as_str()) == Some("video"));

    let has_audio = streams
        .iter()
        .any(|s| s.get("codec_type").and_then(|t| t.as_str()) == Some("audio"));

    MediaInfo {
        path: path.to_path_buf(),
        duration_s,
        size_bytes,
        width: video_stream
            .and_then(|s| s.get("width"))
            .and_then(|w| w.as_u64())
            .map(|w| w as u32),
        height: video_stream
            .and_then(|s| s.get("height"))
            .and_then(|h| h.as_u64())
            .map(|h| h as u32),
        fps: video_stream
            .and_then(|s| s.get("avg_frame_rate"))
            .and_then(|r| r.as_str())
            .map(|s| s.to_string()),
        has_video: video_stream.is_some(),
        has_audio,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_video_with_audio() {
        let probe = json!({
            "format": {"duration": "12.480000", "size": "1048576"},
            "streams": [
                {"codec_type": "video", "width": 1920, "height": 1080, "avg_frame_rate": "30000/1001"},
                {"codec_type": "audio", "sample_rate": "48000"}
            ]
        });

        let info = parse_media_json(&probe, Path::new("/tmp/clip.mp4"));
        assert!((info.duration_s - 12.48).abs() < 1e-9);
        assert_eq!(info.size_bytes, 1_048_576);
        assert_eq!(info.width, Some(1920));
        assert_eq!(info.height, Some(1080));
        assert_eq!(info.fps.as_deref(), Some("30000/1001"));
        assert!(info.has_video);
        assert!(info.has_audio);
    }

    #[test]
    fn parses_audio_only_file() {
        let probe = json!({
            "format": {"duration": "33.1", "size": "2048"},
            "streams": [{"codec_type": "audio"}]
        });

        let info = parse_media_json(&probe, Path::new("/tmp/voice.m4a"));
        assert!(!info.has_video);
        assert!(info.has_audio);
        assert_eq!(info.width, None);
    }

    #[test]
    fn tolerates_missing_fields() {
        let info = parse_media_json(&json!({}), Path::new("/tmp/odd.bin"));
        assert_eq!(info.duration_s, 0.0);
        assert_eq!(info.size_bytes, 0);
        assert!(!info.has_video);
        assert!(!info.has_audio);
    }

    #[test]
    fn probe_rejects_missing_file() {
        let result = probe_media(Path::new("/nonexistent/clip.mp4"));
        assert!(matches!(result, Err(StepError::FileNotFound { .. })));
    }
}
