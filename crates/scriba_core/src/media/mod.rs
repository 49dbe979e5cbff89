//! ffmpeg/ffprobe wrappers for the audio and video work the steps
//! delegate to external tools.

use std::process::{Command, Output};

use crate::errors::{StepError, StepResult};

pub mod audio;
pub mod probe;
pub mod video;

pub use audio::{
    encode_aac, extract_to_wav, gain_for_lufs, measure_lufs, normalize_loudness, AAC_BITRATE,
    TARGET_LUFS,
};
pub use probe::{probe_media, MediaInfo};
pub use video::{
    audio_to_black_video, compress_video, detect_best_encoder, target_video_bitrate_kbps,
    EncoderInfo,
};

/// How much of a failing tool's stderr to keep in the error message.
pub(crate) const STDERR_TAIL_CHARS: usize = 600;

/// Run an external tool to completion, capturing output.
///
/// Non-zero exit becomes a `CommandFailed` carrying the tail of stderr.
pub(crate) fn run_tool(tool: &str, cmd: &mut Command) -> StepResult<Output> {
    tracing::debug!("running {}: {:?}", tool, cmd);

    let output = cmd
        .output()
        .map_err(|e| StepError::command_failed(tool, -1, format!("failed to launch: {e}")))?;

    if !output.status.success() {
        return Err(StepError::command_failed(
            tool,
            output.status.code().unwrap_or(-1),
            tail_of(&String::from_utf8_lossy(&output.stderr), STDERR_TAIL_CHARS),
        ));
    }

    Ok(output)
}

/// Last `max_chars` characters of `text`, trimmed.
pub(crate) fn tail_of(text: &str, max_chars: usize) -> String {
    let count = text.chars().count();
    if count <= max_chars {
        return text.trim().to_string();
    }
    text.chars()
        .skip(count - max_chars)
        .collect::<String>()
        .trim()
        .to_string()
}
