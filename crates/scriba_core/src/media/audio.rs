//! Audio extraction, loudness normalization, and AAC encoding.

use std::fs;
use std::path::Path;
use std::process::Command;

use super::run_tool;
use crate::errors::{StepError, StepResult};

/// Sample rate for extracted analysis audio.
pub const WAV_SAMPLE_RATE: u32 = 48_000;

/// Bitrate for AAC artifacts.
pub const AAC_BITRATE: &str = "192k";

/// Integrated loudness target (EBU R128).
pub const TARGET_LUFS: f64 = -23.0;

/// Measurements at or below this are treated as silence.
const SILENCE_FLOOR_LUFS: f64 = -69.0;

/// Loudness returned when measurement fails or the audio is silent.
const LUFS_SENTINEL: f64 = -70.0;

/// Gain is clamped to this range so a bad measurement cannot blow out
/// the audio.
const MAX_GAIN_DB: f64 = 30.0;

/// Extract audio to WAV: PCM s16le, 48 kHz, mono.
pub fn extract_to_wav(src: &Path, dst: &Path) -> StepResult<()> {
    if !src.exists() {
        return Err(StepError::file_not_found(src.display().to_string()));
    }

    let mut cmd = Command::new("ffmpeg");
    cmd.arg("-y")
        .arg("-i")
        .arg(src)
        .arg("-vn") // No video
        .arg("-acodec")
        .arg("pcm_s16le")
        .arg("-ar")
        .arg(WAV_SAMPLE_RATE.to_string())
        .arg("-ac")
        .arg("1") // Mono
        .arg(dst);

    run_tool("ffmpeg", &mut cmd)?;
    Ok(())
}

/// Encode audio to AAC M4A at [`AAC_BITRATE`].
pub fn encode_aac(src: &Path, dst: &Path) -> StepResult<()> {
    if !src.exists() {
        return Err(StepError::file_not_found(src.display().to_string()));
    }

    let mut cmd = Command::new("ffmpeg");
    cmd.arg("-y")
        .arg("-i")
        .arg(src)
        .arg("-vn")
        .arg("-acodec")
        .arg("aac")
        .arg("-b:a")
        .arg(AAC_BITRATE)
        .arg(dst);

    run_tool("ffmpeg", &mut cmd)?;
    Ok(())
}

/// Measure integrated loudness in LUFS with ffmpeg's loudnorm filter.
///
/// Returns the -70.0 sentinel when the measurement fails, the value is
/// `-inf`, or the value is NaN; callers treat that as silence.
pub fn measure_lufs(path: &Path) -> f64 {
    let mut cmd = Command::new("ffmpeg");
    cmd.arg("-i")
        .arg(path)
        .arg("-af")
        .arg("loudnorm=print_format=json")
        .arg("-f")
        .arg("null")
        .arg("-");

    tracing::debug!("measuring loudness: {:?}", cmd);

    // loudnorm prints its JSON summary on stderr.
    match cmd.output() {
        Ok(output) => {
            let stderr = String::from_utf8_lossy(&output.stderr);
            parse_input_i(&stderr).unwrap_or(LUFS_SENTINEL)
        }
        Err(e) => {
            tracing::debug!("loudness probe failed for {}: {}", path.display(), e);
            LUFS_SENTINEL
        }
    }
}

/// Gain in dB that would bring `measured` to [`TARGET_LUFS`].
///
/// Silence (at or below -69 LUFS) gets no gain; anything else gets the
/// difference, clamped to +/-30 dB.
pub fn gain_for_lufs(measured: f64) -> f64 {
    if measured <= SILENCE_FLOOR_LUFS {
        return 0.0;
    }
    (TARGET_LUFS - measured).clamp(-MAX_GAIN_DB, MAX_GAIN_DB)
}

/// Bring audio to [`TARGET_LUFS`] by applying a fixed gain.
///
/// Input that needs no gain (silence, or already at target) is copied
/// unchanged, as is input the gain filter fails on.
pub fn normalize_loudness(src: &Path, dst: &Path) -> StepResult<()> {
    if !src.exists() {
        return Err(StepError::file_not_found(src.display().to_string()));
    }

    let measured = measure_lufs(src);
    let gain_db = gain_for_lufs(measured);
    if gain_db == 0.0 {
        tracing::debug!("{} needs no gain, copying as-is", src.display());
        fs::copy(src, dst).map_err(|e| StepError::io_error("copy audio", e))?;
        return Ok(());
    }
    tracing::debug!(
        "normalizing {}: {:.1} LUFS -> {:.0} LUFS ({:+.1} dB)",
        src.display(),
        measured,
        TARGET_LUFS,
        gain_db
    );

    let mut cmd = Command::new("ffmpeg");
    cmd.arg("-y")
        .arg("-i")
        .arg(src)
        .arg("-af")
        .arg(format!("volume={gain_db:.2}dB"))
        .arg(dst);

    if let Err(e) = run_tool("ffmpeg", &mut cmd) {
        tracing::debug!("gain filter failed ({e}), copying as-is");
        fs::copy(src, dst).map_err(|e| StepError::io_error("copy audio", e))?;
    }
    Ok(())
}

/// Pull the `input_i` value out of loudnorm's JSON stderr block.
fn parse_input_i(stderr: &str) -> Option<f64> {
    let (_, after_key) = stderr.split_once("\"input_i\"")?;
    let (_, after_colon) = after_key.split_once(':')?;

    let raw = after_colon.trim_start().trim_start_matches('"');
    let value = raw.split('"').next()?.trim().trim_end_matches(',');

    if value == "-inf" {
        return None;
    }
    let parsed: f64 = value.parse().ok()?;
    if parsed.is_nan() {
        return None;
    }
    Some(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_input_i_from_loudnorm_block() {
        let stderr = concat!(
            "[Parsed_loudnorm_0 @ 0x55] \n",
            "{\n",
            "\t\"input_i\" : \"-31.20\",\n",
            "\t\"input_tp\" : \"-12.81\",\n",
            "\t\"input_lra\" : \"5.60\"\n",
            "}\n"
        );
        assert_eq!(parse_input_i(stderr), Some(-31.2));
    }

    #[test]
    fn rejects_inf_measurement() {
        let stderr = "{\n\t\"input_i\" : \"-inf\",\n\t\"input_tp\" : \"-inf\"\n}";
        assert_eq!(parse_input_i(stderr), None);
    }

    #[test]
    fn rejects_garbage_and_missing_key() {
        assert_eq!(parse_input_i("no json here"), None);
        assert_eq!(parse_input_i("{\"input_i\" : \"not-a-number\"}"), None);
    }

    #[test]
    fn extract_rejects_missing_source() {
        let result = extract_to_wav(Path::new("/nonexistent/audio.mp3"), Path::new("/tmp/out.wav"));
        assert!(matches!(result, Err(StepError::FileNotFound { .. })));
    }

    #[test]
    fn encode_rejects_missing_source() {
        let result = encode_aac(Path::new("/nonexistent/audio.wav"), Path::new("/tmp/out.m4a"));
        assert!(matches!(result, Err(StepError::FileNotFound { .. })));
    }

    #[test]
    fn gain_reaches_target_from_typical_speech() {
        assert!((gain_for_lufs(-31.2) - 8.2).abs() < 1e-9);
        assert!((gain_for_lufs(-18.0) - -5.0).abs() < 1e-9);
    }

    #[test]
    fn gain_is_zero_for_silence() {
        assert_eq!(gain_for_lufs(-70.0), 0.0);
        assert_eq!(gain_for_lufs(-69.0), 0.0);
    }

    #[test]
    fn gain_clamps_to_thirty_db() {
        // -60 LUFS is above the silence floor but needs +37 dB; the
        // clamp keeps it at +30.
        assert_eq!(gain_for_lufs(-60.0), 30.0);
    }
}
