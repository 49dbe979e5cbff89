//! Black-canvas rendering and target-size video compression.

use std::fs;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;

use super::audio::AAC_BITRATE;
use super::probe::MediaInfo;
use super::{run_tool, tail_of, STDERR_TAIL_CHARS};
use crate::errors::{StepError, StepResult};

/// Canvas size and frame rate for audio-only renders.
pub const VIDEO_WIDTH: u32 = 854;
pub const VIDEO_HEIGHT: u32 = 480;
pub const VIDEO_FPS: u32 = 30;

/// Audio bitrate reserved when budgeting compressed output.
pub const AUDIO_BITRATE_KBPS: u64 = 128;

/// Floor for the computed video bitrate.
const MIN_VIDEO_BITRATE_KBPS: u64 = 100;

/// Pixel format every consumer player accepts.
const PIXEL_FORMAT: &str = "yuv420p";

/// Hardware H.264 encoders in probe order.
const HW_ENCODERS: &[EncoderInfo] = &[
    EncoderInfo {
        name: "h264_nvenc",
        label: "NVIDIA NVENC",
        extra_args: &["-preset", "p4", "-rc", "vbr"],
    },
    EncoderInfo {
        name: "h264_amf",
        label: "AMD AMF",
        extra_args: &["-quality", "balanced"],
    },
    EncoderInfo {
        name: "h264_qsv",
        label: "Intel QuickSync",
        extra_args: &["-preset", "medium"],
    },
    EncoderInfo {
        name: "h264_videotoolbox",
        label: "Apple VideoToolbox",
        extra_args: &[],
    },
];

/// Software fallback.
const CPU_ENCODER: EncoderInfo = EncoderInfo {
    name: "libx264",
    label: "CPU x264",
    extra_args: &["-preset", "medium"],
};

/// An H.264 encoder ffmpeg can use, with its tuning flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncoderInfo {
    /// ffmpeg encoder name.
    pub name: &'static str,
    /// Human-readable label for logs.
    pub label: &'static str,
    /// Encoder-specific flags.
    pub extra_args: &'static [&'static str],
}

impl std::fmt::Display for EncoderInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.label, self.name)
    }
}

/// Render an audio file onto a black canvas as an MP4.
///
/// WAV input is re-encoded to AAC; anything else is stream-copied.
pub fn audio_to_black_video(audio: &Path, out: &Path) -> StepResult<()> {
    if !audio.exists() {
        return Err(StepError::file_not_found(audio.display().to_string()));
    }

    let is_wav = audio
        .extension()
        .map(|e| e.eq_ignore_ascii_case("wav"))
        .unwrap_or(false);

    let mut cmd = Command::new("ffmpeg");
    cmd.arg("-y")
        .args(["-f", "lavfi", "-i"])
        .arg(format!(
            "color=c=black:s={VIDEO_WIDTH}x{VIDEO_HEIGHT}:r={VIDEO_FPS}"
        ))
        .arg("-i")
        .arg(audio)
        .args(["-vcodec", "libx264", "-preset", "ultrafast", "-crf", "35"]);

    if is_wav {
        cmd.args(["-acodec", "aac", "-b:a", AAC_BITRATE]);
    } else {
        cmd.args(["-acodec", "copy"]);
    }

    cmd.args(["-movflags", "+faststart", "-shortest"]).arg(out);

    run_tool("ffmpeg", &mut cmd)?;
    Ok(())
}

/// Check whether an encoder can produce a frame on this machine.
fn encoder_works(name: &str) -> bool {
    let result = Command::new("ffmpeg")
        .args(["-f", "lavfi", "-i", "nullsrc=s=64x64:d=0.1"])
        .args(["-vcodec", name, "-vframes", "1", "-f", "null", "-"])
        .output();
    matches!(result, Ok(output) if output.status.success())
}

/// Pick the best available encoder.
///
/// `force` accepts `"cpu"` or a specific hardware encoder name;
/// anything unavailable falls back to libx264.
pub fn detect_best_encoder(force: Option<&str>) -> EncoderInfo {
    if force == Some("cpu") {
        tracing::debug!("encoder forced to CPU");
        return CPU_ENCODER;
    }

    for encoder in HW_ENCODERS {
        if let Some(forced) = force {
            if forced != encoder.name {
                continue;
            }
        }
        if encoder_works(encoder.name) {
            tracing::debug!("using encoder {}", encoder);
            return *encoder;
        }
        tracing::debug!("encoder unavailable: {}", encoder);
    }

    tracing::debug!("no hardware encoder available, using {}", CPU_ENCODER);
    CPU_ENCODER
}

/// Video bitrate in kbps that hits `ratio` of the original size, after
/// reserving [`AUDIO_BITRATE_KBPS`] for audio.
pub fn target_video_bitrate_kbps(size_bytes: u64, duration_s: f64, ratio: f64) -> u64 {
    if duration_s <= 0.0 {
        return MIN_VIDEO_BITRATE_KBPS;
    }
    let target_bytes = size_bytes as f64 * ratio;
    let total_kbps = (target_bytes * 8.0) / (duration_s * 1000.0);
    ((total_kbps as i64) - (AUDIO_BITRATE_KBPS as i64)).max(MIN_VIDEO_BITRATE_KBPS as i64) as u64
}

/// Re-encode a video at the given bitrate.
///
/// libx264 runs two passes for size accuracy; hardware encoders run a
/// single VBR pass. `gain_db` above 0.1 dB is applied as an audio
/// volume filter. Progress percentages are reported through `progress`.
pub fn compress_video(
    info: &MediaInfo,
    gain_db: f64,
    encoder: &EncoderInfo,
    video_bitrate_kbps: u64,
    out: &Path,
    progress: Option<&dyn Fn(u64, u64)>,
) -> StepResult<()> {
    let stem = out
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "out".to_string());
    let passlog = out.with_file_name(format!(".{stem}_ffpass"));
    let passlog = passlog.to_string_lossy().to_string();

    let result = if encoder.name == "libx264" {
        let mut pass1 = build_encode_cmd(
            info,
            gain_db,
            encoder,
            video_bitrate_kbps,
            out,
            Some((1, &passlog)),
        );
        run_encode(&mut pass1, info.duration_s, progress).and_then(|()| {
            let mut pass2 = build_encode_cmd(
                info,
                gain_db,
                encoder,
                video_bitrate_kbps,
                out,
                Some((2, &passlog)),
            );
            run_encode(&mut pass2, info.duration_s, progress)
        })
    } else {
        let mut cmd = build_encode_cmd(info, gain_db, encoder, video_bitrate_kbps, out, None);
        run_encode(&mut cmd, info.duration_s, progress)
    };

    // x264 leaves its pass logs next to the output.
    for suffix in ["-0.log", "-0.log.mbtree"] {
        let leftover = PathBuf::from(format!("{passlog}{suffix}"));
        if leftover.exists() {
            let _ = fs::remove_file(&leftover);
        }
    }

    result
}

/// Assemble one encode invocation.
///
/// `two_pass` carries the pass number and the pass log path; pass 1
/// analyzes video only and discards its output.
fn build_encode_cmd(
    info: &MediaInfo,
    gain_db: f64,
    encoder: &EncoderInfo,
    video_bitrate_kbps: u64,
    out: &Path,
    two_pass: Option<(u8, &str)>,
) -> Command {
    let mut cmd = Command::new("ffmpeg");
    cmd.args(["-y", "-progress", "pipe:1", "-nostats"])
        .arg("-i")
        .arg(&info.path)
        .args(["-vcodec", encoder.name])
        .arg("-b:v")
        .arg(format!("{video_bitrate_kbps}k"))
        .args(encoder.extra_args)
        .args(["-pix_fmt", PIXEL_FORMAT]);

    if let Some((pass, logfile)) = two_pass {
        cmd.arg("-pass")
            .arg(pass.to_string())
            .arg("-passlogfile")
            .arg(logfile);
    }

    if matches!(two_pass, Some((1, _))) {
        cmd.args(["-an", "-f", "null"]).arg(null_sink());
        return cmd;
    }

    cmd.args(["-movflags", "+faststart"]);
    if info.has_audio {
        if gain_db.abs() > 0.1 {
            cmd.arg("-af").arg(format!("volume={gain_db:.2}dB"));
        }
        cmd.args(["-acodec", "aac", "-b:a"])
            .arg(format!("{AUDIO_BITRATE_KBPS}k"));
    } else {
        cmd.arg("-an");
    }
    cmd.arg(out);
    cmd
}

fn null_sink() -> &'static str {
    if cfg!(windows) {
        "NUL"
    } else {
        "/dev/null"
    }
}

/// Run an encode, translating ffmpeg's `-progress` stream into
/// percentage callbacks.
fn run_encode(
    cmd: &mut Command,
    duration_s: f64,
    progress: Option<&dyn Fn(u64, u64)>,
) -> StepResult<()> {
    tracing::debug!("running ffmpeg: {:?}", cmd);

    let mut child = cmd
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| StepError::command_failed("ffmpeg", -1, format!("failed to launch: {e}")))?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| StepError::command_failed("ffmpeg", -1, "failed to capture stdout"))?;
    let mut stderr = child
        .stderr
        .take()
        .ok_or_else(|| StepError::command_failed("ffmpeg", -1, "failed to capture stderr"))?;

    // Drain stderr on the side; ffmpeg writes enough there to fill the
    // pipe and stall the encode.
    let drain = thread::spawn(move || {
        let mut buf = String::new();
        let _ = stderr.read_to_string(&mut buf);
        buf
    });

    for line in BufReader::new(stdout).lines() {
        let Ok(line) = line else { break };
        let Some((key, value)) = line.trim().split_once('=') else {
            continue;
        };
        match key {
            // out_time_ms is microseconds despite the name.
            "out_time_ms" => {
                if duration_s > 0.0 {
                    if let Ok(micros) = value.parse::<f64>() {
                        let elapsed_s = micros / 1_000_000.0;
                        let percent = ((elapsed_s / duration_s) * 100.0).min(99.0) as u64;
                        if let Some(report) = progress {
                            report(percent, 100);
                        }
                    }
                }
            }
            "progress" if value == "end" => {
                if let Some(report) = progress {
                    report(100, 100);
                }
            }
            _ => {}
        }
    }

    let status = child
        .wait()
        .map_err(|e| StepError::io_error("wait for ffmpeg", e))?;
    let stderr_text = drain.join().unwrap_or_default();

    if !status.success() {
        return Err(StepError::command_failed(
            "ffmpeg",
            status.code().unwrap_or(-1),
            tail_of(&stderr_text, STDERR_TAIL_CHARS),
        ));
    }
    Ok(())
}
