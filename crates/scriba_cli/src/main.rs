//! scriba command-line interface.
//!
//! Parses flags, loads settings, and drives the selected files through
//! the pipeline one at a time. Per-job log lines are echoed to the
//! console; a summary table closes the run.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;

use scriba_core::config::{ConfigError, ConfigManager, Settings};
use scriba_core::errors::StepError;
use scriba_core::logging::{init_tracing, LogLevel};
use scriba_core::models::SrtMode;
use scriba_core::pipeline::StepDecision;
use scriba_core::runner::{JobResult, Runner};
use scriba_core::steps::RunOptions;
use scriba_core::subtitles::parse_speaker_names;

const DEFAULT_CONFIG_FILE: &str = "scriba.toml";

/// Turn recordings into transcripts and subtitles.
#[derive(Parser, Debug)]
#[command(name = "scriba", version, about = "Turn recordings into transcripts and subtitles")]
struct Cli {
    /// Audio or video files to process.
    #[arg(required = true, value_name = "FILE")]
    files: Vec<PathBuf>,

    /// Language code for transcription (default: auto-detect).
    #[arg(short, long, value_name = "LANG")]
    language: Option<String>,

    /// Expected number of speakers.
    #[arg(short, long, value_name = "N")]
    speakers: Option<u32>,

    /// Subtitle grouping: "sentences" or "speaker-only".
    #[arg(long, value_name = "MODE", value_parser = parse_srt_mode)]
    srt_mode: Option<SrtMode>,

    /// Speaker display names, e.g. "A=Alice,B=Bob".
    #[arg(long, value_name = "MAP")]
    speakers_map: Option<String>,

    /// Skip loudness normalization.
    #[arg(long)]
    no_normalize: bool,

    /// Skip speech enhancement even when a tool is configured.
    #[arg(long)]
    no_enhance: bool,

    /// Re-run every step, ignoring existing artifacts and the cache.
    #[arg(short, long)]
    force: bool,

    /// Render a black-frame video with the processed audio.
    #[arg(long)]
    video_output: bool,

    /// Compress the source video to this fraction of its size.
    #[arg(long, value_name = "RATIO", value_parser = parse_ratio)]
    compress: Option<f64>,

    /// Also write a WebVTT file next to the SRT.
    #[arg(long)]
    vtt: bool,

    /// Show what each step would do, then exit.
    #[arg(long)]
    dry_run: bool,

    /// Configuration file (default: scriba.toml when present).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Verbose diagnostics (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn parse_srt_mode(s: &str) -> Result<SrtMode, String> {
    s.parse().map_err(|e: StepError| e.to_string())
}

fn parse_ratio(s: &str) -> Result<f64, String> {
    let ratio: f64 = s.parse().map_err(|e| format!("not a number: {e}"))?;
    if ratio > 0.0 && ratio <= 1.0 {
        Ok(ratio)
    } else {
        Err("ratio must be above 0 and at most 1".to_string())
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match load_settings(cli.config.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    init_tracing(log_level(&cli, &settings));

    let runner = Runner::new(settings, run_options(&cli));

    if cli.dry_run {
        for file in &cli.files {
            print_decisions(file, &runner.dry_run(file));
        }
        return ExitCode::SUCCESS;
    }

    let mut results = Vec::new();
    for file in &cli.files {
        if !file.exists() {
            eprintln!("File not found: {}", file.display());
            continue;
        }
        results.push(runner.process_file(file, Some(Box::new(|line| println!("{line}")))));
    }

    print_summary(&results);

    if results.is_empty() || results.iter().any(|r| !r.ok) {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

/// Load settings from the given path, the default file, or defaults.
///
/// An explicitly passed path must load; the implicit default file is
/// only read when it exists.
fn load_settings(path: Option<&Path>) -> Result<Settings, ConfigError> {
    let path = match path {
        Some(path) => path,
        None => {
            let default = Path::new(DEFAULT_CONFIG_FILE);
            if !default.exists() {
                return Ok(Settings::default());
            }
            default
        }
    };

    let mut manager = ConfigManager::new(path);
    manager.load()?;
    Ok(manager.settings().clone())
}

fn log_level(cli: &Cli, settings: &Settings) -> LogLevel {
    match cli.verbose {
        0 => LogLevel::from_name(&settings.logging.level).unwrap_or_default(),
        1 => LogLevel::Debug,
        _ => LogLevel::Trace,
    }
}

fn run_options(cli: &Cli) -> RunOptions {
    RunOptions {
        language: cli.language.clone(),
        speakers: cli.speakers,
        srt_mode: cli.srt_mode,
        speaker_names: cli
            .speakers_map
            .as_deref()
            .map(parse_speaker_names)
            .unwrap_or_default(),
        skip_normalize: cli.no_normalize,
        skip_enhance: cli.no_enhance,
        force: cli.force,
        video_output: cli.video_output,
        compress_ratio: cli.compress,
        write_vtt: cli.vtt,
    }
}

fn print_decisions(file: &Path, decisions: &[StepDecision]) {
    println!("{}:", file.display());
    let width = decisions.iter().map(|d| d.name.len()).max().unwrap_or(0);
    for decision in decisions {
        let action = if decision.would_run { "run " } else { "skip" };
        let output = decision
            .output_path
            .as_deref()
            .map(file_name)
            .unwrap_or_default();
        println!(
            "  {:<width$}  {action}  {:<18} {output}",
            decision.name,
            decision.reason.as_str(),
        );
    }
}

fn print_summary(results: &[JobResult]) {
    if results.is_empty() {
        return;
    }

    let rows: Vec<[String; 3]> = results
        .iter()
        .map(|r| {
            [
                file_name(&r.file),
                r.srt.as_deref().map(file_name).unwrap_or_else(|| "N/A".to_string()),
                r.compressed.as_deref().map(file_name).unwrap_or_else(|| "-".to_string()),
            ]
        })
        .collect();

    let header = ["File", "SRT", "Compressed"];
    let mut widths = [header[0].len(), header[1].len(), header[2].len()];
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }

    println!();
    println!("Summary");
    println!(
        "{:<w0$}  {:<w1$}  {}",
        header[0],
        header[1],
        header[2],
        w0 = widths[0],
        w1 = widths[1],
    );
    for row in &rows {
        println!(
            "{:<w0$}  {:<w1$}  {}",
            row[0],
            row[1],
            row[2],
            w0 = widths[0],
            w1 = widths[1],
        );
    }

    for result in results.iter().filter(|r| !r.ok) {
        if let Some(error) = &result.error {
            eprintln!("{}: {error}", file_name(&result.file));
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_defaults() {
        let cli = Cli::try_parse_from(["scriba", "talk.mp3"]).unwrap();
        assert_eq!(cli.files, [PathBuf::from("talk.mp3")]);
        assert!(cli.language.is_none());
        assert!(cli.speakers.is_none());
        assert!(cli.srt_mode.is_none());
        assert!(!cli.no_normalize);
        assert!(!cli.no_enhance);
        assert!(!cli.force);
        assert!(!cli.video_output);
        assert!(cli.compress.is_none());
        assert!(!cli.vtt);
        assert!(!cli.dry_run);
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn requires_at_least_one_file() {
        assert!(Cli::try_parse_from(["scriba"]).is_err());
    }

    #[test]
    fn parses_the_full_flag_set() {
        let cli = Cli::try_parse_from([
            "scriba",
            "-l",
            "de",
            "-s",
            "2",
            "--srt-mode",
            "speaker-only",
            "--speakers-map",
            "A=Alice,B=Bob",
            "--no-normalize",
            "--force",
            "--video-output",
            "--compress",
            "0.4",
            "--vtt",
            "-vv",
            "a.mp3",
            "b.mp4",
        ])
        .unwrap();

        assert_eq!(cli.language.as_deref(), Some("de"));
        assert_eq!(cli.speakers, Some(2));
        assert_eq!(cli.srt_mode, Some(SrtMode::SpeakerOnly));
        assert_eq!(cli.compress, Some(0.4));
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.files.len(), 2);

        let options = run_options(&cli);
        assert!(options.skip_normalize);
        assert!(!options.skip_enhance);
        assert!(options.force);
        assert_eq!(options.speaker_names.get("A").map(String::as_str), Some("Alice"));
    }

    #[test]
    fn rejects_a_bad_srt_mode() {
        let err = Cli::try_parse_from(["scriba", "--srt-mode", "words", "a.mp3"]).unwrap_err();
        assert!(err.to_string().contains("srt mode"));
    }

    #[test]
    fn rejects_an_out_of_range_ratio() {
        assert!(Cli::try_parse_from(["scriba", "--compress", "1.5", "a.mp3"]).is_err());
        assert!(Cli::try_parse_from(["scriba", "--compress", "0", "a.mp3"]).is_err());
        assert!(Cli::try_parse_from(["scriba", "--compress", "0.4", "a.mp3"]).is_ok());
    }

    #[test]
    fn verbosity_overrides_the_configured_level() {
        let cli = Cli::try_parse_from(["scriba", "-v", "a.mp3"]).unwrap();
        assert_eq!(log_level(&cli, &Settings::default()), LogLevel::Debug);

        let cli = Cli::try_parse_from(["scriba", "a.mp3"]).unwrap();
        let mut settings = Settings::default();
        settings.logging.level = "warn".to_string();
        assert_eq!(log_level(&cli, &settings), LogLevel::Warn);
    }

    #[test]
    fn missing_explicit_config_is_an_error() {
        assert!(load_settings(Some(Path::new("/nonexistent/scriba.toml"))).is_err());
    }
}
