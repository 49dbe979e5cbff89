//! Settings struct with TOML-based sections.
//!
//! Settings are organized into logical sections that map to TOML
//! tables. Each section can be updated independently.

use serde::{Deserialize, Serialize};

use crate::cache::DEFAULT_CACHE_FILE;
use crate::models::SrtMode;

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Transcription engine settings.
    #[serde(default)]
    pub transcription: TranscriptionSettings,

    /// Segment grouping settings.
    #[serde(default)]
    pub grouping: GroupingSettings,

    /// Speech enhancement settings.
    #[serde(default)]
    pub enhancement: EnhancementSettings,

    /// Speaker diarization settings.
    #[serde(default)]
    pub diarization: DiarizationSettings,

    /// Path-related settings.
    #[serde(default)]
    pub paths: PathSettings,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Which section of the config a value belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSection {
    Transcription,
    Grouping,
    Enhancement,
    Diarization,
    Paths,
    Logging,
}

impl ConfigSection {
    /// Every section, in file order.
    pub const ALL: [ConfigSection; 6] = [
        ConfigSection::Transcription,
        ConfigSection::Grouping,
        ConfigSection::Enhancement,
        ConfigSection::Diarization,
        ConfigSection::Paths,
        ConfigSection::Logging,
    ];

    /// TOML table name for this section.
    pub fn table_name(&self) -> &'static str {
        match self {
            ConfigSection::Transcription => "transcription",
            ConfigSection::Grouping => "grouping",
            ConfigSection::Enhancement => "enhancement",
            ConfigSection::Diarization => "diarization",
            ConfigSection::Paths => "paths",
            ConfigSection::Logging => "logging",
        }
    }
}

/// Transcription engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionSettings {
    /// Engine to use.
    #[serde(default = "default_provider")]
    pub provider: String,

    /// API key; empty falls back to the provider's environment variable.
    #[serde(default)]
    pub api_key: String,

    /// ISO language code; empty lets the engine detect the language.
    #[serde(default)]
    pub language: String,

    /// Expected number of speakers; 0 sends no hint.
    #[serde(default)]
    pub speakers_expected: u32,
}

impl TranscriptionSettings {
    /// Language as an optional hint.
    pub fn language_hint(&self) -> Option<&str> {
        if self.language.is_empty() {
            None
        } else {
            Some(&self.language)
        }
    }

    /// Speaker count as an optional hint.
    pub fn speakers_hint(&self) -> Option<u32> {
        (self.speakers_expected > 0).then_some(self.speakers_expected)
    }
}

fn default_provider() -> String {
    "assemblyai".to_string()
}

impl Default for TranscriptionSettings {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            api_key: String::new(),
            language: String::new(),
            speakers_expected: 0,
        }
    }
}

/// Segment grouping configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupingSettings {
    /// How chunks are grouped into subtitle segments.
    #[serde(default)]
    pub srt_mode: SrtMode,

    /// Character ceiling for a sentence-mode segment.
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,

    /// Duration ceiling in seconds for a sentence-mode segment.
    #[serde(default = "default_max_duration")]
    pub max_duration_s: f64,
}

fn default_max_chars() -> usize {
    80
}

fn default_max_duration() -> f64 {
    10.0
}

impl Default for GroupingSettings {
    fn default() -> Self {
        Self {
            srt_mode: SrtMode::default(),
            max_chars: default_max_chars(),
            max_duration_s: default_max_duration(),
        }
    }
}

/// Speech enhancement configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnhancementSettings {
    /// Whether enhancement runs at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// External tool to run; empty disables enhancement.
    #[serde(default)]
    pub tool: String,

    /// Argument template; `{input}` and `{output}` expand to paths.
    #[serde(default = "default_enhancer_args")]
    pub args: Vec<String>,
}

fn default_enhancer_args() -> Vec<String> {
    vec!["{input}".to_string(), "{output}".to_string()]
}

impl Default for EnhancementSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            tool: String::new(),
            args: default_enhancer_args(),
        }
    }
}

/// Speaker diarization configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiarizationSettings {
    /// Whether a diarization pass runs when words lack speaker labels.
    #[serde(default)]
    pub enabled: bool,

    /// External tool to run; empty disables diarization.
    #[serde(default)]
    pub tool: String,

    /// Argument template; `{input}` expands to the audio path.
    #[serde(default = "default_diarizer_args")]
    pub args: Vec<String>,

    /// Flag for the expected speaker count; empty drops the hint.
    #[serde(default)]
    pub speakers_flag: String,
}

fn default_diarizer_args() -> Vec<String> {
    vec!["{input}".to_string()]
}

impl Default for DiarizationSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            tool: String::new(),
            args: default_diarizer_args(),
            speakers_flag: String::new(),
        }
    }
}

/// Path configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathSettings {
    /// Folder for job log files.
    #[serde(default = "default_logs_folder")]
    pub logs_folder: String,

    /// Cache file name, resolved next to each source file.
    #[serde(default = "default_cache_file")]
    pub cache_file: String,
}

fn default_logs_folder() -> String {
    ".logs".to_string()
}

fn default_cache_file() -> String {
    DEFAULT_CACHE_FILE.to_string()
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            logs_folder: default_logs_folder(),
            cache_file: default_cache_file(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level filter for console output.
    #[serde(default = "default_level")]
    pub level: String,

    /// Filter progress lines to interval boundaries.
    #[serde(default = "default_true")]
    pub compact: bool,

    /// Progress update step percentage.
    #[serde(default = "default_progress_step")]
    pub progress_step: u32,

    /// Number of log lines kept for the error tail.
    #[serde(default = "default_error_tail")]
    pub error_tail: u32,

    /// Prefix job log lines with timestamps.
    #[serde(default = "default_true")]
    pub show_timestamps: bool,
}

fn default_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_progress_step() -> u32 {
    20
}

fn default_error_tail() -> u32 {
    20
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_level(),
            compact: true,
            progress_step: default_progress_step(),
            error_tail: default_error_tail(),
            show_timestamps: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let settings: Settings = toml::from_str("").unwrap();

        assert_eq!(settings.transcription.provider, "assemblyai");
        assert_eq!(settings.grouping.max_chars, 80);
        assert_eq!(settings.grouping.max_duration_s, 10.0);
        assert_eq!(settings.grouping.srt_mode, SrtMode::Sentences);
        assert!(settings.enhancement.enabled);
        assert!(!settings.diarization.enabled);
        assert_eq!(settings.paths.cache_file, DEFAULT_CACHE_FILE);
        assert_eq!(settings.logging.progress_step, 20);
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let settings: Settings = toml::from_str(
            "[grouping]\nsrt_mode = \"speaker-only\"\nmax_chars = 60\n",
        )
        .unwrap();

        assert_eq!(settings.grouping.srt_mode, SrtMode::SpeakerOnly);
        assert_eq!(settings.grouping.max_chars, 60);
        assert_eq!(settings.grouping.max_duration_s, 10.0);
        assert_eq!(settings.transcription.provider, "assemblyai");
    }

    #[test]
    fn hints_treat_sentinels_as_absent() {
        let mut transcription = TranscriptionSettings::default();
        assert_eq!(transcription.language_hint(), None);
        assert_eq!(transcription.speakers_hint(), None);

        transcription.language = "es".to_string();
        transcription.speakers_expected = 2;
        assert_eq!(transcription.language_hint(), Some("es"));
        assert_eq!(transcription.speakers_hint(), Some(2));
    }

    #[test]
    fn section_table_names_are_stable() {
        let names: Vec<&str> = ConfigSection::ALL.iter().map(|s| s.table_name()).collect();
        assert_eq!(
            names,
            vec![
                "transcription",
                "grouping",
                "enhancement",
                "diarization",
                "paths",
                "logging"
            ]
        );
    }
}
