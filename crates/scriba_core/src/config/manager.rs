//! Config manager for loading, saving, and atomic updates.
//!
//! Key features:
//! - Atomic writes (write to temp file, then rename)
//! - Section-level updates (only modified section is changed)
//! - Preserves comments and formatting with toml_edit

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use thiserror::Error;
use toml_edit::{DocumentMut, Item};

use super::settings::{ConfigSection, Settings};

/// Errors that can occur during config operations.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("Failed to parse config for editing: {0}")]
    EditParseError(#[from] toml_edit::TomlError),

    #[error("Config file not found: {0}")]
    NotFound(PathBuf),
}

/// Result type for config operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Manages application configuration.
///
/// Handles loading, saving, and atomic section-level updates.
pub struct ConfigManager {
    /// Path to the config file.
    config_path: PathBuf,
    /// Current settings loaded in memory.
    settings: Settings,
}

impl ConfigManager {
    /// Create a new config manager with the given config file path.
    ///
    /// Does not load the config; call `load()` or `load_or_create()`
    /// after.
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
            settings: Settings::default(),
        }
    }

    /// Get a reference to the current settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Get a mutable reference to the current settings.
    ///
    /// Changes made here are only in memory until `save()` or
    /// `update_section()` is called.
    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    /// Load config from file.
    ///
    /// Returns an error if the file doesn't exist.
    pub fn load(&mut self) -> ConfigResult<()> {
        if !self.config_path.exists() {
            return Err(ConfigError::NotFound(self.config_path.clone()));
        }

        let content = fs::read_to_string(&self.config_path)?;
        self.settings = toml::from_str(&content)?;
        Ok(())
    }

    /// Load config from file, creating it with defaults if missing.
    pub fn load_or_create(&mut self) -> ConfigResult<()> {
        if self.config_path.exists() {
            self.load()
        } else {
            self.settings = Settings::default();
            self.save()
        }
    }

    /// Save the entire config atomically.
    pub fn save(&self) -> ConfigResult<()> {
        let content = self.generate_config()?;
        self.atomic_write(&content)?;
        Ok(())
    }

    /// Update a specific section atomically.
    ///
    /// Re-reads the file from disk, replaces only the named section,
    /// and writes back; everything else in the file (including
    /// comments) survives.
    pub fn update_section(&mut self, section: ConfigSection) -> ConfigResult<()> {
        let current_content = if self.config_path.exists() {
            fs::read_to_string(&self.config_path)?
        } else {
            String::new()
        };

        let mut doc: DocumentMut = if current_content.is_empty() {
            DocumentMut::new()
        } else {
            current_content.parse()?
        };

        let section_toml = match section {
            ConfigSection::Transcription => toml::to_string_pretty(&self.settings.transcription)?,
            ConfigSection::Grouping => toml::to_string_pretty(&self.settings.grouping)?,
            ConfigSection::Enhancement => toml::to_string_pretty(&self.settings.enhancement)?,
            ConfigSection::Diarization => toml::to_string_pretty(&self.settings.diarization)?,
            ConfigSection::Paths => toml::to_string_pretty(&self.settings.paths)?,
            ConfigSection::Logging => toml::to_string_pretty(&self.settings.logging)?,
        };

        let section_doc: DocumentMut = section_toml.parse()?;
        doc[section.table_name()] = Item::Table(section_doc.as_table().clone());

        self.atomic_write(&doc.to_string())?;
        Ok(())
    }

    /// Generate config content with section comments.
    fn generate_config(&self) -> ConfigResult<String> {
        let mut output = String::new();

        output.push_str("# Scriba configuration\n");
        output.push_str("# Auto-generated; comments survive section updates.\n\n");

        for section in ConfigSection::ALL {
            let (comment, body) = match section {
                ConfigSection::Transcription => (
                    "# Transcription engine",
                    toml::to_string_pretty(&self.settings.transcription)?,
                ),
                ConfigSection::Grouping => (
                    "# Subtitle segment grouping",
                    toml::to_string_pretty(&self.settings.grouping)?,
                ),
                ConfigSection::Enhancement => (
                    "# Speech enhancement tool",
                    toml::to_string_pretty(&self.settings.enhancement)?,
                ),
                ConfigSection::Diarization => (
                    "# Speaker diarization tool",
                    toml::to_string_pretty(&self.settings.diarization)?,
                ),
                ConfigSection::Paths => (
                    "# Working directories and files",
                    toml::to_string_pretty(&self.settings.paths)?,
                ),
                ConfigSection::Logging => (
                    "# Logging configuration",
                    toml::to_string_pretty(&self.settings.logging)?,
                ),
            };

            output.push_str(comment);
            output.push('\n');
            output.push('[');
            output.push_str(section.table_name());
            output.push_str("]\n");
            output.push_str(&body);
            output.push('\n');
        }

        Ok(output)
    }

    /// Write content to the config file atomically.
    ///
    /// Writes to a temp file in the same directory first, then renames.
    fn atomic_write(&self, content: &str) -> io::Result<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let temp_path = self.config_path.with_extension("toml.tmp");

        {
            let mut file = fs::File::create(&temp_path)?;
            file.write_all(content.as_bytes())?;
            file.sync_all()?;
        }

        fs::rename(&temp_path, &self.config_path)?;
        Ok(())
    }
}
