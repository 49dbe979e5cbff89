//! Configuration loading and persistence.

pub mod manager;
pub mod settings;

pub use manager::{ConfigError, ConfigManager, ConfigResult};
pub use settings::{
    ConfigSection, DiarizationSettings, EnhancementSettings, GroupingSettings, LoggingSettings,
    PathSettings, Settings, TranscriptionSettings,
};
