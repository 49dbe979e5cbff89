//! Engine construction from settings.

use std::sync::Arc;

use crate::config::{DiarizationSettings, EnhancementSettings, Settings, TranscriptionSettings};
use crate::errors::{StepError, StepResult};

use super::{
    AssemblyAiTranscriber, CommandDiarizer, CommandEnhancer, Diarizer, Enhancer, ModelCache,
    Transcriber,
};

/// Builds engine handles from settings, loading each at most once.
///
/// Handles are created lazily by the steps that need them, so a run
/// that never reaches a step (a dry run, or a full cache hit) does not
/// pay for engine setup or require provider credentials.
pub struct EngineFactory {
    cache: ModelCache,
    transcription: TranscriptionSettings,
    enhancement: EnhancementSettings,
    diarization: DiarizationSettings,
}

impl EngineFactory {
    pub fn new(settings: &Settings) -> Self {
        Self {
            cache: ModelCache::new(),
            transcription: settings.transcription.clone(),
            enhancement: settings.enhancement.clone(),
            diarization: settings.diarization.clone(),
        }
    }

    /// Whether an enhancement tool is configured.
    pub fn enhancement_configured(&self) -> bool {
        self.enhancement.enabled && !self.enhancement.tool.is_empty()
    }

    /// Whether a diarization tool is configured.
    pub fn diarization_configured(&self) -> bool {
        self.diarization.enabled && !self.diarization.tool.is_empty()
    }

    /// Transcription engine for the configured provider.
    pub fn transcriber(&self) -> StepResult<Arc<dyn Transcriber>> {
        match self.transcription.provider.as_str() {
            "assemblyai" => {
                let api_key = self.transcription.api_key.clone();
                let engine: Arc<AssemblyAiTranscriber> =
                    self.cache.get_or_create("transcriber:assemblyai", || {
                        if api_key.is_empty() {
                            AssemblyAiTranscriber::from_env()
                        } else {
                            AssemblyAiTranscriber::new(api_key)
                        }
                    })?;
                Ok(engine)
            }
            other => Err(StepError::precondition_failed(format!(
                "unknown transcription provider '{other}' (expected 'assemblyai')"
            ))),
        }
    }

    /// Enhancement engine, or `None` when no tool is configured.
    pub fn enhancer(&self) -> StepResult<Option<Arc<dyn Enhancer>>> {
        if !self.enhancement_configured() {
            return Ok(None);
        }
        let tool = self.enhancement.tool.clone();
        let args = self.enhancement.args.clone();
        let key = format!("enhancer:{tool}");
        let engine: Arc<CommandEnhancer> = self
            .cache
            .get_or_create(&key, || Ok(CommandEnhancer::new(tool, args)))?;
        Ok(Some(engine))
    }

    /// Diarization engine, or `None` when no tool is configured.
    pub fn diarizer(&self) -> StepResult<Option<Arc<dyn Diarizer>>> {
        if !self.diarization_configured() {
            return Ok(None);
        }
        let tool = self.diarization.tool.clone();
        let args = self.diarization.args.clone();
        let speakers_flag = self.diarization.speakers_flag.clone();
        let key = format!("diarizer:{tool}");
        let engine: Arc<CommandDiarizer> = self.cache.get_or_create(&key, || {
            let mut diarizer = CommandDiarizer::new(tool, args);
            if !speakers_flag.is_empty() {
                diarizer = diarizer.with_speakers_flag(speakers_flag);
            }
            Ok(diarizer)
        })?;
        Ok(Some(engine))
    }
}
