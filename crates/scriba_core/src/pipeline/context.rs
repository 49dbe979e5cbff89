//! Pipeline context threaded through steps.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::models::{GroupingLimits, SrtMode};

/// Step-scoped progress reporter: `(done, total)`.
pub type ProgressFn = Arc<dyn Fn(u64, u64) + Send + Sync>;

/// Immutable per-file pipeline state.
///
/// Each step receives a context value and returns a new one; nothing
/// mutates shared state. Updates go through the consuming `with_*`
/// methods, which copy the untouched fields. One context is created per
/// input file and discarded when the run returns.
#[derive(Clone)]
pub struct PipelineContext {
    /// Source media file.
    pub src: PathBuf,
    /// Re-run steps even when their outputs exist.
    pub force: bool,
    /// Loudness-normalized audio artifact.
    pub normalized: Option<PathBuf>,
    /// Speech-enhanced audio artifact.
    pub enhanced: Option<PathBuf>,
    /// Word-level JSON transcript artifact.
    pub transcript_json: Option<PathBuf>,
    /// Plain-text transcript artifact.
    pub transcript_txt: Option<PathBuf>,
    /// SRT subtitle artifact.
    pub srt: Option<PathBuf>,
    /// Rendered black-canvas video artifact.
    pub video_out: Option<PathBuf>,
    /// Compressed video artifact.
    pub video_compressed: Option<PathBuf>,
    /// Language code hint for transcription (None = auto-detect).
    pub language: Option<String>,
    /// Expected speaker count hint for diarization.
    pub speakers: Option<u32>,
    /// Speaker label to display name mapping.
    pub speaker_names: BTreeMap<String, String>,
    /// Segmentation policy for subtitle output.
    pub srt_mode: SrtMode,
    /// Limits for the sentence grouping policy.
    pub grouping: GroupingLimits,
    /// Also write a WebVTT file next to the SRT.
    pub write_vtt: bool,
    /// Target size ratio for video compression.
    pub compress_ratio: Option<f64>,
    /// Whether the enhancement cache satisfied this run.
    pub cache_hit: bool,
    /// Per-step elapsed wall time in seconds.
    pub timings: BTreeMap<String, f64>,
    /// Progress reporter installed by the engine for the current step.
    step_progress: Option<ProgressFn>,
}

impl PipelineContext {
    /// Create a context for a source file with default task configuration.
    pub fn new(src: impl Into<PathBuf>) -> Self {
        Self {
            src: src.into(),
            force: false,
            normalized: None,
            enhanced: None,
            transcript_json: None,
            transcript_txt: None,
            srt: None,
            video_out: None,
            video_compressed: None,
            language: None,
            speakers: None,
            speaker_names: BTreeMap::new(),
            srt_mode: SrtMode::default(),
            grouping: GroupingLimits::default(),
            write_vtt: false,
            compress_ratio: None,
            cache_hit: false,
            timings: BTreeMap::new(),
            step_progress: None,
        }
    }

    /// Path of a derived artifact: source stem + suffix, in the source's
    /// directory.
    pub fn artifact_path(&self, suffix: &str) -> PathBuf {
        let stem = self
            .src
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.src.with_file_name(format!("{stem}{suffix}"))
    }

    /// Job name used in logs and errors: the source file name.
    pub fn job_name(&self) -> String {
        self.src
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.src.display().to_string())
    }

    /// Report progress for the current step, if the engine installed a
    /// reporter.
    pub fn report_progress(&self, done: u64, total: u64) {
        if let Some(ref progress) = self.step_progress {
            progress(done, total);
        }
    }

    // Task configuration builders, used when assembling the run.

    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn with_language(mut self, language: Option<String>) -> Self {
        self.language = language;
        self
    }

    pub fn with_speakers(mut self, speakers: Option<u32>) -> Self {
        self.speakers = speakers;
        self
    }

    pub fn with_speaker_names(mut self, speaker_names: BTreeMap<String, String>) -> Self {
        self.speaker_names = speaker_names;
        self
    }

    pub fn with_srt_mode(mut self, srt_mode: SrtMode) -> Self {
        self.srt_mode = srt_mode;
        self
    }

    pub fn with_grouping(mut self, grouping: GroupingLimits) -> Self {
        self.grouping = grouping;
        self
    }

    pub fn with_write_vtt(mut self, write_vtt: bool) -> Self {
        self.write_vtt = write_vtt;
        self
    }

    pub fn with_compress_ratio(mut self, ratio: Option<f64>) -> Self {
        self.compress_ratio = ratio;
        self
    }

    // Step-facing updates, each producing the next context value.

    pub fn with_normalized(mut self, path: Option<PathBuf>) -> Self {
        self.normalized = path;
        self
    }

    pub fn with_enhanced(mut self, path: Option<PathBuf>) -> Self {
        self.enhanced = path;
        self
    }

    pub fn with_transcripts(mut self, json: PathBuf, txt: PathBuf) -> Self {
        self.transcript_json = Some(json);
        self.transcript_txt = Some(txt);
        self
    }

    pub fn with_srt(mut self, path: PathBuf) -> Self {
        self.srt = Some(path);
        self
    }

    pub fn with_video(mut self, path: PathBuf) -> Self {
        self.video_out = Some(path);
        self
    }

    pub fn with_compressed(mut self, path: PathBuf) -> Self {
        self.video_compressed = Some(path);
        self
    }

    pub fn with_cache_hit(mut self, cache_hit: bool) -> Self {
        self.cache_hit = cache_hit;
        self
    }

    /// Record a step's elapsed wall time.
    pub fn with_timing(mut self, step: &str, seconds: f64) -> Self {
        self.timings.insert(step.to_string(), seconds);
        self
    }

    /// Install (or clear) the step-scoped progress reporter. Engine use.
    pub(crate) fn with_step_progress(mut self, progress: Option<ProgressFn>) -> Self {
        self.step_progress = progress;
        self
    }
}

impl std::fmt::Debug for PipelineContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineContext")
            .field("src", &self.src)
            .field("force", &self.force)
            .field("normalized", &self.normalized)
            .field("enhanced", &self.enhanced)
            .field("transcript_json", &self.transcript_json)
            .field("transcript_txt", &self.transcript_txt)
            .field("srt", &self.srt)
            .field("video_out", &self.video_out)
            .field("video_compressed", &self.video_compressed)
            .field("cache_hit", &self.cache_hit)
            .field("timings", &self.timings)
            .finish_non_exhaustive()
    }
}
