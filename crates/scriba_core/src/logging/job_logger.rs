//! Per-job logger with file and callback output.
//!
//! Each job gets its own logger that:
//! - Writes to a dedicated log file under the logs folder
//! - Mirrors messages to a console callback (if provided)
//! - Supports compact mode with progress filtering
//! - Maintains a tail buffer for error diagnosis

use std::collections::VecDeque;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use parking_lot::Mutex;

use super::types::{LogCallback, LogConfig, LogLevel, MessagePrefix};

/// Per-job logger with dual output (file + console).
///
/// Shared between the runner and observers as `Arc<JobLogger>`; all
/// methods take `&self`.
pub struct JobLogger {
    /// Job name for identification.
    job_name: String,
    /// Path to log file.
    log_path: PathBuf,
    /// File writer (buffered).
    file_writer: Mutex<Option<BufWriter<File>>>,
    /// Console callback for mirroring messages.
    callback: Mutex<Option<LogCallback>>,
    /// Logging configuration.
    config: LogConfig,
    /// Tail buffer for recent tool output (used for error diagnosis).
    tail_buffer: Mutex<VecDeque<String>>,
    /// Last progress value logged (for compact mode filtering).
    last_progress: Mutex<u32>,
}

impl JobLogger {
    /// Create a new job logger.
    ///
    /// # Arguments
    /// * `job_name` - Name of the job (used in log filename)
    /// * `log_dir` - Directory to write log file to
    /// * `config` - Logging configuration
    /// * `callback` - Optional callback for console output
    pub fn new(
        job_name: impl Into<String>,
        log_dir: impl AsRef<Path>,
        config: LogConfig,
        callback: Option<LogCallback>,
    ) -> std::io::Result<Self> {
        let job_name = job_name.into();
        let log_dir = log_dir.as_ref();

        fs::create_dir_all(log_dir)?;

        let log_path = log_dir.join(format!("{}.log", sanitize_filename(&job_name)));

        let file = File::create(&log_path)?;
        let file_writer = BufWriter::new(file);

        Ok(Self {
            job_name,
            log_path,
            file_writer: Mutex::new(Some(file_writer)),
            callback: Mutex::new(callback),
            config,
            tail_buffer: Mutex::new(VecDeque::with_capacity(100)),
            last_progress: Mutex::new(0),
        })
    }

    /// Get the job name.
    pub fn job_name(&self) -> &str {
        &self.job_name
    }

    /// Get the log file path.
    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Log a message at the specified level.
    pub fn log(&self, level: LogLevel, message: &str) {
        if level < self.config.level {
            return;
        }

        let formatted = self.format_message(message);
        self.output(&formatted);
    }

    /// Log an info message.
    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    /// Log a warning message.
    pub fn warn(&self, message: &str) {
        let msg = MessagePrefix::Warning.format(message);
        self.log(LogLevel::Warn, &msg);
    }

    /// Log an error message.
    pub fn error(&self, message: &str) {
        let msg = MessagePrefix::Error.format(message);
        self.log(LogLevel::Error, &msg);
    }

    /// Log a phase marker.
    pub fn phase(&self, phase_name: &str) {
        let msg = MessagePrefix::Phase.format(phase_name);
        self.log(LogLevel::Info, &msg);
    }

    /// Log a section marker.
    pub fn section(&self, section_name: &str) {
        let msg = MessagePrefix::Section.format(section_name);
        self.log(LogLevel::Info, &msg);
    }

    /// Log a skipped-step line.
    pub fn skip(&self, message: &str) {
        let msg = MessagePrefix::Skip.format(message);
        self.log(LogLevel::Info, &msg);
    }

    /// Log a success message.
    pub fn success(&self, message: &str) {
        let msg = MessagePrefix::Success.format(message);
        self.log(LogLevel::Info, &msg);
    }

    /// Log progress update (filtered in compact mode).
    ///
    /// Returns true if the progress was logged, false if filtered.
    pub fn progress(&self, percent: u32) -> bool {
        if self.config.compact {
            let mut last = self.last_progress.lock();
            let step = self.config.progress_step;

            // Only log at step intervals (e.g., 0%, 20%, 40%, ...)
            let current_step = (percent / step) * step;
            let last_step = (*last / step) * step;

            if current_step <= last_step && percent < 100 {
                return false;
            }
            *last = percent;
        }

        let msg = format!("Progress: {}%", percent);
        self.log(LogLevel::Info, &msg);
        true
    }

    /// Log command output line (for stdout/stderr from external tools).
    ///
    /// In compact mode, these are only added to the tail buffer.
    pub fn output_line(&self, line: &str, is_stderr: bool) {
        // Always add to tail buffer
        {
            let mut buffer = self.tail_buffer.lock();
            if buffer.len() >= self.config.error_tail {
                buffer.pop_front();
            }
            buffer.push_back(line.to_string());
        }

        // In compact mode, don't output every line
        if self.config.compact {
            return;
        }

        let prefix = if is_stderr { "[stderr] " } else { "" };
        let msg = format!("{}{}", prefix, line);
        self.output(&self.format_message(&msg));
    }

    /// Show the tail buffer (typically after an error).
    pub fn show_tail(&self, header: &str) {
        let buffer = self.tail_buffer.lock();
        if buffer.is_empty() {
            return;
        }

        self.output(&self.format_message(&format!("[{}/tail]", header)));
        for line in buffer.iter() {
            self.output(&self.format_message(line));
        }
    }

    /// Get the current tail buffer contents.
    pub fn get_tail(&self) -> Vec<String> {
        self.tail_buffer.lock().iter().cloned().collect()
    }

    /// Flush the log file.
    pub fn flush(&self) {
        if let Some(ref mut writer) = *self.file_writer.lock() {
            let _ = writer.flush();
        }
    }

    /// Close the logger and release resources.
    pub fn close(&self) {
        self.flush();
        *self.file_writer.lock() = None;
    }

    /// Format a message with timestamp (if enabled).
    fn format_message(&self, message: &str) -> String {
        if self.config.show_timestamps {
            let timestamp = Local::now().format("%H:%M:%S");
            format!("[{}] {}", timestamp, message)
        } else {
            message.to_string()
        }
    }

    /// Output a formatted message to file and console.
    fn output(&self, formatted: &str) {
        if let Some(ref mut writer) = *self.file_writer.lock() {
            let _ = writeln!(writer, "{}", formatted);
        }

        if let Some(ref callback) = *self.callback.lock() {
            callback(formatted);
        }
    }
}

impl Drop for JobLogger {
    fn drop(&mut self) {
        self.close();
    }
}

/// Sanitize a string to be safe for use as a filename.
fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            _ => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::tempdir;

    fn plain_config() -> LogConfig {
        LogConfig {
            show_timestamps: false,
            ..LogConfig::default()
        }
    }

    #[test]
    fn creates_log_file() {
        let dir = tempdir().unwrap();
        let logger = JobLogger::new("interview.mp3", dir.path(), LogConfig::default(), None).unwrap();

        assert!(logger.log_path().exists());
        assert!(logger
            .log_path()
            .to_string_lossy()
            .contains("interview.mp3.log"));
        assert_eq!(logger.job_name(), "interview.mp3");
    }

    #[test]
    fn writes_to_file() {
        let dir = tempdir().unwrap();
        let logger = JobLogger::new("job", dir.path(), LogConfig::default(), None).unwrap();

        logger.info("Test message");
        logger.flush();

        let content = fs::read_to_string(logger.log_path()).unwrap();
        assert!(content.contains("Test message"));
    }

    #[test]
    fn calls_console_callback() {
        let dir = tempdir().unwrap();
        let call_count = Arc::new(AtomicUsize::new(0));
        let count_clone = call_count.clone();

        let callback: LogCallback = Box::new(move |_msg| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });

        let logger = JobLogger::new("job", dir.path(), LogConfig::default(), Some(callback)).unwrap();

        logger.info("Message 1");
        logger.info("Message 2");

        assert_eq!(call_count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn level_filters_below_threshold() {
        let dir = tempdir().unwrap();
        let mut config = plain_config();
        config.level = LogLevel::Warn;

        let logger = JobLogger::new("job", dir.path(), config, None).unwrap();
        logger.info("quiet");
        logger.error("loud");
        logger.flush();

        let content = fs::read_to_string(logger.log_path()).unwrap();
        assert!(!content.contains("quiet"));
        assert!(content.contains("[ERROR] loud"));
    }

    #[test]
    fn prefixed_helpers_render_markers() {
        let dir = tempdir().unwrap();
        let logger = JobLogger::new("job", dir.path(), plain_config(), None).unwrap();

        logger.phase("transcribe");
        logger.skip("enhance: already_done");
        logger.section("artifacts");
        logger.success("done");
        logger.flush();

        let content = fs::read_to_string(logger.log_path()).unwrap();
        assert!(content.contains("=== transcribe ==="));
        assert!(content.contains("[SKIP] enhance: already_done"));
        assert!(content.contains("--- artifacts ---"));
        assert!(content.contains("[SUCCESS] done"));
    }

    #[test]
    fn compact_mode_filters_progress() {
        let dir = tempdir().unwrap();
        let mut config = LogConfig::default();
        config.compact = true;
        config.progress_step = 20;

        let logger = JobLogger::new("job", dir.path(), config, None).unwrap();

        // These should be filtered (not at 20% intervals)
        assert!(!logger.progress(5));
        assert!(!logger.progress(10));
        assert!(!logger.progress(15));

        // This should pass (at 20% interval)
        assert!(logger.progress(20));

        // This should be filtered
        assert!(!logger.progress(25));

        // This should pass
        assert!(logger.progress(40));

        // 100% always passes
        assert!(logger.progress(100));
    }

    #[test]
    fn verbose_mode_logs_every_progress() {
        let dir = tempdir().unwrap();
        let mut config = plain_config();
        config.compact = false;

        let logger = JobLogger::new("job", dir.path(), config, None).unwrap();
        assert!(logger.progress(3));
        assert!(logger.progress(4));
    }

    #[test]
    fn tail_buffer_maintains_limit() {
        let dir = tempdir().unwrap();
        let mut config = LogConfig::default();
        config.compact = true;
        config.error_tail = 5;

        let logger = JobLogger::new("job", dir.path(), config, None).unwrap();

        for i in 0..10 {
            logger.output_line(&format!("Line {}", i), false);
        }

        let tail = logger.get_tail();
        assert_eq!(tail.len(), 5);
        assert_eq!(tail[0], "Line 5");
        assert_eq!(tail[4], "Line 9");
    }

    #[test]
    fn compact_buffers_output_lines_until_shown() {
        let dir = tempdir().unwrap();
        let mut config = plain_config();
        config.compact = true;

        let logger = JobLogger::new("job", dir.path(), config, None).unwrap();
        logger.output_line("frame=  100", true);
        logger.output_line("Error while decoding", true);
        logger.flush();

        let before = fs::read_to_string(logger.log_path()).unwrap();
        assert!(!before.contains("frame="));

        logger.show_tail("ffmpeg");
        logger.flush();

        let after = fs::read_to_string(logger.log_path()).unwrap();
        assert!(after.contains("[ffmpeg/tail]"));
        assert!(after.contains("frame=  100"));
        assert!(after.contains("Error while decoding"));
    }

    #[test]
    fn verbose_prints_stderr_lines_directly() {
        let dir = tempdir().unwrap();
        let mut config = plain_config();
        config.compact = false;

        let logger = JobLogger::new("job", dir.path(), config, None).unwrap();
        logger.output_line("size=  2048kB", true);
        logger.flush();

        let content = fs::read_to_string(logger.log_path()).unwrap();
        assert!(content.contains("[stderr] size=  2048kB"));
    }

    #[test]
    fn no_timestamps_when_disabled() {
        let dir = tempdir().unwrap();
        let logger = JobLogger::new("job", dir.path(), plain_config(), None).unwrap();

        logger.info("bare line");
        logger.flush();

        let content = fs::read_to_string(logger.log_path()).unwrap();
        assert!(content.starts_with("bare line"));
    }

    #[test]
    fn sanitizes_filename() {
        assert_eq!(sanitize_filename("normal_name"), "normal_name");
        assert_eq!(sanitize_filename("has/slash"), "has_slash");
        assert_eq!(sanitize_filename("has:colon"), "has_colon");
        assert_eq!(sanitize_filename("a<b>c"), "a_b_c");
    }
}
