//! Speech enhancement engine abstraction.

use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;

use super::expand_placeholders;
use crate::errors::{StepError, StepResult};
use crate::media::{tail_of, STDERR_TAIL_CHARS};

/// A speech enhancement engine.
pub trait Enhancer: Send + Sync {
    /// Engine name for logs.
    fn name(&self) -> &str;

    /// Enhance `src` into `dst`.
    ///
    /// `Ok(false)` means the engine declined the input (no output was
    /// produced); callers fall back to the unenhanced audio.
    fn enhance(
        &self,
        src: &Path,
        dst: &Path,
        progress: Option<&dyn Fn(u64, u64)>,
    ) -> StepResult<bool>;
}

/// Enhancement through a configured external tool.
///
/// The argument template may use `{input}` and `{output}` placeholders.
/// Lines of the form `percent=NN` on the tool's stdout are forwarded as
/// progress.
pub struct CommandEnhancer {
    program: String,
    args: Vec<String>,
}

impl CommandEnhancer {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    fn build_command(&self, src: &Path, dst: &Path) -> Command {
        let src = src.to_string_lossy();
        let dst = dst.to_string_lossy();
        let mut cmd = Command::new(&self.program);
        cmd.args(expand_placeholders(
            &self.args,
            &[("{input}", src.as_ref()), ("{output}", dst.as_ref())],
        ));
        cmd
    }
}

impl Enhancer for CommandEnhancer {
    fn name(&self) -> &str {
        &self.program
    }

    fn enhance(
        &self,
        src: &Path,
        dst: &Path,
        progress: Option<&dyn Fn(u64, u64)>,
    ) -> StepResult<bool> {
        if !src.exists() {
            return Err(StepError::file_not_found(src.display().to_string()));
        }

        let mut cmd = self.build_command(src, dst);
        tracing::debug!("running enhancer: {:?}", cmd);

        let mut child = cmd
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                StepError::command_failed(&self.program, -1, format!("failed to launch: {e}"))
            })?;

        let stdout = child.stdout.take().ok_or_else(|| {
            StepError::command_failed(&self.program, -1, "failed to capture stdout")
        })?;
        let mut stderr = child.stderr.take().ok_or_else(|| {
            StepError::command_failed(&self.program, -1, "failed to capture stderr")
        })?;

        // Drain stderr on the side so a chatty tool cannot fill the pipe.
        let drain = thread::spawn(move || {
            let mut buf = String::new();
            let _ = stderr.read_to_string(&mut buf);
            buf
        });

        for line in BufReader::new(stdout).lines() {
            let Ok(line) = line else { break };
            if let Some(percent) = parse_percent(&line) {
                if let Some(report) = progress {
                    report(percent.min(100), 100);
                }
            }
        }

        let status = child
            .wait()
            .map_err(|e| StepError::io_error("wait for enhancer", e))?;
        let stderr_text = drain.join().unwrap_or_default();

        if !status.success() {
            return Err(StepError::command_failed(
                &self.program,
                status.code().unwrap_or(-1),
                tail_of(&stderr_text, STDERR_TAIL_CHARS),
            ));
        }

        if !dst.exists() {
            tracing::debug!("enhancer produced no output for {}", src.display());
            return Ok(false);
        }
        Ok(true)
    }
}

/// Parse a `percent=NN` progress line.
fn parse_percent(line: &str) -> Option<u64> {
    let (key, value) = line.trim().split_once('=')?;
    if key != "percent" {
        return None;
    }
    value.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn percent_lines_parse() {
        assert_eq!(parse_percent("percent=42"), Some(42));
        assert_eq!(parse_percent("  percent=100  "), Some(100));
        assert_eq!(parse_percent("loaded model"), None);
        assert_eq!(parse_percent("ratio=42"), None);
        assert_eq!(parse_percent("percent=abc"), None);
    }

    #[test]
    fn command_expands_placeholders() {
        let enhancer = CommandEnhancer::new(
            "denoise",
            vec!["{input}".to_string(), "-o".to_string(), "{output}".to_string()],
        );
        let cmd = enhancer.build_command(Path::new("/tmp/in.wav"), Path::new("/tmp/out.wav"));
        let args: Vec<String> = cmd
            .get_args()
            .map(|a| a.to_string_lossy().to_string())
            .collect();
        assert_eq!(args, vec!["/tmp/in.wav", "-o", "/tmp/out.wav"]);
    }

    #[test]
    fn reports_progress_and_succeeds_when_output_exists() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("in.wav");
        fs::write(&src, b"fake audio").unwrap();
        let dst = dir.path().join("out.wav");

        let enhancer = CommandEnhancer::new(
            "sh",
            vec![
                "-c".to_string(),
                "echo percent=50; echo percent=100; cp {input} {output}".to_string(),
            ],
        );

        let seen = Mutex::new(Vec::new());
        let report = |done: u64, total: u64| seen.lock().push((done, total));
        let produced = enhancer.enhance(&src, &dst, Some(&report)).unwrap();

        assert!(produced);
        assert!(dst.exists());
        assert_eq!(*seen.lock(), vec![(50, 100), (100, 100)]);
    }

    #[test]
    fn declining_tool_returns_false() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("in.wav");
        fs::write(&src, b"fake audio").unwrap();
        let dst = dir.path().join("out.wav");

        let enhancer = CommandEnhancer::new("true", Vec::new());
        let produced = enhancer.enhance(&src, &dst, None).unwrap();

        assert!(!produced);
        assert!(!dst.exists());
    }

    #[test]
    fn failing_tool_surfaces_stderr() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("in.wav");
        fs::write(&src, b"fake audio").unwrap();

        let enhancer = CommandEnhancer::new(
            "sh",
            vec!["-c".to_string(), "echo model missing >&2; exit 2".to_string()],
        );
        let err = enhancer
            .enhance(&src, dir.path().join("out.wav").as_path(), None)
            .unwrap_err();

        match err {
            StepError::CommandFailed {
                exit_code, message, ..
            } => {
                assert_eq!(exit_code, 2);
                assert!(message.contains("model missing"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn missing_source_is_rejected() {
        let enhancer = CommandEnhancer::new("true", Vec::new());
        let result = enhancer.enhance(
            Path::new("/nonexistent/in.wav"),
            Path::new("/tmp/out.wav"),
            None,
        );
        assert!(matches!(result, Err(StepError::FileNotFound { .. })));
    }
}
