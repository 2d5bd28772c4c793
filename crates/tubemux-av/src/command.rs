//! Builder for executing external tool commands.
//!
//! [`ToolCommand::execute`] runs a tool to completion and captures its
//! output (used for metadata lookups). [`ToolCommand::spawn`] starts a
//! long-running tool and returns a [`ToolProcess`] whose stderr can be
//! consumed line by line while it runs (used for muxing).

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStderr, Command};

use crate::{Error, Result};

/// Default command timeout: 5 minutes.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Output captured from a tool execution.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Process exit status.
    pub status: ExitStatus,
    /// Captured standard output (lossy UTF-8).
    pub stdout: String,
    /// Captured standard error (lossy UTF-8).
    pub stderr: String,
}

/// Where a spawned tool's standard output goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StdoutMode {
    /// Discard it.
    #[default]
    Null,
    /// Share this process's standard output with the child.
    Inherit,
}

/// A builder for constructing and executing external tool invocations.
///
/// # Example
///
/// ```no_run
/// use tubemux_av::ToolCommand;
/// use std::path::PathBuf;
///
/// # async fn example() -> tubemux_av::Result<()> {
/// let output = ToolCommand::new(PathBuf::from("yt-dlp"))
///     .arg("-J")
///     .arg("https://example.com/watch?v=abc")
///     .execute()
///     .await?;
/// println!("{}", output.stdout);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
    stdout: StdoutMode,
}

impl ToolCommand {
    /// Create a new command for the given program path.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
            stdout: StdoutMode::Null,
        }
    }

    /// Append a single argument.
    pub fn arg(&mut self, s: impl Into<String>) -> &mut Self {
        self.args.push(s.into());
        self
    }

    /// Append multiple arguments.
    pub fn args(&mut self, iter: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        self.args.extend(iter.into_iter().map(Into::into));
        self
    }

    /// Set the maximum execution time for [`ToolCommand::execute`].
    pub fn timeout(&mut self, d: Duration) -> &mut Self {
        self.timeout = d;
        self
    }

    /// Choose where a spawned process writes its standard output.
    pub fn stdout(&mut self, mode: StdoutMode) -> &mut Self {
        self.stdout = mode;
        self
    }

    /// The arguments collected so far.
    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    fn program_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.to_string_lossy().to_string())
    }

    /// Execute the command, capturing stdout and stderr.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ToolFailed`] if spawning fails, the process times out,
    /// or it exits with a non-zero status (message includes stderr).
    pub async fn execute(&self) -> Result<ToolOutput> {
        let program_name = self.program_name();

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd
            .spawn()
            .map_err(|e| Error::tool_failed(&program_name, format!("failed to spawn: {e}")))?;

        let result = tokio::time::timeout(self.timeout, child.wait_with_output()).await;

        match result {
            Ok(Ok(output)) => {
                let tool_output = ToolOutput {
                    status: output.status,
                    stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                    stderr: String::from_utf8_lossy(&output.stderr).to_string(),
                };

                if !output.status.success() {
                    return Err(Error::tool_failed(
                        program_name,
                        format!(
                            "exited with status {}: {}",
                            output.status,
                            tool_output.stderr.trim()
                        ),
                    ));
                }

                Ok(tool_output)
            }
            Ok(Err(e)) => Err(Error::tool_failed(
                program_name,
                format!("I/O error waiting for process: {e}"),
            )),
            // The child future is dropped here and kill_on_drop reaps it.
            Err(_elapsed) => Err(Error::tool_failed(
                program_name,
                format!("timed out after {:?}", self.timeout),
            )),
        }
    }

    /// Start the command and return a handle to the running process.
    ///
    /// stdin is closed, stdout follows [`ToolCommand::stdout`], and stderr is
    /// piped so it can be read through [`ToolProcess::next_line`]. No timeout
    /// applies to a spawned process.
    pub fn spawn(&self) -> Result<ToolProcess> {
        let program_name = self.program_name();

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        match self.stdout {
            StdoutMode::Null => cmd.stdout(Stdio::null()),
            StdoutMode::Inherit => cmd.stdout(Stdio::inherit()),
        };

        let mut child = cmd
            .spawn()
            .map_err(|e| Error::tool_failed(&program_name, format!("failed to spawn: {e}")))?;
        let stderr = child.stderr.take().map(BufReader::new);

        Ok(ToolProcess {
            name: program_name,
            child,
            stderr,
            line: Vec::new(),
        })
    }
}

/// Handle to a running external tool.
#[derive(Debug)]
pub struct ToolProcess {
    name: String,
    child: Child,
    stderr: Option<BufReader<ChildStderr>>,
    line: Vec<u8>,
}

impl ToolProcess {
    /// Next diagnostic line from the tool's stderr, or `None` at end of stream.
    ///
    /// Lines are decoded lossily; bytes that are not UTF-8 never end the
    /// stream. The pipe stays open until the process exits.
    pub async fn next_line(&mut self) -> Option<String> {
        let reader = self.stderr.as_mut()?;
        self.line.clear();
        match reader.read_until(b'\n', &mut self.line).await {
            Ok(0) => None,
            Ok(_) => {
                let line = String::from_utf8_lossy(&self.line);
                Some(line.trim_end_matches(['\n', '\r']).to_string())
            }
            Err(e) => {
                tracing::debug!("error reading {} stderr: {e}", self.name);
                None
            }
        }
    }

    /// Wait for the process to exit and return its status.
    ///
    /// Unread stderr is drained while waiting so the child never blocks on
    /// a full pipe or sees it closed early.
    pub async fn wait(mut self) -> Result<ExitStatus> {
        let stderr = self.stderr.take();
        let drain = async move {
            if let Some(mut reader) = stderr {
                let _ = tokio::io::copy(&mut reader, &mut tokio::io::sink()).await;
            }
        };
        let (_, status) = tokio::join!(drain, self.child.wait());
        status.map_err(|e| {
            Error::tool_failed(&self.name, format!("I/O error waiting for process: {e}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn execute_echo() {
        let output = ToolCommand::new("echo").arg("hello").execute().await;

        match output {
            Ok(out) => {
                assert!(out.status.success());
                assert!(out.stdout.trim().contains("hello"));
            }
            Err(_) => {
                // On some minimal environments echo may not exist; skip.
            }
        }
    }

    #[tokio::test]
    async fn execute_nonexistent_tool() {
        let result = ToolCommand::new("nonexistent_tool_xyz_12345")
            .execute()
            .await;
        let err = result.unwrap_err().to_string();
        assert!(err.contains("failed to spawn"), "unexpected error: {err}");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn timeout_fires() {
        let result = ToolCommand::new("sleep")
            .arg("10")
            .timeout(Duration::from_millis(100))
            .execute()
            .await;
        let err = result.unwrap_err().to_string();
        assert!(err.contains("timed out"), "unexpected error: {err}");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn execute_reports_stderr_on_failure() {
        let result = ToolCommand::new("sh")
            .args(["-c", "echo broken >&2; exit 3"])
            .execute()
            .await;
        let err = result.unwrap_err().to_string();
        assert!(err.contains("broken"), "unexpected error: {err}");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn spawn_streams_stderr_lines() {
        let mut process = ToolCommand::new("sh")
            .args(["-c", "echo one >&2; echo two >&2"])
            .spawn()
            .unwrap();

        let mut lines = Vec::new();
        while let Some(line) = process.next_line().await {
            lines.push(line);
        }
        let status = process.wait().await.unwrap();

        assert!(status.success());
        assert_eq!(lines, vec!["one", "two"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn spawn_reports_nonzero_exit() {
        let mut process = ToolCommand::new("sh")
            .args(["-c", "exit 2"])
            .spawn()
            .unwrap();
        assert!(process.next_line().await.is_none());
        let status = process.wait().await.unwrap();
        assert_eq!(status.code(), Some(2));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn spawn_decodes_non_utf8_lines_lossily() {
        let mut process = ToolCommand::new("sh")
            .args(["-c", r"printf 'caf\351\n' >&2; sleep 0.2; echo after >&2"])
            .spawn()
            .unwrap();

        let mut lines = Vec::new();
        while let Some(line) = process.next_line().await {
            lines.push(line);
        }
        let status = process.wait().await.unwrap();

        assert!(status.success());
        assert_eq!(lines, vec!["caf\u{FFFD}", "after"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn wait_drains_unread_stderr() {
        // More than a pipe buffer of stderr, never read by the caller.
        let script = "i=0; while [ $i -lt 5000 ]; do echo 'frame progress' >&2; i=$((i+1)); done";
        let process = ToolCommand::new("sh")
            .args(["-c", script])
            .spawn()
            .unwrap();
        let status = process.wait().await.unwrap();
        assert!(status.success());
    }

    #[test]
    fn spawn_missing_binary_fails() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let result = rt.block_on(async { ToolCommand::new("nonexistent_tool_xyz_12345").spawn() });
        assert!(matches!(result, Err(Error::ToolFailed { .. })));
    }
}
