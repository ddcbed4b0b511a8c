//! Runs one trial of the tuning binary as a subprocess.
//!
//! The assignment goes in as a single JSON object on stdin; stdout and stderr
//! are collected until the process exits or the trial timeout elapses.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{ChildStdin, Command};
use tracing::{debug, warn};
use ts_types::TrialAssignment;

use crate::errors::{ExecutorError, ExecutorResult};

/// Program and arguments used to launch the tuning binary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialCommand {
    pub program: PathBuf,
    /// Empty for the tuning binary, which takes all input on stdin.
    pub args: Vec<String>,
}

impl TrialCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    fn display(&self) -> String {
        self.program.display().to_string()
    }
}

/// How the subprocess session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitState {
    /// The process exited on its own. `code` is `None` when killed by a signal.
    Exited { code: Option<i32>, success: bool },
    /// The trial timeout elapsed and the process was killed.
    TimedOut,
}

impl ExitState {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Exited { success: true, .. })
    }
}

impl From<ExitStatus> for ExitState {
    fn from(status: ExitStatus) -> Self {
        Self::Exited {
            code: status.code(),
            success: status.success(),
        }
    }
}

/// Everything collected from one subprocess session.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialOutput {
    pub stdout: String,
    pub stderr: String,
    pub status: ExitState,
    pub elapsed: Duration,
}

impl TrialOutput {
    fn timed_out(elapsed: Duration) -> Self {
        Self {
            stdout: String::new(),
            stderr: String::new(),
            status: ExitState::TimedOut,
            elapsed,
        }
    }

    pub fn is_timed_out(&self) -> bool {
        self.status == ExitState::TimedOut
    }
}

/// Launches a fresh tuning process per trial.
#[derive(Debug, Clone)]
pub struct TrialExecutor {
    command: TrialCommand,
    timeout: Duration,
}

impl TrialExecutor {
    pub fn new(command: TrialCommand, timeout: Duration) -> Self {
        Self { command, timeout }
    }

    pub fn command(&self) -> &TrialCommand {
        &self.command
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run one trial.
    ///
    /// Errors only when the process cannot be launched or its pipes fail. A
    /// timeout is reported as [`ExitState::TimedOut`] with no output, and the
    /// child is killed and reaped before returning. The child is also killed
    /// if this future is dropped mid-trial.
    pub async fn execute(&self, assignment: &TrialAssignment) -> ExecutorResult<TrialOutput> {
        let payload = assignment.to_json()?;
        debug!("Starting {} with arguments: {}", self.command.display(), payload);

        let started = Instant::now();
        let mut child = Command::new(&self.command.program)
            .args(&self.command.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ExecutorError::Launch {
                program: self.command.display(),
                source,
            })?;

        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let session = async {
            let (written, out, err) = tokio::join!(
                write_payload(stdin, payload.into_bytes()),
                drain(stdout),
                drain(stderr),
            );
            if let Err(e) = written {
                // The binary may exit before reading its input
                warn!("Could not write assignment to subprocess stdin: {}", e);
            }
            let status = child.wait().await?;
            Ok::<_, std::io::Error>((out?, err?, status))
        };

        let outcome = tokio::time::timeout(self.timeout, session).await;
        match outcome {
            Ok(Ok((out, err, status))) => Ok(TrialOutput {
                stdout: String::from_utf8_lossy(&out).into_owned(),
                stderr: String::from_utf8_lossy(&err).into_owned(),
                status: status.into(),
                elapsed: started.elapsed(),
            }),
            Ok(Err(e)) => {
                let _ = child.kill().await;
                Err(ExecutorError::Io(e))
            }
            Err(_) => {
                warn!(
                    "Trial exceeded timeout of {:?}; killing {}",
                    self.timeout,
                    self.command.display()
                );
                if let Err(e) = child.kill().await {
                    warn!("Failed to kill timed out subprocess: {}", e);
                }
                Ok(TrialOutput::timed_out(started.elapsed()))
            }
        }
    }
}

/// Write the payload and close stdin so the child sees end of input.
async fn write_payload(stdin: Option<ChildStdin>, payload: Vec<u8>) -> std::io::Result<()> {
    if let Some(mut stdin) = stdin {
        stdin.write_all(&payload).await?;
        stdin.shutdown().await?;
    }
    Ok(())
}

async fn drain<R: AsyncRead + Unpin>(stream: Option<R>) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    if let Some(mut stream) = stream {
        stream.read_to_end(&mut buf).await?;
    }
    Ok(buf)
}
