//! Narrow seam around external tool invocation.
//!
//! Every subprocess call in this crate goes through [`CommandRunner`],
//! modeled as `(program, args, stdin) -> (exit status, stdout, stderr)`
//! with a bounded timeout. Diagnostics code never touches
//! `std::process` directly, so tests can substitute a scripted fake.

use std::io::{Read, Write};
use std::process::{Command, Stdio};
use std::time::Duration;

use thiserror::Error;
use tracing::debug;
use wait_timeout::ChildExt;

/// Captured output of a finished external command.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    /// Exit code, if the process exited normally.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// True when the process exited with code zero.
    #[must_use]
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// Stdout followed by stderr, the way a terminal user sees it.
    #[must_use]
    pub fn combined(&self) -> String {
        let mut out = self.stdout.clone();
        out.push_str(&self.stderr);
        out
    }
}

/// Failure to obtain any output from an external tool.
#[derive(Error, Debug)]
pub enum ExecError {
    /// The program is not installed or not on PATH.
    #[error("{program} command not available")]
    Missing {
        /// Name of the missing program
        program: String,
    },

    /// The process did not finish within the allowed time.
    #[error("command timed out after {0:?}")]
    Timeout(Duration),

    /// Spawning or talking to the process failed.
    #[error("failed to run {program}: {source}")]
    Spawn {
        /// Program that failed to run
        program: String,
        /// Underlying I/O error
        source: std::io::Error,
    },
}

/// Executes external tools with a bounded timeout.
pub trait CommandRunner {
    /// Run `program` with `args`, feeding `stdin` and waiting at most
    /// `timeout` for it to finish.
    fn run(
        &self,
        program: &str,
        args: &[&str],
        stdin: &str,
        timeout: Duration,
    ) -> Result<CommandOutput, ExecError>;

    /// Whether `program` can be found on PATH.
    fn available(&self, program: &str) -> bool;
}

/// [`CommandRunner`] backed by real subprocesses.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(
        &self,
        program: &str,
        args: &[&str],
        stdin: &str,
        timeout: Duration,
    ) -> Result<CommandOutput, ExecError> {
        debug!(program, ?args, "running external tool");

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| {
                if source.kind() == std::io::ErrorKind::NotFound {
                    ExecError::Missing {
                        program: program.to_string(),
                    }
                } else {
                    ExecError::Spawn {
                        program: program.to_string(),
                        source,
                    }
                }
            })?;

        // Feed stdin from its own thread so the timeout below bounds
        // the whole call even when the child stops draining the pipe;
        // dropping the handle afterwards gives the tool its EOF.
        if let Some(mut handle) = child.stdin.take() {
            let input = stdin.to_owned();
            std::thread::spawn(move || {
                let _ = handle.write_all(input.as_bytes());
            });
        }

        // Drain stdout/stderr on separate threads; waiting first can
        // deadlock once a pipe buffer fills.
        let stdout_pipe = child.stdout.take();
        let stderr_pipe = child.stderr.take();
        let stdout_thread = std::thread::spawn(move || read_pipe(stdout_pipe));
        let stderr_thread = std::thread::spawn(move || read_pipe(stderr_pipe));

        let status = child.wait_timeout(timeout).map_err(|source| ExecError::Spawn {
            program: program.to_string(),
            source,
        })?;

        let Some(status) = status else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(ExecError::Timeout(timeout));
        };

        let stdout = stdout_thread.join().unwrap_or_default();
        let stderr = stderr_thread.join().unwrap_or_default();

        Ok(CommandOutput {
            status: status.code(),
            stdout,
            stderr,
        })
    }

    fn available(&self, program: &str) -> bool {
        which::which(program).is_ok()
    }
}

fn read_pipe<R: Read>(pipe: Option<R>) -> String {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        let _ = pipe.read_to_end(&mut buf);
    }
    String::from_utf8_lossy(&buf).into_owned()
}
