// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// External process invocation behind the `CommandRunner` trait.
//
// Strategies describe a command (argv, timeout, working directory) and get
// back the exit code and captured streams. The production runner uses
// `tokio::process`, kills the child on timeout or cancellation, and never
// leaves an orphan behind.

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

use crate::cancel::CancelToken;

/// Bound for `--version` availability probes.
const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// One external command to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<OsString>,
    /// Hard wall-clock limit; the child is killed when it expires.
    pub timeout: Duration,
    pub working_dir: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout,
            working_dir: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Argument list as lossy strings, for logs and assertions.
    pub fn display_args(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }
}

/// Result of a command that ran to completion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    /// Captured stderr, or stdout when stderr is empty, trimmed.
    pub fn diagnostic(&self) -> String {
        let stderr = String::from_utf8_lossy(&self.stderr);
        let stderr = stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_string();
        }
        String::from_utf8_lossy(&self.stdout).trim().to_string()
    }
}

/// Why a command did not run to completion.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("command timed out after {0:?}")]
    TimedOut(Duration),

    #[error("command cancelled")]
    Cancelled,

    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed waiting for command: {0}")]
    Io(#[from] std::io::Error),
}

/// Runs external commands.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, spec: CommandSpec, cancel: &CancelToken) -> Result<CommandOutput, RunError>;
}

/// `tokio::process` implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioCommandRunner;

impl TokioCommandRunner {
    pub fn new() -> Self {
        Self
    }

    /// Check that `program` can be started, returning the first line of its
    /// `--version` output.
    pub async fn probe(&self, program: &str) -> Option<String> {
        let spec = CommandSpec::new(program, PROBE_TIMEOUT).arg("--version");
        match self.run(spec, &CancelToken::new()).await {
            Ok(output) if output.success() => {
                let version = output.stdout_lossy();
                let first = version.lines().next().unwrap_or_default().trim().to_string();
                info!(program, version = %first, "tool available");
                Some(first)
            }
            Ok(output) => {
                warn!(program, exit_code = ?output.exit_code, "tool probe failed");
                None
            }
            Err(err) => {
                warn!(program, error = %err, "tool unavailable");
                None
            }
        }
    }
}

#[async_trait]
impl CommandRunner for TokioCommandRunner {
    #[instrument(skip_all, fields(program = %spec.program, timeout = ?spec.timeout))]
    async fn run(&self, spec: CommandSpec, cancel: &CancelToken) -> Result<CommandOutput, RunError> {
        if cancel.is_cancelled() {
            return Err(RunError::Cancelled);
        }

        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &spec.working_dir {
            command.current_dir(dir);
        }

        debug!(args = ?spec.display_args(), "spawning");
        let child = command.spawn().map_err(|source| RunError::Spawn {
            program: spec.program.clone(),
            source,
        })?;

        // Dropping this future drops the child, and kill_on_drop kills it.
        let wait = child.wait_with_output();

        tokio::select! {
            result = tokio::time::timeout(spec.timeout, wait) => match result {
                Ok(output) => {
                    let output = output?;
                    let output = CommandOutput {
                        exit_code: output.status.code(),
                        stdout: output.stdout,
                        stderr: output.stderr,
                    };
                    debug!(exit_code = ?output.exit_code, "command finished");
                    Ok(output)
                }
                Err(_) => {
                    warn!("command timed out, killing child");
                    Err(RunError::TimedOut(spec.timeout))
                }
            },
            _ = cancel.cancelled() => {
                info!("command cancelled, killing child");
                Err(RunError::Cancelled)
            }
        }
    }
}
