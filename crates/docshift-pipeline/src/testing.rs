// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scripted stand-ins for the external tools, so strategies and the
// dispatcher can be exercised without soffice or tesseract installed.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use docshift_core::ConversionError;

use crate::cancel::CancelToken;
use crate::ocr::TextExtractor;
use crate::runner::{CommandOutput, CommandRunner, CommandSpec, RunError};

/// What a [`FakeRunner`] does when invoked.
#[derive(Debug, Clone)]
pub enum RunScript {
    /// Exit 0 printing `stdout`.
    Stdout(String),
    /// Exit with `code` printing `stderr`.
    Exit { code: i32, stderr: String },
    /// Behave like `soffice --convert-to pdf`: write `bytes` to
    /// `<outdir>/<input stem>.pdf` and exit 0.
    ConvertToPdf(Vec<u8>),
    /// Exit 0 without writing anything.
    SilentSuccess,
    /// Report the wall-clock limit as exceeded.
    TimeOut,
    /// Fail to start, as when the binary is missing.
    SpawnFailure,
    /// Block until cancelled or the command's timeout passes.
    Hang,
    /// Panic inside the runner.
    Panic,
}

/// Scripted [`CommandRunner`] that records every command it receives.
#[derive(Debug)]
pub struct FakeRunner {
    script: RunScript,
    calls: Mutex<Vec<CommandSpec>>,
}

impl FakeRunner {
    pub fn new(script: RunScript) -> Self {
        Self {
            script,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl CommandRunner for FakeRunner {
    async fn run(&self, spec: CommandSpec, cancel: &CancelToken) -> Result<CommandOutput, RunError> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(spec.clone());

        match &self.script {
            RunScript::Stdout(stdout) => Ok(CommandOutput {
                exit_code: Some(0),
                stdout: stdout.clone().into_bytes(),
                stderr: Vec::new(),
            }),
            RunScript::Exit { code, stderr } => Ok(CommandOutput {
                exit_code: Some(*code),
                stdout: Vec::new(),
                stderr: stderr.clone().into_bytes(),
            }),
            RunScript::ConvertToPdf(bytes) => {
                let target = office_output_path(&spec).ok_or_else(|| {
                    RunError::Io(std::io::Error::other("no --outdir or input in argv"))
                })?;
                tokio::fs::write(&target, bytes).await?;
                Ok(CommandOutput {
                    exit_code: Some(0),
                    ..CommandOutput::default()
                })
            }
            RunScript::SilentSuccess => Ok(CommandOutput {
                exit_code: Some(0),
                ..CommandOutput::default()
            }),
            RunScript::TimeOut => Err(RunError::TimedOut(spec.timeout)),
            RunScript::SpawnFailure => Err(RunError::Spawn {
                program: spec.program.clone(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
            }),
            RunScript::Hang => {
                tokio::select! {
                    _ = tokio::time::sleep(spec.timeout) => Err(RunError::TimedOut(spec.timeout)),
                    _ = cancel.cancelled() => Err(RunError::Cancelled),
                }
            }
            RunScript::Panic => panic!("scripted runner panic"),
        }
    }
}

/// `<outdir>/<stem of last arg>.pdf` from a `--convert-to pdf` argv.
fn office_output_path(spec: &CommandSpec) -> Option<PathBuf> {
    let args = spec.display_args();
    let outdir = args
        .iter()
        .position(|a| a == "--outdir")
        .and_then(|i| args.get(i + 1))?;
    let input = Path::new(args.last()?);
    let stem = input.file_stem()?.to_string_lossy().into_owned();
    Some(Path::new(outdir).join(format!("{stem}.pdf")))
}

/// What a [`FakeExtractor`] returns.
#[derive(Debug, Clone)]
pub enum ExtractScript {
    Text(String),
    Fail(ConversionError),
    /// Block until cancelled.
    Hang,
}

/// Scripted [`TextExtractor`]. Records each image path and whether the
/// file existed at the time of the call.
#[derive(Debug)]
pub struct FakeExtractor {
    script: ExtractScript,
    seen: Mutex<Vec<(PathBuf, bool)>>,
}

impl FakeExtractor {
    pub fn new(script: ExtractScript) -> Self {
        Self {
            script,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new(ExtractScript::Text(text.into()))
    }

    pub fn seen(&self) -> Vec<(PathBuf, bool)> {
        self.seen
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl TextExtractor for FakeExtractor {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn extract(&self, image: &Path, cancel: &CancelToken) -> Result<String, ConversionError> {
        self.seen
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((image.to_path_buf(), image.exists()));

        match &self.script {
            ExtractScript::Text(text) => Ok(text.trim().to_string()),
            ExtractScript::Fail(err) => Err(err.clone()),
            ExtractScript::Hang => {
                cancel.cancelled().await;
                Err(ConversionError::Cancelled)
            }
        }
    }
}
