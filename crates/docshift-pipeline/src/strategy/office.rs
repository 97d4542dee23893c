// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Office document to PDF through a headless office suite.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use docshift_core::{ConversionError, OutputFormat};
use tracing::{info, instrument, warn};

use super::{ConversionStrategy, Job};
use crate::cancel::CancelToken;
use crate::ocr::{failure_detail, run_error_to_conversion};
use crate::runner::{CommandRunner, CommandSpec};

/// Runs `<program> --headless --convert-to pdf --outdir <dir> <input>`.
///
/// Success needs both a zero exit code and the expected PDF on disk; the
/// converter is known to exit cleanly without writing anything.
pub struct OfficeToPdf {
    runner: Arc<dyn CommandRunner>,
    program: String,
    timeout: Duration,
}

impl OfficeToPdf {
    pub fn new(runner: Arc<dyn CommandRunner>, program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            runner,
            program: program.into(),
            timeout,
        }
    }

    fn command_for(&self, job: &Job) -> CommandSpec {
        let outdir = job
            .output
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_default();
        CommandSpec::new(&self.program, self.timeout)
            .arg("--headless")
            .arg("--convert-to")
            .arg("pdf")
            .arg("--outdir")
            .arg(outdir.as_os_str())
            .arg(job.source.as_os_str())
    }
}

#[async_trait]
impl ConversionStrategy for OfficeToPdf {
    fn name(&self) -> &'static str {
        "office-to-pdf"
    }

    fn output_filename(&self, stem: &str, _format: OutputFormat) -> String {
        format!("{stem}.pdf")
    }

    #[instrument(skip_all, fields(request_id = %job.request_id, program = %self.program))]
    async fn convert(&self, job: &Job, cancel: &CancelToken) -> Result<String, ConversionError> {
        cancel.check()?;

        let output = self
            .runner
            .run(self.command_for(job), cancel)
            .await
            .map_err(|err| run_error_to_conversion(err, self.timeout))?;

        if !output.success() {
            let detail = failure_detail(&self.program, &output.diagnostic(), output.exit_code);
            warn!(exit_code = ?output.exit_code, %detail, "office converter failed");
            return Err(ConversionError::ExternalToolFailure { detail });
        }

        if !tokio::fs::try_exists(&job.output).await.unwrap_or(false) {
            warn!(output = %job.output.display(), "office converter exited 0 without output");
            return Err(ConversionError::ExternalToolFailure {
                detail: "no output produced".into(),
            });
        }

        info!(output = %job.output.display(), "office document converted");
        Ok(format!("{} a PDF", job.extension.to_ascii_uppercase()))
    }
}
