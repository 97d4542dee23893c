// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-format conversion strategies.
//
// The dispatcher persists the source, picks the output path, and hands both
// to exactly one strategy. A strategy writes the output file (or fails) and
// owns the cleanup of any intermediate file it creates itself.

pub mod image;
pub mod office;
pub mod pdf;

use std::path::PathBuf;

use async_trait::async_trait;
use docshift_core::{ConversionError, OutputFormat};
use uuid::Uuid;

use crate::cancel::CancelToken;

pub use self::image::ImageToDocument;
pub use self::office::OfficeToPdf;
pub use self::pdf::PdfToOffice;

/// Everything a strategy needs to know about one request.
#[derive(Debug, Clone)]
pub struct Job {
    pub request_id: Uuid,
    /// Persisted copy of the upload.
    pub source: PathBuf,
    /// Where the strategy must write its result.
    pub output: PathBuf,
    /// Lowercase source extension.
    pub extension: String,
    pub sanitized_filename: String,
    pub output_format: OutputFormat,
}

/// One format-specific conversion.
#[async_trait]
pub trait ConversionStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Output file name for a source with this stem.
    fn output_filename(&self, stem: &str, format: OutputFormat) -> String;

    /// Convert `job.source` into `job.output`, returning the user-facing
    /// conversion label.
    async fn convert(&self, job: &Job, cancel: &CancelToken) -> Result<String, ConversionError>;
}

/// Run CPU-bound work on the blocking pool. A panic in `work` becomes
/// `ConversionError::Internal`.
pub(crate) async fn run_blocking<T, F>(work: F) -> Result<T, ConversionError>
where
    F: FnOnce() -> Result<T, ConversionError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|join| ConversionError::Internal {
            detail: format!("blocking task failed: {join}"),
        })?
}
