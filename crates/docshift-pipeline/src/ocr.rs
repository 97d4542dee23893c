// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Text extraction backends for the image strategy.
//
// The default backend shells out to `tesseract` through the command runner;
// with the `ocr` feature the pure-Rust `ocrs` engine can run in process.
// Either way a single invocation is bounded by the configured OCR timeout
// and aborted on cancellation.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use docshift_core::{ConversionError, ConverterConfig, DocshiftError, OcrEngineKind, OcrSettings};
use tracing::{debug, info, instrument};

use crate::cancel::CancelToken;
use crate::runner::{CommandRunner, CommandSpec, RunError};

/// Reads the text out of a preprocessed image file.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Backend name for logs.
    fn name(&self) -> &'static str;

    /// Recognised text, trimmed. May be empty; the caller decides what an
    /// empty result means.
    async fn extract(&self, image: &Path, cancel: &CancelToken) -> Result<String, ConversionError>;
}

/// Pick the configured backend. Called once at startup.
pub fn build_extractor(
    config: &ConverterConfig,
    runner: Arc<dyn CommandRunner>,
) -> Result<Arc<dyn TextExtractor>, DocshiftError> {
    let extractor: Arc<dyn TextExtractor> = match config.ocr.engine {
        OcrEngineKind::Tesseract => Arc::new(TesseractExtractor::new(
            runner,
            config.ocr.clone(),
            config.ocr_timeout(),
        )),
        OcrEngineKind::Ocrs => ocrs_extractor(config)?,
    };
    info!(backend = extractor.name(), "OCR backend selected");
    Ok(extractor)
}

#[cfg(feature = "ocr")]
fn ocrs_extractor(config: &ConverterConfig) -> Result<Arc<dyn TextExtractor>, DocshiftError> {
    Ok(Arc::new(OcrsExtractor::new(&config.ocr, config.ocr_timeout())?))
}

#[cfg(not(feature = "ocr"))]
fn ocrs_extractor(_config: &ConverterConfig) -> Result<Arc<dyn TextExtractor>, DocshiftError> {
    Err(DocshiftError::Config(
        "ocr engine `ocrs` requested but the ocr feature is not compiled in".into(),
    ))
}

// -- Tesseract ------------------------------------------------------------------

/// Runs `tesseract <image> stdout -l <langs> --psm <n> --oem <n>`.
pub struct TesseractExtractor {
    runner: Arc<dyn CommandRunner>,
    settings: OcrSettings,
    timeout: Duration,
}

impl TesseractExtractor {
    pub fn new(runner: Arc<dyn CommandRunner>, settings: OcrSettings, timeout: Duration) -> Self {
        Self {
            runner,
            settings,
            timeout,
        }
    }

    pub fn command_for(&self, image: &Path) -> CommandSpec {
        CommandSpec::new(&self.settings.program, self.timeout)
            .arg(image.as_os_str())
            .arg("stdout")
            .arg("-l")
            .arg(&self.settings.languages)
            .arg("--psm")
            .arg(self.settings.page_segmentation_mode.to_string())
            .arg("--oem")
            .arg(self.settings.engine_mode.to_string())
    }
}

#[async_trait]
impl TextExtractor for TesseractExtractor {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    #[instrument(skip_all, fields(image = %image.display()))]
    async fn extract(&self, image: &Path, cancel: &CancelToken) -> Result<String, ConversionError> {
        let output = self
            .runner
            .run(self.command_for(image), cancel)
            .await
            .map_err(|err| run_error_to_conversion(err, self.timeout))?;

        if !output.success() {
            return Err(ConversionError::ExternalToolFailure {
                detail: failure_detail(&self.settings.program, &output.diagnostic(), output.exit_code),
            });
        }

        let text = output.stdout_lossy().trim().to_string();
        debug!(chars = text.chars().count(), "tesseract finished");
        Ok(text)
    }
}

/// Classify a runner failure.
pub(crate) fn run_error_to_conversion(err: RunError, timeout: Duration) -> ConversionError {
    match err {
        RunError::TimedOut(_) => ConversionError::ConversionTimeout {
            seconds: timeout.as_secs(),
        },
        RunError::Cancelled => ConversionError::Cancelled,
        other => ConversionError::ExternalToolFailure {
            detail: other.to_string(),
        },
    }
}

/// Detail for a nonzero exit: captured output, or the exit status when the
/// tool printed nothing.
pub(crate) fn failure_detail(program: &str, diagnostic: &str, exit_code: Option<i32>) -> String {
    if !diagnostic.is_empty() {
        return diagnostic.to_string();
    }
    match exit_code {
        Some(code) => format!("{program} exited with status {code}"),
        None => format!("{program} was terminated by a signal"),
    }
}

// -- ocrs -----------------------------------------------------------------------

/// In-process OCR with `ocrs`. Models load once; each call runs on the
/// blocking pool.
#[cfg(feature = "ocr")]
pub struct OcrsExtractor {
    engine: Arc<docshift_document::OcrEngine>,
    timeout: Duration,
}

#[cfg(feature = "ocr")]
impl OcrsExtractor {
    pub fn new(settings: &OcrSettings, timeout: Duration) -> Result<Self, DocshiftError> {
        use docshift_document::scan::ocr::OcrModelPaths;

        let paths = OcrModelPaths::resolve(settings.model_dir.as_deref());
        let engine = docshift_document::OcrEngine::new(&paths)?;
        Ok(Self {
            engine: Arc::new(engine),
            timeout,
        })
    }
}

#[cfg(feature = "ocr")]
#[async_trait]
impl TextExtractor for OcrsExtractor {
    fn name(&self) -> &'static str {
        "ocrs"
    }

    #[instrument(skip_all, fields(image = %image.display()))]
    async fn extract(&self, image: &Path, cancel: &CancelToken) -> Result<String, ConversionError> {
        let engine = Arc::clone(&self.engine);
        let path = image.to_path_buf();
        let task = tokio::task::spawn_blocking(move || -> Result<String, DocshiftError> {
            let decoded = ::image::open(&path)
                .map_err(|err| DocshiftError::ImageError(format!("failed to open {}: {}", path.display(), err)))?;
            engine.recognize_text(&decoded)
        });

        // A timed-out or cancelled call is abandoned; the blocking thread
        // finishes on its own and its result is dropped.
        tokio::select! {
            joined = tokio::time::timeout(self.timeout, task) => match joined {
                Ok(Ok(result)) => Ok(result.map_err(ConversionError::from)?.trim().to_string()),
                Ok(Err(join)) => Err(ConversionError::Internal { detail: format!("OCR task failed: {join}") }),
                Err(_) => Err(ConversionError::ConversionTimeout { seconds: self.timeout.as_secs() }),
            },
            _ = cancel.cancelled() => Err(ConversionError::Cancelled),
        }
    }
}
