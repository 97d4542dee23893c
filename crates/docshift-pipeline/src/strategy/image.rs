// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image to PDF or Word through OCR.
//
// Modelled as an explicit state machine:
//
//   Start -> Decoded -> Preprocessed -> Extracted -> Built -> Done
//
// with `Failed` reachable from every state. The preprocessed temp image is
// tracked by a guard local to this strategy and removed on every exit path.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use docshift_core::{ConversionError, DocshiftError, OutputFormat};
use docshift_document::{DocxWriter, ImageProcessor, PdfWriter, Preprocessor};
use image::DynamicImage;
use tempfile::TempPath;
use tracing::{debug, info, instrument, warn};

use super::{ConversionStrategy, Job, run_blocking};
use crate::cancel::CancelToken;
use crate::cleanup::ArtifactGuard;
use crate::ocr::TextExtractor;

/// Where one OCR conversion currently stands.
#[derive(Debug)]
pub enum OcrState {
    Start,
    Decoded {
        image: Arc<DynamicImage>,
    },
    Preprocessed {
        image: Arc<DynamicImage>,
        temp: PathBuf,
    },
    Extracted {
        image: Arc<DynamicImage>,
        text: String,
    },
    Built,
    Done,
    Failed(ConversionError),
}

impl OcrState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Decoded { .. } => "decoded",
            Self::Preprocessed { .. } => "preprocessed",
            Self::Extracted { .. } => "extracted",
            Self::Built => "built",
            Self::Done => "done",
            Self::Failed(_) => "failed",
        }
    }

    fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed(_))
    }
}

/// OCR strategy: decode, preprocess, extract, build.
pub struct ImageToDocument {
    preprocessor: Arc<dyn Preprocessor>,
    extractor: Arc<dyn TextExtractor>,
    temp_dir: PathBuf,
}

impl ImageToDocument {
    pub fn new(
        preprocessor: Arc<dyn Preprocessor>,
        extractor: Arc<dyn TextExtractor>,
        temp_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            preprocessor,
            extractor,
            temp_dir: temp_dir.into(),
        }
    }

    /// Fresh `<temp_dir>/tmp_<sanitized stem>_<random>.png`.
    fn create_temp(temp_dir: &Path, stem: &str) -> Result<TempPath, ConversionError> {
        let file = tempfile::Builder::new()
            .prefix(&format!("tmp_{stem}_"))
            .suffix(".png")
            .tempfile_in(temp_dir)
            .map_err(DocshiftError::from)?;
        Ok(file.into_temp_path())
    }

    /// Drive the state machine to a terminal state.
    pub async fn run(&self, job: &Job, cancel: &CancelToken) -> OcrState {
        let mut temps = ArtifactGuard::new("ocr-temp");
        let mut state = OcrState::Start;

        while !state.is_terminal() {
            let from = state.name();
            state = match cancel.check() {
                Err(err) => OcrState::Failed(err),
                Ok(()) => self.step(state, job, cancel, &mut temps).await,
            };
            debug!(from, to = state.name(), "OCR state transition");
        }

        // Remove the temp image before reporting, on success and failure.
        drop(temps);
        state
    }

    async fn step(
        &self,
        state: OcrState,
        job: &Job,
        cancel: &CancelToken,
        temps: &mut ArtifactGuard,
    ) -> OcrState {
        let next = match state {
            OcrState::Start => self.decode(job).await,
            OcrState::Decoded { image } => self.preprocess(image, job, temps).await,
            OcrState::Preprocessed { image, temp } => self.extract(image, &temp, cancel).await,
            OcrState::Extracted { image, text } => self.build(image, text, job).await,
            OcrState::Built => Ok(OcrState::Done),
            terminal @ (OcrState::Done | OcrState::Failed(_)) => Ok(terminal),
        };
        next.unwrap_or_else(OcrState::Failed)
    }

    async fn decode(&self, job: &Job) -> Result<OcrState, ConversionError> {
        let source = job.source.clone();
        let image = run_blocking(move || {
            ImageProcessor::open(&source)
                .map(|p| p.normalize_color_mode().into_dynamic())
                .map_err(ConversionError::from)
        })
        .await?;
        Ok(OcrState::Decoded {
            image: Arc::new(image),
        })
    }

    async fn preprocess(
        &self,
        image: Arc<DynamicImage>,
        job: &Job,
        temps: &mut ArtifactGuard,
    ) -> Result<OcrState, ConversionError> {
        let stem = Path::new(&job.sanitized_filename)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let temp = temps.adopt(Self::create_temp(&self.temp_dir, &stem)?);
        let preprocessor = Arc::clone(&self.preprocessor);
        let input = Arc::clone(&image);
        let target = temp.clone();
        run_blocking(move || {
            let processed = preprocessor.preprocess(&input)?;
            ImageProcessor::from_dynamic(processed).save_png(&target)?;
            Ok(())
        })
        .await?;
        debug!(pipeline = self.preprocessor.name(), temp = %temp.display(), "preprocessed image written");
        Ok(OcrState::Preprocessed { image, temp })
    }

    async fn extract(
        &self,
        image: Arc<DynamicImage>,
        temp: &Path,
        cancel: &CancelToken,
    ) -> Result<OcrState, ConversionError> {
        let text = self.extractor.extract(temp, cancel).await?;
        let text = text.trim().to_string();
        if text.is_empty() {
            warn!(backend = self.extractor.name(), "OCR produced no text");
            return Err(ConversionError::EmptyExtraction);
        }
        Ok(OcrState::Extracted { image, text })
    }

    async fn build(
        &self,
        image: Arc<DynamicImage>,
        text: String,
        job: &Job,
    ) -> Result<OcrState, ConversionError> {
        let title = job.sanitized_filename.clone();
        let output = job.output.clone();
        let format = job.output_format;
        run_blocking(move || {
            match format {
                OutputFormat::Pdf => PdfWriter::new(title).write_ocr_document(&image, &text, &output),
                OutputFormat::Word => {
                    DocxWriter::ocr_document(&title, &image, &text).and_then(|doc| doc.write_to(&output))
                }
            }
            .map_err(ConversionError::from)
        })
        .await?;
        Ok(OcrState::Built)
    }
}

/// User-facing label for an OCR conversion.
pub fn ocr_label(format: OutputFormat) -> &'static str {
    match format {
        OutputFormat::Pdf => "Imagen a PDF (OCR)",
        OutputFormat::Word => "Imagen a Word (OCR)",
    }
}

#[async_trait]
impl ConversionStrategy for ImageToDocument {
    fn name(&self) -> &'static str {
        "image-ocr"
    }

    fn output_filename(&self, stem: &str, format: OutputFormat) -> String {
        format!("{stem}_ocr.{}", format.extension())
    }

    #[instrument(skip_all, fields(
        request_id = %job.request_id,
        format = %job.output_format,
        pipeline = self.preprocessor.name(),
        backend = self.extractor.name(),
    ))]
    async fn convert(&self, job: &Job, cancel: &CancelToken) -> Result<String, ConversionError> {
        match self.run(job, cancel).await {
            OcrState::Done => {
                info!(output = %job.output.display(), "OCR conversion finished");
                Ok(ocr_label(job.output_format).to_string())
            }
            OcrState::Failed(err) => Err(err),
            other => Err(ConversionError::Internal {
                detail: format!("OCR stopped in non-terminal state {}", other.name()),
            }),
        }
    }
}
