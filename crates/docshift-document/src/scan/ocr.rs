// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-process OCR using the `ocrs` crate, a pure-Rust engine running neural
// network models through `rten`.
//
// Only compiled with the `ocr` feature. The engine needs two model files,
// `text-detection.rten` and `text-recognition.rten`, in one directory. When
// no directory is configured the ocrs-cli cache (`$XDG_CACHE_HOME/ocrs` or
// `~/.cache/ocrs`) is used.

use std::path::{Path, PathBuf};

use docshift_core::error::DocshiftError;
use image::DynamicImage;
use ocrs::{ImageSource, OcrEngine as OcrsEngine, OcrEngineParams};
use rten::Model;
use tracing::{debug, info, instrument};

const DETECTION_MODEL_FILENAME: &str = "text-detection.rten";
const RECOGNITION_MODEL_FILENAME: &str = "text-recognition.rten";

/// Directory the ocrs CLI downloads its models into.
pub fn default_model_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CACHE_HOME") {
        PathBuf::from(xdg).join("ocrs")
    } else if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join(".cache").join("ocrs")
    } else {
        PathBuf::from("ocrs-models")
    }
}

/// Model file locations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcrModelPaths {
    pub detection: PathBuf,
    pub recognition: PathBuf,
}

impl OcrModelPaths {
    pub fn from_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            detection: dir.join(DETECTION_MODEL_FILENAME),
            recognition: dir.join(RECOGNITION_MODEL_FILENAME),
        }
    }

    /// Use `dir` if given, the ocrs cache otherwise.
    pub fn resolve(dir: Option<&Path>) -> Self {
        match dir {
            Some(dir) => Self::from_dir(dir),
            None => Self::from_dir(default_model_dir()),
        }
    }

    fn validate(&self) -> Result<(), DocshiftError> {
        for (kind, path) in [("detection", &self.detection), ("recognition", &self.recognition)] {
            if !path.exists() {
                return Err(DocshiftError::OcrError(format!(
                    "{kind} model not found at {}; run `ocrs-cli` once to download models",
                    path.display()
                )));
            }
        }
        Ok(())
    }
}

/// Loaded OCR engine. Model loading is expensive, so build one per process
/// and share it.
pub struct OcrEngine {
    engine: OcrsEngine,
}

impl OcrEngine {
    #[instrument(skip_all, fields(
        detection = %paths.detection.display(),
        recognition = %paths.recognition.display(),
    ))]
    pub fn new(paths: &OcrModelPaths) -> Result<Self, DocshiftError> {
        paths.validate()?;

        info!("Loading OCR models");
        let detection_model = Model::load_file(&paths.detection).map_err(|err| {
            DocshiftError::OcrError(format!(
                "failed to load detection model from {}: {}",
                paths.detection.display(),
                err
            ))
        })?;
        let recognition_model = Model::load_file(&paths.recognition).map_err(|err| {
            DocshiftError::OcrError(format!(
                "failed to load recognition model from {}: {}",
                paths.recognition.display(),
                err
            ))
        })?;

        let engine = OcrsEngine::new(OcrEngineParams {
            detection_model: Some(detection_model),
            recognition_model: Some(recognition_model),
            ..Default::default()
        })
        .map_err(|err| DocshiftError::OcrError(format!("failed to initialise OCR engine: {}", err)))?;

        info!("OCR engine ready");
        Ok(Self { engine })
    }

    /// Recognise all text in `image`, one line per output line.
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    pub fn recognize_text(&self, image: &DynamicImage) -> Result<String, DocshiftError> {
        let rgb = image.to_rgb8();
        let (width, height) = rgb.dimensions();

        let source = ImageSource::from_bytes(rgb.as_raw(), (width, height)).map_err(|err| {
            DocshiftError::OcrError(format!(
                "failed to create image source ({}x{}): {}",
                width, height, err
            ))
        })?;

        let input = self
            .engine
            .prepare_input(source)
            .map_err(|err| DocshiftError::OcrError(format!("OCR input preparation failed: {}", err)))?;

        let text = self
            .engine
            .get_text(&input)
            .map_err(|err| DocshiftError::OcrError(format!("OCR text recognition failed: {}", err)))?;

        debug!(lines = text.lines().count(), chars = text.chars().count(), "OCR complete");
        Ok(text)
    }
}
