// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Converter configuration, injected into the validator and dispatcher.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{DocshiftError, Result};
use crate::types::DocumentCategory;

/// Which preprocessing pipeline the image strategy should use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreprocessingMode {
    /// Full pipeline when compiled in, reduced otherwise.
    #[default]
    Auto,
    Full,
    Reduced,
}

/// OCR backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OcrEngineKind {
    /// External `tesseract` binary.
    #[default]
    Tesseract,
    /// In-process `ocrs` engine (requires the `ocr` feature).
    Ocrs,
}

/// Fixed OCR configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrSettings {
    pub engine: OcrEngineKind,
    /// Tesseract binary name or path.
    pub program: String,
    /// Two simultaneous language models, `+`-joined.
    pub languages: String,
    /// 6 = assume a single uniform block of text.
    pub page_segmentation_mode: u8,
    /// 1 = neural LSTM engine only.
    pub engine_mode: u8,
    /// Directory with `text-detection.rten` / `text-recognition.rten` for ocrs.
    pub model_dir: Option<PathBuf>,
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self {
            engine: OcrEngineKind::Tesseract,
            program: "tesseract".into(),
            languages: "spa+eng".into(),
            page_segmentation_mode: 6,
            engine_mode: 1,
            model_dir: None,
        }
    }
}

/// Limits, allow-lists, and storage location for the conversion core.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    /// Maximum accepted upload size in bytes.
    pub max_upload_size: u64,
    /// Lowercase extensions (no dot) accepted for upload.
    pub allowed_extensions: BTreeSet<String>,
    pub word_mime_types: BTreeSet<String>,
    pub pdf_mime_types: BTreeSet<String>,
    pub image_mime_types: BTreeSet<String>,
    /// Directory receiving source copies, temp artifacts, and outputs.
    pub storage_root: PathBuf,
    pub min_image_dimension: u32,
    pub max_image_dimension: u32,
    /// Wall-clock bound for the office converter subprocess.
    pub office_timeout_secs: u64,
    /// Wall-clock bound for one OCR invocation.
    pub ocr_timeout_secs: u64,
    /// Headless office converter binary.
    pub office_converter: String,
    pub ocr: OcrSettings,
    pub preprocessing: PreprocessingMode,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            max_upload_size: 10 * 1024 * 1024,
            allowed_extensions: set(&["docx", "doc", "odt", "rtf", "pdf", "jpg", "jpeg", "png"]),
            word_mime_types: set(&[
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
                "application/msword",
                "application/vnd.oasis.opendocument.text",
                "application/rtf",
                "text/rtf",
                "application/octet-stream",
            ]),
            pdf_mime_types: set(&["application/pdf", "application/x-pdf"]),
            image_mime_types: set(&["image/jpeg", "image/jpg", "image/png", "image/pjpeg"]),
            storage_root: PathBuf::from("media").join("converted_files"),
            min_image_dimension: 50,
            max_image_dimension: 4000,
            office_timeout_secs: 60,
            ocr_timeout_secs: 120,
            office_converter: "soffice".into(),
            ocr: OcrSettings::default(),
            preprocessing: PreprocessingMode::Auto,
        }
    }
}

impl ConverterConfig {
    /// Load a TOML configuration file. Missing keys keep their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&raw)
            .map_err(|e| DocshiftError::Config(format!("{}: {e}", path.display())))?;
        info!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Parse a TOML document.
    pub fn from_toml(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw).map_err(|e| DocshiftError::Config(e.to_string()))?;
        config.check()?;
        Ok(config)
    }

    /// Reject configurations the pipeline cannot honour.
    pub fn check(&self) -> Result<()> {
        if self.min_image_dimension > self.max_image_dimension {
            return Err(DocshiftError::Config(format!(
                "min_image_dimension {} exceeds max_image_dimension {}",
                self.min_image_dimension, self.max_image_dimension
            )));
        }
        if self.office_timeout_secs == 0 || self.ocr_timeout_secs == 0 {
            return Err(DocshiftError::Config("timeouts must be positive".into()));
        }
        Ok(())
    }

    /// MIME allow-list for a category.
    pub fn mime_types_for(&self, category: DocumentCategory) -> &BTreeSet<String> {
        match category {
            DocumentCategory::Word => &self.word_mime_types,
            DocumentCategory::Pdf => &self.pdf_mime_types,
            DocumentCategory::Image => &self.image_mime_types,
        }
    }

    pub fn office_timeout(&self) -> Duration {
        Duration::from_secs(self.office_timeout_secs)
    }

    pub fn ocr_timeout(&self) -> Duration {
        Duration::from_secs(self.ocr_timeout_secs)
    }

    /// Builder-style override used by hosts and tests.
    pub fn with_storage_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.storage_root = root.into();
        self
    }

    pub fn with_max_upload_size(mut self, bytes: u64) -> Self {
        self.max_upload_size = bytes;
        self
    }
}

fn set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}
