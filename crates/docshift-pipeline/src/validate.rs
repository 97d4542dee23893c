// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Upload validation. Pure: no disk writes. Images have their header
// dimensions checked before the pixels are decoded in memory.

use std::sync::Arc;

use docshift_core::{
    ConverterConfig, DocshiftError, DocumentCategory, UploadedDocument, ValidatedInput, ValidationError,
    extension_of, sanitize_filename,
};
use docshift_document::image::processor::{ImageProcessor, read_dimensions};
use tracing::{debug, info, instrument};

/// Checks uploads against the configured limits and allow-lists.
#[derive(Debug, Clone)]
pub struct Validator {
    config: Arc<ConverterConfig>,
}

impl Validator {
    pub fn new(config: impl Into<Arc<ConverterConfig>>) -> Self {
        Self {
            config: config.into(),
        }
    }

    /// Run every check in order, stopping at the first failure:
    /// size, extension, content type, then (images only) header
    /// dimensions and a full decode. The filename is sanitized last.
    #[instrument(skip_all, fields(filename = document.filename(), size = document.size()))]
    pub fn validate(&self, document: UploadedDocument) -> Result<ValidatedInput, ValidationError> {
        let config = &self.config;

        if document.size() > config.max_upload_size {
            return Err(ValidationError::TooLarge {
                limit: config.max_upload_size,
                size: document.size(),
            });
        }

        let extension = extension_of(document.filename());
        let category = match DocumentCategory::from_extension(&extension) {
            Some(category) if config.allowed_extensions.contains(&extension) => category,
            _ => {
                return Err(ValidationError::UnsupportedExtension {
                    extension,
                    allowed: config.allowed_extensions.iter().cloned().collect(),
                });
            }
        };

        let content_type = normalize_content_type(document.content_type());
        if !config.mime_types_for(category).contains(&content_type) {
            return Err(ValidationError::InvalidContentType {
                content_type,
                extension,
            });
        }

        if category == DocumentCategory::Image {
            self.check_image(document.bytes())?;
        }

        let sanitized = sanitize_filename(document.filename(), &extension, category);
        info!(%extension, ?category, sanitized = %sanitized, "upload accepted");
        Ok(ValidatedInput::new_unchecked(
            document, extension, category, sanitized,
        ))
    }

    fn check_image(&self, bytes: &[u8]) -> Result<(), ValidationError> {
        let corrupt = |err: DocshiftError| ValidationError::CorruptImage {
            detail: err.to_string(),
        };
        let (width, height) = read_dimensions(bytes).map_err(corrupt)?;
        debug!(width, height, "image header read");

        let min = self.config.min_image_dimension;
        let max = self.config.max_image_dimension;
        if width < min || height < min {
            return Err(ValidationError::ImageTooSmall { width, height, min });
        }
        if width > max || height > max {
            return Err(ValidationError::ImageTooLarge { width, height, max });
        }

        // Bounded by the checks above.
        ImageProcessor::from_bytes(bytes).map_err(corrupt)?;
        Ok(())
    }
}

/// Lowercased media type without parameters (`; charset=...`).
fn normalize_content_type(raw: &str) -> String {
    raw.split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}
