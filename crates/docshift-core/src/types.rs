// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Docshift conversion pipeline.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ConversionError, ErrorKind, ValidationError};
use crate::human_errors::{humanize_conversion, humanize_validation};

/// Input families the pipeline knows how to convert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentCategory {
    /// Word-processing documents (DOCX, DOC, ODT, RTF), converted to PDF.
    Word,
    /// PDF documents, converted to DOCX.
    Pdf,
    /// Raster images containing text, run through OCR.
    Image,
}

impl DocumentCategory {
    /// Infer the category from a lowercase extension without the dot.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "docx" | "doc" | "odt" | "rtf" => Some(Self::Word),
            "pdf" => Some(Self::Pdf),
            "jpg" | "jpeg" | "png" => Some(Self::Image),
            _ => None,
        }
    }

    /// Generic file stem used when sanitization leaves nothing behind.
    pub fn fallback_stem(&self) -> &'static str {
        match self {
            Self::Word | Self::Pdf => "documento",
            Self::Image => "imagen",
        }
    }
}

/// Output selector for the image strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Word,
    Pdf,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Word => "docx",
            Self::Pdf => "pdf",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "word" => Ok(Self::Word),
            "pdf" => Ok(Self::Pdf),
            other => Err(format!("unknown output format {other:?} (expected word or pdf)")),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Word => f.write_str("word"),
            Self::Pdf => f.write_str("pdf"),
        }
    }
}

/// A file as received from the host. Immutable once constructed.
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    bytes: Vec<u8>,
    filename: String,
    size: u64,
    content_type: String,
}

impl UploadedDocument {
    /// Wrap an upload. `size` is the size the host declared, which the
    /// validator checks against the configured limit.
    pub fn new(
        bytes: Vec<u8>,
        filename: impl Into<String>,
        size: u64,
        content_type: impl Into<String>,
    ) -> Self {
        Self {
            bytes,
            filename: filename.into(),
            size,
            content_type: content_type.into(),
        }
    }

    /// Convenience constructor declaring the actual byte length as the size.
    pub fn from_bytes(
        bytes: Vec<u8>,
        filename: impl Into<String>,
        content_type: impl Into<String>,
    ) -> Self {
        let size = bytes.len() as u64;
        Self::new(bytes, filename, size, content_type)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }
}

/// An upload that passed every validator check.
///
/// Only the validator constructs these, so `extension` is always in the
/// allow-list and `sanitized_filename` is never empty.
#[derive(Debug, Clone)]
pub struct ValidatedInput {
    document: UploadedDocument,
    extension: String,
    category: DocumentCategory,
    sanitized_filename: String,
}

impl ValidatedInput {
    #[doc(hidden)]
    pub fn new_unchecked(
        document: UploadedDocument,
        extension: String,
        category: DocumentCategory,
        sanitized_filename: String,
    ) -> Self {
        Self {
            document,
            extension,
            category,
            sanitized_filename,
        }
    }

    pub fn document(&self) -> &UploadedDocument {
        &self.document
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn category(&self) -> DocumentCategory {
        self.category
    }

    pub fn sanitized_filename(&self) -> &str {
        &self.sanitized_filename
    }

    /// Sanitized filename without its extension.
    pub fn stem(&self) -> &str {
        self.sanitized_filename
            .rsplit_once('.')
            .map(|(stem, _)| stem)
            .unwrap_or(&self.sanitized_filename)
    }
}

/// A validated input plus the output selector.
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    pub input: ValidatedInput,
    /// Only consulted by the image strategy.
    pub output_format: OutputFormat,
}

impl ConversionRequest {
    pub fn new(input: ValidatedInput) -> Self {
        Self {
            input,
            output_format: OutputFormat::default(),
        }
    }

    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }
}

/// Normalized result of one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionOutcome {
    Success {
        output_filename: String,
        conversion_label: String,
        /// Status-page message shown to the user.
        message: String,
    },
    Failure {
        error_kind: ErrorKind,
        human_message: String,
    },
}

impl ConversionOutcome {
    pub fn from_validation_error(err: &ValidationError) -> Self {
        Self::Failure {
            error_kind: err.kind(),
            human_message: humanize_validation(err).to_string(),
        }
    }

    pub fn from_conversion_error(err: &ConversionError) -> Self {
        Self::Failure {
            error_kind: err.kind(),
            human_message: humanize_conversion(err).to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn output_filename(&self) -> Option<&str> {
        match self {
            Self::Success {
                output_filename, ..
            } => Some(output_filename),
            Self::Failure { .. } => None,
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { error_kind, .. } => Some(*error_kind),
        }
    }
}

/// Lowercase extension (without the dot) of a declared filename.
///
/// Returns an empty string when the name has no suffix.
pub fn extension_of(filename: &str) -> String {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default()
}

/// Reduce a filename to ASCII alphanumerics plus `.`, `_` and `-`.
///
/// Leading dots are stripped so the result can never name a hidden file or
/// a relative path component. If no usable stem survives, a generic name
/// keyed by the category is used instead.
pub fn sanitize_filename(filename: &str, extension: &str, category: DocumentCategory) -> String {
    let raw_stem = filename
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(filename);
    let cleaned: String = raw_stem
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();
    let stem = cleaned.trim_matches('.');

    if stem.is_empty() || stem.chars().all(|c| matches!(c, '.' | '_' | '-')) {
        format!("{}.{}", category.fallback_stem(), extension)
    } else {
        format!("{stem}.{extension}")
    }
}

/// Download `Content-Type` selected by extension.
pub fn content_type_for_extension(ext: &str) -> &'static str {
    match ext.to_ascii_lowercase().as_str() {
        "pdf" => "application/pdf",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        _ => "application/octet-stream",
    }
}
