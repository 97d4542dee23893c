// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Closed error taxonomy for Docshift.
//
// Validation failures are detected before any conversion work starts.
// Conversion failures are detected while a strategy runs. Everything else
// (I/O, library errors from the document crate) is folded into one of those
// two families before it reaches the outcome returned to the host.

use thiserror::Error;

/// Rejections raised by the validator before a conversion begins.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("file is {size} bytes, over the {limit}-byte upload limit")]
    TooLarge { limit: u64, size: u64 },

    #[error("extension {extension:?} is not allowed (allowed: {})", allowed.join(", "))]
    UnsupportedExtension {
        extension: String,
        allowed: Vec<String>,
    },

    #[error("content type {content_type:?} does not match extension {extension:?}")]
    InvalidContentType {
        content_type: String,
        extension: String,
    },

    #[error("image could not be decoded: {detail}")]
    CorruptImage { detail: String },

    #[error("image is {width}x{height}px, below the {min}px minimum")]
    ImageTooSmall { width: u32, height: u32, min: u32 },

    #[error("image is {width}x{height}px, above the {max}px maximum")]
    ImageTooLarge { width: u32, height: u32, max: u32 },
}

/// Failures raised while a conversion strategy runs.
///
/// None of these are retried: a single attempt is made per request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    #[error("conversion timed out after {seconds}s")]
    ConversionTimeout { seconds: u64 },

    #[error("external tool failed: {detail}")]
    ExternalToolFailure { detail: String },

    #[error("conversion library failed: {detail}")]
    ConversionLibraryFailure { detail: String },

    #[error("no text could be extracted from the image")]
    EmptyExtraction,

    #[error("unsupported format: {extension:?}")]
    UnsupportedFormat { extension: String },

    #[error("conversion cancelled")]
    Cancelled,

    #[error("unexpected conversion failure: {detail}")]
    Internal { detail: String },
}

/// Umbrella error for every Docshift operation.
#[derive(Debug, Error)]
pub enum DocshiftError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Conversion(#[from] ConversionError),

    // -- Document processing --
    #[error("image processing failed: {0}")]
    ImageError(String),

    #[error("PDF operation failed: {0}")]
    PdfError(String),

    #[error("DOCX generation failed: {0}")]
    DocxError(String),

    #[error("OCR failed: {0}")]
    OcrError(String),

    // -- Host boundary --
    #[error("configuration error: {0}")]
    Config(String),

    #[error("file not found: {0}")]
    NotFound(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, DocshiftError>;

impl From<DocshiftError> for ConversionError {
    fn from(err: DocshiftError) -> Self {
        match err {
            DocshiftError::Conversion(inner) => inner,
            DocshiftError::ImageError(detail)
            | DocshiftError::PdfError(detail)
            | DocshiftError::DocxError(detail)
            | DocshiftError::OcrError(detail) => ConversionError::ConversionLibraryFailure { detail },
            other => ConversionError::Internal {
                detail: other.to_string(),
            },
        }
    }
}

/// Flat tag for a failed outcome, one per taxonomy variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    TooLarge,
    UnsupportedExtension,
    InvalidContentType,
    CorruptImage,
    ImageTooSmall,
    ImageTooLarge,
    ConversionTimeout,
    ExternalToolFailure,
    ConversionLibraryFailure,
    EmptyExtraction,
    UnsupportedFormat,
    Cancelled,
    Internal,
}

impl ValidationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::TooLarge { .. } => ErrorKind::TooLarge,
            Self::UnsupportedExtension { .. } => ErrorKind::UnsupportedExtension,
            Self::InvalidContentType { .. } => ErrorKind::InvalidContentType,
            Self::CorruptImage { .. } => ErrorKind::CorruptImage,
            Self::ImageTooSmall { .. } => ErrorKind::ImageTooSmall,
            Self::ImageTooLarge { .. } => ErrorKind::ImageTooLarge,
        }
    }
}

impl ConversionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ConversionTimeout { .. } => ErrorKind::ConversionTimeout,
            Self::ExternalToolFailure { .. } => ErrorKind::ExternalToolFailure,
            Self::ConversionLibraryFailure { .. } => ErrorKind::ConversionLibraryFailure,
            Self::EmptyExtraction => ErrorKind::EmptyExtraction,
            Self::UnsupportedFormat { .. } => ErrorKind::UnsupportedFormat,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Internal { .. } => ErrorKind::Internal,
        }
    }
}
