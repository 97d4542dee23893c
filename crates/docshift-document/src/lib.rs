// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// docshift-document: Document processing for the Docshift conversion pipeline.
//
// Provides OCR image preprocessing (full and reduced pipelines), the in-process
// OCR engine, PDF text extraction, and the PDF / DOCX output builders used for
// OCR results and PDF re-flow.

pub mod docx;
pub mod image;
pub mod pdf;
pub mod scan;

// Re-export the primary structs so callers can use `docshift_document::PdfWriter` etc.
pub use crate::docx::writer::DocxWriter;
pub use crate::image::preprocess::{Preprocessor, ReducedPreprocessor, select_preprocessor};
pub use crate::image::processor::ImageProcessor;
pub use crate::pdf::reader::{PageRange, PdfTextReader};
pub use crate::pdf::writer::PdfWriter;

#[cfg(feature = "advanced-imaging")]
pub use crate::image::preprocess::FullPreprocessor;
#[cfg(feature = "advanced-imaging")]
pub use crate::scan::enhance::ScanEnhancer;

#[cfg(feature = "ocr")]
pub use crate::scan::ocr::OcrEngine;
