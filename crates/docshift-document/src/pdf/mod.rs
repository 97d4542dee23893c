// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module: text extraction from existing PDFs and the OCR result builder.

pub mod reader;
pub mod writer;

pub use reader::{PageRange, PdfTextReader};
pub use writer::PdfWriter;
