// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanned-text pipeline: OCR enhancement filters and the in-process OCR engine.

#[cfg(feature = "advanced-imaging")]
pub mod enhance;

#[cfg(feature = "ocr")]
pub mod ocr;

#[cfg(feature = "advanced-imaging")]
pub use enhance::ScanEnhancer;

#[cfg(feature = "ocr")]
pub use ocr::OcrEngine;
