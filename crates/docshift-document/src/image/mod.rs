// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image module: decoding, colour-mode normalisation, and OCR preprocessing.

pub mod preprocess;
pub mod processor;

pub use preprocess::{Preprocessor, ReducedPreprocessor, select_preprocessor};
pub use processor::ImageProcessor;
