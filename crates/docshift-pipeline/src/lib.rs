// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// docshift-pipeline: validation, dispatch, conversion strategies and
// request-scoped cleanup.
//
// Flow for one upload:
//
//   Validator -> Dispatcher -> strategy (office | pdf | image OCR) -> cleanup
//
// External tools are reached through `CommandRunner` and OCR through
// `TextExtractor`, so everything here can be driven by the scripted fakes in
// `testing` (unit tests, or the `testing` feature for downstream tests).

pub mod cancel;
pub mod cleanup;
pub mod dispatch;
pub mod download;
pub mod ocr;
pub mod runner;
pub mod strategy;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod validate;

pub use cancel::CancelToken;
pub use cleanup::ArtifactGuard;
pub use dispatch::Dispatcher;
pub use download::{Download, OutputStore};
pub use ocr::{TesseractExtractor, TextExtractor, build_extractor};
pub use runner::{CommandOutput, CommandRunner, CommandSpec, RunError, TokioCommandRunner};
pub use strategy::{ConversionStrategy, ImageToDocument, Job, OfficeToPdf, PdfToOffice};
pub use validate::Validator;

#[cfg(feature = "ocr")]
pub use ocr::OcrsExtractor;
