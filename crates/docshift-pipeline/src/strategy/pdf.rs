// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF to Word: text is pulled page by page and re-flowed into a DOCX.

use async_trait::async_trait;
use docshift_core::{ConversionError, DocshiftError, OutputFormat};
use docshift_document::{DocxWriter, PageRange, PdfTextReader};
use tracing::{info, instrument};

use super::{ConversionStrategy, Job, run_blocking};
use crate::cancel::CancelToken;

/// Re-flows the text layer of a PDF into a Word document.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfToOffice {
    pages: PageRange,
}

impl PdfToOffice {
    pub fn new(pages: PageRange) -> Self {
        Self { pages }
    }
}

#[async_trait]
impl ConversionStrategy for PdfToOffice {
    fn name(&self) -> &'static str {
        "pdf-to-office"
    }

    fn output_filename(&self, stem: &str, _format: OutputFormat) -> String {
        format!("{stem}.docx")
    }

    #[instrument(skip_all, fields(request_id = %job.request_id))]
    async fn convert(&self, job: &Job, cancel: &CancelToken) -> Result<String, ConversionError> {
        cancel.check()?;

        let source = job.source.clone();
        let output = job.output.clone();
        let range = self.pages;
        let page_count = run_blocking(move || {
            let pages = PdfTextReader::open(&source)
                .and_then(|reader| reader.extract_pages(range))
                .map_err(library_failure)?;
            DocxWriter::from_pages(&pages)
                .write_to(&output)
                .map_err(library_failure)?;
            Ok(pages.len())
        })
        .await?;

        info!(pages = page_count, output = %job.output.display(), "PDF re-flowed to DOCX");
        Ok("PDF a Word".to_string())
    }
}

/// Every error from the PDF/DOCX libraries, I/O included, is a library
/// failure for this strategy.
fn library_failure(err: DocshiftError) -> ConversionError {
    ConversionError::ConversionLibraryFailure {
        detail: err.to_string(),
    }
}
