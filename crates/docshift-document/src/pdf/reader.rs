// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF text reader: loads an existing PDF with `lopdf` and extracts the text
// of a page range, one string per page.

use std::path::Path;

use docshift_core::error::DocshiftError;
use lopdf::Document;
use tracing::{debug, info, instrument};

/// Inclusive, 1-indexed page range. `last: None` runs to the end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    pub first: u32,
    pub last: Option<u32>,
}

impl PageRange {
    pub const fn all() -> Self {
        Self {
            first: 1,
            last: None,
        }
    }

    pub const fn pages(first: u32, last: u32) -> Self {
        Self {
            first,
            last: Some(last),
        }
    }
}

impl Default for PageRange {
    fn default() -> Self {
        Self::all()
    }
}

/// Reads text out of an existing PDF document.
pub struct PdfTextReader {
    document: Document,
}

impl PdfTextReader {
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DocshiftError> {
        let path_ref = path.as_ref();
        let document = Document::load(path_ref).map_err(|err| {
            DocshiftError::PdfError(format!("failed to open {}: {}", path_ref.display(), err))
        })?;
        debug!(pages = document.get_pages().len(), "PDF loaded");
        Ok(Self { document })
    }

    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self, DocshiftError> {
        let document = Document::load_mem(data).map_err(|err| {
            DocshiftError::PdfError(format!("failed to load PDF from memory: {}", err))
        })?;
        Ok(Self { document })
    }

    pub fn page_count(&self) -> usize {
        self.document.get_pages().len()
    }

    /// Extract the text of every page in `range`, in page order.
    ///
    /// A page without a text layer yields an empty string. A range outside
    /// the document is an error.
    #[instrument(skip(self))]
    pub fn extract_pages(&self, range: PageRange) -> Result<Vec<String>, DocshiftError> {
        let total = self.page_count() as u32;
        let last = range.last.unwrap_or(total);

        if range.first == 0 || range.first > last || last > total {
            return Err(DocshiftError::PdfError(format!(
                "page range {}..={} out of range (document has {} pages)",
                range.first, last, total
            )));
        }

        info!(first = range.first, last, total, "Extracting PDF text");

        let mut pages = Vec::with_capacity((last - range.first + 1) as usize);
        for page_number in range.first..=last {
            let text = self.document.extract_text(&[page_number]).map_err(|err| {
                DocshiftError::PdfError(format!(
                    "failed to extract text from page {}: {}",
                    page_number, err
                ))
            })?;
            debug!(page_number, chars = text.chars().count(), "Page text extracted");
            pages.push(text);
        }
        Ok(pages)
    }
}
