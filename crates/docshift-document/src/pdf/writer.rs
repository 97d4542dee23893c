// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF writer: lays out an OCR result (title, source image, extracted text)
// on A4 pages using `printpdf` 0.8.
//
// printpdf 0.8 builds documents from `PdfPage` values holding `Vec<Op>`
// operation lists, serialised at the end with `PdfDocument::save()`.

use std::path::Path;

use docshift_core::error::DocshiftError;
use image::DynamicImage;
use printpdf::{
    BuiltinFont, Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg, Point, Pt, RawImage,
    RawImageData, RawImageFormat, TextItem, XObjectId, XObjectTransform,
};
use tracing::{debug, info, instrument};

/// A4 in millimetres (595 x 842 pt).
const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;

const LEFT_MARGIN_PT: f32 = 50.0;
const TOP_LINE_PT: f32 = 800.0;
const BOTTOM_MARGIN_PT: f32 = 50.0;

const TITLE_SIZE_PT: f32 = 18.0;
/// Gap between the title baseline and the top of the image.
const TITLE_GAP_PT: f32 = 30.0;

/// Bounding box for the embedded source image.
const IMAGE_MAX_WIDTH_PT: f32 = 500.0;
const IMAGE_MAX_HEIGHT_PT: f32 = 300.0;
const IMAGE_GAP_PT: f32 = 20.0;

const TEXT_SIZE_PT: f32 = 11.0;
const LINE_HEIGHT_PT: f32 = 14.0;
/// Fixed-width wrap column for extracted text.
pub const WRAP_COLUMNS: usize = 80;

/// Builds PDF output for OCR results.
pub struct PdfWriter {
    title: String,
}

impl PdfWriter {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }

    /// Create the OCR document: bold title, the source image scaled into a
    /// 500 x 300 pt box, then the extracted text wrapped at 80 columns.
    ///
    /// Text that runs below the bottom margin continues on a new page.
    #[instrument(skip(self, image, text), fields(title = %self.title, text_len = text.len()))]
    pub fn create_ocr_document(
        &self,
        image: &DynamicImage,
        text: &str,
    ) -> Result<Vec<u8>, DocshiftError> {
        info!(
            width = image.width(),
            height = image.height(),
            "Creating OCR PDF"
        );

        let mut doc = PdfDocument::new(&self.title);
        let xobject_id = doc.add_image(&to_raw_image(image)?);

        let (img_w, img_h) = (image.width() as f32, image.height() as f32);
        let ratio = (IMAGE_MAX_WIDTH_PT / img_w).min(IMAGE_MAX_HEIGHT_PT / img_h);
        let rendered_h = img_h * ratio;

        let image_top = TOP_LINE_PT - TITLE_GAP_PT;
        let image_bottom = image_top - rendered_h;

        let mut ops: Vec<Op> = Vec::new();
        push_line(
            &mut ops,
            &self.title,
            TOP_LINE_PT,
            BuiltinFont::HelveticaBold,
            TITLE_SIZE_PT,
        );
        push_image(&mut ops, xobject_id, image_bottom, ratio);

        let mut pages: Vec<PdfPage> = Vec::new();
        let mut y = image_bottom - IMAGE_GAP_PT;
        let lines = wrap_text(text, WRAP_COLUMNS);

        for line in &lines {
            if y < BOTTOM_MARGIN_PT {
                pages.push(a4_page(std::mem::take(&mut ops)));
                y = TOP_LINE_PT;
            }
            // Every text section sets its own font, so a fresh page starts
            // with the font reset.
            if !line.is_empty() {
                push_line(&mut ops, line, y, BuiltinFont::Helvetica, TEXT_SIZE_PT);
            }
            y -= LINE_HEIGHT_PT;
        }
        pages.push(a4_page(ops));

        let page_count = pages.len();
        doc.with_pages(pages);
        debug!(lines = lines.len(), pages = page_count, ratio, "OCR PDF layout complete");

        let mut warnings: Vec<PdfWarnMsg> = Vec::new();
        Ok(doc.save(&PdfSaveOptions::default(), &mut warnings))
    }

    /// Build the OCR document and write it to `path`.
    pub fn write_ocr_document(
        &self,
        image: &DynamicImage,
        text: &str,
        path: impl AsRef<Path>,
    ) -> Result<(), DocshiftError> {
        let bytes = self.create_ocr_document(image, text)?;
        std::fs::write(path.as_ref(), &bytes)?;
        info!("Wrote OCR PDF to {}", path.as_ref().display());
        Ok(())
    }
}

fn a4_page(ops: Vec<Op>) -> PdfPage {
    PdfPage::new(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), ops)
}

fn push_line(ops: &mut Vec<Op>, text: &str, y: f32, font: BuiltinFont, size: f32) {
    ops.push(Op::StartTextSection);
    ops.push(Op::SetTextCursor {
        pos: Point {
            x: Pt(LEFT_MARGIN_PT),
            y: Pt(y),
        },
    });
    ops.push(Op::SetFontSizeBuiltinFont {
        size: Pt(size),
        font,
    });
    ops.push(Op::WriteTextBuiltinFont {
        items: vec![TextItem::Text(text.to_string())],
        font,
    });
    ops.push(Op::EndTextSection);
}

/// Place the image with its lower-left corner at (left margin, `bottom`).
///
/// At 72 dpi one pixel is one point, so `ratio` is the scale directly.
fn push_image(ops: &mut Vec<Op>, id: XObjectId, bottom: f32, ratio: f32) {
    ops.push(Op::UseXobject {
        id,
        transform: XObjectTransform {
            translate_x: Some(Pt(LEFT_MARGIN_PT)),
            translate_y: Some(Pt(bottom)),
            scale_x: Some(ratio),
            scale_y: Some(ratio),
            dpi: Some(72.0),
            rotate: None,
        },
    });
}

fn to_raw_image(image: &DynamicImage) -> Result<RawImage, DocshiftError> {
    if image.width() == 0 || image.height() == 0 {
        return Err(DocshiftError::PdfError("cannot embed an empty image".into()));
    }
    let rgb = image.to_rgb8();
    Ok(RawImage {
        width: rgb.width() as usize,
        height: rgb.height() as usize,
        pixels: RawImageData::U8(rgb.into_raw()),
        data_format: RawImageFormat::RGB8,
        tag: Vec::new(),
    })
}

// -- Text wrapping helper -----------------------------------------------------

/// Wrap text so no line exceeds `max_width` characters.
///
/// Existing newlines are kept; within each line words are packed greedily.
/// Words longer than `max_width` are force-broken on character boundaries.
pub fn wrap_text(text: &str, max_width: usize) -> Vec<String> {
    let max_width = max_width.max(1);
    let mut result = Vec::new();

    for paragraph in text.lines() {
        let words: Vec<&str> = paragraph.split_whitespace().collect();
        if words.is_empty() {
            result.push(String::new());
            continue;
        }

        let mut current = String::new();
        let mut current_len = 0usize;

        for word in words {
            let word_len = word.chars().count();
            if word_len > max_width {
                if !current.is_empty() {
                    result.push(std::mem::take(&mut current));
                }
                let chars: Vec<char> = word.chars().collect();
                let mut chunks = chars.chunks(max_width).peekable();
                while let Some(chunk) = chunks.next() {
                    if chunks.peek().is_some() {
                        result.push(chunk.iter().collect());
                    } else {
                        current = chunk.iter().collect();
                        current_len = chunk.len();
                    }
                }
            } else if current.is_empty() {
                current.push_str(word);
                current_len = word_len;
            } else if current_len + 1 + word_len <= max_width {
                current.push(' ');
                current.push_str(word);
                current_len += 1 + word_len;
            } else {
                result.push(std::mem::replace(&mut current, word.to_string()));
                current_len = word_len;
            }
        }

        if !current.is_empty() {
            result.push(current);
        }
    }

    result
}
