// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// DOCX writer: a flat list of blocks rendered through `docx-rs`. Supports
// title and heading styles, plain paragraphs, page breaks and a single
// inline PNG image.

use std::io::Cursor;
use std::path::Path;

use docshift_core::error::DocshiftError;
use docx_rs::{BreakType, Docx, PageMargin, Paragraph, Pic, Run, Style, StyleType};
use image::DynamicImage;
use tracing::{debug, info, instrument};

use crate::image::processor::ImageProcessor;

/// Embedded image width: 6 inches in EMU (914400 per inch).
const IMAGE_WIDTH_EMU: u32 = 5_486_400;

/// A4 portrait in twentieths of a point.
const PAGE_WIDTH: u32 = 11_906;
const PAGE_HEIGHT: u32 = 16_838;
const PAGE_MARGIN: i32 = 1_440;

/// One body element of the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Title(String),
    /// Level-1 heading.
    Heading(String),
    Paragraph(String),
    /// The embedded image, at most one per document.
    Image,
    PageBreak,
}

struct EmbeddedImage {
    png: Vec<u8>,
    width: u32,
    height: u32,
}

/// Builds a `.docx` document block by block.
#[derive(Default)]
pub struct DocxWriter {
    blocks: Vec<Block>,
    image: Option<EmbeddedImage>,
}

impl DocxWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(&mut self, text: impl Into<String>) -> &mut Self {
        self.blocks.push(Block::Title(text.into()));
        self
    }

    pub fn heading(&mut self, text: impl Into<String>) -> &mut Self {
        self.blocks.push(Block::Heading(text.into()));
        self
    }

    pub fn paragraph(&mut self, text: impl Into<String>) -> &mut Self {
        self.blocks.push(Block::Paragraph(text.into()));
        self
    }

    pub fn page_break(&mut self) -> &mut Self {
        self.blocks.push(Block::PageBreak);
        self
    }

    /// Embed `image` as PNG at a fixed 6 inch width.
    pub fn image(&mut self, image: &DynamicImage) -> Result<&mut Self, DocshiftError> {
        if self.image.is_some() {
            return Err(DocshiftError::DocxError(
                "only one embedded image is supported".into(),
            ));
        }
        if image.width() == 0 || image.height() == 0 {
            return Err(DocshiftError::DocxError("cannot embed an empty image".into()));
        }
        let png = ImageProcessor::from_dynamic(image.clone()).to_png_bytes()?;
        self.image = Some(EmbeddedImage {
            png,
            width: image.width(),
            height: image.height(),
        });
        self.blocks.push(Block::Image);
        Ok(self)
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    // -- Document recipes -----------------------------------------------------

    /// OCR result: title, the original image, then one paragraph per
    /// non-empty line of `text`.
    pub fn ocr_document(
        title: &str,
        image: &DynamicImage,
        text: &str,
    ) -> Result<Self, DocshiftError> {
        let mut writer = Self::new();
        writer.title(title).heading("Imagen original");
        writer.image(image)?;
        writer.heading("Texto extraído");
        for line in non_empty_lines(text) {
            writer.paragraph(line);
        }
        Ok(writer)
    }

    /// Re-flowed PDF text: one paragraph per non-empty line, a page break
    /// between source pages.
    pub fn from_pages(pages: &[String]) -> Self {
        let mut writer = Self::new();
        for (index, page) in pages.iter().enumerate() {
            if index > 0 {
                writer.page_break();
            }
            for line in non_empty_lines(page) {
                writer.paragraph(line);
            }
        }
        writer
    }

    // -- Output ---------------------------------------------------------------

    /// Serialise the package to bytes.
    #[instrument(skip(self), fields(blocks = self.blocks.len(), image = self.image.is_some()))]
    pub fn to_bytes(&self) -> Result<Vec<u8>, DocshiftError> {
        let mut cursor = Cursor::new(Vec::new());
        self.render()
            .build()
            .pack(&mut cursor)
            .map_err(|err| DocshiftError::DocxError(format!("failed to pack DOCX: {err}")))?;
        let bytes = cursor.into_inner();
        debug!(bytes = bytes.len(), "DOCX package written");
        Ok(bytes)
    }

    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<(), DocshiftError> {
        let bytes = self.to_bytes()?;
        std::fs::write(path.as_ref(), &bytes)?;
        info!("Wrote DOCX to {}", path.as_ref().display());
        Ok(())
    }

    fn render(&self) -> Docx {
        let mut docx = Docx::new()
            .page_size(PAGE_WIDTH, PAGE_HEIGHT)
            .page_margin(
                PageMargin::new()
                    .top(PAGE_MARGIN)
                    .right(PAGE_MARGIN)
                    .bottom(PAGE_MARGIN)
                    .left(PAGE_MARGIN),
            )
            .add_style(Style::new("Title", StyleType::Paragraph).name("Title").bold().size(40))
            .add_style(
                Style::new("Heading1", StyleType::Paragraph)
                    .name("heading 1")
                    .bold()
                    .size(32),
            );

        for block in &self.blocks {
            let paragraph = match block {
                Block::Title(text) => text_paragraph(text).style("Title"),
                Block::Heading(text) => text_paragraph(text).style("Heading1"),
                Block::Paragraph(text) => text_paragraph(text),
                Block::PageBreak => Paragraph::new().add_run(Run::new().add_break(BreakType::Page)),
                Block::Image => match &self.image {
                    Some(image) => image_paragraph(image),
                    None => continue,
                },
            };
            docx = docx.add_paragraph(paragraph);
        }
        docx
    }
}

fn non_empty_lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines().map(str::trim).filter(|line| !line.is_empty())
}

fn text_paragraph(text: &str) -> Paragraph {
    Paragraph::new().add_run(Run::new().add_text(text))
}

/// Fixed 6 inch width, height scaled to keep the aspect ratio.
fn image_paragraph(image: &EmbeddedImage) -> Paragraph {
    let height = u64::from(IMAGE_WIDTH_EMU) * u64::from(image.height) / u64::from(image.width.max(1));
    let height = u32::try_from(height).unwrap_or(u32::MAX);
    let pic = Pic::new(&image.png).size(IMAGE_WIDTH_EMU, height);
    Paragraph::new().add_run(Run::new().add_image(pic))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use std::io::Read;

    fn read_part(bytes: &[u8], name: &str) -> Option<Vec<u8>> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut entry = archive.by_name(name).ok()?;
        let mut buf = Vec::new();
        entry.read_to_end(&mut buf).unwrap();
        Some(buf)
    }

    /// Every part stored under `word/media/`.
    fn media_parts(bytes: &[u8]) -> Vec<Vec<u8>> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let names: Vec<String> = archive
            .file_names()
            .filter(|name| name.starts_with("word/media/"))
            .map(str::to_string)
            .collect();
        names
            .iter()
            .map(|name| {
                let mut buf = Vec::new();
                archive.by_name(name).unwrap().read_to_end(&mut buf).unwrap();
                buf
            })
            .collect()
    }

    fn document_xml(bytes: &[u8]) -> String {
        String::from_utf8(read_part(bytes, "word/document.xml").unwrap()).unwrap()
    }

    fn photo() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(200, 100, Rgb([250, 250, 250])))
    }

    #[test]
    fn package_contains_required_parts() {
        let bytes = DocxWriter::from_pages(&["hola".into()]).to_bytes().unwrap();
        for part in [
            "[Content_Types].xml",
            "_rels/.rels",
            "word/document.xml",
            "word/styles.xml",
            "word/_rels/document.xml.rels",
        ] {
            assert!(read_part(&bytes, part).is_some(), "missing {part}");
        }
        assert!(media_parts(&bytes).is_empty());
        assert!(document_xml(&bytes).contains("hola"));
    }

    #[test]
    fn text_is_escaped() {
        let bytes = DocxWriter::from_pages(&["a < b & c".into()]).to_bytes().unwrap();
        assert!(document_xml(&bytes).contains("a &lt; b &amp; c"));
    }

    #[test]
    fn pages_are_separated_by_breaks_and_blank_lines_dropped() {
        let writer = DocxWriter::from_pages(&["uno\n\n  \ndos".into(), "tres".into()]);
        assert_eq!(
            writer.blocks(),
            &[
                Block::Paragraph("uno".into()),
                Block::Paragraph("dos".into()),
                Block::PageBreak,
                Block::Paragraph("tres".into()),
            ]
        );
        let xml = document_xml(&writer.to_bytes().unwrap());
        assert_eq!(xml.matches(r#"w:type="page""#).count(), 1);
    }

    #[test]
    fn headings_carry_their_styles() {
        let mut writer = DocxWriter::new();
        writer.title("Informe").heading("Resumen").paragraph("cuerpo");
        let bytes = writer.to_bytes().unwrap();
        let xml = document_xml(&bytes);
        assert!(xml.contains(r#"w:val="Title""#));
        assert!(xml.contains(r#"w:val="Heading1""#));
        let styles = String::from_utf8(read_part(&bytes, "word/styles.xml").unwrap()).unwrap();
        assert!(styles.contains(r#"w:styleId="Heading1""#));
    }

    #[test]
    fn ocr_document_layout() {
        let writer = DocxWriter::ocr_document("scan.png", &photo(), "Line one\n\nLine two\n").unwrap();
        assert_eq!(
            writer.blocks(),
            &[
                Block::Title("scan.png".into()),
                Block::Heading("Imagen original".into()),
                Block::Image,
                Block::Heading("Texto extraído".into()),
                Block::Paragraph("Line one".into()),
                Block::Paragraph("Line two".into()),
            ]
        );
    }

    #[test]
    fn image_is_embedded_at_six_inches() {
        let bytes = DocxWriter::ocr_document("scan", &photo(), "text")
            .unwrap()
            .to_bytes()
            .unwrap();
        let media = media_parts(&bytes);
        assert_eq!(media.len(), 1);
        assert!(media[0].starts_with(&[0x89, b'P', b'N', b'G']));

        let xml = document_xml(&bytes);
        // 200x100 source keeps its 2:1 aspect.
        assert!(xml.contains(r#"cx="5486400""#));
        assert!(xml.contains(r#"cy="2743200""#));
        assert!(xml.contains("r:embed="));

        let rels = String::from_utf8(read_part(&bytes, "word/_rels/document.xml.rels").unwrap()).unwrap();
        assert!(rels.contains("media/"));
    }

    #[test]
    fn second_image_is_rejected() {
        let mut writer = DocxWriter::new();
        writer.image(&photo()).unwrap();
        assert!(writer.image(&photo()).is_err());
    }

    #[test]
    fn empty_pdf_text_still_produces_a_document() {
        let bytes = DocxWriter::from_pages(&[String::new()]).to_bytes().unwrap();
        assert!(document_xml(&bytes).contains("<w:body>"));
    }
}
