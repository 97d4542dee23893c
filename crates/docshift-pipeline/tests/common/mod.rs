// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Shared fixtures for the pipeline integration tests.

#![allow(dead_code)]

use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use docshift_core::{ConverterConfig, UploadedDocument};
use docshift_document::ReducedPreprocessor;
use docshift_pipeline::testing::{FakeExtractor, FakeRunner, RunScript};
use docshift_pipeline::Dispatcher;
use image::{GrayImage, ImageFormat, Luma};
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};

pub const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

pub struct Harness {
    pub dir: tempfile::TempDir,
    pub runner: Arc<FakeRunner>,
    pub extractor: Arc<FakeExtractor>,
    pub dispatcher: Dispatcher,
}

impl Harness {
    pub fn new(script: RunScript, extractor: FakeExtractor) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(FakeRunner::new(script));
        let extractor = Arc::new(extractor);
        let config = ConverterConfig::default().with_storage_root(dir.path());
        let dispatcher = Dispatcher::with_preprocessor(
            config,
            runner.clone(),
            extractor.clone(),
            Arc::new(ReducedPreprocessor),
        );
        Self {
            dir,
            runner,
            extractor,
            dispatcher,
        }
    }

    /// Same fakes, but the preprocessing pipeline is chosen by
    /// `Dispatcher::new` from the default configuration.
    pub fn with_default_pipeline(script: RunScript, extractor: FakeExtractor) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(FakeRunner::new(script));
        let extractor = Arc::new(extractor);
        let config = ConverterConfig::default().with_storage_root(dir.path());
        let dispatcher = Dispatcher::new(config, runner.clone(), extractor.clone()).unwrap();
        Self {
            dir,
            runner,
            extractor,
            dispatcher,
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// File names currently in the storage root, sorted.
    pub fn files(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.root())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

pub fn upload(bytes: Vec<u8>, filename: &str, content_type: &str) -> UploadedDocument {
    UploadedDocument::from_bytes(bytes, filename, content_type)
}

/// A light page with a dark band, PNG-encoded.
pub fn png(width: u32, height: u32) -> Vec<u8> {
    let mut img = GrayImage::from_pixel(width, height, Luma([240]));
    let band = (height / 3)..(height / 3 + height / 10 + 1);
    for y in band {
        for x in (width / 10)..(width - width / 10) {
            img.put_pixel(x, y, Luma([15]));
        }
    }
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

/// Single-page PDF with one line of Helvetica text.
pub fn text_pdf(text: &str) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });
    let content = Content {
        operations: vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 14.into()]),
            Operation::new("Td", vec![72.into(), 720.into()]),
            Operation::new("Tj", vec![Object::string_literal(text)]),
            Operation::new("ET", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => resources_id,
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
}

/// `word/document.xml` from a produced DOCX.
pub fn document_xml(path: &Path) -> String {
    use std::io::Read;
    let file = std::fs::File::open(path).unwrap();
    let mut archive = zip::ZipArchive::new(file).unwrap();
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .unwrap()
        .read_to_string(&mut xml)
        .unwrap();
    xml
}
