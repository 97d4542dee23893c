// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// End-to-end runs of `Dispatcher::submit` against scripted tools.

mod common;

use std::time::Duration;

use common::{DOCX_MIME, Harness, document_xml, png, text_pdf, upload};
use docshift_core::{ConversionError, ConversionOutcome, ErrorKind, OutputFormat};
use docshift_pipeline::testing::{ExtractScript, FakeExtractor, RunScript};
use docshift_pipeline::{CancelToken, OutputStore};

fn success_parts(outcome: ConversionOutcome) -> (String, String, String) {
    match outcome {
        ConversionOutcome::Success {
            output_filename,
            conversion_label,
            message,
        } => (output_filename, conversion_label, message),
        other => panic!("expected success, got {other:?}"),
    }
}

#[tokio::test]
async fn docx_to_pdf_leaves_only_the_output() {
    let h = Harness::new(
        RunScript::ConvertToPdf(b"%PDF-1.4\n%fake\n".to_vec()),
        FakeExtractor::text("unused"),
    );
    let outcome = h
        .dispatcher
        .submit(
            upload(b"PK\x03\x04docx".to_vec(), "report.docx", DOCX_MIME),
            OutputFormat::Word,
            &CancelToken::new(),
        )
        .await;

    let (output, label, message) = success_parts(outcome);
    assert_eq!(output, "report.pdf");
    assert_eq!(label, "DOCX a PDF");
    assert!(message.contains("report.docx"));
    assert_eq!(h.files(), vec!["report.pdf"]);
    assert_eq!(h.runner.calls().len(), 1);
}

#[tokio::test]
async fn same_docx_twice_yields_two_valid_outputs() {
    let h = Harness::new(
        RunScript::ConvertToPdf(b"%PDF-1.4\n".to_vec()),
        FakeExtractor::text("unused"),
    );
    let mut outputs = Vec::new();
    for _ in 0..2 {
        let outcome = h
            .dispatcher
            .submit(
                upload(b"PK".to_vec(), "report.docx", DOCX_MIME),
                OutputFormat::Word,
                &CancelToken::new(),
            )
            .await;
        let (output, _, _) = success_parts(outcome);
        let bytes = std::fs::read(h.root().join(&output)).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        outputs.push(output);
    }
    assert_eq!(outputs[0], outputs[1]);
    assert_eq!(h.files(), vec!["report.pdf"]);
    assert_eq!(h.runner.calls().len(), 2);
}

#[tokio::test]
async fn tiny_image_is_rejected_before_any_write() {
    let h = Harness::new(RunScript::SilentSuccess, FakeExtractor::text("unused"));
    let outcome = h
        .dispatcher
        .submit(upload(png(10, 10), "tiny.png", "image/png"), OutputFormat::Pdf, &CancelToken::new())
        .await;
    assert_eq!(outcome.error_kind(), Some(ErrorKind::ImageTooSmall));
    assert!(h.files().is_empty());
    assert!(h.extractor.seen().is_empty());
}

#[tokio::test]
async fn oversized_upload_is_rejected_before_any_write() {
    let h = Harness::new(RunScript::SilentSuccess, FakeExtractor::text("unused"));
    let doc = docshift_core::UploadedDocument::new(b"PK".to_vec(), "big.docx", 11 * 1024 * 1024, DOCX_MIME);
    let outcome = h.dispatcher.submit(doc, OutputFormat::Word, &CancelToken::new()).await;
    assert_eq!(outcome.error_kind(), Some(ErrorKind::TooLarge));
    assert!(h.files().is_empty());
    assert!(h.runner.calls().is_empty());
}

#[tokio::test]
async fn office_timeout_removes_source_and_output() {
    let h = Harness::new(RunScript::TimeOut, FakeExtractor::text("unused"));
    let outcome = h
        .dispatcher
        .submit(
            upload(b"PK".to_vec(), "slow.docx", DOCX_MIME),
            OutputFormat::Word,
            &CancelToken::new(),
        )
        .await;
    match outcome {
        ConversionOutcome::Failure {
            error_kind,
            human_message,
        } => {
            assert_eq!(error_kind, ErrorKind::ConversionTimeout);
            assert!(!human_message.is_empty());
        }
        other => panic!("expected failure, got {other:?}"),
    }
    assert!(h.files().is_empty());
}

#[tokio::test]
async fn missing_office_binary_is_tool_failure() {
    let h = Harness::new(RunScript::SpawnFailure, FakeExtractor::text("unused"));
    let outcome = h
        .dispatcher
        .submit(
            upload(b"PK".to_vec(), "a.docx", DOCX_MIME),
            OutputFormat::Word,
            &CancelToken::new(),
        )
        .await;
    assert_eq!(outcome.error_kind(), Some(ErrorKind::ExternalToolFailure));
    assert!(h.files().is_empty());
}

#[tokio::test]
async fn pdf_becomes_docx_with_the_same_text() {
    let h = Harness::new(RunScript::SilentSuccess, FakeExtractor::text("unused"));
    let outcome = h
        .dispatcher
        .submit(
            upload(text_pdf("Quarterly notes"), "notes.pdf", "application/pdf"),
            OutputFormat::Word,
            &CancelToken::new(),
        )
        .await;
    let (output, label, _) = success_parts(outcome);
    assert_eq!(output, "notes.docx");
    assert_eq!(label, "PDF a Word");
    assert_eq!(h.files(), vec!["notes.docx"]);
    assert!(document_xml(&h.root().join("notes.docx")).contains("Quarterly notes"));
    assert!(h.runner.calls().is_empty());
}

#[tokio::test]
async fn image_to_pdf_through_ocr() {
    let h = Harness::new(RunScript::SilentSuccess, FakeExtractor::text("The quick brown fox"));
    let outcome = h
        .dispatcher
        .submit(upload(png(300, 200), "scan.png", "image/png"), OutputFormat::Pdf, &CancelToken::new())
        .await;
    let (output, label, _) = success_parts(outcome);
    assert_eq!(output, "scan_ocr.pdf");
    assert!(label.contains("OCR"));
    assert_eq!(h.files(), vec!["scan_ocr.pdf"]);

    let seen = h.extractor.seen();
    assert_eq!(seen.len(), 1);
    assert!(seen[0].1, "preprocessed image must exist while OCR runs");
    assert!(!seen[0].0.exists());
}

#[tokio::test]
async fn image_to_word_through_ocr() {
    let h = Harness::new(RunScript::SilentSuccess, FakeExtractor::text("Línea uno\nLínea dos"));
    let outcome = h
        .dispatcher
        .submit(upload(png(200, 120), "foto.png", "image/png"), OutputFormat::Word, &CancelToken::new())
        .await;
    let (output, label, _) = success_parts(outcome);
    assert_eq!(output, "foto_ocr.docx");
    assert_eq!(label, "Imagen a Word (OCR)");
    let xml = document_xml(&h.root().join(&output));
    assert!(xml.contains("Línea uno"));
    assert!(xml.contains("Línea dos"));
}

#[tokio::test]
async fn blank_ocr_is_empty_extraction_and_leaves_nothing() {
    let h = Harness::new(RunScript::SilentSuccess, FakeExtractor::text("   \n  "));
    let outcome = h
        .dispatcher
        .submit(upload(png(120, 120), "blank.png", "image/png"), OutputFormat::Pdf, &CancelToken::new())
        .await;
    assert_eq!(outcome.error_kind(), Some(ErrorKind::EmptyExtraction));
    assert!(h.files().is_empty());
}

#[tokio::test]
async fn ocr_timeout_is_classified_and_cleaned_up() {
    let h = Harness::new(
        RunScript::SilentSuccess,
        FakeExtractor::new(ExtractScript::Fail(ConversionError::ConversionTimeout { seconds: 120 })),
    );
    let outcome = h
        .dispatcher
        .submit(upload(png(120, 120), "slow.png", "image/png"), OutputFormat::Word, &CancelToken::new())
        .await;
    assert_eq!(outcome.error_kind(), Some(ErrorKind::ConversionTimeout));
    assert!(h.files().is_empty());
}

#[tokio::test]
async fn strategy_panic_is_contained() {
    let h = Harness::new(RunScript::Panic, FakeExtractor::text("unused"));
    let outcome = h
        .dispatcher
        .submit(
            upload(b"PK".to_vec(), "boom.docx", DOCX_MIME),
            OutputFormat::Word,
            &CancelToken::new(),
        )
        .await;
    assert_eq!(outcome.error_kind(), Some(ErrorKind::Internal));
    assert!(h.files().is_empty());
}

#[tokio::test]
async fn cancelling_a_hung_converter() {
    let h = Harness::new(RunScript::Hang, FakeExtractor::text("unused"));
    let token = CancelToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });
    let outcome = h
        .dispatcher
        .submit(upload(b"PK".to_vec(), "hang.odt", "application/vnd.oasis.opendocument.text"), OutputFormat::Word, &token)
        .await;
    assert_eq!(outcome.error_kind(), Some(ErrorKind::Cancelled));
    assert!(h.files().is_empty());
}

#[tokio::test]
async fn produced_output_can_be_downloaded() {
    let h = Harness::new(RunScript::SilentSuccess, FakeExtractor::text("unused"));
    let outcome = h
        .dispatcher
        .submit(
            upload(text_pdf("Hello"), "hello.pdf", "application/pdf"),
            OutputFormat::Word,
            &CancelToken::new(),
        )
        .await;
    let (output, _, _) = success_parts(outcome);

    let download = OutputStore::open(h.root()).fetch(&output).await.unwrap();
    assert_eq!(download.content_type, DOCX_MIME);
    assert_eq!(download.content_disposition, "attachment; filename=\"hello.docx\"");
    assert!(download.bytes.starts_with(b"PK"));
}

#[tokio::test]
async fn no_temp_images_survive_any_outcome() {
    for extractor in [
        FakeExtractor::text("text"),
        FakeExtractor::text(""),
        FakeExtractor::new(ExtractScript::Fail(ConversionError::ExternalToolFailure {
            detail: "tesseract crashed".into(),
        })),
    ] {
        let h = Harness::new(RunScript::SilentSuccess, extractor);
        let _ = h
            .dispatcher
            .submit(upload(png(100, 100), "page.png", "image/png"), OutputFormat::Pdf, &CancelToken::new())
            .await;
        assert!(
            h.files().iter().all(|name| !name.starts_with("tmp_")),
            "{:?}",
            h.files()
        );
    }
}

#[tokio::test]
async fn default_pipeline_handles_minimum_and_narrow_images() {
    for (width, height, format, expected) in [
        (50, 50, OutputFormat::Pdf, "edge_ocr.pdf"),
        (50, 300, OutputFormat::Word, "edge_ocr.docx"),
        (300, 200, OutputFormat::Pdf, "edge_ocr.pdf"),
    ] {
        let h = Harness::with_default_pipeline(RunScript::SilentSuccess, FakeExtractor::text("Texto"));
        let outcome = h
            .dispatcher
            .submit(upload(png(width, height), "edge.png", "image/png"), format, &CancelToken::new())
            .await;
        let (output, _, _) = success_parts(outcome);
        assert_eq!(output, expected, "{width}x{height}");
        assert_eq!(h.files(), vec![expected]);

        let seen = h.extractor.seen();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].1);
        let preprocessed = seen[0].0.file_name().unwrap().to_string_lossy().into_owned();
        assert!(preprocessed.starts_with("tmp_edge_"), "{preprocessed}");
    }
}
