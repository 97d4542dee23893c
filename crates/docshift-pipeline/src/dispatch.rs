// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Request orchestration: route by extension, persist the source, run one
// strategy, normalize the result, clean up.
//
// Each request runs in its own spawned task. A panic anywhere in a strategy
// surfaces as `ConversionError::Internal` instead of unwinding into the
// caller, and the request's artifact guard is dropped inside that task, so
// the source copy and any partial output are removed on that path too.

use std::path::PathBuf;
use std::sync::Arc;

use docshift_core::{
    ConversionError, ConversionOutcome, ConversionRequest, ConverterConfig, DocshiftError,
    DocumentCategory, OutputFormat, UploadedDocument,
};
use docshift_document::{Preprocessor, select_preprocessor};
use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

use crate::cancel::CancelToken;
use crate::cleanup::ArtifactGuard;
use crate::ocr::{TextExtractor, build_extractor};
use crate::runner::{CommandRunner, TokioCommandRunner};
use crate::strategy::{ConversionStrategy, ImageToDocument, Job, OfficeToPdf, PdfToOffice};
use crate::validate::Validator;

/// Routes validated uploads to the right conversion strategy.
///
/// Cheap to clone; clones share the same strategies.
#[derive(Clone)]
pub struct Dispatcher {
    shared: Arc<Shared>,
}

struct Shared {
    config: Arc<ConverterConfig>,
    validator: Validator,
    office: OfficeToPdf,
    pdf: PdfToOffice,
    image: ImageToDocument,
}

impl Dispatcher {
    /// Build a dispatcher. The preprocessing pipeline is selected here, once,
    /// from `config.preprocessing` and the compiled-in features.
    pub fn new(
        config: impl Into<Arc<ConverterConfig>>,
        runner: Arc<dyn CommandRunner>,
        extractor: Arc<dyn TextExtractor>,
    ) -> Result<Self, DocshiftError> {
        let config = config.into();
        let preprocessor = select_preprocessor(config.preprocessing)?;
        Ok(Self::with_preprocessor(config, runner, extractor, preprocessor))
    }

    /// Build a dispatcher with an explicit preprocessing pipeline.
    pub fn with_preprocessor(
        config: impl Into<Arc<ConverterConfig>>,
        runner: Arc<dyn CommandRunner>,
        extractor: Arc<dyn TextExtractor>,
        preprocessor: Arc<dyn Preprocessor>,
    ) -> Self {
        let config = config.into();
        info!(
            storage_root = %config.storage_root.display(),
            office = %config.office_converter,
            preprocessing = preprocessor.name(),
            ocr = extractor.name(),
            "dispatcher ready"
        );
        let shared = Shared {
            validator: Validator::new(Arc::clone(&config)),
            office: OfficeToPdf::new(
                runner,
                config.office_converter.clone(),
                config.office_timeout(),
            ),
            pdf: PdfToOffice::default(),
            image: ImageToDocument::new(preprocessor, extractor, config.storage_root.clone()),
            config,
        };
        Self {
            shared: Arc::new(shared),
        }
    }

    /// Production wiring: real subprocesses and the configured OCR backend.
    pub fn from_config(config: ConverterConfig) -> Result<Self, DocshiftError> {
        config.check()?;
        let runner: Arc<dyn CommandRunner> = Arc::new(TokioCommandRunner::new());
        let extractor = build_extractor(&config, Arc::clone(&runner))?;
        Self::new(config, runner, extractor)
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.shared.config
    }

    pub fn validator(&self) -> &Validator {
        &self.shared.validator
    }

    /// Validate an upload and, if accepted, convert it.
    pub async fn submit(
        &self,
        document: UploadedDocument,
        format: OutputFormat,
        cancel: &CancelToken,
    ) -> ConversionOutcome {
        match self.shared.validator.validate(document) {
            Ok(input) => {
                let request = ConversionRequest::new(input).with_output_format(format);
                self.convert(request, cancel).await
            }
            Err(err) => {
                warn!(error = %err, "upload rejected");
                ConversionOutcome::from_validation_error(&err)
            }
        }
    }

    /// Convert one validated request. Never panics and never returns an
    /// error: every failure is folded into `ConversionOutcome::Failure`.
    ///
    /// On success exactly the output file is left in the storage root; on
    /// failure nothing this request wrote remains.
    pub async fn convert(&self, request: ConversionRequest, cancel: &CancelToken) -> ConversionOutcome {
        let request_id = Uuid::new_v4();
        let span = info_span!(
            "convert",
            %request_id,
            filename = %request.input.sanitized_filename(),
            format = %request.output_format,
        );
        let original = request.input.document().filename().to_string();

        let shared = Arc::clone(&self.shared);
        let token = cancel.clone();
        let task = tokio::spawn(
            async move { shared.run(request_id, request, &token).await }.instrument(span.clone()),
        );

        let result = match task.await {
            Ok(result) => result,
            Err(join) => Err(ConversionError::Internal {
                detail: if join.is_panic() {
                    "conversion task panicked".to_string()
                } else {
                    format!("conversion task aborted: {join}")
                },
            }),
        };

        let _entered = span.enter();
        match result {
            Ok((output_filename, label)) => {
                info!(output = %output_filename, %label, "conversion succeeded");
                ConversionOutcome::Success {
                    message: format!("¡Se ha convertido {original} a {output_filename} exitosamente!"),
                    output_filename,
                    conversion_label: label,
                }
            }
            Err(err) => {
                warn!(error = %err, kind = ?err.kind(), "conversion failed");
                ConversionOutcome::from_conversion_error(&err)
            }
        }
    }
}

impl Shared {
    fn strategy_for(&self, extension: &str) -> Result<&dyn ConversionStrategy, ConversionError> {
        match DocumentCategory::from_extension(extension) {
            Some(DocumentCategory::Word) => Ok(&self.office),
            Some(DocumentCategory::Pdf) => Ok(&self.pdf),
            Some(DocumentCategory::Image) => Ok(&self.image),
            None => Err(ConversionError::UnsupportedFormat {
                extension: extension.to_string(),
            }),
        }
    }

    /// Returns `(output_filename, conversion_label)`.
    async fn run(
        &self,
        request_id: Uuid,
        request: ConversionRequest,
        cancel: &CancelToken,
    ) -> Result<(String, String), ConversionError> {
        let input = &request.input;
        let strategy = self.strategy_for(input.extension())?;
        cancel.check()?;

        let root = &self.config.storage_root;
        tokio::fs::create_dir_all(root)
            .await
            .map_err(|err| io_failure("create storage root", err))?;

        let mut guard = ArtifactGuard::new("request");
        let source = guard.track(root.join(input.sanitized_filename()));
        let output_filename = strategy.output_filename(input.stem(), request.output_format);
        let output: PathBuf = guard.track(root.join(&output_filename));

        tokio::fs::write(&source, input.document().bytes())
            .await
            .map_err(|err| io_failure("persist source", err))?;
        info!(strategy = strategy.name(), source = %source.display(), "source persisted");

        let job = Job {
            request_id,
            source,
            output,
            extension: input.extension().to_string(),
            sanitized_filename: input.sanitized_filename().to_string(),
            output_format: request.output_format,
        };
        let label = strategy.convert(&job, cancel).await?;

        // Only the output survives; the source copy goes with the guard.
        guard.keep(&job.output);
        Ok((output_filename, label))
    }
}

fn io_failure(step: &str, err: std::io::Error) -> ConversionError {
    ConversionError::Internal {
        detail: format!("{step}: {err}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeExtractor, FakeRunner, RunScript};
    use docshift_core::{ErrorKind, ValidatedInput};
    use docshift_document::ReducedPreprocessor;
    use std::path::Path;

    fn dispatcher(root: &Path, script: RunScript) -> Dispatcher {
        let config = ConverterConfig::default().with_storage_root(root);
        Dispatcher::with_preprocessor(
            config,
            Arc::new(FakeRunner::new(script)),
            Arc::new(FakeExtractor::text("hola")),
            Arc::new(ReducedPreprocessor),
        )
    }

    fn request(filename: &str, extension: &str, category: DocumentCategory) -> ConversionRequest {
        let doc = UploadedDocument::from_bytes(b"PK\x03\x04".to_vec(), filename, "application/octet-stream");
        ConversionRequest::new(ValidatedInput::new_unchecked(
            doc,
            extension.to_string(),
            category,
            filename.to_string(),
        ))
    }

    #[tokio::test]
    async fn unknown_extension_is_unsupported_format() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = dispatcher(dir.path(), RunScript::SilentSuccess)
            .convert(request("a.xyz", "xyz", DocumentCategory::Word), &CancelToken::new())
            .await;
        assert_eq!(outcome.error_kind(), Some(ErrorKind::UnsupportedFormat));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn success_message_names_original_and_output() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = dispatcher(dir.path(), RunScript::ConvertToPdf(b"%PDF-1.4".to_vec()))
            .convert(request("report.docx", "docx", DocumentCategory::Word), &CancelToken::new())
            .await;
        match outcome {
            ConversionOutcome::Success {
                output_filename,
                conversion_label,
                message,
            } => {
                assert_eq!(output_filename, "report.pdf");
                assert_eq!(conversion_label, "DOCX a PDF");
                assert_eq!(message, "¡Se ha convertido report.docx a report.pdf exitosamente!");
            }
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn storage_root_is_created_on_demand() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("media").join("converted_files");
        let outcome = dispatcher(&root, RunScript::ConvertToPdf(b"%PDF-1.4".to_vec()))
            .convert(request("a.odt", "odt", DocumentCategory::Word), &CancelToken::new())
            .await;
        assert!(outcome.is_success());
        assert!(root.join("a.pdf").exists());
        assert!(!root.join("a.odt").exists());
    }

    #[tokio::test]
    async fn runner_panic_is_internal_and_cleaned_up() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = dispatcher(dir.path(), RunScript::Panic)
            .convert(request("a.doc", "doc", DocumentCategory::Word), &CancelToken::new())
            .await;
        assert_eq!(outcome.error_kind(), Some(ErrorKind::Internal));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn pre_cancelled_request_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let token = CancelToken::new();
        token.cancel();
        let outcome = dispatcher(dir.path(), RunScript::SilentSuccess)
            .convert(request("a.rtf", "rtf", DocumentCategory::Word), &token)
            .await;
        assert_eq!(outcome.error_kind(), Some(ErrorKind::Cancelled));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
