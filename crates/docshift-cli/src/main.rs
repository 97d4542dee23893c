// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Docshift: office <-> PDF conversion and OCR of text images.
//
// Entry point. Initialises logging, loads configuration, and runs one
// subcommand against the conversion pipeline.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use docshift_core::{
    ConversionOutcome, ConverterConfig, DocshiftError, OutputFormat, UploadedDocument,
    content_type_for_extension, extension_of,
};
use docshift_pipeline::{CancelToken, Dispatcher, OutputStore, TokioCommandRunner};
use serde_json::json;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "docshift", version, about = "Convert office documents, PDFs and scanned images")]
struct Cli {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the storage root from the configuration.
    #[arg(long, global = true)]
    storage_root: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Convert one file into the storage root.
    Convert {
        /// File to convert (.docx .doc .odt .rtf .pdf .jpg .jpeg .png)
        file: PathBuf,

        /// Output for image input: word or pdf
        #[arg(long, default_value = "word")]
        format: OutputFormat,

        /// Declared MIME type; guessed from the extension when omitted
        #[arg(long)]
        content_type: Option<String>,

        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },
    /// Copy a produced output out of the storage root.
    Download {
        /// Output file name as reported by `convert`
        filename: String,

        /// Destination path
        #[arg(long)]
        to: PathBuf,
    },
    /// Report which external tools are available.
    Doctor,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "docshift failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode, DocshiftError> {
    let mut config = match &cli.config {
        Some(path) => ConverterConfig::load(path)?,
        None => ConverterConfig::default(),
    };
    if let Some(root) = cli.storage_root {
        config = config.with_storage_root(root);
    }

    match cli.command {
        Command::Convert {
            file,
            format,
            content_type,
            json,
        } => convert(config, &file, format, content_type, json).await,
        Command::Download { filename, to } => download(&config, &filename, &to).await,
        Command::Doctor => Ok(doctor(&config).await),
    }
}

async fn convert(
    config: ConverterConfig,
    file: &Path,
    format: OutputFormat,
    content_type: Option<String>,
    json: bool,
) -> Result<ExitCode, DocshiftError> {
    let filename = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| DocshiftError::NotFound(file.display().to_string()))?;
    let content_type = content_type
        .unwrap_or_else(|| content_type_for_extension(&extension_of(&filename)).to_string());
    let bytes = tokio::fs::read(file).await?;
    info!(file = %file.display(), bytes = bytes.len(), %content_type, "read input");

    let dispatcher = Dispatcher::from_config(config)?;
    let cancel = CancelToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, cancelling conversion");
            interrupt.cancel();
        }
    });

    let upload = UploadedDocument::from_bytes(bytes, filename, content_type);
    let outcome = dispatcher.submit(upload, format, &cancel).await;
    print_outcome(&outcome, json);

    Ok(if outcome.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn print_outcome(outcome: &ConversionOutcome, json: bool) {
    match (outcome, json) {
        (
            ConversionOutcome::Success {
                output_filename,
                conversion_label,
                message,
            },
            true,
        ) => println!(
            "{}",
            json!({
                "status": "success",
                "message": message,
                "output_filename": output_filename,
                "conversion_label": conversion_label,
            })
        ),
        (
            ConversionOutcome::Failure {
                error_kind,
                human_message,
            },
            true,
        ) => println!(
            "{}",
            json!({
                "status": "failure",
                "error_kind": format!("{error_kind:?}"),
                "message": human_message,
            })
        ),
        (
            ConversionOutcome::Success {
                output_filename,
                conversion_label,
                message,
            },
            false,
        ) => {
            println!("{message}");
            println!("{conversion_label}: {output_filename}");
        }
        (ConversionOutcome::Failure { human_message, .. }, false) => eprintln!("{human_message}"),
    }
}

async fn download(config: &ConverterConfig, filename: &str, to: &Path) -> Result<ExitCode, DocshiftError> {
    let store = OutputStore::open(&config.storage_root);
    let download = store.fetch(filename).await?;
    tokio::fs::write(to, &download.bytes).await?;
    info!(
        filename,
        to = %to.display(),
        content_type = download.content_type,
        "output copied"
    );
    println!("{} ({}, {} bytes)", to.display(), download.content_type, download.bytes.len());
    Ok(ExitCode::SUCCESS)
}

async fn doctor(config: &ConverterConfig) -> ExitCode {
    let runner = TokioCommandRunner::new();
    let mut missing = false;
    for program in [config.office_converter.as_str(), config.ocr.program.as_str()] {
        match runner.probe(program).await {
            Some(version) => println!("{program}: {version}"),
            None => {
                println!("{program}: not available");
                missing = true;
            }
        }
    }
    println!("preprocessing: {:?}", config.preprocessing);
    println!("storage root: {}", config.storage_root.display());
    if missing {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn convert_defaults_to_word() {
        let cli = Cli::try_parse_from(["docshift", "convert", "scan.png"]).unwrap();
        match cli.command {
            Command::Convert {
                file,
                format,
                content_type,
                json,
            } => {
                assert_eq!(file, PathBuf::from("scan.png"));
                assert_eq!(format, OutputFormat::Word);
                assert!(content_type.is_none());
                assert!(!json);
            }
            _ => panic!("expected convert"),
        }
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "docshift",
            "convert",
            "scan.png",
            "--format",
            "pdf",
            "--storage-root",
            "/tmp/out",
        ])
        .unwrap();
        assert_eq!(cli.storage_root, Some(PathBuf::from("/tmp/out")));
        assert!(matches!(
            cli.command,
            Command::Convert {
                format: OutputFormat::Pdf,
                ..
            }
        ));
    }

    #[test]
    fn unknown_format_is_rejected() {
        assert!(Cli::try_parse_from(["docshift", "convert", "a.png", "--format", "odt"]).is_err());
    }

    #[test]
    fn download_requires_destination() {
        assert!(Cli::try_parse_from(["docshift", "download", "a.pdf"]).is_err());
        let cli = Cli::try_parse_from(["docshift", "download", "a.pdf", "--to", "out.pdf"]).unwrap();
        assert!(matches!(cli.command, Command::Download { .. }));
    }
}
