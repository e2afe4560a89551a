// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pruefwerk — Document Integrity Verification
//
// Entry point. Initialises logging, detects the optional backends, runs one
// verification and prints the report as JSON on stdout. Logs go to stderr.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use image::DynamicImage;
use pruefwerk_core::error::{PruefwerkError, Result};
use pruefwerk_core::human_errors::humanize_error;
use pruefwerk_core::{CancelFlag, Classification, DocumentKind, VerifyConfig};
use pruefwerk_document::{CapabilityRegistry, ImageTransformer, TransformMode, encode_png};
use pruefwerk_verify::{VerificationReport, VerificationRequest, verify_async};
use serde::Serialize;
use tracing::{info, warn};

/// Exit code for runs that stopped before a verdict.
const EXIT_ABORTED: u8 = 3;

#[derive(Debug, Parser)]
#[command(name = "pruefwerk", version, about = "Verify a document against a known-good reference")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Verify a PDF or image and print the report as JSON.
    Verify(VerifyArgs),
    /// Show which optional backends this system provides.
    Capabilities {
        /// JSON configuration file.
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(Debug, clap::Args)]
struct VerifyArgs {
    /// Submitted document (PDF, PNG, JPEG, ...).
    file: PathBuf,

    /// Known-good text of the verified page.
    #[arg(long, conflicts_with = "reference_text_file")]
    reference_text: Option<String>,

    /// File holding the known-good text of the verified page.
    #[arg(long)]
    reference_text_file: Option<PathBuf>,

    /// Known-good image of the verified page.
    #[arg(long)]
    reference_image: Option<PathBuf>,

    /// Known-good copy of the whole document, for the byte-identity check.
    #[arg(long)]
    reference_document: Option<PathBuf>,

    /// Page to verify, counting from 1.
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    page: Option<u32>,

    /// JSON configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory that receives the page views and the diff image as PNG.
    #[arg(long)]
    output_dir: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct AbortReport {
    error: String,
    message: String,
    suggestion: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let outcome = match cli.command {
        Command::Verify(args) => verify(args).await,
        Command::Capabilities { config } => capabilities(config.as_deref()),
    };

    match outcome {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            match serde_json::to_string_pretty(&AbortReport::from(&err)) {
                Ok(json) => println!("{json}"),
                Err(_) => eprintln!("{err}"),
            }
            ExitCode::from(EXIT_ABORTED)
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<VerifyConfig> {
    match path {
        Some(path) => VerifyConfig::load(path),
        None => Ok(VerifyConfig::default()),
    }
}

fn capabilities(config: Option<&Path>) -> Result<u8> {
    let config = load_config(config)?;
    let caps = CapabilityRegistry::global_with(&config).capabilities();
    println!("{}", serde_json::to_string_pretty(&caps)?);
    Ok(0)
}

async fn verify(args: VerifyArgs) -> Result<u8> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(page) = args.page {
        config.selected_page = page as usize - 1;
    }
    let request = build_request(&args)?;
    let registry = CapabilityRegistry::global_with(&config).clone();

    let cancel = CancelFlag::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling verification");
            on_interrupt.cancel();
        }
    });

    info!(file = %args.file.display(), "Verifying document");
    let report = verify_async(registry, config, request, cancel).await?;

    if let Some(dir) = &args.output_dir {
        write_images(&report, dir)?;
    }
    println!("{}", serde_json::to_string_pretty(&report.summary())?);
    Ok(exit_code(report.verdict.classification))
}

fn build_request(args: &VerifyArgs) -> Result<VerificationRequest> {
    let mut request = VerificationRequest::new(std::fs::read(&args.file)?);
    if let Some(kind) = args
        .file
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(DocumentKind::from_extension)
    {
        request = request.with_kind(kind);
    }

    if let Some(text) = &args.reference_text {
        request = request.with_reference_text(text.clone());
    } else if let Some(path) = &args.reference_text_file {
        request = request.with_reference_text(std::fs::read_to_string(path)?);
    }
    if let Some(path) = &args.reference_image {
        request = request.with_reference_image(std::fs::read(path)?);
    }
    if let Some(path) = &args.reference_document {
        request = request.with_reference_document(std::fs::read(path)?);
    }
    Ok(request)
}

/// Write every view of the verified page, plus the diff when there is one.
fn write_images(report: &VerificationReport, dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    let Some(page) = report.selected() else {
        return Ok(());
    };

    for mode in TransformMode::ALL {
        let png = encode_png(&ImageTransformer::render(page.bitmap(), mode))?;
        std::fs::write(dir.join(format!("page-{}-{}.png", page.index() + 1, mode.label())), png)?;
    }
    if let Some(diff) = &report.verdict.diff_image {
        let png = encode_png(&DynamicImage::ImageRgb8(diff.clone()))?;
        std::fs::write(dir.join(format!("page-{}-diff.png", page.index() + 1)), png)?;
    }
    info!(dir = %dir.display(), "Page images written");
    Ok(())
}

fn exit_code(classification: Classification) -> u8 {
    match classification {
        Classification::Original => 0,
        Classification::Fake => 1,
        Classification::Inconclusive => 2,
    }
}

impl From<&PruefwerkError> for AbortReport {
    fn from(err: &PruefwerkError) -> Self {
        let human = humanize_error(err);
        Self {
            error: err.to_string(),
            message: human.message,
            suggestion: human.suggestion,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;
    use std::io::Write;

    #[test]
    fn exit_codes_follow_the_classification() {
        assert_eq!(exit_code(Classification::Original), 0);
        assert_eq!(exit_code(Classification::Fake), 1);
        assert_eq!(exit_code(Classification::Inconclusive), 2);
    }

    #[test]
    fn verify_arguments_parse() {
        let cli = Cli::try_parse_from([
            "pruefwerk",
            "verify",
            "scan.png",
            "--reference-text",
            "Certificate of Completion John Doe",
            "--page",
            "2",
        ])
        .unwrap();
        let Command::Verify(args) = cli.command else {
            panic!("expected the verify subcommand");
        };
        assert_eq!(args.file, PathBuf::from("scan.png"));
        assert_eq!(args.page, Some(2));
    }

    #[test]
    fn page_zero_and_conflicting_text_sources_are_rejected() {
        assert!(Cli::try_parse_from(["pruefwerk", "verify", "a.pdf", "--page", "0"]).is_err());
        assert!(
            Cli::try_parse_from([
                "pruefwerk",
                "verify",
                "a.pdf",
                "--reference-text",
                "x",
                "--reference-text-file",
                "x.txt",
            ])
            .is_err()
        );
    }

    #[test]
    fn request_reads_reference_text_file_and_kind() {
        let dir = tempfile::tempdir().unwrap();
        let document = dir.path().join("certificate.pdf");
        std::fs::write(&document, b"%PDF-1.5").unwrap();
        let reference = dir.path().join("reference.txt");
        std::fs::File::create(&reference)
            .unwrap()
            .write_all(b"Amount: 1000")
            .unwrap();

        let cli = Cli::try_parse_from([
            OsString::from("pruefwerk"),
            OsString::from("verify"),
            document.clone().into_os_string(),
            OsString::from("--reference-text-file"),
            reference.clone().into_os_string(),
        ])
        .unwrap();
        let Command::Verify(args) = cli.command else {
            panic!("expected the verify subcommand");
        };

        let request = build_request(&args).unwrap();
        assert_eq!(request.kind, Some(DocumentKind::Pdf));
        assert_eq!(request.reference_text.as_deref(), Some("Amount: 1000"));
        assert_eq!(request.document, b"%PDF-1.5");
    }

    #[test]
    fn missing_document_is_an_io_error() {
        let cli = Cli::try_parse_from(["pruefwerk", "verify", "/nonexistent/scan.png"]).unwrap();
        let Command::Verify(args) = cli.command else {
            panic!("expected the verify subcommand");
        };
        assert!(matches!(build_request(&args), Err(PruefwerkError::Io(_))));
    }

    #[test]
    fn abort_report_is_human_readable() {
        let report = AbortReport::from(&PruefwerkError::NoPagesAvailable("empty".into()));
        assert!(report.error.contains("empty"));
        assert!(!report.message.is_empty());
    }
}
