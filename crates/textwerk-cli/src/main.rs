// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Textwerk — document extraction from the command line.
//
// Entry point. Initialises logging, loads configuration, and runs local files
// through the processing queue, writing each structured artifact as JSON.

mod output;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use textwerk_core::config::{ParentLinking, PipelineConfig};
use textwerk_core::error::Result;
use textwerk_core::human_errors::humanize_error;
use textwerk_core::types::DocumentId;
use textwerk_extract::ocr::{OcrService, TesseractLocator};
use textwerk_pipeline::{DocumentService, ProcessingQueue, ProgressCallback};
use tracing::{error, info};

use output::{TableFormat, write_artifacts};

#[derive(Parser)]
#[command(name = "textwerk")]
#[command(version)]
#[command(about = "Turn PDF, Word, spreadsheet, and image files into linked structured content")]
struct Cli {
    /// JSON configuration file (defaults are used when it is missing)
    #[arg(short, long, env = "TEXTWERK_CONFIG", default_value = "textwerk.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process files and write one structured artifact per file
    Process {
        /// Input files
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,

        /// Output directory
        #[arg(short, long, value_name = "DIR", default_value = ".")]
        out: PathBuf,

        /// Also export every table in this format
        #[arg(long, value_enum)]
        tables: Option<TableFormat>,

        /// How blocks find their parent heading
        #[arg(long, value_enum)]
        linking: Option<Linking>,
    },

    /// Report whether an OCR engine can be found and started
    ProbeOcr,

    /// Write the effective configuration to the config file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Linking {
    /// Nearest open heading of a higher level
    Stack,
    /// Nearest earlier heading with the same section title
    Title,
}

impl From<Linking> for ParentLinking {
    fn from(linking: Linking) -> Self {
        match linking {
            Linking::Stack => ParentLinking::SectionStack,
            Linking::Title => ParentLinking::SectionTitle,
        }
    }
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
    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            let human = humanize_error(&err);
            error!(error = %err, "textwerk failed");
            eprintln!("{}", human.summary());
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config = PipelineConfig::load(&cli.config).with_env_overrides()?;
    match cli.command {
        Commands::Process {
            files,
            out,
            tables,
            linking,
        } => {
            let mut config = config;
            if let Some(linking) = linking {
                config.structure.parent_linking = linking.into();
            }
            process(config, &files, &out, tables).await
        }
        Commands::ProbeOcr => Ok(probe_ocr(&config)),
        Commands::InitConfig { force } => {
            if cli.config.exists() && !force {
                eprintln!("{} already exists, pass --force to overwrite it", cli.config.display());
                return Ok(ExitCode::FAILURE);
            }
            config.persist(&cli.config)?;
            println!("{}", cli.config.display());
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn process(
    config: PipelineConfig,
    files: &[PathBuf],
    out: &Path,
    tables: Option<TableFormat>,
) -> Result<ExitCode> {
    let service = Arc::new(DocumentService::in_memory(&config)?);
    let queue = ProcessingQueue::new(Arc::clone(&service), config.max_concurrent_documents);
    info!(files = files.len(), capacity = queue.capacity(), "processing");

    let mut failures = 0usize;
    let mut submitted: Vec<(String, DocumentId)> = Vec::new();
    for file in files {
        let name = file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| file.display().to_string());
        let uploaded = std::fs::read(file)
            .map_err(Into::into)
            .and_then(|data| service.upload(&data, &name));
        match uploaded {
            Ok(document) => {
                queue.submit(document.id, Some(progress_logger(name.clone())))?;
                submitted.push((name, document.id));
            }
            Err(err) => {
                failures += 1;
                error!(file = %name, error = %err, "upload rejected");
                eprintln!("{name}: {}", humanize_error(&err).summary());
            }
        }
    }

    for (name, id) in submitted {
        let outcome = match queue.wait(id).await {
            Ok(_) => service.structured_data(id),
            Err(err) => Err(err),
        };
        match outcome {
            Ok(Some(data)) => {
                let stem = Path::new(&name)
                    .file_stem()
                    .map(|stem| stem.to_string_lossy().into_owned())
                    .unwrap_or_else(|| id.to_string());
                for path in write_artifacts(out, &stem, &data, tables)? {
                    println!("{}", path.display());
                }
            }
            Ok(None) => {
                failures += 1;
                eprintln!("{name}: no structured data was produced");
            }
            Err(err) => {
                failures += 1;
                let message = service
                    .document(id)
                    .ok()
                    .and_then(|document| document.error_message)
                    .unwrap_or_else(|| humanize_error(&err).summary());
                eprintln!("{name}: {message}");
            }
        }
    }

    if failures > 0 {
        info!(failures, "some documents failed");
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

fn progress_logger(name: String) -> ProgressCallback {
    Arc::new(move |stage, progress| {
        info!(file = %name, stage = stage.as_str(), progress, "progress");
        Ok(())
    })
}

fn probe_ocr(config: &PipelineConfig) -> ExitCode {
    if !config.ocr.enabled {
        println!("OCR is disabled in the configuration");
        return ExitCode::FAILURE;
    }
    let locator = TesseractLocator::from_settings(&config.ocr);
    let Some(command) = locator.locate() else {
        println!("no tesseract binary found; set TESSERACT_CMD or ocr.tesseract_cmd");
        return ExitCode::FAILURE;
    };
    match OcrService::tesseract(config.ocr.clone(), &locator) {
        Ok(Some(service)) => match service.version() {
            Some(version) => {
                println!("{}: {version}", command.display());
                ExitCode::SUCCESS
            }
            None => {
                println!("{} did not report a version", command.display());
                ExitCode::FAILURE
            }
        },
        Ok(None) => {
            println!("no tesseract binary found");
            ExitCode::FAILURE
        }
        Err(err) => {
            println!("{}", humanize_error(&err).summary());
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn process_arguments_parse() {
        let cli = Cli::try_parse_from([
            "textwerk", "process", "a.pdf", "b.docx", "--out", "artifacts", "--tables", "csv",
            "--linking", "title",
        ])
        .unwrap();
        match cli.command {
            Commands::Process {
                files,
                out,
                tables,
                linking,
            } => {
                assert_eq!(files.len(), 2);
                assert_eq!(out, PathBuf::from("artifacts"));
                assert_eq!(tables, Some(TableFormat::Csv));
                assert_eq!(linking.map(ParentLinking::from), Some(ParentLinking::SectionTitle));
            }
            _ => panic!("expected process"),
        }
    }

    #[test]
    fn process_requires_files() {
        assert!(Cli::try_parse_from(["textwerk", "process"]).is_err());
    }

    #[tokio::test]
    async fn unreadable_files_fail_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig {
            upload_dir: dir.path().join("uploads"),
            ..PipelineConfig::default()
        };
        let code = process(config, &[dir.path().join("missing.pdf")], dir.path(), None)
            .await
            .unwrap();
        assert_eq!(code, ExitCode::FAILURE);
    }
}
