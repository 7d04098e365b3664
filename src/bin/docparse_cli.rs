//! Offline entrypoint: run the parse pipeline on a local image without the HTTP server.
use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use docparse::{
    config, logging,
    processing::{DocumentType, ProcessingService, build_prompt},
};

#[derive(Parser)]
#[command(
    name = "docparse-cli",
    about = "Extract structured JSON from document images"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// OCR an image and ask the model for a structured record.
    Parse {
        #[arg(long)]
        file: PathBuf,
        #[arg(long)]
        doc_type: String,
    },
    /// Print the prompt that would be sent for already extracted text.
    Prompt {
        #[arg(long)]
        doc_type: String,
        #[arg(long)]
        text_file: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Parse { file, doc_type } => parse(&file, &doc_type).await,
        Command::Prompt {
            doc_type,
            text_file,
        } => print_prompt(&doc_type, &text_file),
    }
}

async fn parse(file: &Path, doc_type: &str) -> Result<()> {
    if !file.is_file() {
        bail!("{} is not a readable file", file.display());
    }
    config::init_config();
    logging::init_tracing();

    let service = ProcessingService::new().await;
    let record = service
        .parse_stored(file, doc_type)
        .await
        .with_context(|| format!("failed to parse {}", file.display()))?;
    println!(
        "{}",
        serde_json::to_string_pretty(&record).context("failed to render record")?
    );
    Ok(())
}

fn print_prompt(doc_type: &str, text_file: &Path) -> Result<()> {
    let known: DocumentType = doc_type.parse().with_context(|| {
        let names: Vec<&str> = DocumentType::ALL.iter().map(|t| t.as_str()).collect();
        format!("expected one of {}", names.join(", "))
    })?;
    let text = fs::read_to_string(text_file)
        .with_context(|| format!("failed to read {}", text_file.display()))?;
    print!("{}", build_prompt(known.as_str(), &text));
    Ok(())
}
