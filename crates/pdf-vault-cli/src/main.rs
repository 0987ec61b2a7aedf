//! PDF Vault CLI - Watermark and inspect local PDF files.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use pdf_vault_core::util::readable_file_size;
use pdf_vault_core::{AppConfig, PdfDocument, WatermarkSpec, apply_watermark_with};
use std::path::{Path, PathBuf};
use tracing::{Level, info, warn};
use tracing_subscriber::FmtSubscriber;

/// Prefix given to every watermarked copy
const OUTPUT_PREFIX: &str = "watermarked_";

#[derive(Parser, Debug)]
#[command(name = "pdf-vault")]
#[command(author, version, about = "Watermark and inspect PDF documents", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Stamp confidentiality watermarks onto PDF files
    Watermark {
        /// Input PDF files
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Label shown in the headline (default: the file stem)
        #[arg(short, long)]
        label: Option<String>,

        /// Output directory (default: next to each input)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Fixed timestamp text instead of the current local time
        #[arg(long)]
        timestamp: Option<String>,
    },

    /// Show page count, version and metadata of a PDF
    Info {
        /// Input PDF file
        input: PathBuf,
    },

    /// Print the effective configuration as TOML
    Config {
        /// Config file path
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

/// Destination for the watermarked copy of `input`.
fn output_path(input: &Path, output_dir: Option<&Path>) -> PathBuf {
    let name = input
        .file_name()
        .map_or_else(|| "document.pdf".into(), |n| n.to_string_lossy());
    let file_name = format!("{OUTPUT_PREFIX}{name}");

    match output_dir {
        Some(dir) => dir.join(file_name),
        None => input.with_file_name(file_name),
    }
}

fn default_label(input: &Path) -> String {
    input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("document")
        .to_string()
}

async fn watermark(
    inputs: Vec<PathBuf>,
    label: Option<String>,
    output_dir: Option<PathBuf>,
    timestamp: Option<String>,
) -> Result<()> {
    if let Some(dir) = &output_dir {
        tokio::fs::create_dir_all(dir)
            .await
            .context(format!("Failed to create output directory: {}", dir.display()))?;
    }

    let pb = ProgressBar::new(inputs.len() as u64);
    // Template is hardcoded and valid, unwrap is safe
    #[allow(clippy::unwrap_used)]
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("#>-"),
    );

    let mut written = Vec::with_capacity(inputs.len());

    for input in inputs {
        pb.set_message(input.display().to_string());

        let label = label.clone().unwrap_or_else(|| default_label(&input));
        let spec = match &timestamp {
            Some(ts) => WatermarkSpec::new(&label, ts),
            None => WatermarkSpec::now(&label),
        };

        let source = tokio::fs::read(&input)
            .await
            .context(format!("Failed to read PDF: {}", input.display()))?;

        let output = tokio::task::spawn_blocking(move || apply_watermark_with(&source, &spec))
            .await
            .context("Watermark task panicked")?
            .context(format!("Failed to watermark: {}", input.display()))?;

        let destination = output_path(&input, output_dir.as_deref());
        if destination.exists() {
            warn!("Overwriting {}", destination.display());
        }
        tokio::fs::write(&destination, output)
            .await
            .context(format!("Failed to write output: {}", destination.display()))?;

        info!("Watermarked {} -> {}", input.display(), destination.display());
        written.push(destination);
        pb.inc(1);
    }

    pb.finish_with_message("Watermarking complete");

    // CLI output is intentional
    #[allow(clippy::print_stdout)]
    {
        for path in &written {
            println!("Watermarked PDF saved to: {}", path.display());
        }
    }

    Ok(())
}

fn show_info(input: &Path) -> Result<()> {
    let doc = PdfDocument::from_file(input)
        .context(format!("Failed to load PDF: {}", input.display()))?;
    let meta = doc.metadata();

    let fields = [
        ("Title", meta.title.as_deref()),
        ("Author", meta.author.as_deref()),
        ("Subject", meta.subject.as_deref()),
        ("Keywords", meta.keywords.as_deref()),
        ("Creator", meta.creator.as_deref()),
        ("Producer", meta.producer.as_deref()),
        ("Created", meta.creation_date.as_deref()),
        ("Modified", meta.modification_date.as_deref()),
    ];

    // CLI output is intentional
    #[allow(clippy::print_stdout)]
    {
        println!("File:      {}", input.display());
        println!("Size:      {}", readable_file_size(doc.bytes().len() as u64));
        println!("Version:   {}", doc.version());
        println!("Pages:     {}", doc.page_count());
        println!("Encrypted: {}", if doc.is_encrypted() { "yes" } else { "no" });
        println!("MD5:       {}", doc.checksum());
        for (name, value) in fields {
            if let Some(value) = value {
                println!("{:<10} {}", format!("{name}:"), value);
            }
        }
    }

    Ok(())
}

fn print_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(path) => AppConfig::from_file(path),
        None => AppConfig::load(),
    }
    .context("Failed to load configuration")?;

    let rendered = config.to_toml().context("Failed to render configuration")?;

    // CLI output is intentional
    #[allow(clippy::print_stdout)]
    {
        print!("{rendered}");
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (before parsing args so env vars are available)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Setup logging
    let log_level = match args.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    match args.command {
        Command::Watermark {
            inputs,
            label,
            output_dir,
            timestamp,
        } => watermark(inputs, label, output_dir, timestamp).await,
        Command::Info { input } => show_info(&input),
        Command::Config { config } => print_config(config.as_deref()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_output_path_next_to_input() {
        assert_eq!(
            output_path(Path::new("/docs/report.pdf"), None),
            PathBuf::from("/docs/watermarked_report.pdf")
        );
    }

    #[test]
    fn test_output_path_in_directory() {
        assert_eq!(
            output_path(Path::new("/docs/report.pdf"), Some(Path::new("/out"))),
            PathBuf::from("/out/watermarked_report.pdf")
        );
    }

    #[test]
    fn test_default_label_is_file_stem() {
        assert_eq!(default_label(Path::new("a/Q3 Results.pdf")), "Q3 Results");
        assert_eq!(default_label(Path::new("/")), "document");
    }

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from([
            "pdf-vault",
            "watermark",
            "a.pdf",
            "b.pdf",
            "--label",
            "Board",
            "-v",
        ])
        .unwrap();
        assert_eq!(args.verbose, 1);
        assert!(matches!(
            args.command,
            Command::Watermark { ref inputs, ref label, .. }
                if inputs.len() == 2 && label.as_deref() == Some("Board")
        ));
    }
}
