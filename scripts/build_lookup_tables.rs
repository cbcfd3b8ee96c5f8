use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use sutra_ocr::config::{AppConfig, OcrConfig};
use sutra_ocr::source::{read_all, OcrPageSource, PageSource};
use sutra_ocr::tools::{glossary_terms, parse_sutra_listing, read_text, write_glossary, write_sutra_table};

#[derive(Debug, Parser)]
#[command(author, version, about = "Build sutra tables and glossary skeletons")]
struct Args {
    #[command(subcommand)]
    task: Task,
}

#[derive(Debug, Subcommand)]
enum Task {
    /// Turn a pasted `1.1.1: text` listing into a sutra table CSV
    Sutras {
        /// Raw listing text file
        #[arg(short, long)]
        listing: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        /// Read the listing as IAST and store Devanagari
        #[arg(long, default_value = "false")]
        devanagari: bool,
    },
    /// Collect parenthetical terms into a terminology CSV to fill in by hand
    Glossary {
        /// Text file or directory of .txt pages
        #[arg(short, long, conflicts_with = "pdf")]
        input: Option<PathBuf>,
        /// Scanned PDF to OCR instead
        #[arg(long)]
        pdf: Option<PathBuf>,
        /// OCR settings (the `ocr` section is used)
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long, default_value = "1")]
        first_page: u32,
        #[arg(long)]
        last_page: Option<u32>,
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    match args.task {
        Task::Sutras {
            listing,
            output,
            devanagari,
        } => {
            info!("Reading sutra listing from: {:?}", listing);
            let entries = parse_sutra_listing(&read_text(&listing)?);
            info!("Found {} sutras", entries.len());
            write_sutra_table(&entries, &output, devanagari)?;
        }
        Task::Glossary {
            input,
            pdf,
            config,
            first_page,
            last_page,
            output,
        } => {
            let text = match (input, pdf) {
                (Some(path), _) if path.is_dir() => read_all(&path)?,
                (Some(path), _) => read_text(&path)?,
                (None, Some(pdf)) => {
                    let ocr = match config {
                        Some(path) => AppConfig::load(&path)?.ocr,
                        None => OcrConfig::default(),
                    };
                    ocr_pages(&pdf, &ocr, first_page, last_page)?
                }
                (None, None) => anyhow::bail!("One of --input or --pdf is required"),
            };

            let terms = glossary_terms(&text);
            info!("Found {} unique parenthetical terms", terms.len());
            write_glossary(&terms, &output)?;
        }
    }

    Ok(())
}

fn ocr_pages(pdf: &Path, ocr: &OcrConfig, first: u32, last: Option<u32>) -> Result<String> {
    let source = OcrPageSource::open(pdf, ocr)?;
    let last = last.unwrap_or(source.page_count()).min(source.page_count());

    let mut text = String::new();
    for number in first.max(1)..=last {
        info!("Reading page {}/{}", number, last);
        match source.page(number) {
            Ok(page) => {
                text.push_str(&page.text);
                text.push('\n');
            }
            Err(e) => warn!("Skipping page {}: {}", number, e),
        }
    }
    Ok(text)
}
