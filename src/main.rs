use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use sutra_ocr::classify::{read_samples, Classifier, Label, NgramModel};
use sutra_ocr::config::{AppConfig, ClassifierKind};
use sutra_ocr::normalize::normalize;
use sutra_ocr::pipeline::Pipeline;
use sutra_ocr::records::{CsvEmitter, LookupTables, ReportWriter};
use sutra_ocr::source::{OcrPageSource, PageSource, TextDirSource, TextLayerSource};
use sutra_ocr::tools::insert_ground_truth;
use sutra_ocr::translit::{Scheme, Transliterator};

#[derive(Debug, Parser)]
#[command(author, version, about = "Sanskrit/English OCR extraction CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Extract verse records into a CSV file
    Extract(ExtractArgs),
    /// Write a line-by-line classification report
    Annotate(AnnotateArgs),
    /// Clean page text and insert canonical sutras from the sutra table
    Restore(RestoreArgs),
    /// Train the statistical line classifier from labelled corpora
    TrainClassifier(TrainArgs),
}

/// Where page text comes from
#[derive(Debug, Args)]
#[group(required = true, multiple = false)]
struct SourceArgs {
    /// Scanned PDF, read through pdftoppm + Tesseract
    #[arg(long)]
    pdf: Option<PathBuf>,
    /// PDF with an embedded text layer
    #[arg(long)]
    text_layer: Option<PathBuf>,
    /// Directory of pre-extracted .txt pages
    #[arg(long)]
    text_dir: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct RunArgs {
    #[command(flatten)]
    source: SourceArgs,
    /// Path to configuration JSON file
    #[arg(long)]
    config: Option<PathBuf>,
    /// First page to process (1-indexed)
    #[arg(long)]
    first_page: Option<u32>,
    /// Last page to process (inclusive)
    #[arg(long)]
    last_page: Option<u32>,
    #[arg(long, value_enum)]
    classifier: Option<ClassifierKind>,
    /// Statistical classifier model (JSON)
    #[arg(long)]
    model: Option<PathBuf>,
    /// Romanization scheme of the OCR output
    #[arg(long, value_enum)]
    scheme: Option<Scheme>,
    /// Terminology CSV (term, corrected form)
    #[arg(long)]
    terminology: Option<PathBuf>,
    /// Sutra table CSV (number, Devanagari)
    #[arg(long)]
    sutras: Option<PathBuf>,
    #[arg(long)]
    workers: Option<usize>,
}

#[derive(Debug, Args)]
struct ExtractArgs {
    #[command(flatten)]
    run: RunArgs,
    /// Output CSV path
    #[arg(short, long)]
    output: PathBuf,
    /// Add the sutra_translation column
    #[arg(long)]
    include_sutra_translation: bool,
}

#[derive(Debug, Args)]
struct AnnotateArgs {
    #[command(flatten)]
    run: RunArgs,
    /// Output report path
    #[arg(short, long)]
    output: PathBuf,
}

#[derive(Debug, Args)]
struct RestoreArgs {
    #[command(flatten)]
    run: RunArgs,
    /// Output text path
    #[arg(short, long)]
    output: PathBuf,
}

#[derive(Debug, Args)]
struct TrainArgs {
    /// Sanskrit lines, one per line
    #[arg(long)]
    sanskrit: PathBuf,
    /// English lines, one per line
    #[arg(long)]
    english: PathBuf,
    /// Lines that are neither
    #[arg(long)]
    other: Option<PathBuf>,
    /// Character n-gram order
    #[arg(long, default_value = "3")]
    order: usize,
    /// Where to write the model JSON
    #[arg(short, long)]
    output: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Extract(args) => extract_command(args),
        Commands::Annotate(args) => annotate_command(args),
        Commands::Restore(args) => restore_command(args),
        Commands::TrainClassifier(args) => train_command(args),
    }
}

fn load_config(args: &RunArgs) -> Result<AppConfig> {
    let mut config = match &args.config {
        Some(path) => {
            info!("Loading configuration from: {:?}", path);
            AppConfig::load(path)?
        }
        None => AppConfig::default(),
    };

    if let Some(first) = args.first_page {
        config.pipeline.first_page = first;
    }
    if args.last_page.is_some() {
        config.pipeline.last_page = args.last_page;
    }
    if let Some(kind) = args.classifier {
        config.classifier.kind = kind;
    }
    if args.model.is_some() {
        config.classifier.model_path = args.model.clone();
    }
    if let Some(scheme) = args.scheme {
        config.translit.input_scheme = scheme;
    }
    if args.terminology.is_some() {
        config.lookup.terminology = args.terminology.clone();
    }
    if args.sutras.is_some() {
        config.lookup.sutras = args.sutras.clone();
    }
    if let Some(workers) = args.workers {
        config.pipeline.workers = workers;
    }

    config.validate()?;
    info!("Configuration: {}", config);
    Ok(config)
}

fn open_source(args: &SourceArgs, config: &AppConfig) -> Result<Box<dyn PageSource>> {
    let source: Box<dyn PageSource> = if let Some(pdf) = &args.pdf {
        Box::new(OcrPageSource::open(pdf, &config.ocr)?)
    } else if let Some(pdf) = &args.text_layer {
        Box::new(TextLayerSource::open(pdf)?)
    } else if let Some(dir) = &args.text_dir {
        Box::new(TextDirSource::open(dir)?)
    } else {
        anyhow::bail!("One of --pdf, --text-layer or --text-dir is required");
    };
    Ok(source)
}

/// Config, lookup tables, classifier and page source, in that order, so bad
/// tables fail before any page is touched.
fn prepare(args: &RunArgs) -> Result<(Pipeline, LookupTables, Box<dyn PageSource>)> {
    let config = load_config(args)?;

    let tables = LookupTables::load(&config.lookup).context("Failed to load lookup tables")?;

    let classifier = Classifier::from_config(&config.classifier, tables.terms.as_ref())?;
    let source = open_source(&args.source, &config)?;
    Ok((Pipeline::new(config, classifier), tables, source))
}

fn extract_command(args: ExtractArgs) -> Result<()> {
    let (pipeline, tables, source) = prepare(&args.run)?;
    let run = pipeline.run(source.as_ref(), &tables)?;

    let mut output = pipeline.config().output.clone();
    output.include_sutra_translation |= args.include_sutra_translation;

    let stats = CsvEmitter::new(&output).write_file(&args.output, &run.rows)?;
    info!(
        "Extraction completed: {} pages ok, {} failed, {} records",
        run.pages_ok, run.pages_failed, stats.written
    );
    Ok(())
}

fn annotate_command(args: AnnotateArgs) -> Result<()> {
    let (pipeline, tables, source) = prepare(&args.run)?;
    let outcomes = pipeline.extract(source.as_ref())?;

    let translit = Transliterator::new(
        pipeline.config().translit.input_scheme,
        tables.terms.as_ref(),
    );
    ReportWriter::new(&translit).write_file(&args.output, &outcomes)?;
    info!("Annotation completed for {} pages", outcomes.len());
    Ok(())
}

fn restore_command(args: RestoreArgs) -> Result<()> {
    let (pipeline, tables, source) = prepare(&args.run)?;
    let sutras = tables
        .sutras
        .as_ref()
        .context("restore needs a sutra table (--sutras or lookup.sutras)")?;

    let Some(range) = pipeline.page_range(source.page_count()) else {
        anyhow::bail!("No pages in the requested range");
    };

    let mut restored = String::new();
    for number in range {
        match source.page(number) {
            Ok(page) => {
                let cleaned = normalize(&page.text, &pipeline.config().normalizer);
                restored.push_str(&insert_ground_truth(&cleaned, sutras));
                restored.push_str("\n\n");
                info!("Restored page {}", number);
            }
            Err(e) => {
                warn!("Skipping page {}: {}", number, e);
                restored.push_str(&format!("[ERROR] page {}: {}\n\n", number, e));
            }
        }
    }

    fs::write(&args.output, restored)
        .with_context(|| format!("Failed to write restored text to {:?}", args.output))?;
    info!("Restored text written to {:?}", args.output);
    Ok(())
}

fn train_command(args: TrainArgs) -> Result<()> {
    let mut corpora = vec![(Label::Sanskrit, &args.sanskrit), (Label::English, &args.english)];
    if let Some(other) = &args.other {
        corpora.push((Label::Other, other));
    }

    let mut samples: Vec<(Label, String)> = Vec::new();
    for (label, path) in corpora {
        let lines = read_samples(path)?;
        info!("Loaded {} {} samples from {:?}", lines.len(), label, path);
        samples.extend(lines.into_iter().map(|line| (label, line)));
    }

    let model = NgramModel::train(
        samples.iter().map(|(label, line)| (*label, line.as_str())),
        args.order,
    )?;
    model.save(&args.output)?;

    info!(
        "Trained {}-gram model over {} samples, saved to {:?}",
        model.order(),
        samples.len(),
        args.output
    );
    Ok(())
}
