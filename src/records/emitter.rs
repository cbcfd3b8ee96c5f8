use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use tracing::{debug, info};

use super::{OutputRow, VerseRecord};
use crate::classify::Label;
use crate::config::OutputConfig;
use crate::pipeline::PageOutcome;
use crate::translit::{Scheme, Transliterator};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmitStats {
    pub written: usize,
    pub duplicates: usize,
    pub errors: usize,
}

/// Writes records as fully quoted UTF-8 CSV, dropping repeated verses.
pub struct CsvEmitter {
    include_sutra_translation: bool,
    error_rows: bool,
}

impl CsvEmitter {
    pub fn new(config: &OutputConfig) -> Self {
        Self {
            include_sutra_translation: config.include_sutra_translation,
            error_rows: config.error_rows,
        }
    }

    pub fn write<W: Write>(&self, writer: W, rows: &[OutputRow]) -> Result<EmitStats> {
        let mut csv = csv::WriterBuilder::new()
            .quote_style(csv::QuoteStyle::Always)
            .from_writer(writer);

        csv.write_record(VerseRecord::header(self.include_sutra_translation))
            .context("Failed to write CSV header")?;

        let mut stats = EmitStats::default();
        let mut seen: HashSet<(String, String, String)> = HashSet::new();

        for row in rows {
            match row {
                OutputRow::Record(record) => {
                    let (sutra, verse, roman) = record.dedup_key();
                    if !seen.insert((sutra.to_string(), verse.to_string(), roman.to_string())) {
                        debug!("Dropping duplicate verse {} / {}", sutra, verse);
                        stats.duplicates += 1;
                        continue;
                    }
                    csv.write_record(record.fields(self.include_sutra_translation))
                        .with_context(|| format!("Failed to write record {}", record.sutra_no))?;
                    stats.written += 1;
                }
                OutputRow::PageError { page, reason } => {
                    stats.errors += 1;
                    if self.error_rows {
                        let marker = VerseRecord::page_error(*page, reason);
                        csv.write_record(marker.fields(self.include_sutra_translation))
                            .with_context(|| format!("Failed to write error row for page {}", page))?;
                    }
                }
            }
        }

        csv.flush().context("Failed to flush CSV output")?;
        Ok(stats)
    }

    pub fn write_file(&self, path: &Path, rows: &[OutputRow]) -> Result<EmitStats> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create output directory {:?}", parent))?;
        }
        let file = File::create(path)
            .with_context(|| format!("Failed to create output file {:?}", path))?;

        let stats = self.write(BufWriter::new(file), rows)?;
        info!(
            "Wrote {} records to {:?} ({} duplicates dropped, {} failed pages)",
            stats.written, path, stats.duplicates, stats.errors
        );
        Ok(stats)
    }
}

/// Line-by-line annotated text report
pub struct ReportWriter<'a> {
    translit: &'a Transliterator<'a>,
}

impl<'a> ReportWriter<'a> {
    pub fn new(translit: &'a Transliterator<'a>) -> Self {
        Self { translit }
    }

    pub fn write<W: Write>(&self, mut out: W, pages: &[PageOutcome]) -> io::Result<()> {
        for outcome in pages {
            match outcome {
                PageOutcome::Failed { page, reason } => {
                    writeln!(out, "[ERROR] page {}: {}\n", page, reason)?;
                }
                PageOutcome::Extracted { page, lines } => {
                    writeln!(out, "=== Page {} ===\n", page)?;
                    for line in lines {
                        match line.label {
                            Label::Sanskrit => {
                                let rendered = match &line.rewrite {
                                    Some(rewrite) => self.translit.render_from(rewrite, Scheme::Iast),
                                    None => self.translit.render(&line.text),
                                };
                                writeln!(out, "SANSKRIT ({:.2}):", line.confidence)?;
                                writeln!(out, "Original: {}", line.text)?;
                                writeln!(out, "IAST: {}", rendered.iast)?;
                                writeln!(out, "Devanagari: {}\n", rendered.devanagari)?;
                            }
                            Label::English => writeln!(out, "ENGLISH:\n{}\n", line.text)?,
                            Label::Other => writeln!(out, "OTHER:\n{}\n", line.text)?,
                        }
                    }
                }
            }
        }
        out.flush()
    }

    pub fn write_file(&self, path: &Path, pages: &[PageOutcome]) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create report file {:?}", path))?;
        self.write(BufWriter::new(file), pages)
            .with_context(|| format!("Failed to write report to {:?}", path))?;
        info!("Wrote report for {} pages to {:?}", pages.len(), path);
        Ok(())
    }
}
