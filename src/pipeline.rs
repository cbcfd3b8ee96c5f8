use anyhow::{Context, Result};
use rayon::prelude::*;
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::ops::RangeInclusive;
use std::path::Path;
use tracing::{info, warn};

use crate::classify::{ClassifiedLine, Classifier, Label};
use crate::config::AppConfig;
use crate::normalize::normalize;
use crate::records::{BuilderState, LookupTables, OutputRow, RecordFinisher};
use crate::source::PageSource;

/// What became of one page
#[derive(Debug, Clone, PartialEq)]
pub enum PageOutcome {
    Extracted { page: u32, lines: Vec<ClassifiedLine> },
    Failed { page: u32, reason: String },
}

impl PageOutcome {
    pub fn page(&self) -> u32 {
        match self {
            PageOutcome::Extracted { page, .. } | PageOutcome::Failed { page, .. } => *page,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, PageOutcome::Failed { .. })
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunOutput {
    pub outcomes: Vec<PageOutcome>,
    pub rows: Vec<OutputRow>,
    pub pages_ok: usize,
    pub pages_failed: usize,
}

/// Per-page extraction and classification in parallel, then an ordered
/// fold through the record builder.
pub struct Pipeline {
    config: AppConfig,
    classifier: Classifier,
}

impl Pipeline {
    pub fn new(config: AppConfig, classifier: Classifier) -> Self {
        Self { config, classifier }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Configured range clamped to what the source holds; `None` when empty.
    pub fn page_range(&self, page_count: u32) -> Option<RangeInclusive<u32>> {
        let first = self.config.pipeline.first_page.max(1);
        let last = self
            .config
            .pipeline
            .last_page
            .unwrap_or(page_count)
            .min(page_count);
        (first <= last).then_some(first..=last)
    }

    /// Fetch, normalize and classify one page. Never fails; a page that
    /// cannot be read becomes `PageOutcome::Failed`.
    pub fn process_page(&self, source: &dyn PageSource, number: u32) -> PageOutcome {
        let page = match source.page(number) {
            Ok(page) => page,
            Err(e) => {
                warn!("Skipping page {}: {}", number, e);
                return PageOutcome::Failed {
                    page: number,
                    reason: e.to_string(),
                };
            }
        };

        let cleaned = normalize(&page.text, &self.config.normalizer);
        let lines: Vec<ClassifiedLine> = cleaned
            .lines()
            .map(|line| self.classifier.classify_line(line))
            .collect();

        info!("Page {}: {} lines", number, lines.len());
        PageOutcome::Extracted {
            page: number,
            lines,
        }
    }

    /// Every page in range, in page order regardless of completion order.
    pub fn extract(&self, source: &dyn PageSource) -> Result<Vec<PageOutcome>> {
        let count = source.page_count();
        let Some(range) = self.page_range(count) else {
            warn!(
                "No pages to process: range {}..{:?} against {} pages",
                self.config.pipeline.first_page, self.config.pipeline.last_page, count
            );
            return Ok(Vec::new());
        };

        info!(
            "Processing pages {}..={} of {} with {} workers",
            range.start(),
            range.end(),
            source.describe(),
            self.config.pipeline.workers
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.pipeline.workers)
            .build()
            .context("Failed to build worker pool")?;

        let outcomes = pool.install(|| {
            range
                .into_par_iter()
                .map(|number| self.process_page(source, number))
                .collect::<Vec<_>>()
        });
        Ok(outcomes)
    }

    /// Fold classified pages into output rows. Failed pages become marker
    /// rows at their position; headings carry across pages.
    pub fn build_rows(&self, outcomes: &[PageOutcome], tables: &LookupTables) -> Vec<OutputRow> {
        let finisher = RecordFinisher::new(
            self.config.translit.input_scheme,
            tables.terms.as_ref(),
            tables.sutras.as_ref(),
            self.config.segment.placeholder_translation.as_deref(),
        );

        let mut rows = Vec::new();
        let mut state = BuilderState::default();
        for outcome in outcomes {
            match outcome {
                PageOutcome::Extracted { lines, .. } => {
                    let (next, closed) = state.fold_lines(lines, &self.config.segment);
                    state = next;
                    rows.extend(
                        closed
                            .into_iter()
                            .map(|draft| OutputRow::Record(finisher.finish(draft))),
                    );
                }
                PageOutcome::Failed { page, reason } => rows.push(OutputRow::PageError {
                    page: *page,
                    reason: reason.clone(),
                }),
            }
        }
        if let Some(draft) = state.finish() {
            rows.push(OutputRow::Record(finisher.finish(draft)));
        }
        rows
    }

    pub fn run(&self, source: &dyn PageSource, tables: &LookupTables) -> Result<RunOutput> {
        let outcomes = self.extract(source)?;
        let pages_failed = outcomes.iter().filter(|o| o.is_failed()).count();
        let pages_ok = outcomes.len() - pages_failed;

        if let Some(corpus) = &self.config.sanskrit_corpus {
            let written = append_sanskrit_corpus(corpus, &outcomes)?;
            info!("Appended {} Sanskrit lines to {:?}", written, corpus);
        }

        let rows = self.build_rows(&outcomes, tables);
        info!(
            "Processed {} pages ({} failed), {} cached classifications",
            pages_ok + pages_failed,
            pages_failed,
            self.classifier.cached_entries()
        );

        Ok(RunOutput {
            outcomes,
            rows,
            pages_ok,
            pages_failed,
        })
    }
}

/// Append every Sanskrit line to a training corpus, one per line.
pub fn append_sanskrit_corpus(path: &Path, outcomes: &[PageOutcome]) -> Result<usize> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open corpus file {:?}", path))?;
    let mut out = BufWriter::new(file);

    let mut written = 0;
    for outcome in outcomes {
        if let PageOutcome::Extracted { lines, .. } = outcome {
            for line in lines.iter().filter(|l| l.label == Label::Sanskrit) {
                let text = line.rewrite.as_deref().unwrap_or(&line.text);
                writeln!(out, "{}", text)
                    .with_context(|| format!("Failed to write corpus file {:?}", path))?;
                written += 1;
            }
        }
    }
    out.flush()
        .with_context(|| format!("Failed to flush corpus file {:?}", path))?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::HeuristicClassifier;
    use crate::source::{Page, SourceError};
    use crate::translit::Scheme;
    use std::fs;
    use tempfile::tempdir;

    struct MemorySource {
        pages: Vec<Option<&'static str>>,
    }

    impl PageSource for MemorySource {
        fn describe(&self) -> String {
            "memory".to_string()
        }

        fn page_count(&self) -> u32 {
            self.pages.len() as u32
        }

        fn page(&self, number: u32) -> Result<Page, SourceError> {
            match self.pages.get(number as usize - 1).copied().flatten() {
                Some(text) => Ok(Page {
                    number,
                    text: text.to_string(),
                }),
                None => Err(SourceError::Ocr {
                    page: number,
                    reason: "tesseract crashed".to_string(),
                }),
            }
        }
    }

    fn pipeline(config: AppConfig) -> Pipeline {
        let classifier = Classifier::new(Box::new(HeuristicClassifier::new()), 0.8, 64);
        Pipeline::new(config, classifier)
    }

    fn source() -> MemorySource {
        MemorySource {
            pages: vec![
                Some("CHAPTER ONE\n1.1.1\nsome roman text\n"),
                Some("-- synonym gloss\nTRANSLATION\nthe meaning\n"),
                None,
                Some("1.1.2\nnext verse text\n12\n"),
            ],
        }
    }

    #[test]
    fn test_page_range_is_clamped() {
        let mut config = AppConfig::default();
        config.pipeline.first_page = 2;
        config.pipeline.last_page = Some(50);
        let p = pipeline(config);
        assert_eq!(p.page_range(10), Some(2..=10));
        assert_eq!(p.page_range(1), None);
    }

    #[test]
    fn test_failed_page_is_recorded_not_fatal() {
        let p = pipeline(AppConfig::default());
        let outcomes = p.extract(&source()).unwrap();

        assert_eq!(outcomes.len(), 4);
        assert_eq!(
            outcomes.iter().map(PageOutcome::page).collect::<Vec<_>>(),
            vec![1, 2, 3, 4]
        );
        assert_eq!(
            outcomes[2],
            PageOutcome::Failed {
                page: 3,
                reason: "page 3: OCR failed: tesseract crashed".to_string()
            }
        );
    }

    #[test]
    fn test_records_span_pages_in_order() {
        let mut config = AppConfig::default();
        config.translit.input_scheme = Scheme::Iast;
        let run = pipeline(config).run(&source(), &LookupTables::default()).unwrap();

        assert_eq!(run.pages_ok, 3);
        assert_eq!(run.pages_failed, 1);

        let records: Vec<_> = run
            .rows
            .iter()
            .filter_map(|row| match row {
                OutputRow::Record(r) => Some(r),
                OutputRow::PageError { .. } => None,
            })
            .collect();
        assert_eq!(records.len(), 2);

        let first = records[0];
        assert_eq!(first.chapter_title, "Chapter One");
        assert_eq!(first.sutra_no, "1.1.1");
        assert!(first.sb_verse_roman.contains("some roman text"));
        assert!(first.sb_verse_synonyms.contains("synonym gloss"));
        assert!(first.sb_verse_translation.contains("the meaning"));

        assert_eq!(records[1].chapter_title, "Chapter One");
        assert_eq!(records[1].sutra_no, "1.1.2");
        assert!(run
            .rows
            .iter()
            .any(|row| matches!(row, OutputRow::PageError { page: 3, .. })));
    }

    #[test]
    fn test_sanskrit_corpus_dump() {
        let dir = tempdir().unwrap();
        let corpus = dir.path().join("sanskrit.txt");
        let outcomes = vec![
            PageOutcome::Extracted {
                page: 1,
                lines: vec![
                    ClassifiedLine::labelled("tat tvam asi", Label::Sanskrit, 1.0),
                    ClassifiedLine::labelled("That thou art.", Label::English, 0.9),
                ],
            },
            PageOutcome::Failed {
                page: 2,
                reason: "x".to_string(),
            },
        ];

        assert_eq!(append_sanskrit_corpus(&corpus, &outcomes).unwrap(), 1);
        assert_eq!(append_sanskrit_corpus(&corpus, &outcomes).unwrap(), 1);
        assert_eq!(
            fs::read_to_string(&corpus).unwrap(),
            "tat tvam asi\ntat tvam asi\n"
        );
    }
}
