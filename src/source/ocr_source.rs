use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

use super::{check_range, Page, PageSource, SourceError};
use crate::config::OcrConfig;
use crate::utils::{image_prep, ocr};

/// Scanned PDF read through pdftoppm + Tesseract, one page at a time.
///
/// Each source owns a private scratch directory so concurrent runs never
/// share page images; it is removed when the source is dropped.
pub struct OcrPageSource {
    pdf: PathBuf,
    config: OcrConfig,
    page_count: u32,
    scratch: PathBuf,
}

impl OcrPageSource {
    pub fn open(pdf: &Path, config: &OcrConfig) -> Result<Self> {
        if !pdf.is_file() {
            anyhow::bail!("PDF not found: {:?}", pdf);
        }

        ocr::check_tool(&config.tesseract_cmd, "--version")?;
        ocr::check_tool(&config.pdftoppm_cmd, "-v")?;

        let page_count = ocr::pdf_page_count(pdf, config)?;

        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        let base = config.work_dir.clone().unwrap_or_else(std::env::temp_dir);
        let scratch = base.join(format!("sutra_ocr_{}_{}", std::process::id(), millis));
        fs::create_dir_all(&scratch)
            .with_context(|| format!("Failed to create scratch directory {:?}", scratch))?;

        info!(
            "Opened {:?}: {} pages, language {}, {} dpi",
            pdf, page_count, config.language, config.dpi
        );

        Ok(Self {
            pdf: pdf.to_path_buf(),
            config: config.clone(),
            page_count,
            scratch,
        })
    }
}

impl PageSource for OcrPageSource {
    fn describe(&self) -> String {
        format!("OCR of {:?}", self.pdf)
    }

    fn page_count(&self) -> u32 {
        self.page_count
    }

    fn page(&self, number: u32) -> Result<Page, SourceError> {
        check_range(number, self.page_count)?;

        let rendered = ocr::render_page(&self.pdf, number, &self.config, &self.scratch)?;
        let mut scratch_files = vec![rendered.clone()];

        let image = if self.config.binarize {
            let binarized = self.scratch.join(format!("page-{}-bin.png", number));
            scratch_files.push(binarized.clone());
            image_prep::binarize_file(&rendered, &binarized)
                .map_err(|source| SourceError::Image { page: number, source })?;
            binarized
        } else {
            rendered
        };

        let text = ocr::recognize(&image, number, &self.config);

        for file in scratch_files {
            let _ = fs::remove_file(file);
        }

        let text = text?;
        debug!("OCR page {}: {} chars", number, text.len());
        Ok(Page { number, text })
    }
}

impl Drop for OcrPageSource {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_dir_all(&self.scratch) {
            warn!("Failed to remove scratch directory {:?}: {}", self.scratch, e);
        }
    }
}
