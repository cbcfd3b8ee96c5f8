use anyhow::Result;
use std::path::{Path, PathBuf};

use super::{check_range, Page, PageSource, SourceError};
use crate::utils::pdf_parser::extract_pages;

/// Embedded text layer of a PDF, for documents that were not scanned.
pub struct TextLayerSource {
    pdf: PathBuf,
    pages: Vec<String>,
}

impl TextLayerSource {
    pub fn open(pdf: &Path) -> Result<Self> {
        if !pdf.is_file() {
            anyhow::bail!("PDF not found: {:?}", pdf);
        }

        let content = extract_pages(pdf)?;
        if !content.has_text {
            anyhow::bail!("{:?} has no text layer; use OCR instead", pdf);
        }

        Ok(Self {
            pdf: pdf.to_path_buf(),
            pages: content.pages,
        })
    }
}

impl PageSource for TextLayerSource {
    fn describe(&self) -> String {
        format!("text layer of {:?}", self.pdf)
    }

    fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    fn page(&self, number: u32) -> Result<Page, SourceError> {
        check_range(number, self.page_count())?;
        Ok(Page {
            number,
            text: self.pages[number as usize - 1].clone(),
        })
    }
}
