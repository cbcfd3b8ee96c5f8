use anyhow::{Context, Result};
use pdf_extract::extract_text;
use std::path::Path;
use tracing::{info, warn};

/// Text layer of a PDF, split per page
#[derive(Debug, Clone)]
pub struct PdfContent {
    pub pages: Vec<String>,
    pub has_text: bool,
}

/// Extract the embedded text of a PDF, one entry per page
pub fn extract_pages(path: &Path) -> Result<PdfContent> {
    info!("Extracting text layer from PDF: {:?}", path);

    let text = extract_text(path)
        .with_context(|| format!("Failed to extract text from PDF: {:?}", path))?;

    let content = split_pages(&text);
    if !content.has_text {
        warn!("PDF appears to be scanned or has no extractable text: {:?}", path);
    }

    info!("Extracted {} pages from PDF", content.pages.len());
    Ok(content)
}

/// Pages are separated by form feeds; a trailing empty chunk is not a page.
pub fn split_pages(text: &str) -> PdfContent {
    let mut pages: Vec<String> = text.split('\x0C').map(|s| s.to_string()).collect();
    while pages.len() > 1 && pages.last().is_some_and(|p| p.trim().is_empty()) {
        pages.pop();
    }

    PdfContent {
        has_text: !text.trim().is_empty(),
        pages,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_on_form_feed() {
        let content = split_pages("page one\x0Cpage two\x0C\n");
        assert!(content.has_text);
        assert_eq!(content.pages, vec!["page one", "page two"]);
    }

    #[test]
    fn test_blank_layer_has_no_text() {
        let content = split_pages("  \x0C \x0C");
        assert!(!content.has_text);
        assert_eq!(content.pages.len(), 1);
    }
}
