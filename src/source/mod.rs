mod ocr_source;
mod text_dir;
mod text_layer;

use std::io;
use thiserror::Error;

pub use ocr_source::OcrPageSource;
pub use text_dir::{read_all, TextDirSource};
pub use text_layer::TextLayerSource;

/// Raw text of one physical page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// 1-indexed
    pub number: u32,
    pub text: String,
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("page {page} is outside 1..={count}")]
    OutOfRange { page: u32, count: u32 },

    #[error("page {page}: rendering failed: {reason}")]
    Render { page: u32, reason: String },

    #[error("page {page}: OCR failed: {reason}")]
    Ocr { page: u32, reason: String },

    #[error("page {page}: image preparation failed: {source}")]
    Image {
        page: u32,
        #[source]
        source: image::ImageError,
    },

    #[error("page {page}: {source}")]
    Io {
        page: u32,
        #[source]
        source: io::Error,
    },
}

/// Something that yields page text by page number
pub trait PageSource: Send + Sync {
    /// Human-readable origin for log lines
    fn describe(&self) -> String;

    fn page_count(&self) -> u32;

    fn page(&self, number: u32) -> Result<Page, SourceError>;
}

fn check_range(page: u32, count: u32) -> Result<(), SourceError> {
    if page == 0 || page > count {
        return Err(SourceError::OutOfRange { page, count });
    }
    Ok(())
}
