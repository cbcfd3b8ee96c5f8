pub mod image_prep;
pub mod ocr;
pub mod pdf_parser;

pub use image_prep::{binarize, binarize_file, otsu_threshold};
pub use ocr::{check_tool, pdf_page_count, recognize, render_page};
pub use pdf_parser::{extract_pages, PdfContent};
