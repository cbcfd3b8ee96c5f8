// Library exports for the CLI and the lookup-table builder

pub mod classify;
pub mod config;
pub mod normalize;
pub mod pipeline;
pub mod records;
pub mod source;
pub mod tools;
pub mod translit;
pub mod utils;

// Re-export commonly used types
pub use classify::{ClassifiedLine, Classifier, Label};
pub use config::AppConfig;
pub use pipeline::{PageOutcome, Pipeline, RunOutput};
pub use records::{LookupTables, OutputRow, VerseRecord};
pub use source::{Page, PageSource};
