use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::translit::Scheme;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    /// Minimum run of border characters for a line to count as decoration
    pub border_min_run: usize,
    pub symbol_prefix_min_run: usize,
    pub symbol_prefix_max_letters: usize,
    pub short_token_max_len: usize,
    pub max_short_ratio: f32,
    pub min_tokens_for_ratio: usize,
    pub real_word_min_alpha: usize,
    pub min_real_words: usize,
    pub min_tokens_for_real_words: usize,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            border_min_run: 4,
            symbol_prefix_min_run: 3,
            symbol_prefix_max_letters: 10,
            short_token_max_len: 3,
            max_short_ratio: 0.7,
            min_tokens_for_ratio: 5,
            real_word_min_alpha: 4,
            min_real_words: 2,
            min_tokens_for_real_words: 4,
        }
    }
}

impl NormalizerConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(self.border_min_run > 0, "border_min_run must be > 0");
        ensure!(self.symbol_prefix_min_run > 0, "symbol_prefix_min_run must be > 0");
        ensure!(
            (0.0..=1.0).contains(&self.max_short_ratio),
            "max_short_ratio must be within [0,1]"
        );
        ensure!(self.real_word_min_alpha > 0, "real_word_min_alpha must be > 0");
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierKind {
    Heuristic,
    Statistical,
    Generative,
}

/// How the generative backend is reached
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LlmBackend {
    /// llama.cpp style `/completion` endpoint
    Http { url: String },
    /// Local runner invoked once per prompt; the prompt is appended as the last argument
    Command { program: PathBuf, args: Vec<String> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptStyle {
    /// "Sanskrit or English?" one-word answer
    Binary,
    /// `ENGLISH:` / `OTHER:` / `IAST: <normalized text>`
    Normalize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerativeConfig {
    pub backend: LlmBackend,
    pub prompt: PromptStyle,
    pub max_tokens: u32,
    pub temperature: f32,
    pub max_prompt_chars: usize,
    /// Calls allowed before the cooldown kicks in
    pub batch_size: usize,
    pub cooldown_ms: u64,
    pub timeout_secs: u64,
}

impl Default for GenerativeConfig {
    fn default() -> Self {
        Self {
            backend: LlmBackend::Http {
                url: "http://127.0.0.1:8080/completion".to_string(),
            },
            prompt: PromptStyle::Binary,
            max_tokens: 8,
            temperature: 0.1,
            max_prompt_chars: 1000,
            batch_size: 10,
            cooldown_ms: 2000,
            timeout_secs: 30,
        }
    }
}

impl GenerativeConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(self.batch_size > 0, "generative.batch_size must be > 0");
        ensure!(self.max_prompt_chars > 0, "generative.max_prompt_chars must be > 0");
        ensure!(self.max_tokens > 0, "generative.max_tokens must be > 0");
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub kind: ClassifierKind,
    /// Minimum confidence for a Sanskrit label
    pub threshold: f32,
    /// Characters handed to the statistical model
    pub max_chars: usize,
    pub cache_capacity: usize,
    pub model_path: Option<PathBuf>,
    pub generative: GenerativeConfig,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            kind: ClassifierKind::Heuristic,
            threshold: 0.8,
            max_chars: 512,
            cache_capacity: 4096,
            model_path: None,
            generative: GenerativeConfig::default(),
        }
    }
}

impl ClassifierConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(
            (0.0..=1.0).contains(&self.threshold),
            "classifier.threshold must be within [0,1]"
        );
        ensure!(self.max_chars > 0, "classifier.max_chars must be > 0");
        if self.kind == ClassifierKind::Statistical {
            ensure!(
                self.model_path.is_some(),
                "classifier.model_path is required for the statistical classifier"
            );
        }
        self.generative.validate()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Tesseract language hint
    pub language: String,
    pub dpi: u32,
    pub psm: u32,
    pub binarize: bool,
    pub tesseract_cmd: PathBuf,
    pub pdftoppm_cmd: PathBuf,
    pub pdfinfo_cmd: PathBuf,
    /// Scratch directory for rendered pages; system temp dir when unset
    pub work_dir: Option<PathBuf>,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            language: "eng+san".to_string(),
            dpi: 300,
            psm: 3,
            binarize: true,
            tesseract_cmd: PathBuf::from("tesseract"),
            pdftoppm_cmd: PathBuf::from("pdftoppm"),
            pdfinfo_cmd: PathBuf::from("pdfinfo"),
            work_dir: None,
        }
    }
}

impl OcrConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(!self.language.trim().is_empty(), "ocr.language must not be empty");
        ensure!(self.dpi >= 72, "ocr.dpi must be >= 72");
        ensure!(self.psm <= 13, "ocr.psm must be within 0..=13");
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslitConfig {
    /// Romanization the OCR output is read as
    pub input_scheme: Scheme,
}

impl Default for TranslitConfig {
    fn default() -> Self {
        Self {
            input_scheme: Scheme::Itrans,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentConfig {
    pub subchapter_min_words: usize,
    /// Written into empty translations when set
    pub placeholder_translation: Option<String>,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            subchapter_min_words: 4,
            placeholder_translation: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub include_sutra_translation: bool,
    /// Emit a marker row for every page that failed
    pub error_rows: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            include_sutra_translation: false,
            error_rows: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// 1-indexed, inclusive
    pub first_page: u32,
    pub last_page: Option<u32>,
    pub workers: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            first_page: 1,
            last_page: None,
            workers: 4,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(self.first_page >= 1, "pipeline.first_page is 1-indexed");
        if let Some(last) = self.last_page {
            ensure!(
                last >= self.first_page,
                "pipeline.last_page ({}) must be >= first_page ({})",
                last,
                self.first_page
            );
        }
        ensure!(self.workers > 0, "pipeline.workers must be > 0");
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupConfig {
    pub terminology: Option<PathBuf>,
    pub sutras: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub normalizer: NormalizerConfig,
    pub classifier: ClassifierConfig,
    pub ocr: OcrConfig,
    pub translit: TranslitConfig,
    pub segment: SegmentConfig,
    pub output: OutputConfig,
    pub pipeline: PipelineConfig,
    pub lookup: LookupConfig,
    /// Sanskrit lines seen during a run are appended here for model training
    pub sanskrit_corpus: Option<PathBuf>,
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config: Self = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse config JSON: {:?}", path))?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.normalizer.validate()?;
        self.classifier.validate()?;
        self.ocr.validate()?;
        self.pipeline.validate()?;
        ensure!(
            self.segment.subchapter_min_words > 1,
            "segment.subchapter_min_words must be > 1"
        );
        Ok(())
    }
}

impl fmt::Display for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "classifier={:?} threshold={} scheme={:?} pages={}..{} workers={}",
            self.classifier.kind,
            self.classifier.threshold,
            self.translit.input_scheme,
            self.pipeline.first_page,
            self.pipeline
                .last_page
                .map(|p| p.to_string())
                .unwrap_or_else(|| "end".to_string()),
            self.pipeline.workers,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.classifier.threshold, 0.8);
        assert_eq!(config.ocr.language, "eng+san");
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{ "classifier": {{ "kind": "generative", "generative": {{ "backend": {{ "type": "command", "program": "llama-run", "args": ["model.gguf"] }} }} }}, "pipeline": {{ "first_page": 26, "last_page": 30 }} }}"#
        )
        .unwrap();

        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!(config.classifier.kind, ClassifierKind::Generative);
        assert!(matches!(
            config.classifier.generative.backend,
            LlmBackend::Command { .. }
        ));
        assert_eq!(config.pipeline.first_page, 26);
        assert_eq!(config.pipeline.last_page, Some(30));
        assert_eq!(config.normalizer.max_short_ratio, 0.7);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_inverted_page_range_is_rejected() {
        let mut config = AppConfig::default();
        config.pipeline.first_page = 10;
        config.pipeline.last_page = Some(3);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_statistical_requires_model() {
        let mut config = AppConfig::default();
        config.classifier.kind = ClassifierKind::Statistical;
        assert!(config.validate().is_err());
        config.classifier.model_path = Some(PathBuf::from("model.json"));
        assert!(config.validate().is_ok());
    }
}
