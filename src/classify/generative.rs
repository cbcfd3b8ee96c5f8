use anyhow::Result;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::process::Command;
use std::thread;
use std::time::Duration;
use tracing::debug;

use super::{Classification, ClassifyError, Label, LineClassifier};
use crate::config::{GenerativeConfig, LlmBackend, PromptStyle};

/// Sampling parameters sent with every prompt
#[derive(Debug, Clone, Copy)]
pub struct GenerationParams {
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Something that turns a prompt into a completion
pub trait CompletionBackend: Send + Sync {
    fn complete(&self, prompt: &str, params: GenerationParams) -> Result<String, ClassifyError>;
}

/// Runs a local model binary once per prompt, prompt passed as the last argument.
pub struct CommandBackend {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandBackend {
    pub fn new(program: PathBuf, args: Vec<String>) -> Self {
        Self { program, args }
    }
}

impl CompletionBackend for CommandBackend {
    fn complete(&self, prompt: &str, _params: GenerationParams) -> Result<String, ClassifyError> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(prompt)
            .output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ClassifyError::Backend(format!(
                "{:?} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// llama.cpp server `/completion` endpoint
#[cfg(feature = "http-llm")]
pub struct HttpBackend {
    client: reqwest::blocking::Client,
    url: String,
}

#[cfg(feature = "http-llm")]
#[derive(serde::Serialize)]
struct CompletionRequest<'a> {
    prompt: &'a str,
    n_predict: u32,
    temperature: f32,
    stop: [&'a str; 1],
}

#[cfg(feature = "http-llm")]
#[derive(serde::Deserialize)]
struct CompletionResponse {
    content: String,
}

#[cfg(feature = "http-llm")]
impl HttpBackend {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, ClassifyError> {
        let client = reqwest::blocking::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[cfg(feature = "http-llm")]
impl CompletionBackend for HttpBackend {
    fn complete(&self, prompt: &str, params: GenerationParams) -> Result<String, ClassifyError> {
        let request = CompletionRequest {
            prompt,
            n_predict: params.max_tokens,
            temperature: params.temperature,
            stop: ["\n"],
        };

        let response = self.client.post(&self.url).json(&request).send()?;

        if !response.status().is_success() {
            return Err(ClassifyError::Backend(format!(
                "{} returned {}",
                self.url,
                response.status()
            )));
        }

        let body: CompletionResponse = response.json()?;
        Ok(body.content)
    }
}

/// Global pause after every `batch_size` calls to a remote endpoint.
///
/// The lock is held while sleeping so every worker waits out the same pause.
pub struct Cooldown {
    batch_size: usize,
    pause: Duration,
    calls: Mutex<usize>,
}

impl Cooldown {
    pub fn new(batch_size: usize, pause: Duration) -> Self {
        Self {
            batch_size: batch_size.max(1),
            pause,
            calls: Mutex::new(0),
        }
    }

    pub fn before_call(&self) {
        let mut calls = self.calls.lock();
        if *calls > 0 && *calls % self.batch_size == 0 && !self.pause.is_zero() {
            debug!("Cooling down for {:?} after {} calls", self.pause, *calls);
            thread::sleep(self.pause);
        }
        *calls += 1;
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock()
    }
}

/// Asks a language model whether a line is Sanskrit, optionally also
/// for a normalized IAST rendering of it.
pub struct GenerativeClassifier {
    backend: Box<dyn CompletionBackend>,
    style: PromptStyle,
    params: GenerationParams,
    max_prompt_chars: usize,
    cooldown: Option<Cooldown>,
}

impl GenerativeClassifier {
    pub fn new(
        backend: Box<dyn CompletionBackend>,
        style: PromptStyle,
        params: GenerationParams,
        max_prompt_chars: usize,
    ) -> Self {
        Self {
            backend,
            style,
            params,
            max_prompt_chars,
            cooldown: None,
        }
    }

    pub fn with_cooldown(mut self, cooldown: Cooldown) -> Self {
        self.cooldown = Some(cooldown);
        self
    }

    pub fn from_config(config: &GenerativeConfig) -> Result<Self> {
        let params = GenerationParams {
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        };

        let classifier = match &config.backend {
            LlmBackend::Command { program, args } => Self::new(
                Box::new(CommandBackend::new(program.clone(), args.clone())),
                config.prompt,
                params,
                config.max_prompt_chars,
            ),
            #[cfg(feature = "http-llm")]
            LlmBackend::Http { url } => {
                let backend = HttpBackend::new(url.clone(), Duration::from_secs(config.timeout_secs))?;
                Self::new(Box::new(backend), config.prompt, params, config.max_prompt_chars)
                    .with_cooldown(Cooldown::new(
                        config.batch_size,
                        Duration::from_millis(config.cooldown_ms),
                    ))
            }
            #[cfg(not(feature = "http-llm"))]
            LlmBackend::Http { url } => {
                anyhow::bail!("HTTP backend {} requested but built without the http-llm feature", url)
            }
        };

        Ok(classifier)
    }

    fn prompt(&self, text: &str) -> String {
        let cleaned: String = text
            .replace(['\'', '"'], "`")
            .chars()
            .take(self.max_prompt_chars)
            .collect();

        match self.style {
            PromptStyle::Binary => format!(
                "Classify this text as Sanskrit or English. Answer with one word.\n\n\
                 Text: '{}'\n\nAnswer:",
                cleaned
            ),
            PromptStyle::Normalize => format!(
                "You are an expert in Sanskrit and English. Analyze the following text segment. \
                 Determine if it is a Sanskrit verse (or part of one) or primarily English. \
                 If it is a Sanskrit verse, answer 'IAST:' followed by the verse in standard IAST \
                 transliteration with OCR errors and diacritics corrected. \
                 If it is primarily English, answer 'ENGLISH:'. \
                 If it is neither (garbage, headings, very mixed), answer 'OTHER:'. \
                 Do not add any other text.\n\n\
                 Text Segment: '{}'\n\nOutput:",
                cleaned
            ),
        }
    }
}

const NEGATIONS: &[&str] = &["no", "not", "non", "neither", "nor"];

/// One-word Sanskrit/English answer, yes/no accepted as well. Any
/// negation ("not Sanskrit", "non-Sanskrit") means Other.
pub fn parse_binary(answer: &str) -> Result<Classification, ClassifyError> {
    let lower = answer.trim().to_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    if words.first() == Some(&"yes") {
        return Ok(Classification::new(Label::Sanskrit, 1.0));
    }
    if words.iter().any(|w| NEGATIONS.contains(w)) {
        return Ok(Classification::new(Label::Other, 1.0));
    }

    match (words.contains(&"sanskrit"), words.contains(&"english")) {
        (true, false) => Ok(Classification::new(Label::Sanskrit, 1.0)),
        (false, true) => Ok(Classification::new(Label::English, 1.0)),
        _ => Err(ClassifyError::Unparseable(answer.trim().to_string())),
    }
}

/// `ENGLISH:` / `OTHER:` / `IAST: <text>`; a bare answer that still looks
/// like text is taken as an unlabelled rewrite at low confidence.
pub fn parse_normalize(answer: &str) -> Result<Classification, ClassifyError> {
    let raw = answer.trim();
    let lower = raw.to_lowercase();

    if lower.starts_with("english:") {
        return Ok(Classification::new(Label::English, 1.0));
    }
    if lower.starts_with("other:") {
        return Ok(Classification::new(Label::Other, 1.0));
    }
    if lower.starts_with("iast:") {
        let rewrite = raw.get("iast:".len()..).unwrap_or_default().trim();
        if rewrite.is_empty() {
            return Ok(Classification::new(Label::Other, 1.0));
        }
        return Ok(Classification::new(Label::Sanskrit, 1.0).with_rewrite(rewrite.to_string()));
    }
    if raw.chars().count() > 5 && raw.chars().any(char::is_alphabetic) {
        return Ok(Classification::new(Label::Sanskrit, 0.6).with_rewrite(raw.to_string()));
    }

    Err(ClassifyError::Unparseable(raw.to_string()))
}

impl LineClassifier for GenerativeClassifier {
    fn name(&self) -> &'static str {
        "generative"
    }

    fn classify(&self, text: &str) -> Result<Classification, ClassifyError> {
        if let Some(cooldown) = &self.cooldown {
            cooldown.before_call();
        }

        let answer = self.backend.complete(&self.prompt(text), self.params)?;

        match self.style {
            PromptStyle::Binary => parse_binary(&answer),
            PromptStyle::Normalize => parse_normalize(&answer),
        }
    }
}
