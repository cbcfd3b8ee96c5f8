mod cache;
mod generative;
mod heuristic;
mod statistical;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::{ClassifierConfig, ClassifierKind};
use crate::records::lookup::TerminologyMap;

pub use cache::ClassificationCache;
pub use generative::{
    CommandBackend, CompletionBackend, Cooldown, GenerationParams, GenerativeClassifier,
};
#[cfg(feature = "http-llm")]
pub use generative::HttpBackend;
pub use heuristic::HeuristicClassifier;
pub use statistical::{read_samples, NgramModel, StatisticalClassifier};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Sanskrit,
    English,
    Other,
}

impl Label {
    pub const ALL: [Label; 3] = [Label::Sanskrit, Label::English, Label::Other];
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Label::Sanskrit => "SANSKRIT",
            Label::English => "ENGLISH",
            Label::Other => "OTHER",
        };
        f.write_str(name)
    }
}

impl FromStr for Label {
    type Err = ClassifyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sanskrit" | "san" => Ok(Label::Sanskrit),
            "english" | "eng" => Ok(Label::English),
            "other" => Ok(Label::Other),
            other => Err(ClassifyError::Unparseable(other.to_string())),
        }
    }
}

/// One classifier answer
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub label: Label,
    /// Always within [0,1]
    pub confidence: f32,
    /// Normalized IAST a generative backend may hand back
    pub rewrite: Option<String>,
}

impl Classification {
    pub fn new(label: Label, confidence: f32) -> Self {
        Self {
            label,
            confidence: clamp_unit(confidence),
            rewrite: None,
        }
    }

    pub fn with_rewrite(mut self, rewrite: String) -> Self {
        self.rewrite = Some(rewrite);
        self
    }

    /// What every failed backend call turns into
    pub fn fallback() -> Self {
        Self::new(Label::Other, 0.0)
    }
}

fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// A line of page text together with its label
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedLine {
    pub text: String,
    pub label: Label,
    pub confidence: f32,
    pub rewrite: Option<String>,
}

impl ClassifiedLine {
    pub fn new(text: impl Into<String>, classification: Classification) -> Self {
        Self {
            text: text.into(),
            label: classification.label,
            confidence: classification.confidence,
            rewrite: classification.rewrite,
        }
    }

    /// Convenience for callers that already know the label
    pub fn labelled(text: impl Into<String>, label: Label, confidence: f32) -> Self {
        Self::new(text, Classification::new(label, confidence))
    }
}

#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("classifier backend failed: {0}")]
    Backend(String),

    #[error("could not interpret classifier answer {0:?}")]
    Unparseable(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[cfg(feature = "http-llm")]
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// A strategy that labels a short span of text
pub trait LineClassifier: Send + Sync {
    fn name(&self) -> &'static str;

    fn classify(&self, text: &str) -> Result<Classification, ClassifyError>;
}

/// Strategy-agnostic front: memoizes answers, enforces the Sanskrit
/// threshold and turns backend failures into `Other`/0.0.
pub struct Classifier {
    backend: Box<dyn LineClassifier>,
    cache: ClassificationCache,
    threshold: f32,
}

impl Classifier {
    pub fn new(backend: Box<dyn LineClassifier>, threshold: f32, cache_capacity: usize) -> Self {
        Self {
            backend,
            cache: ClassificationCache::new(cache_capacity),
            threshold,
        }
    }

    pub fn from_config(config: &ClassifierConfig, terms: Option<&TerminologyMap>) -> Result<Self> {
        let backend: Box<dyn LineClassifier> = match config.kind {
            ClassifierKind::Heuristic => {
                let extra = terms.map(|t| t.terms().collect::<Vec<_>>()).unwrap_or_default();
                Box::new(HeuristicClassifier::with_terms(extra))
            }
            ClassifierKind::Statistical => {
                let path = config
                    .model_path
                    .as_deref()
                    .context("statistical classifier needs classifier.model_path")?;
                let model = NgramModel::load(path)?;
                Box::new(StatisticalClassifier::new(model, config.max_chars, config.threshold))
            }
            ClassifierKind::Generative => {
                Box::new(GenerativeClassifier::from_config(&config.generative)?)
            }
        };

        info!("Using {} classifier (threshold {})", backend.name(), config.threshold);

        Ok(Self::new(backend, config.threshold, config.cache_capacity))
    }

    pub fn classify(&self, text: &str) -> Classification {
        let key = ClassificationCache::key(text);
        if key.is_empty() {
            return Classification::fallback();
        }

        if let Some(hit) = self.cache.get(&key) {
            return hit;
        }

        match self.backend.classify(&key) {
            Ok(answer) => {
                let answer = self.enforce_threshold(answer);
                self.cache.insert(key, answer.clone());
                answer
            }
            Err(e) => {
                debug!("{} classifier failed, treating line as OTHER: {}", self.backend.name(), e);
                Classification::fallback()
            }
        }
    }

    pub fn classify_line(&self, text: &str) -> ClassifiedLine {
        ClassifiedLine::new(text, self.classify(text))
    }

    fn enforce_threshold(&self, answer: Classification) -> Classification {
        let confidence = clamp_unit(answer.confidence);
        if answer.label == Label::Sanskrit && confidence < self.threshold {
            return Classification::new(Label::Other, confidence);
        }
        Classification {
            label: answer.label,
            confidence,
            rewrite: answer.rewrite,
        }
    }

    pub fn cached_entries(&self) -> usize {
        self.cache.len()
    }
}
