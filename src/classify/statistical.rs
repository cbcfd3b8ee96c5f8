use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use super::{Classification, ClassifyError, Label, LineClassifier};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ClassStats {
    label: Label,
    documents: u64,
    total: u64,
    counts: HashMap<String, u64>,
}

/// Character n-gram naive Bayes model over labelled lines
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NgramModel {
    order: usize,
    classes: Vec<ClassStats>,
    vocab_size: usize,
}

fn ngrams(text: &str, order: usize) -> Vec<String> {
    let padded: Vec<char> = std::iter::once(' ')
        .chain(text.to_lowercase().chars())
        .chain(std::iter::once(' '))
        .collect();

    if padded.iter().all(|c| c.is_whitespace()) {
        return Vec::new();
    }
    if padded.len() <= order {
        return vec![padded.into_iter().collect()];
    }

    padded
        .windows(order)
        .map(|w| w.iter().collect::<String>())
        .collect()
}

impl NgramModel {
    /// Train from `(label, line)` pairs
    pub fn train<'a, I>(samples: I, order: usize) -> Result<Self>
    where
        I: IntoIterator<Item = (Label, &'a str)>,
    {
        ensure!(order > 0, "n-gram order must be > 0");

        let mut classes: Vec<ClassStats> = Label::ALL
            .iter()
            .map(|&label| ClassStats {
                label,
                documents: 0,
                total: 0,
                counts: HashMap::new(),
            })
            .collect();
        let mut vocab = HashSet::new();

        for (label, text) in samples {
            let grams = ngrams(text, order);
            if grams.is_empty() {
                continue;
            }
            let Some(stats) = classes.iter_mut().find(|c| c.label == label) else {
                continue;
            };
            stats.documents += 1;
            for gram in grams {
                stats.total += 1;
                *stats.counts.entry(gram.clone()).or_insert(0) += 1;
                vocab.insert(gram);
            }
        }

        classes.retain(|c| c.documents > 0);
        ensure!(
            classes.len() >= 2,
            "training data must cover at least two labels"
        );

        Ok(Self {
            order,
            classes,
            vocab_size: vocab.len(),
        })
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn labels(&self) -> Vec<Label> {
        self.classes.iter().map(|c| c.label).collect()
    }

    /// Posterior probability per label, highest first. Empty for blank text.
    pub fn posteriors(&self, text: &str) -> Vec<(Label, f32)> {
        let grams = ngrams(text, self.order);
        if grams.is_empty() {
            return Vec::new();
        }

        let total_docs: u64 = self.classes.iter().map(|c| c.documents).sum();
        let vocab = self.vocab_size as f64 + 1.0;

        let log_scores: Vec<(Label, f64)> = self
            .classes
            .iter()
            .map(|class| {
                let prior = (class.documents as f64 / total_docs as f64).ln();
                let denom = class.total as f64 + vocab;
                let likelihood: f64 = grams
                    .iter()
                    .map(|g| {
                        let count = class.counts.get(g).copied().unwrap_or(0) as f64;
                        ((count + 1.0) / denom).ln()
                    })
                    .sum();
                (class.label, prior + likelihood)
            })
            .collect();

        let max = log_scores
            .iter()
            .map(|(_, s)| *s)
            .fold(f64::NEG_INFINITY, f64::max);
        let norm: f64 = log_scores.iter().map(|(_, s)| (s - max).exp()).sum();

        let mut posteriors: Vec<(Label, f32)> = log_scores
            .into_iter()
            .map(|(label, s)| (label, ((s - max).exp() / norm) as f32))
            .collect();
        posteriors.sort_by(|a, b| b.1.total_cmp(&a.1));
        posteriors
    }

    /// Save model to a JSON file
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .with_context(|| "Failed to serialize classifier model")?;

        fs::write(path, json)
            .with_context(|| format!("Failed to write classifier model to {:?}", path))?;

        Ok(())
    }

    /// Load model from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read classifier model from {:?}", path))?;

        let model: Self = serde_json::from_str(&json)
            .with_context(|| "Failed to deserialize classifier model")?;

        Ok(model)
    }
}

/// Non-blank lines of a training file, trimmed
pub fn read_samples(path: &Path) -> Result<Vec<String>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read training file {:?}", path))?;

    Ok(text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect())
}

pub struct StatisticalClassifier {
    model: NgramModel,
    max_chars: usize,
    threshold: f32,
}

impl StatisticalClassifier {
    pub fn new(model: NgramModel, max_chars: usize, threshold: f32) -> Self {
        Self {
            model,
            max_chars,
            threshold,
        }
    }
}

impl LineClassifier for StatisticalClassifier {
    fn name(&self) -> &'static str {
        "statistical"
    }

    fn classify(&self, text: &str) -> Result<Classification, ClassifyError> {
        let head: String = text.chars().take(self.max_chars).collect();

        let Some(&(label, score)) = self.model.posteriors(&head).first() else {
            return Ok(Classification::fallback());
        };

        if score >= self.threshold {
            Ok(Classification::new(label, score))
        } else {
            Ok(Classification::new(Label::Other, 1.0 - score))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const SANSKRIT: &[&str] = &[
        "athāto brahmajijñāsā",
        "janmādyasya yataḥ",
        "śāstrayonitvāt",
        "tat tu samanvayāt",
        "dharmakṣetre kurukṣetre samavetā yuyutsavaḥ",
        "īkṣaterna aśabdam",
    ];

    const ENGLISH: &[&str] = &[
        "now therefore the inquiry into brahman",
        "the origin of this world is from that",
        "because scripture is the source of knowledge",
        "but that is established by harmony",
        "on the field of righteousness they gathered",
        "it is not the one that is inferred",
    ];

    fn model() -> NgramModel {
        let samples = SANSKRIT
            .iter()
            .map(|s| (Label::Sanskrit, *s))
            .chain(ENGLISH.iter().map(|s| (Label::English, *s)));
        NgramModel::train(samples, 3).unwrap()
    }

    #[test]
    fn test_ngrams_are_padded() {
        assert_eq!(ngrams("ab", 3), vec![" ab", "ab "]);
        assert_eq!(ngrams("a", 3), vec![" a "]);
        assert!(ngrams("   ", 3).is_empty());
    }

    #[test]
    fn test_training_needs_two_labels() {
        let samples = SANSKRIT.iter().map(|s| (Label::Sanskrit, *s));
        assert!(NgramModel::train(samples, 3).is_err());
    }

    #[test]
    fn test_posteriors_sum_to_one() {
        let posteriors = model().posteriors("yataḥ tu");
        let total: f32 = posteriors.iter().map(|(_, p)| p).sum();
        assert!((total - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_separates_languages() {
        let classifier = StatisticalClassifier::new(model(), 512, 0.5);
        assert_eq!(
            classifier.classify("brahmajijñāsā yataḥ").unwrap().label,
            Label::Sanskrit
        );
        assert_eq!(
            classifier.classify("the inquiry is established by scripture").unwrap().label,
            Label::English
        );
    }

    #[test]
    fn test_blank_text_is_other() {
        let classifier = StatisticalClassifier::new(model(), 512, 0.5);
        assert_eq!(classifier.classify("  ").unwrap(), Classification::fallback());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("model.json");
        let original = model();
        original.save(&path).unwrap();

        let loaded = NgramModel::load(&path).unwrap();
        assert_eq!(loaded.order(), 3);
        assert_eq!(loaded.labels(), original.labels());
        assert_eq!(
            loaded.posteriors("śāstra")[0].0,
            original.posteriors("śāstra")[0].0
        );
    }
}
