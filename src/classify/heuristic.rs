use std::collections::HashSet;

use super::{Classification, ClassifyError, Label, LineClassifier};

/// Common Sanskrit words as they show up in romanized commentary, with and
/// without diacritics.
const BUILTIN_TERMS: &[&str] = &[
    "sri", "śrī", "krsna", "krishna", "kṛṣṇa", "atma", "ātmā", "atman", "ātman", "jnana",
    "jñāna", "sastra", "śāstra", "guru", "guruḥ", "bhagavan", "bhagavān", "paramatma",
    "paramātmā", "purusa", "puruṣa", "karma", "karman", "yoga", "yogaḥ", "veda", "vedanta",
    "vedānta", "brahman", "brahma", "prana", "prāṇa", "jyotis", "akasa", "ākāśa", "dharma",
    "artha", "moksa", "mokṣa", "sutra", "sūtra", "pramana", "pramāṇa", "prameya", "nyaya",
    "nyāya", "atha", "atah", "ataḥ", "iti", "ca", "eva", "tat", "tvam", "asi", "namah",
    "namaḥ", "om", "oṃ", "hi", "na", "tu", "api", "yatha", "yathā", "tatha", "tathā",
];

const IAST_MARKED: &[char] = &[
    'ā', 'ī', 'ū', 'ṛ', 'ṝ', 'ḷ', 'ḹ', 'ṃ', 'ṁ', 'ḥ', 'ś', 'ṣ', 'ṇ', 'ṭ', 'ḍ', 'ṅ', 'ñ',
];

/// Rule-based labelling: dictionary hits or long all-caps lines mean verse,
/// terminal punctuation means prose.
pub struct HeuristicClassifier {
    terms: HashSet<String>,
}

impl HeuristicClassifier {
    pub fn new() -> Self {
        Self::with_terms(std::iter::empty::<&str>())
    }

    /// Builtin dictionary plus extra (lowercased) terms, usually the
    /// terminology map's keys.
    pub fn with_terms<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut terms: HashSet<String> = BUILTIN_TERMS.iter().map(|t| t.to_string()).collect();
        terms.extend(extra.into_iter().map(|t| t.as_ref().to_lowercase()));
        Self { terms }
    }

    fn dictionary_hits(&self, text: &str) -> usize {
        text.split_whitespace()
            .map(|word| {
                word.trim_matches(|c: char| !c.is_alphanumeric())
                    .to_lowercase()
            })
            .filter(|word| !word.is_empty())
            .filter(|word| self.terms.contains(word) || word.chars().any(|c| IAST_MARKED.contains(&c)))
            .count()
    }
}

impl Default for HeuristicClassifier {
    fn default() -> Self {
        Self::new()
    }
}

fn is_shouting(text: &str) -> bool {
    text.chars().any(|c| c.is_alphabetic())
        && !text.chars().any(|c| c.is_lowercase())
        && text.split_whitespace().count() > 3
}

impl LineClassifier for HeuristicClassifier {
    fn name(&self) -> &'static str {
        "heuristic"
    }

    fn classify(&self, text: &str) -> Result<Classification, ClassifyError> {
        let text = text.trim();

        if self.dictionary_hits(text) >= 2 {
            return Ok(Classification::new(Label::Sanskrit, 1.0));
        }

        if is_shouting(text) {
            return Ok(Classification::new(Label::Sanskrit, 0.85));
        }

        if text.ends_with(['.', '?', '!']) {
            return Ok(Classification::new(Label::English, 0.9));
        }

        Ok(Classification::new(Label::Other, 0.5))
    }
}
