use lazy_static::lazy_static;
use regex::{Captures, Regex};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::LookupConfig;

lazy_static! {
    static ref WORD: Regex = Regex::new(r"[\p{L}\p{M}]+").unwrap();
    static ref PARENTHETICAL: Regex = Regex::new(r"\(([^()]+)\)").unwrap();
}

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("lookup table not found: {0:?}")]
    NotFound(PathBuf),

    #[error("failed to read lookup table {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{path:?} line {line}: {reason}")]
    Malformed {
        path: PathBuf,
        line: u64,
        reason: String,
    },

    #[error("terminology entry {term:?} leads back to {via:?}")]
    Cycle { term: String, via: String },
}

/// Two-column rows of a lookup CSV. `is_header` is asked about the first
/// row only.
fn read_pairs(
    path: &Path,
    is_header: impl Fn(&str) -> bool,
) -> Result<Vec<(u64, String, String)>, LookupError> {
    if !path.exists() {
        return Err(LookupError::NotFound(path.to_path_buf()));
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|source| LookupError::Read {
            path: path.to_path_buf(),
            source,
        })?;

    let mut rows = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record.map_err(|source| LookupError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let line = record.position().map(|p| p.line()).unwrap_or(idx as u64 + 1);

        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }
        if record.len() != 2 {
            return Err(LookupError::Malformed {
                path: path.to_path_buf(),
                line,
                reason: format!("expected 2 columns, found {}", record.len()),
            });
        }

        let key = record[0].trim();
        if idx == 0 && is_header(key) {
            debug!("Skipping header row of {:?}", path);
            continue;
        }
        if key.is_empty() {
            return Err(LookupError::Malformed {
                path: path.to_path_buf(),
                line,
                reason: "empty key".to_string(),
            });
        }

        rows.push((line, key.to_string(), record[1].trim().to_string()));
    }

    Ok(rows)
}

/// OCR spelling -> corrected IAST, keys compared lowercase.
///
/// Chains are resolved at load, so every value is final.
#[derive(Debug, Clone, Default)]
pub struct TerminologyMap {
    entries: HashMap<String, String>,
}

impl TerminologyMap {
    pub fn load(path: &Path) -> Result<Self, LookupError> {
        let rows = read_pairs(path, |key| {
            matches!(key.to_lowercase().as_str(), "original" | "term" | "ocr")
        })?;

        // a glossary skeleton row with nothing filled in yet
        let pairs = rows
            .into_iter()
            .filter(|(_, _, value)| !value.is_empty())
            .map(|(_, key, value)| (key, value));

        let map = Self::from_pairs(pairs)?;
        info!("Loaded {} terminology entries from {:?}", map.len(), path);
        Ok(map)
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, LookupError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let raw: HashMap<String, String> = pairs
            .into_iter()
            .map(|(k, v)| (k.as_ref().trim().to_lowercase(), v.into()))
            .collect();

        let mut entries = HashMap::with_capacity(raw.len());
        for key in raw.keys() {
            entries.insert(key.clone(), resolve_chain(&raw, key)?);
        }

        Ok(Self { entries })
    }

    pub fn get(&self, term: &str) -> Option<&str> {
        self.entries.get(&term.to_lowercase()).map(String::as_str)
    }

    pub fn terms(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn replacement(&self, word: &str) -> Option<String> {
        let value = self.get(word)?;
        let starts_upper = word.chars().next().is_some_and(char::is_uppercase);
        let mut chars = value.chars();
        match chars.next() {
            Some(first) if starts_upper && first.is_lowercase() => {
                Some(first.to_uppercase().chain(chars).collect())
            }
            _ => Some(value.to_string()),
        }
    }

    /// Replace every known word, keeping a leading capital.
    pub fn apply_words(&self, text: &str) -> String {
        if self.is_empty() {
            return text.to_string();
        }
        WORD.replace_all(text, |caps: &Captures| {
            let word = &caps[0];
            self.replacement(word).unwrap_or_else(|| word.to_string())
        })
        .into_owned()
    }

    /// Correct single-word glosses written in parentheses, as in
    /// "valid knowledge (pramana)".
    pub fn apply_parenthetical(&self, text: &str) -> String {
        if self.is_empty() {
            return text.to_string();
        }
        PARENTHETICAL
            .replace_all(text, |caps: &Captures| {
                let inner = caps[1].trim().trim_matches('*');
                let single_word = !inner.is_empty() && inner.chars().all(char::is_alphabetic);
                match self.replacement(inner) {
                    Some(fixed) if single_word => format!("({})", fixed),
                    _ => caps[0].to_string(),
                }
            })
            .into_owned()
    }
}

fn resolve_chain(raw: &HashMap<String, String>, key: &str) -> Result<String, LookupError> {
    let mut seen = HashSet::from([key.to_string()]);
    let mut current = raw.get(key).cloned().unwrap_or_default();

    loop {
        let lower = current.to_lowercase();
        match raw.get(&lower) {
            // differs only in case: take the spelling the table settles on
            Some(next) if next.to_lowercase() == lower => return Ok(next.clone()),
            Some(next) => {
                if !seen.insert(lower.clone()) {
                    return Err(LookupError::Cycle {
                        term: key.to_string(),
                        via: lower,
                    });
                }
                current = next.clone();
            }
            None => return Ok(current),
        }
    }
}

/// Sutra number -> authoritative Devanagari text
#[derive(Debug, Clone, Default)]
pub struct SutraTable {
    entries: HashMap<String, String>,
}

fn sutra_sort_key(number: &str) -> Vec<u32> {
    number
        .split(['.', '-'])
        .map(|part| part.trim().parse().unwrap_or(0))
        .collect()
}

impl SutraTable {
    pub fn load(path: &Path) -> Result<Self, LookupError> {
        let rows = read_pairs(path, |key| !key.starts_with(|c: char| c.is_ascii_digit()))?;

        let mut entries = HashMap::with_capacity(rows.len());
        for (line, number, text) in rows {
            if text.is_empty() {
                return Err(LookupError::Malformed {
                    path: path.to_path_buf(),
                    line,
                    reason: format!("sutra {} has no text", number),
                });
            }
            entries.insert(number, text);
        }

        info!("Loaded {} sutras from {:?}", entries.len(), path);
        Ok(Self { entries })
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    pub fn get(&self, number: &str) -> Option<&str> {
        self.entries.get(number.trim()).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries by sutra number, highest first
    pub fn descending(&self) -> Vec<(&str, &str)> {
        let mut rows: Vec<(&str, &str)> = self
            .entries
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        rows.sort_by(|a, b| sutra_sort_key(b.0).cmp(&sutra_sort_key(a.0)));
        rows
    }
}

/// Every lookup table a run needs, loaded up front.
#[derive(Debug, Clone, Default)]
pub struct LookupTables {
    pub terms: Option<TerminologyMap>,
    pub sutras: Option<SutraTable>,
}

impl LookupTables {
    pub fn load(config: &LookupConfig) -> Result<Self, LookupError> {
        let terms = config
            .terminology
            .as_deref()
            .map(TerminologyMap::load)
            .transpose()?;
        let sutras = config.sutras.as_deref().map(SutraTable::load).transpose()?;
        Ok(Self { terms, sutras })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_apply_words_keeps_capital() {
        let map = TerminologyMap::from_pairs([("Krsna", "kṛṣṇa"), ("sastra", "śāstra")]).unwrap();
        assert_eq!(
            map.apply_words("Krsna taught the sastra."),
            "Kṛṣṇa taught the śāstra."
        );
    }

    #[test]
    fn test_apply_words_is_idempotent() {
        let map = TerminologyMap::from_pairs([
            ("krsna", "kṛṣṇa"),
            ("kṛṣṇa", "Kṛṣṇa"),
            ("atma", "ātmā"),
        ])
        .unwrap();
        let once = map.apply_words("krsna atma KRSNA");
        assert_eq!(map.apply_words(&once), once);
    }

    #[test]
    fn test_chains_resolve_to_final_value() {
        let map = TerminologyMap::from_pairs([("prana", "pranah"), ("pranah", "prāṇa")]).unwrap();
        assert_eq!(map.get("prana"), Some("prāṇa"));
    }

    #[test]
    fn test_cycle_is_rejected() {
        let err = TerminologyMap::from_pairs([("a", "b"), ("b", "a")]).unwrap_err();
        assert!(matches!(err, LookupError::Cycle { .. }));
    }

    #[test]
    fn test_parenthetical_terms() {
        let map = TerminologyMap::from_pairs([("pramana", "pramāṇa")]).unwrap();
        assert_eq!(
            map.apply_parenthetical("valid knowledge (pramana) and (two words)"),
            "valid knowledge (pramāṇa) and (two words)"
        );
        assert_eq!(map.apply_parenthetical("(*pramana*)"), "(pramāṇa)");
    }

    #[test]
    fn test_load_glossary_with_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("glossary.csv");
        fs::write(
            &path,
            "\"Original\",\"Corrected IAST\"\n\"sastra\",\"śāstra\"\n\"nyaya\",\"\"\n",
        )
        .unwrap();

        let map = TerminologyMap::load(&path).unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("Sastra"), Some("śāstra"));
    }

    #[test]
    fn test_missing_and_malformed_tables() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope.csv");
        assert!(matches!(
            TerminologyMap::load(&missing),
            Err(LookupError::NotFound(_))
        ));

        let bad = dir.path().join("bad.csv");
        fs::write(&bad, "1.1.1,अथ,extra\n").unwrap();
        assert!(matches!(
            SutraTable::load(&bad),
            Err(LookupError::Malformed { .. })
        ));
    }

    #[test]
    fn test_sutra_table_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sutras.csv");
        fs::write(
            &path,
            "1.1.2,जन्माद्यस्य यतः\n1.1.10,गतिसामान्यात्\n1.1.1,अथातो ब्रह्मजिज्ञासा\n",
        )
        .unwrap();

        let table = SutraTable::load(&path).unwrap();
        assert_eq!(table.get("1.1.1"), Some("अथातो ब्रह्मजिज्ञासा"));
        let order: Vec<&str> = table.descending().iter().map(|(k, _)| *k).collect();
        assert_eq!(order, vec!["1.1.10", "1.1.2", "1.1.1"]);
    }
}
