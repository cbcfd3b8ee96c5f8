//! Helpers for preparing lookup tables and restoring page text.

use anyhow::{Context, Result};
use lazy_static::lazy_static;
use regex::{NoExpand, Regex};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::records::SutraTable;
use crate::translit::{transliterate, Scheme};

lazy_static! {
    static ref SUTRA_LISTING: Regex = Regex::new(r"(\d+\.\d+\.\d+):\s+(.*)").unwrap();
    static ref PARENTHETICAL: Regex = Regex::new(r"\(([^)]+)\)").unwrap();
}

/// Pull `1.1.1: text` entries out of a pasted listing
pub fn parse_sutra_listing(raw: &str) -> Vec<(String, String)> {
    SUTRA_LISTING
        .captures_iter(raw)
        .map(|caps| (caps[1].to_string(), caps[2].trim().to_string()))
        .collect()
}

/// Write a sutra table CSV. With `to_devanagari` the listing is read as IAST.
pub fn write_sutra_table(
    entries: &[(String, String)],
    output: &Path,
    to_devanagari: bool,
) -> Result<usize> {
    if entries.is_empty() {
        anyhow::bail!("No sutras found; expected lines like '1.1.1: text'");
    }

    let mut writer = csv::Writer::from_path(output)
        .with_context(|| format!("Failed to create sutra table {:?}", output))?;
    for (number, text) in entries {
        let text = if to_devanagari {
            transliterate(text, Scheme::Iast, Scheme::Devanagari)
        } else {
            text.clone()
        };
        writer
            .write_record([number.as_str(), text.as_str()])
            .with_context(|| format!("Failed to write sutra {}", number))?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to flush sutra table {:?}", output))?;

    info!("Wrote {} sutras to {:?}", entries.len(), output);
    Ok(entries.len())
}

/// Unique single-word parenthetical terms, lowercased
pub fn glossary_terms(text: &str) -> BTreeSet<String> {
    PARENTHETICAL
        .captures_iter(text)
        .map(|caps| {
            caps[1]
                .replace("-\n", "")
                .replace('\n', " ")
                .replace('*', "")
                .trim()
                .to_lowercase()
        })
        .filter(|term| term.chars().count() > 1 && term.chars().all(char::is_alphabetic))
        .collect()
}

/// Skeleton terminology CSV: every term with an empty correction column
pub fn write_glossary(terms: &BTreeSet<String>, output: &Path) -> Result<usize> {
    let mut writer = csv::Writer::from_path(output)
        .with_context(|| format!("Failed to create glossary {:?}", output))?;
    writer
        .write_record(["Original", "Corrected IAST"])
        .context("Failed to write glossary header")?;
    for term in terms {
        writer
            .write_record([term.as_str(), ""])
            .with_context(|| format!("Failed to write glossary term {}", term))?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to flush glossary {:?}", output))?;

    info!("Wrote {} glossary terms to {:?}", terms.len(), output);
    Ok(terms.len())
}

/// Put the canonical sutra above its numbered line. Sutras are placed
/// highest number first, each at the first line starting with its last
/// number component.
pub fn insert_ground_truth(text: &str, sutras: &SutraTable) -> String {
    let mut text = text.to_string();
    for (number, sutra) in sutras.descending() {
        let display = number.rsplit('.').next().unwrap_or(number);
        let pattern = match Regex::new(&format!(r"(?m)^\s*{}\.", regex::escape(display))) {
            Ok(pattern) => pattern,
            Err(e) => {
                warn!("Skipping sutra {}: {}", number, e);
                continue;
            }
        };
        let replacement = format!("\n{}\n\n{}.", sutra, display);
        text = pattern.replacen(&text, 1, NoExpand(&replacement)).into_owned();
    }
    text
}

pub fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_sutra_listing() {
        let raw = "Adhyaya 1\n1.1.1: athāto brahmajijñāsā\nnoise\n1.1.2:  janmādyasya yataḥ  \n";
        assert_eq!(
            parse_sutra_listing(raw),
            vec![
                ("1.1.1".to_string(), "athāto brahmajijñāsā".to_string()),
                ("1.1.2".to_string(), "janmādyasya yataḥ".to_string()),
            ]
        );
    }

    #[test]
    fn test_sutra_table_round_trips_through_loader() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sutras.csv");
        let entries = parse_sutra_listing("1.1.1: tat tvam asi\n");

        write_sutra_table(&entries, &path, true).unwrap();
        let table = SutraTable::load(&path).unwrap();
        assert_eq!(table.get("1.1.1"), Some("तत् त्वम् असि"));

        assert!(write_sutra_table(&[], &path, false).is_err());
    }

    #[test]
    fn test_glossary_terms() {
        let text = "the self (ātman) and (*Brahman*) differ from (two words) \
                    and (x) and (prakr-\nti) and (ātman)";
        let terms = glossary_terms(text);
        assert_eq!(
            terms.into_iter().collect::<Vec<_>>(),
            vec!["brahman", "prakrti", "ātman"]
        );
    }

    #[test]
    fn test_glossary_file_has_empty_corrections() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("glossary.csv");
        let terms: BTreeSet<String> = ["dharma".to_string()].into_iter().collect();

        write_glossary(&terms, &path).unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "Original,Corrected IAST\ndharma,\n"
        );
    }

    #[test]
    fn test_insert_ground_truth() {
        let table = SutraTable::from_pairs([("1.1.1", "प्रमाण"), ("1.1.2", "दुःख $1")]);
        let text = "Commentary\n1. first verse\n2. second verse\n2. repeated";
        let restored = insert_ground_truth(text, &table);

        assert_eq!(
            restored,
            "Commentary\n\nप्रमाण\n\n1. first verse\n\nदुःख $1\n\n2. second verse\n2. repeated"
        );
    }
}
