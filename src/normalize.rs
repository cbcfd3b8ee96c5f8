//! OCR noise removal for raw page text.

use lazy_static::lazy_static;
use regex::Regex;

use crate::config::NormalizerConfig;

lazy_static! {
    static ref PAREN_IN_WORD: Regex = Regex::new(r"([A-Za-z])\)([A-Za-z])").unwrap();
    static ref SOURCE_TAG: Regex = Regex::new(r"\[source:\s*\d+\]").unwrap();
    static ref EMPTY_PARENS: Regex = Regex::new(r"\(\s*\)").unwrap();
    static ref RULER: Regex = Regex::new(r"-{5,}.*?-{5,}").unwrap();
    static ref PAGE_NUMBER: Regex = Regex::new(r"^\d+$").unwrap();
}

fn is_border_char(c: char) -> bool {
    matches!(
        c,
        '|' | '¦' | '¬' | '-' | '_' | '=' | '~' | '!' | '.' | '[' | ']' | '{' | '}' | '('
            | ')' | '<' | '>' | '\\' | '/' | '*' | '+'
    ) || ('\u{2500}'..='\u{257F}').contains(&c)
}

fn is_prefix_char(c: char) -> bool {
    matches!(c, '|' | '!' | '¬' | ':' | ';' | '-' | '_' | '=' | '~')
}

/// A `0` that sits in a word is almost always a misread `o`.
fn fix_zeros(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;

    while i < chars.len() {
        if chars[i] != '0' {
            out.push(chars[i]);
            i += 1;
            continue;
        }

        let start = i;
        while i < chars.len() && chars[i] == '0' {
            i += 1;
        }
        let before = start.checked_sub(1).map(|j| chars[j]);
        let after = chars.get(i).copied();

        let letter_after = after.is_some_and(|c| c.is_ascii_lowercase());
        let digit_before = before.is_some_and(|c| c.is_ascii_digit());
        let replacement = if letter_after && !digit_before { 'o' } else { '0' };
        out.extend(std::iter::repeat(replacement).take(i - start));
    }

    out
}

/// Known OCR confusions, applied to the whole page
fn substitute(text: &str) -> String {
    let text = text.replace("I$", "IS").replace('$', "S").replace("0f", "of");
    let mut text = fix_zeros(&text);
    while PAREN_IN_WORD.is_match(&text) {
        text = PAREN_IN_WORD.replace_all(&text, "$1$2").into_owned();
    }
    text
}

fn is_border(line: &str, config: &NormalizerConfig) -> bool {
    let mut count = 0;
    for c in line.chars().filter(|c| !c.is_whitespace()) {
        if !is_border_char(c) {
            return false;
        }
        count += 1;
    }
    count >= config.border_min_run
}

fn has_symbol_prefix(line: &str, config: &NormalizerConfig) -> bool {
    let run = line.chars().take_while(|&c| is_prefix_char(c)).count();
    let letters = line.chars().filter(char::is_ascii_alphabetic).count();
    run >= config.symbol_prefix_min_run && letters < config.symbol_prefix_max_letters
}

fn is_low_content(line: &str, config: &NormalizerConfig) -> bool {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.is_empty() {
        return true;
    }

    if tokens.len() > config.min_tokens_for_ratio {
        let short = tokens
            .iter()
            .filter(|t| t.chars().count() <= config.short_token_max_len)
            .count();
        if short as f32 / tokens.len() as f32 > config.max_short_ratio {
            return true;
        }
    }

    if tokens.len() > config.min_tokens_for_real_words {
        let real = tokens
            .iter()
            .filter(|t| t.chars().filter(|c| c.is_alphabetic()).count() >= config.real_word_min_alpha)
            .count();
        if real < config.min_real_words {
            return true;
        }
    }

    false
}

fn strip_artifacts(line: &str) -> String {
    if line.starts_with("--- PAGE") {
        return String::new();
    }
    let line = SOURCE_TAG.replace_all(line, "");
    let line = line.replace('\\', "");
    let line = EMPTY_PARENS.replace_all(&line, "");
    let line = RULER.replace_all(&line, "");
    line.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn clean_line(line: &str, config: &NormalizerConfig) -> Option<String> {
    let trimmed = line.trim();
    if trimmed.is_empty()
        || is_border(trimmed, config)
        || has_symbol_prefix(trimmed, config)
        || is_low_content(trimmed, config)
    {
        return None;
    }

    let cleaned = strip_artifacts(trimmed);
    if cleaned.is_empty() || is_border(&cleaned, config) || PAGE_NUMBER.is_match(&cleaned) {
        return None;
    }
    Some(cleaned)
}

/// Strip OCR noise from raw page text, one output line per kept input line.
/// Never fails; the worst case is an empty string.
pub fn normalize(raw: &str, config: &NormalizerConfig) -> String {
    substitute(raw)
        .lines()
        .filter_map(|line| clean_line(line, config))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    const BORDER: &[char] = &[
        '|', '¦', '¬', '-', '_', '=', '~', '!', '.', '[', ']', '{', '}', '(', ')', '<', '>',
        '\\', '/', '*', '+', '─', '│', '┌', '┐', '└', '┘', '═', '╬',
    ];

    fn norm(raw: &str) -> String {
        normalize(raw, &NormalizerConfig::default())
    }

    #[test]
    fn test_border_only_text_is_removed() {
        for len in 4..16 {
            for offset in 0..BORDER.len() {
                let line: String = (0..len)
                    .map(|i| BORDER[(offset + i * 7) % BORDER.len()])
                    .collect();
                assert_eq!(norm(&line), "", "border line survived: {:?}", line);
            }
        }
        assert_eq!(norm("| | | | |"), "");
    }

    #[test]
    fn test_substitutions() {
        assert_eq!(substitute("THI$ I$ 0f"), "THIS IS of");
        assert_eq!(substitute("the w0rld and b00ks"), "the world and books");
        assert_eq!(substitute("1.10 and 2020"), "1.10 and 2020");
        assert_eq!(substitute("10th"), "10th");
        assert_eq!(substitute("kno)wledge a)b)c"), "knowledge abc");
    }

    #[test]
    fn test_symbol_prefix_lines_dropped() {
        assert_eq!(norm("|||: page 12"), "");
        assert_eq!(norm("-- atha now"), "-- atha now");
    }

    #[test]
    fn test_low_content_lines_dropped() {
        assert_eq!(norm("a b c d e f g"), "");
        assert_eq!(norm("x1 y2 z3 w4 v5"), "");
        assert_eq!(norm("tat tu samanvayāt"), "tat tu samanvayāt");
    }

    #[test]
    fn test_artifacts_removed() {
        assert_eq!(
            norm("Brahman ( ) is \\real [source: 3]"),
            "Brahman is real"
        );
        assert_eq!(norm("--- PAGE 4 ---"), "");
        assert_eq!(norm("before ------ noise ------ after"), "before after");
    }

    #[test]
    fn test_verse_page_survives() {
        let raw = "  ====================\nCHAPTER ONE\n\n1.1.1\nathāto brahmajijñāsā\n\
                   -- atha now; brahma the Absolute\nTRANSLATION\n\
                   Now therefore the inquiry into Brahman.\n12\n";
        assert_eq!(
            norm(raw),
            "CHAPTER ONE\n1.1.1\nathāto brahmajijñāsā\n-- atha now; brahma the Absolute\n\
             TRANSLATION\nNow therefore the inquiry into Brahman."
        );
    }
}
