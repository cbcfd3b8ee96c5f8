//! Repairs for diacritics that OCR tends to get wrong in IAST text.

/// Combining marks folded into their precomposed IAST letters.
const COMPOSITIONS: &[(char, char, char)] = &[
    ('a', '\u{0304}', 'ā'),
    ('i', '\u{0304}', 'ī'),
    ('u', '\u{0304}', 'ū'),
    ('A', '\u{0304}', 'Ā'),
    ('I', '\u{0304}', 'Ī'),
    ('U', '\u{0304}', 'Ū'),
    ('r', '\u{0323}', 'ṛ'),
    ('R', '\u{0323}', 'Ṛ'),
    ('ṛ', '\u{0304}', 'ṝ'),
    ('Ṛ', '\u{0304}', 'Ṝ'),
    ('l', '\u{0323}', 'ḷ'),
    ('L', '\u{0323}', 'Ḷ'),
    ('ḷ', '\u{0304}', 'ḹ'),
    ('m', '\u{0323}', 'ṃ'),
    ('M', '\u{0323}', 'Ṃ'),
    ('h', '\u{0323}', 'ḥ'),
    ('H', '\u{0323}', 'Ḥ'),
    ('t', '\u{0323}', 'ṭ'),
    ('T', '\u{0323}', 'Ṭ'),
    ('d', '\u{0323}', 'ḍ'),
    ('D', '\u{0323}', 'Ḍ'),
    ('n', '\u{0323}', 'ṇ'),
    ('N', '\u{0323}', 'Ṇ'),
    ('s', '\u{0323}', 'ṣ'),
    ('S', '\u{0323}', 'Ṣ'),
    ('n', '\u{0307}', 'ṅ'),
    ('N', '\u{0307}', 'Ṅ'),
    ('m', '\u{0307}', 'ṁ'),
    ('s', '\u{0301}', 'ś'),
    ('S', '\u{0301}', 'Ś'),
    ('n', '\u{0303}', 'ñ'),
    ('N', '\u{0303}', 'Ñ'),
];

/// Look-alike marks and misplaced retroflexion, mapped to the intended IAST.
///
/// Every replacement removes a marked character, so repeated passes settle.
const CORRECTIONS: &[(&str, &str)] = &[
    ("ṁ", "ṃ"),
    ("ġ", "g"),
    ("ṉ", "n"),
    ("ḻ", "l"),
    ("ṡ", "ś"),
    ("ṙ", "ṛ"),
    ("ẖ", "ḥ"),
    ("ḵ", "k"),
    ("ṯ", "t"),
    ("ḏ", "d"),
    ("k\u{035F}h", "kh"),
    ("ă", "ā"),
    ("ĭ", "ī"),
    ("ŭ", "ū"),
    ("ş", "ṣ"),
    ("ţ", "ṭ"),
    // a retroflex can't precede a dental stop
    ("ṭt", "tt"),
    ("ḍd", "dd"),
    ("ṇt", "nt"),
    ("ṇd", "nd"),
];

/// Folds decomposed base+mark pairs into precomposed letters.
pub fn compose_marks(text: &str) -> String {
    let mut out: Vec<char> = Vec::with_capacity(text.len());
    for ch in text.chars() {
        if let Some(prev) = out.last_mut() {
            if let Some(&(_, _, composed)) = COMPOSITIONS
                .iter()
                .find(|(base, mark, _)| *base == *prev && *mark == ch)
            {
                *prev = composed;
                continue;
            }
        }
        out.push(ch);
    }
    out.into_iter().collect()
}

fn apply_once(text: &str) -> String {
    CORRECTIONS
        .iter()
        .fold(compose_marks(text), |acc, (from, to)| acc.replace(from, to))
}

/// Applies the correction table until nothing changes, so
/// `correct(&correct(x)) == correct(x)`.
pub fn correct(text: &str) -> String {
    let mut current = apply_once(text);
    loop {
        let next = apply_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compose_decomposed_marks() {
        assert_eq!(compose_marks("a\u{0304}tma\u{0304}"), "ātmā");
        assert_eq!(compose_marks("kr\u{0323}s\u{0323}n\u{0323}a"), "kṛṣṇa");
        assert_eq!(compose_marks("r\u{0323}\u{0304}"), "ṝ");
    }

    #[test]
    fn test_lookalikes_fixed() {
        assert_eq!(correct("saṁsāra"), "saṃsāra");
        assert_eq!(correct("ġuru"), "guru");
        assert_eq!(correct("k\u{035F}hala"), "khala");
    }

    #[test]
    fn test_retroflex_before_dental() {
        assert_eq!(correct("bhaṇtu"), "bhantu");
        assert_eq!(correct("raṣṭra"), "raṣṭra");
    }

    #[test]
    fn test_correct_is_idempotent() {
        let samples = [
            "athāto brahmajijñāsā",
            "saṁsāra ṇṇṭt ġ ṁ",
            "ṭṭt ḍḍd ṇṇd",
            "kr\u{0323}s\u{0323}n\u{0323}a ṁ\u{0323}",
            "plain english text",
            "",
        ];
        for sample in samples {
            let once = correct(sample);
            assert_eq!(correct(&once), once, "not idempotent for {:?}", sample);
        }
    }

    #[test]
    fn test_correct_leaves_valid_iast_alone() {
        let valid = "janmādyasya yataḥ śāstrayonitvāt";
        assert_eq!(correct(valid), valid);
    }
}
