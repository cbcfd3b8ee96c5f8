mod correction;
mod schemes;

use serde::{Deserialize, Serialize};

use crate::records::lookup::TerminologyMap;

pub use correction::{compose_marks, correct};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Scheme {
    Itrans,
    Iast,
    HarvardKyoto,
    Slp1,
    Devanagari,
}

/// Convert `text` between two schemes. Characters outside the source
/// scheme's alphabet are carried over unchanged, so this never fails.
pub fn transliterate(text: &str, from: Scheme, to: Scheme) -> String {
    if from == to || text.is_empty() {
        return text.to_string();
    }

    let source = if from == Scheme::Iast {
        compose_marks(text)
    } else {
        text.to_string()
    };

    let tokens = schemes::parse(&source, from);
    schemes::render(&tokens, to)
}

/// Romanized and Devanagari renderings of the same text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub iast: String,
    pub devanagari: String,
}

/// Decides which scheme pairs run, in what order, and applies the
/// terminology and diacritic corrections in between.
pub struct Transliterator<'a> {
    input: Scheme,
    terms: Option<&'a TerminologyMap>,
}

impl<'a> Transliterator<'a> {
    pub fn new(input: Scheme, terms: Option<&'a TerminologyMap>) -> Self {
        Self { input, terms }
    }

    pub fn input_scheme(&self) -> Scheme {
        self.input
    }

    /// Bring text written in `scheme` to corrected IAST.
    pub fn to_iast(&self, text: &str, scheme: Scheme) -> String {
        let iast = transliterate(text, scheme, Scheme::Iast);
        let iast = match self.terms {
            Some(terms) => terms.apply_words(&iast),
            None => iast,
        };
        correct(&iast)
    }

    pub fn render(&self, text: &str) -> Rendered {
        self.render_from(text, self.input)
    }

    pub fn render_from(&self, text: &str, scheme: Scheme) -> Rendered {
        let iast = self.to_iast(text, scheme);
        let devanagari = transliterate(&iast, Scheme::Iast, Scheme::Devanagari);
        Rendered { iast, devanagari }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iast_to_devanagari() {
        assert_eq!(
            transliterate("athāto brahmajijñāsā", Scheme::Iast, Scheme::Devanagari),
            "अथातो ब्रह्मजिज्ञासा"
        );
        assert_eq!(
            transliterate("kṛṣṇa", Scheme::Iast, Scheme::Devanagari),
            "कृष्ण"
        );
    }

    #[test]
    fn test_itrans_to_iast() {
        assert_eq!(
            transliterate("athAto brahmajij~nAsA", Scheme::Itrans, Scheme::Iast),
            "athāto brahmajijñāsā"
        );
        assert_eq!(transliterate("kRRiShNa", Scheme::Itrans, Scheme::Iast), "kṛṣṇa");
        assert_eq!(transliterate("shAstra", Scheme::Itrans, Scheme::Iast), "śāstra");
    }

    #[test]
    fn test_hk_and_slp1() {
        assert_eq!(
            transliterate("janmAdyasya yataH", Scheme::HarvardKyoto, Scheme::Iast),
            "janmādyasya yataḥ"
        );
        assert_eq!(transliterate("kfzRa", Scheme::Slp1, Scheme::Iast), "kṛṣṇa");
        assert_eq!(transliterate("śāstra", Scheme::Iast, Scheme::Slp1), "SAstra");
    }

    #[test]
    fn test_iast_devanagari_round_trip() {
        let samples = [
            "athāto brahmajijñāsā",
            "janmādyasya yataḥ",
            "śāstrayonitvāt",
            "tat tu samanvayāt",
            "oṃ namaḥ śivāya",
            "pramāṇaprameyasaṃśaya",
            "1.1.1 dharmaḥ |",
            "ṛṣi ḹ ai au",
        ];
        for sample in samples {
            let dev = transliterate(sample, Scheme::Iast, Scheme::Devanagari);
            let back = transliterate(&dev, Scheme::Devanagari, Scheme::Iast);
            assert_eq!(back, sample, "round trip through {:?}", dev);
        }
    }

    #[test]
    fn test_devanagari_iast_round_trip() {
        for sample in ["धर्मक्षेत्रे कुरुक्षेत्रे", "अथातो ब्रह्मजिज्ञासा ॥", "सत्यं ज्ञानम्"] {
            let iast = transliterate(sample, Scheme::Devanagari, Scheme::Iast);
            let back = transliterate(&iast, Scheme::Iast, Scheme::Devanagari);
            assert_eq!(back, sample, "round trip through {:?}", iast);
        }
    }

    #[test]
    fn test_decomposed_iast_input() {
        assert_eq!(
            transliterate("a\u{0304}tma\u{0304}", Scheme::Iast, Scheme::Devanagari),
            "आत्मा"
        );
    }

    #[test]
    fn test_sequencer_corrects_after_conversion() {
        let translit = Transliterator::new(Scheme::Iast, None);
        let rendered = translit.render("saṁsāra");
        assert_eq!(rendered.iast, "saṃsāra");
        assert_eq!(rendered.devanagari, "संसार");
    }
}
