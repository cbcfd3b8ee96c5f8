//! Folds classified lines into verse records.
//!
//! The fold state is a plain value: the pipeline threads it from page to page
//! so headings and an open record survive page breaks.

use lazy_static::lazy_static;
use regex::Regex;

use super::lookup::{SutraTable, TerminologyMap};
use super::VerseRecord;
use crate::classify::{ClassifiedLine, Label};
use crate::config::SegmentConfig;
use crate::translit::{transliterate, Scheme, Transliterator};

lazy_static! {
    static ref CHAPTER: Regex = Regex::new(r"(?i)^chapter\s+\w+").unwrap();
    static ref ADHIKARANA: Regex = Regex::new(r"(?i)^adhikara[nṇ]a\s+\d+\s*:\s*(.*)$").unwrap();
    static ref SUTRA_REF: Regex = Regex::new(r"\(\s*Vs\.\s*(\d+\.\d+\.\d+)\s*\)").unwrap();
    static ref VERSE_NO: Regex =
        Regex::new(r"^(\d{1,3}(?:\.\d{1,3}){0,2}(?:-\d{1,3})?)(\.)?(?:\s+(.*))?$").unwrap();
    static ref TRANSLATION_MARKER: Regex = Regex::new(r"(?i)^translation\b[\s:.]*(.*)$").unwrap();
}

/// Sticky heading context
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headings {
    pub chapter: String,
    pub sub_chapter: String,
    /// Last `(Vs. x.y.z)` reference seen
    pub sutra_ref: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Roman,
    Synonyms,
    Translation,
}

/// A line of verse text and whether it still needs converting from the
/// input scheme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RomanSegment {
    pub text: String,
    pub from_input_scheme: bool,
}

/// A record that is still collecting lines
#[derive(Debug, Clone, PartialEq)]
pub struct DraftRecord {
    pub headings: Headings,
    pub verse_no: String,
    pub roman: Vec<RomanSegment>,
    pub synonyms: Vec<String>,
    pub translation: Vec<String>,
    phase: Phase,
}

impl DraftRecord {
    fn open(verse_no: &str, headings: &Headings) -> Self {
        Self {
            headings: headings.clone(),
            verse_no: verse_no.to_string(),
            roman: Vec::new(),
            synonyms: Vec::new(),
            translation: Vec::new(),
            phase: Phase::Roman,
        }
    }

    pub fn sutra_no(&self) -> &str {
        self.headings.sutra_ref.as_deref().unwrap_or(&self.verse_no)
    }

    fn push_roman(&mut self, text: &str, line: &ClassifiedLine) {
        let segment = match &line.rewrite {
            Some(rewrite) => RomanSegment {
                text: rewrite.clone(),
                from_input_scheme: false,
            },
            None => RomanSegment {
                text: text.to_string(),
                from_input_scheme: true,
            },
        };
        self.roman.push(segment);
    }

    fn absorb(&mut self, text: &str, line: &ClassifiedLine) {
        if let Some(caps) = TRANSLATION_MARKER.captures(text) {
            self.phase = Phase::Translation;
            let rest = caps[1].trim();
            if !rest.is_empty() {
                self.translation.push(rest.to_string());
            }
            return;
        }

        match self.phase {
            Phase::Translation => self.translation.push(text.to_string()),
            _ if text.contains("--") => {
                self.phase = Phase::Synonyms;
                self.synonyms.push(text.to_string());
            }
            Phase::Roman if line.label == Label::English => self.translation.push(text.to_string()),
            Phase::Roman => self.push_roman(text, line),
            Phase::Synonyms => {
                self.phase = Phase::Translation;
                self.translation.push(text.to_string());
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuilderState {
    pub headings: Headings,
    open: Option<DraftRecord>,
}

fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_sub_chapter(text: &str, min_words: usize) -> bool {
    text.starts_with(char::is_alphabetic)
        && !text.chars().any(char::is_lowercase)
        && text.split_whitespace().count() >= min_words
}

impl BuilderState {
    pub fn has_open_record(&self) -> bool {
        self.open.is_some()
    }

    /// Feed one line. Returns the record this line closed, if any.
    pub fn step(mut self, line: &ClassifiedLine, rules: &SegmentConfig) -> (Self, Option<DraftRecord>) {
        let text = line.text.trim();
        if text.is_empty() {
            return (self, None);
        }

        if let Some(m) = CHAPTER.find(text) {
            self.headings.chapter = title_case(m.as_str());
            self.headings.sub_chapter.clear();
            return (self, None);
        }

        if let Some(caps) = ADHIKARANA.captures(text) {
            let title = caps[1].trim();
            self.headings.sub_chapter = if title.is_empty() {
                text.to_string()
            } else {
                title.to_string()
            };
            return (self, None);
        }

        if is_sub_chapter(text, rules.subchapter_min_words) {
            self.headings.sub_chapter = text.to_string();
            return (self, None);
        }

        if let Some(caps) = SUTRA_REF.captures(text) {
            self.headings.sutra_ref = Some(caps[1].to_string());
            let rest = SUTRA_REF.replace(text, "");
            let rest = rest.trim();
            if rest.is_empty() {
                return (self, None);
            }
            let remainder = ClassifiedLine {
                text: rest.to_string(),
                ..line.clone()
            };
            return self.step(&remainder, rules);
        }

        if let Some(caps) = VERSE_NO.captures(text) {
            let number = &caps[1];
            if number.contains('.') || caps.get(2).is_some() {
                let closed = self.open.take();
                let mut draft = DraftRecord::open(number, &self.headings);
                if let Some(rest) = caps.get(3).map(|m| m.as_str().trim()) {
                    if !rest.is_empty() {
                        draft.push_roman(rest, line);
                    }
                }
                self.open = Some(draft);
                return (self, closed);
            }
        }

        if let Some(draft) = self.open.as_mut() {
            draft.absorb(text, line);
        }

        (self, None)
    }

    /// Feed a run of lines, collecting every record they close.
    pub fn fold_lines<'l, I>(self, lines: I, rules: &SegmentConfig) -> (Self, Vec<DraftRecord>)
    where
        I: IntoIterator<Item = &'l ClassifiedLine>,
    {
        let mut closed = Vec::new();
        let state = lines.into_iter().fold(self, |state, line| {
            let (state, done) = state.step(line, rules);
            closed.extend(done);
            state
        });
        (state, closed)
    }

    /// End of input: the open record, if any, is complete.
    pub fn finish(self) -> Option<DraftRecord> {
        self.open
    }
}

/// Build every record from one ordered run of lines.
pub fn build_records(lines: &[ClassifiedLine], rules: &SegmentConfig) -> Vec<DraftRecord> {
    let (state, mut records) = BuilderState::default().fold_lines(lines, rules);
    records.extend(state.finish());
    records
}

fn collapse(parts: &[String]) -> String {
    parts
        .iter()
        .flat_map(|p| p.split_whitespace())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Turns drafts into output records: transliteration, terminology and
/// the sutra table's Devanagari.
pub struct RecordFinisher<'a> {
    translit: Transliterator<'a>,
    terms: Option<&'a TerminologyMap>,
    sutras: Option<&'a SutraTable>,
    placeholder: Option<&'a str>,
}

impl<'a> RecordFinisher<'a> {
    pub fn new(
        input_scheme: Scheme,
        terms: Option<&'a TerminologyMap>,
        sutras: Option<&'a SutraTable>,
        placeholder: Option<&'a str>,
    ) -> Self {
        Self {
            translit: Transliterator::new(input_scheme, terms),
            terms,
            sutras,
            placeholder,
        }
    }

    pub fn finish(&self, draft: DraftRecord) -> VerseRecord {
        let input = self.translit.input_scheme();
        let roman: Vec<String> = draft
            .roman
            .iter()
            .map(|seg| {
                let scheme = if seg.from_input_scheme { input } else { Scheme::Iast };
                self.translit.to_iast(&seg.text, scheme)
            })
            .collect();
        let roman = collapse(&roman);

        let sutra_no = draft.sutra_no().to_string();
        let devanagari = self
            .sutras
            .and_then(|table| table.get(&sutra_no).or_else(|| table.get(&draft.verse_no)))
            .map(str::to_string)
            .unwrap_or_else(|| transliterate(&roman, Scheme::Iast, Scheme::Devanagari));

        let mut synonyms = collapse(&draft.synonyms).trim_matches(['|', ' ']).to_string();
        let mut translation = collapse(&draft.translation).trim_matches(['|', ' ']).to_string();
        if let Some(terms) = self.terms {
            synonyms = terms.apply_words(&synonyms);
            translation = terms.apply_parenthetical(&translation);
        }
        if translation.is_empty() {
            if let Some(placeholder) = self.placeholder {
                translation = placeholder.to_string();
            }
        }

        VerseRecord {
            chapter_title: draft.headings.chapter,
            sub_chapter_title: draft.headings.sub_chapter,
            sutra_no,
            sutra_translation: roman.clone(),
            sb_verse_no: draft.verse_no,
            sb_verse_roman: roman,
            sb_verse_devanagari: devanagari,
            sb_verse_synonyms: synonyms,
            sb_verse_translation: translation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn other(text: &str) -> ClassifiedLine {
        ClassifiedLine::labelled(text, Label::Other, 0.5)
    }

    fn lines(texts: &[&str]) -> Vec<ClassifiedLine> {
        texts.iter().map(|t| other(t)).collect()
    }

    fn finisher() -> RecordFinisher<'static> {
        RecordFinisher::new(Scheme::Itrans, None, None, None)
    }

    #[test]
    fn test_single_record_from_marked_sections() {
        let rules = SegmentConfig::default();
        let input = lines(&[
            "CHAPTER ONE",
            "1.1.1",
            "some roman text",
            "-- synonym gloss",
            "TRANSLATION",
            "the meaning",
        ]);

        let drafts = build_records(&input, &rules);
        assert_eq!(drafts.len(), 1);

        let finisher = RecordFinisher::new(Scheme::Iast, None, None, None);
        let record = finisher.finish(drafts.into_iter().next().unwrap());
        assert_eq!(record.chapter_title, "Chapter One");
        assert_eq!(record.sutra_no, "1.1.1");
        assert!(record.sb_verse_roman.contains("some roman text"));
        assert!(record.sb_verse_synonyms.contains("synonym gloss"));
        assert!(record.sb_verse_translation.contains("the meaning"));
    }

    #[test]
    fn test_headings_are_sticky() {
        let rules = SegmentConfig::default();
        let input = lines(&[
            "CHAPTER TWO",
            "Adhikarana 3: Smrtyadhikaranam",
            "(Vs. 2.1.1)",
            "2.1.1 smrtyanavakasadosaprasanga iti cet",
            "2.1.2 itaresam canupalabdheh",
            "THE REFUTATION OF SANKHYA",
            "2.1.3 etena yogah pratyuktah",
        ]);

        let drafts = build_records(&input, &rules);
        assert_eq!(drafts.len(), 3);

        assert_eq!(drafts[0].headings.chapter, "Chapter Two");
        assert_eq!(drafts[0].headings.sub_chapter, "Smrtyadhikaranam");
        assert_eq!(drafts[1].sutra_no(), "2.1.1");
        assert_eq!(drafts[1].verse_no, "2.1.2");
        assert_eq!(drafts[2].headings.sub_chapter, "THE REFUTATION OF SANKHYA");
        assert_eq!(drafts[2].headings.chapter, "Chapter Two");
    }

    #[test]
    fn test_verse_number_forms() {
        let rules = SegmentConfig::default();
        let drafts = build_records(&lines(&["12. janmadyasya yatah", "3.4-5", "7 pages later"]), &rules);
        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[0].verse_no, "12");
        assert_eq!(drafts[0].roman[0].text, "janmadyasya yatah");
        assert_eq!(drafts[1].verse_no, "3.4-5");
        // a bare integer without a dot is body text
        assert_eq!(drafts[1].roman[0].text, "7 pages later");
    }

    #[test]
    fn test_english_in_roman_phase_goes_to_translation() {
        let rules = SegmentConfig::default();
        let input = vec![
            other("1.1.2"),
            ClassifiedLine::labelled("janmadyasya yatah", Label::Sanskrit, 1.0),
            ClassifiedLine::labelled("From which the origin of this world proceeds.", Label::English, 0.9),
        ];
        let drafts = build_records(&input, &rules);
        assert_eq!(drafts[0].roman.len(), 1);
        assert!(drafts[0].roman[0].from_input_scheme);
        assert_eq!(drafts[0].translation.len(), 1);
    }

    #[test]
    fn test_lines_before_first_record_are_ignored() {
        let rules = SegmentConfig::default();
        let drafts = build_records(&lines(&["preface text", "more preface"]), &rules);
        assert!(drafts.is_empty());
    }

    #[test]
    fn test_state_carries_across_pages() {
        let rules = SegmentConfig::default();
        let page_one = lines(&["CHAPTER ONE", "1.1.1", "athato brahma jijnasa"]);
        let page_two = lines(&["TRANSLATION", "now the inquiry", "1.1.2", "janmadyasya yatah"]);

        let (state, first) = BuilderState::default().fold_lines(&page_one, &rules);
        assert!(first.is_empty());
        assert!(state.has_open_record());

        let (state, second) = state.fold_lines(&page_two, &rules);
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].translation, vec!["now the inquiry".to_string()]);

        let last = state.finish().unwrap();
        assert_eq!(last.verse_no, "1.1.2");
        assert_eq!(last.headings.chapter, "Chapter One");
    }

    #[test]
    fn test_sutra_table_overrides_devanagari() {
        let rules = SegmentConfig::default();
        let table = SutraTable::from_pairs([("1.1.1", "अथातो ब्रह्मजिज्ञासा")]);
        let finisher = RecordFinisher::new(Scheme::Itrans, None, Some(&table), Some("[missing translation]"));

        let drafts = build_records(
            &[
                other("1.1.1"),
                ClassifiedLine::labelled("athAto brahmajij~nAsA", Label::Sanskrit, 1.0),
            ],
            &rules,
        );
        let record = finisher.finish(drafts[0].clone());

        assert_eq!(record.sb_verse_roman, "athāto brahmajijñāsā");
        assert_eq!(record.sb_verse_devanagari, "अथातो ब्रह्मजिज्ञासा");
        assert_eq!(record.sb_verse_translation, "[missing translation]");
    }

    #[test]
    fn test_devanagari_follows_roman_without_table() {
        let rules = SegmentConfig::default();
        let drafts = build_records(
            &[
                other("1.1.2"),
                ClassifiedLine::labelled("janmAdyasya yataH", Label::Sanskrit, 1.0),
            ],
            &rules,
        );
        let record = finisher().finish(drafts[0].clone());
        assert_eq!(record.sb_verse_roman, "janmādyasya yataḥ");
        assert_eq!(record.sb_verse_devanagari, "जन्माद्यस्य यतः");
        assert!(record.sb_verse_translation.is_empty());
    }

    #[test]
    fn test_rewrite_replaces_ocr_text() {
        let rules = SegmentConfig::default();
        let mut line = ClassifiedLine::labelled("athato brahmajijnasa", Label::Sanskrit, 1.0);
        line.rewrite = Some("athāto brahmajijñāsā".to_string());

        let drafts = build_records(&[other("1.1.1"), line], &rules);
        let record = finisher().finish(drafts[0].clone());
        assert_eq!(record.sb_verse_roman, "athāto brahmajijñāsā");
    }

    #[test]
    fn test_unlabelled_verse_lines_use_input_scheme() {
        let rules = SegmentConfig::default();
        let drafts = build_records(&lines(&["1.1.2", "janmAdyasya yataH"]), &rules);
        assert!(drafts[0].roman[0].from_input_scheme);

        let record = finisher().finish(drafts[0].clone());
        assert_eq!(record.sb_verse_roman, "janmādyasya yataḥ");
        assert_eq!(record.sb_verse_devanagari, "जन्माद्यस्य यतः");
    }
}
