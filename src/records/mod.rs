pub mod builder;
pub mod emitter;
pub mod lookup;

pub use builder::{BuilderState, DraftRecord, Headings, RecordFinisher};
pub use emitter::{CsvEmitter, EmitStats, ReportWriter};
pub use lookup::{LookupError, LookupTables, SutraTable, TerminologyMap};

/// One finished verse
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VerseRecord {
    pub chapter_title: String,
    pub sub_chapter_title: String,
    pub sutra_no: String,
    pub sutra_translation: String,
    pub sb_verse_no: String,
    pub sb_verse_roman: String,
    pub sb_verse_devanagari: String,
    pub sb_verse_synonyms: String,
    pub sb_verse_translation: String,
}

impl VerseRecord {
    pub fn header(include_sutra_translation: bool) -> Vec<&'static str> {
        let mut header = vec!["Chapter Title", "Sub-Chapter Title", "sutra_no"];
        if include_sutra_translation {
            header.push("sutra_translation");
        }
        header.extend([
            "sb_verse_no",
            "sb_verse_roman",
            "sb_verse_devanagari",
            "sb_verse_synonyms",
            "sb_verse_translation",
        ]);
        header
    }

    pub fn fields(&self, include_sutra_translation: bool) -> Vec<&str> {
        let mut fields = vec![
            self.chapter_title.as_str(),
            self.sub_chapter_title.as_str(),
            self.sutra_no.as_str(),
        ];
        if include_sutra_translation {
            fields.push(self.sutra_translation.as_str());
        }
        fields.extend([
            self.sb_verse_no.as_str(),
            self.sb_verse_roman.as_str(),
            self.sb_verse_devanagari.as_str(),
            self.sb_verse_synonyms.as_str(),
            self.sb_verse_translation.as_str(),
        ]);
        fields
    }

    /// Rows with the same key are the same verse
    pub fn dedup_key(&self) -> (&str, &str, &str) {
        (&self.sutra_no, &self.sb_verse_no, &self.sb_verse_roman)
    }

    /// Marker row standing in for a page that could not be read
    pub fn page_error(page: u32, reason: &str) -> Self {
        Self {
            sb_verse_translation: format!("[ERROR] page {}: {}", page, reason),
            ..Self::default()
        }
    }
}

/// What an extraction run hands to the emitter, in page order
#[derive(Debug, Clone, PartialEq)]
pub enum OutputRow {
    Record(VerseRecord),
    PageError { page: u32, reason: String },
}
