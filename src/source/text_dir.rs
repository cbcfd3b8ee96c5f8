use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use walkdir::WalkDir;

use super::{check_range, Page, PageSource, SourceError};

/// Pre-extracted `.txt` pages, one file per page, ordered by file name.
pub struct TextDirSource {
    dir: PathBuf,
    files: Vec<PathBuf>,
}

impl TextDirSource {
    pub fn open(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            anyhow::bail!("Text directory not found: {:?}", dir);
        }

        let mut files: Vec<PathBuf> = WalkDir::new(dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| {
                p.extension()
                    .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case("txt"))
                    .unwrap_or(false)
            })
            .collect();
        files.sort();

        if files.is_empty() {
            anyhow::bail!("No .txt pages found in {:?}", dir);
        }

        info!("Found {} text pages in {:?}", files.len(), dir);

        Ok(Self {
            dir: dir.to_path_buf(),
            files,
        })
    }
}

impl PageSource for TextDirSource {
    fn describe(&self) -> String {
        format!("text pages in {:?}", self.dir)
    }

    fn page_count(&self) -> u32 {
        self.files.len() as u32
    }

    fn page(&self, number: u32) -> Result<Page, SourceError> {
        check_range(number, self.page_count())?;
        let path = &self.files[number as usize - 1];
        let text = fs::read_to_string(path)
            .map_err(|source| SourceError::Io { page: number, source })?;
        Ok(Page { number, text })
    }
}

/// Read a directory of pages into one string, in page order
pub fn read_all(dir: &Path) -> Result<String> {
    let source = TextDirSource::open(dir)?;
    let mut text = String::new();
    for number in 1..=source.page_count() {
        let page = source
            .page(number)
            .with_context(|| format!("Failed to read page {} of {:?}", number, dir))?;
        text.push_str(&page.text);
        text.push('\n');
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_pages_sorted_by_name() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("page_002.txt"), "second").unwrap();
        fs::write(dir.path().join("page_001.txt"), "first").unwrap();
        fs::write(dir.path().join("notes.md"), "ignored").unwrap();

        let source = TextDirSource::open(dir.path()).unwrap();
        assert_eq!(source.page_count(), 2);
        assert_eq!(source.page(1).unwrap().text, "first");
        assert_eq!(source.page(2).unwrap().text, "second");
        assert!(matches!(
            source.page(3),
            Err(SourceError::OutOfRange { page: 3, count: 2 })
        ));
    }

    #[test]
    fn test_missing_or_empty_dir_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(TextDirSource::open(dir.path()).is_err());
        assert!(TextDirSource::open(&dir.path().join("missing")).is_err());
    }

    #[test]
    fn test_read_all_joins_pages() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "(pramana)").unwrap();
        fs::write(dir.path().join("b.txt"), "(prameya)").unwrap();
        assert_eq!(read_all(dir.path()).unwrap(), "(pramana)\n(prameya)\n");
    }
}
