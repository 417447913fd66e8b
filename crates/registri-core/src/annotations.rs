//! Year annotations
//!
//! Each book's printed pages are partitioned into calendar years: a page
//! belongs to at most one year. The only mutation is a suffix assignment,
//! "this page and everything after it belongs to year Y", which leaves
//! earlier pages untouched.
//!
//! The whole map is kept in `page-annotations.json`:
//!
//! ```text
//! { "1.registro-1650-1700": { "1699": [1, 2], "1700": [3, 4, 5, 6] } }
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{RegistryError, RegistryResult};
use crate::models::{Year, YearRange};
use crate::storage::{JsonFile, StorageError};

/// Year -> printed pages for one book
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnnotationSet {
    years: BTreeMap<Year, BTreeSet<u32>>,
}

impl AnnotationSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.years.is_empty()
    }

    /// Number of distinct years
    pub fn len(&self) -> usize {
        self.years.len()
    }

    /// Years in ascending order with their pages
    pub fn years(&self) -> impl Iterator<Item = (&Year, &BTreeSet<u32>)> {
        self.years.iter()
    }

    /// Pages recorded under `year`
    pub fn pages(&self, year: &Year) -> Option<&BTreeSet<u32>> {
        self.years.get(year)
    }

    /// The year owning `page`
    pub fn year_of(&self, page: u32) -> Option<&Year> {
        self.years
            .iter()
            .find(|(_, pages)| pages.contains(&page))
            .map(|(year, _)| year)
    }

    /// Assign `pages` to `year`, taking every page `>= start_page` away from
    /// the other years first
    ///
    /// Years left without pages are removed.
    pub fn assign_from(&mut self, year: &Year, start_page: u32, pages: impl IntoIterator<Item = u32>) {
        for existing in self.years.values_mut() {
            existing.retain(|&page| page < start_page);
        }
        self.years.retain(|_, pages| !pages.is_empty());

        let target = self.years.entry(year.clone()).or_default();
        target.extend(pages);
        if target.is_empty() {
            self.years.remove(year);
        }
    }

    /// Remove page 0 (pages are 1-based) and any year left empty
    ///
    /// Returns how many entries were removed.
    fn drop_invalid_pages(&mut self) -> usize {
        let mut dropped = 0;
        for pages in self.years.values_mut() {
            if pages.remove(&0) {
                dropped += 1;
            }
        }
        self.years.retain(|_, pages| !pages.is_empty());
        dropped
    }

    /// Lowest and highest year plus the number of years
    pub fn year_range(&self) -> Option<YearRange> {
        let start = self.years.keys().next()?.value();
        let end = self.years.keys().next_back()?.value();
        Some(YearRange {
            start,
            end,
            total_years: self.years.len(),
        })
    }
}

/// Book id -> annotations, as stored on disk
pub type AnnotationMap = BTreeMap<String, AnnotationSet>;

/// Render sorted pages as compact ranges, e.g. `"1-4, 7, 9-10"`
pub fn format_page_ranges<'a>(pages: impl IntoIterator<Item = &'a u32>) -> String {
    let mut sorted: Vec<u32> = pages.into_iter().copied().collect();
    sorted.sort_unstable();
    sorted.dedup();

    let mut ranges = Vec::new();
    let mut iter = sorted.into_iter();
    let Some(mut start) = iter.next() else {
        return String::new();
    };
    let mut end = start;

    for page in iter {
        if page == end + 1 {
            end = page;
        } else {
            ranges.push(format_range(start, end));
            start = page;
            end = page;
        }
    }
    ranges.push(format_range(start, end));
    ranges.join(", ")
}

fn format_range(start: u32, end: u32) -> String {
    if start == end {
        start.to_string()
    } else {
        format!("{}-{}", start, end)
    }
}

/// Annotations for every book, backed by a JSON file
///
/// Every mutation rewrites the file before returning.
#[derive(Debug)]
pub struct AnnotationStore {
    file: JsonFile<AnnotationMap>,
    books: AnnotationMap,
    load_error: Option<StorageError>,
}

impl AnnotationStore {
    /// Load annotations from `path`
    ///
    /// A missing file is created empty; an unreadable one is replaced by an
    /// empty map (see [`AnnotationStore::take_load_error`]).
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let file: JsonFile<AnnotationMap> = JsonFile::new(path);
        let mut loaded = file.load_or_init();

        for (book_id, set) in loaded.value.iter_mut() {
            let dropped = set.drop_invalid_pages();
            if dropped > 0 {
                warn!("Dropped page 0 from {} year(s) of '{}'", dropped, book_id);
            }
        }
        loaded.value.retain(|_, set| !set.is_empty());

        info!(
            "Loaded annotations for {} book(s) from {:?}",
            loaded.value.len(),
            file.path()
        );
        Self {
            file,
            books: loaded.value,
            load_error: loaded.recovered_from,
        }
    }

    /// The error that forced an empty start, reported once
    pub fn take_load_error(&mut self) -> Option<RegistryError> {
        self.load_error
            .take()
            .map(|source| RegistryError::MalformedPersistedState {
                path: self.file.path().to_path_buf(),
                source,
            })
    }

    pub fn get(&self, book_id: &str) -> Option<&AnnotationSet> {
        self.books.get(book_id)
    }

    pub fn books(&self) -> &AnnotationMap {
        &self.books
    }

    /// Suffix assignment for one book, then save
    ///
    /// On a save failure the in-memory change is kept and
    /// `PersistenceFailure` is returned.
    pub fn assign_from(
        &mut self,
        book_id: &str,
        year: &Year,
        start_page: u32,
        pages: impl IntoIterator<Item = u32>,
    ) -> RegistryResult<()> {
        self.books
            .entry(book_id.to_string())
            .or_default()
            .assign_from(year, start_page, pages);
        self.save()
    }

    /// Write the whole map to disk
    pub fn save(&self) -> RegistryResult<()> {
        self.file.save(&self.books).map_err(|source| {
            warn!("Failed to save annotations: {}", source);
            RegistryError::PersistenceFailure {
                path: self.file.path().to_path_buf(),
                source,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn year(s: &str) -> Year {
        s.parse().unwrap()
    }

    fn set_of(entries: &[(&str, &[u32])]) -> AnnotationSet {
        let mut set = AnnotationSet::new();
        for (y, pages) in entries {
            set.years
                .insert(year(y), pages.iter().copied().collect());
        }
        set
    }

    fn assert_exclusive(set: &AnnotationSet) {
        let mut seen = BTreeSet::new();
        for (_, pages) in set.years() {
            for page in pages {
                assert!(seen.insert(*page), "page {} under two years", page);
            }
        }
    }

    #[test]
    fn test_reassign_suffix_keeps_earlier_pages() {
        let mut set = set_of(&[("1699", &[1, 2, 3, 4, 5, 6, 7, 8])]);

        set.assign_from(&year("1700"), 3, 3..=8);

        assert_eq!(set, set_of(&[("1699", &[1, 2]), ("1700", &[3, 4, 5, 6, 7, 8])]));
    }

    #[test]
    fn test_assign_prunes_emptied_years() {
        let mut set = set_of(&[("1699", &[3, 4]), ("1698", &[1, 2])]);

        set.assign_from(&year("1700"), 3, 3..=8);

        assert!(set.pages(&year("1699")).is_none());
        assert_eq!(set.len(), 2);
        assert_eq!(set.year_of(1), Some(&year("1698")));
        assert_eq!(set.year_of(5), Some(&year("1700")));
    }

    #[test]
    fn test_assign_is_idempotent() {
        let mut once = set_of(&[("1699", &[1, 2, 3, 4, 5, 6])]);
        once.assign_from(&year("1700"), 3, 3..=6);

        let mut twice = once.clone();
        twice.assign_from(&year("1700"), 3, 3..=6);

        assert_eq!(once, twice);
    }

    #[test]
    fn test_assign_earlier_start_takes_over_later_year() {
        let mut set = AnnotationSet::new();
        set.assign_from(&year("1700"), 5, 5..=10);
        set.assign_from(&year("1701"), 9, 9..=10);
        set.assign_from(&year("1699"), 1, 1..=10);

        assert_eq!(set, set_of(&[("1699", &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10])]));
    }

    #[test]
    fn test_exclusivity_over_assignment_sequence() {
        let mut set = AnnotationSet::new();
        let steps = [
            ("1650", 1),
            ("1652", 7),
            ("1651", 4),
            ("1653", 12),
            ("1650", 2),
            ("1655", 15),
            ("1651", 9),
        ];
        for (y, start) in steps {
            set.assign_from(&year(y), start, start..=16);
            assert_exclusive(&set);
        }
    }

    #[test]
    fn test_assign_same_year_again_keeps_earlier_pages() {
        let mut set = AnnotationSet::new();
        set.assign_from(&year("1700"), 1, 1..=8);
        set.assign_from(&year("1700"), 5, 5..=8);

        assert_eq!(set, set_of(&[("1700", &[1, 2, 3, 4, 5, 6, 7, 8])]));
    }

    #[test]
    fn test_year_of_missing_page() {
        let set = set_of(&[("1700", &[3, 4])]);
        assert_eq!(set.year_of(3), Some(&year("1700")));
        assert_eq!(set.year_of(2), None);
    }

    #[test]
    fn test_year_range() {
        assert_eq!(AnnotationSet::new().year_range(), None);

        let set = set_of(&[("1702", &[9]), ("1699", &[1]), ("1700", &[4])]);
        assert_eq!(
            set.year_range(),
            Some(YearRange {
                start: 1699,
                end: 1702,
                total_years: 3
            })
        );
    }

    #[test]
    fn test_format_page_ranges() {
        assert_eq!(format_page_ranges(&[]), "");
        assert_eq!(format_page_ranges(&[4]), "4");
        assert_eq!(format_page_ranges(&[1, 2, 3, 4, 7, 9, 10]), "1-4, 7, 9-10");
        assert_eq!(format_page_ranges(&[10, 9, 1, 2]), "1-2, 9-10");
    }

    #[test]
    fn test_set_json_is_sorted() {
        let mut set = AnnotationSet::new();
        set.assign_from(&year("1700"), 3, [5, 3, 4]);

        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, r#"{"1700":[3,4,5]}"#);
    }

    #[test]
    fn test_unsorted_file_is_accepted() {
        let parsed: AnnotationMap =
            serde_json::from_str(r#"{"libro": {"1699": [4, 1, 2, 2]}}"#).unwrap();
        let pages: Vec<u32> = parsed["libro"]
            .pages(&year("1699"))
            .unwrap()
            .iter()
            .copied()
            .collect();
        assert_eq!(pages, vec![1, 2, 4]);
    }

    #[test]
    fn test_store_persists_each_assignment() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("page-annotations.json");

        {
            let mut store = AnnotationStore::open(&path);
            assert!(path.exists());
            assert!(store.take_load_error().is_none());
            store
                .assign_from("libro", &year("1700"), 3, 3..=8)
                .unwrap();
        }

        let store = AnnotationStore::open(&path);
        let set = store.get("libro").unwrap();
        assert_eq!(set.year_of(8), Some(&year("1700")));
        assert!(store.get("altro").is_none());
    }

    #[test]
    fn test_store_drops_page_zero_on_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("page-annotations.json");
        fs::write(
            &path,
            r#"{"libro": {"1699": [0], "1700": [0, 1, 2]}, "vuoto": {"1650": [0]}}"#,
        )
        .unwrap();

        let mut store = AnnotationStore::open(&path);
        assert!(store.take_load_error().is_none());
        assert_eq!(store.get("libro"), Some(&set_of(&[("1700", &[1, 2])])));
        assert!(store.get("vuoto").is_none());
    }

    #[test]
    fn test_store_recovers_from_malformed_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("page-annotations.json");
        fs::write(&path, r#"{"libro": {"17": [1]}}"#).unwrap();

        let mut store = AnnotationStore::open(&path);
        assert!(store.books().is_empty());
        assert!(matches!(
            store.take_load_error(),
            Some(RegistryError::MalformedPersistedState { .. })
        ));
        // Reported once
        assert!(store.take_load_error().is_none());

        store.assign_from("libro", &year("1700"), 1, 1..=2).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("\"1700\""));
    }
}
