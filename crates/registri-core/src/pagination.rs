//! Photo index <-> printed page resolution
//!
//! A book's photos are numbered 0.. in capture order. The first
//! `skip_images` photos (covers, front matter) carry no printed number; every
//! other photo depicts `pages_in_photo(i)` consecutive printed pages, starting
//! at `start_page` for the first non-skipped photo.
//!
//! ```text
//! skip_images = 1, start_page = 1, two pages per photo
//!
//! photo:   0           1      2      3      4
//! pages:   Copertina   1-2    3-4    5-6    7-8
//! ```
//!
//! [`Pagination`] is pure; callers supply the config and photo count.
//! [`PaginationStore`] keeps the per-book configs in
//! `book-pagination-config.json`.

use std::collections::BTreeMap;
use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::error::{RegistryError, RegistryResult};
use crate::models::{Book, PageLabel, PaginationConfig, PhotoPages};
use crate::storage::{JsonFile, StorageError};

/// The page layout of one book
#[derive(Debug, Clone, Copy)]
pub struct Pagination<'a> {
    book_id: &'a str,
    config: &'a PaginationConfig,
    photo_count: usize,
}

impl<'a> Pagination<'a> {
    pub fn new(book_id: &'a str, config: &'a PaginationConfig, photo_count: usize) -> Self {
        Self {
            book_id,
            config,
            photo_count,
        }
    }

    pub fn for_book(book: &'a Book, config: &'a PaginationConfig) -> Self {
        Self::new(&book.id, config, book.photo_count())
    }

    pub fn config(&self) -> &PaginationConfig {
        self.config
    }

    pub fn photo_count(&self) -> usize {
        self.photo_count
    }

    /// Whether any photo carries a printed page number
    pub fn has_pages(&self) -> bool {
        self.config.skip_images < self.photo_count
    }

    /// Printed page numbers (or the label) of the photo at `photo_index`
    pub fn page_numbers(&self, photo_index: usize) -> RegistryResult<PhotoPages> {
        self.check_photo(photo_index)?;

        if let Some(label) = self.label(photo_index) {
            return Ok(PhotoPages::Labeled(label));
        }

        let first = self.first_page_of(photo_index);
        let count = self.config.pages_in_photo(photo_index);
        Ok(PhotoPages::Pages((first..first.saturating_add(count)).collect()))
    }

    /// Photo holding printed page `page`
    ///
    /// Pages outside every photo's range resolve to the last photo rather
    /// than failing. A book with no numbered photos is `OutOfRange`.
    pub fn photo_index_for_page(&self, page: u32) -> RegistryResult<usize> {
        if !self.has_pages() {
            return Err(RegistryError::no_pages(self.book_id, page));
        }

        let mut current = self.config.start_page;
        for photo_index in self.config.skip_images..self.photo_count {
            let next = current.saturating_add(self.config.pages_in_photo(photo_index));
            if page >= current && page < next {
                debug!(
                    "Page {} of '{}' is on photo {} ({}-{})",
                    page,
                    self.book_id,
                    photo_index,
                    current,
                    next - 1
                );
                return Ok(photo_index);
            }
            current = next;
        }

        debug!(
            "Page {} not found in '{}', clamping to last photo",
            page, self.book_id
        );
        Ok(self.photo_count - 1)
    }

    /// Number of printed pages in the book
    pub fn total_pages(&self) -> u32 {
        self.count_pages(self.config.skip_images..self.photo_count)
    }

    /// Every printed page from `photo_index` to the end of the book, in order
    ///
    /// Labeled photos in the range contribute nothing.
    pub fn pages_from(&self, photo_index: usize) -> RegistryResult<Vec<u32>> {
        self.check_photo(photo_index)?;

        let first_numbered = photo_index.max(self.config.skip_images);
        if first_numbered >= self.photo_count {
            return Ok(Vec::new());
        }

        let start = self.first_page_of(first_numbered);
        let end = start.saturating_add(self.count_pages(first_numbered..self.photo_count));
        Ok((start..end).collect())
    }

    /// Resolve every photo of the book, in order
    pub fn photos(&self) -> impl Iterator<Item = (usize, PhotoPages)> + '_ {
        let mut next_page = self.config.start_page;
        (0..self.photo_count).map(move |photo_index| match self.label(photo_index) {
            Some(label) => (photo_index, PhotoPages::Labeled(label)),
            None => {
                let count = self.config.pages_in_photo(photo_index);
                let end = next_page.saturating_add(count);
                let pages = (next_page..end).collect();
                next_page = end;
                (photo_index, PhotoPages::Pages(pages))
            }
        })
    }

    fn check_photo(&self, photo_index: usize) -> RegistryResult<()> {
        if photo_index >= self.photo_count {
            return Err(RegistryError::photo_out_of_range(
                self.book_id,
                photo_index,
                self.photo_count,
            ));
        }
        Ok(())
    }

    fn label(&self, photo_index: usize) -> Option<PageLabel> {
        let skip = self.config.skip_images;
        if photo_index >= skip {
            None
        } else if photo_index == 0 {
            Some(PageLabel::Cover)
        } else if photo_index == skip - 1 {
            Some(PageLabel::BackCover)
        } else {
            Some(PageLabel::FrontMatter(photo_index))
        }
    }

    /// First printed page of a non-skipped photo
    fn first_page_of(&self, photo_index: usize) -> u32 {
        self.config
            .start_page
            .saturating_add(self.count_pages(self.config.skip_images..photo_index))
    }

    /// Pages over a range of photos, saturating at `u32::MAX`
    fn count_pages(&self, photos: std::ops::Range<usize>) -> u32 {
        photos
            .map(|i| self.config.pages_in_photo(i))
            .fold(0, u32::saturating_add)
    }
}

/// Book id -> pagination config, as stored on disk
pub type PaginationMap = BTreeMap<String, PaginationConfig>;

/// Per-book pagination configs backed by a JSON file
///
/// Books without an entry use [`PaginationConfig::default`].
#[derive(Debug)]
pub struct PaginationStore {
    file: JsonFile<PaginationMap>,
    configs: PaginationMap,
    default: PaginationConfig,
    load_error: Option<StorageError>,
}

impl PaginationStore {
    /// Load configs from `path`, normalizing each entry to its mode
    ///
    /// Entries that fail validation are dropped, so those books fall back to
    /// the default layout.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let file: JsonFile<PaginationMap> = JsonFile::new(path);
        let loaded = file.load_or_init();

        let configs: PaginationMap = loaded
            .value
            .into_iter()
            .filter_map(|(book_id, config)| {
                let normalized = config.clone().normalized();
                if normalized != config {
                    warn!(
                        "Pagination config for '{}' did not match its mode; normalized",
                        book_id
                    );
                }
                match normalized.validate() {
                    Ok(()) => Some((book_id, normalized)),
                    Err(e) => {
                        warn!("Ignoring pagination config for '{}': {}", book_id, e);
                        None
                    }
                }
            })
            .collect();

        info!(
            "Loaded pagination for {} book(s) from {:?}",
            configs.len(),
            file.path()
        );
        Self {
            file,
            configs,
            default: PaginationConfig::default(),
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

    /// Config for `book_id`, or the default
    pub fn get(&self, book_id: &str) -> &PaginationConfig {
        self.configs.get(book_id).unwrap_or(&self.default)
    }

    /// Whether `book_id` has a stored config
    pub fn is_custom(&self, book_id: &str) -> bool {
        self.configs.contains_key(book_id)
    }

    /// Normalize, validate and store a config, then save
    ///
    /// Invalid configs are rejected without touching the store. On a save
    /// failure the in-memory change is kept and `PersistenceFailure` is
    /// returned.
    pub fn set(&mut self, book_id: &str, config: PaginationConfig) -> RegistryResult<&PaginationConfig> {
        let config = config.normalized();
        config.validate()?;

        self.configs.insert(book_id.to_string(), config);
        self.file.save(&self.configs).map_err(|source| {
            warn!("Failed to save pagination config: {}", source);
            RegistryError::PersistenceFailure {
                path: self.file.path().to_path_buf(),
                source,
            }
        })?;

        Ok(self.get(book_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PaginationMode;
    use std::collections::BTreeMap;

    fn config(skip: usize, start: u32, default: u32) -> PaginationConfig {
        PaginationConfig {
            mode: PaginationMode::Manual,
            start_page: start,
            skip_images: skip,
            default_pages_per_image: default,
            exceptions: BTreeMap::new(),
        }
    }

    /// A spread of configs covering skips, odd starts and exceptions
    fn sample_configs() -> Vec<PaginationConfig> {
        let mut configs = Vec::new();
        for skip in 0..4 {
            for start in [1, 3, 10] {
                for default in [1, 2] {
                    configs.push(config(skip, start, default));

                    let mut with_exceptions = config(skip, start, default);
                    with_exceptions.exceptions.insert(skip + 1, 1);
                    with_exceptions.exceptions.insert(skip + 3, 3);
                    configs.push(with_exceptions);
                }
            }
        }
        configs
    }

    #[test]
    fn test_cover_skip_double_pages() {
        let config = config(1, 1, 2);
        let pagination = Pagination::new("libro", &config, 5);

        assert_eq!(
            pagination.page_numbers(0).unwrap(),
            PhotoPages::Labeled(PageLabel::Cover)
        );
        assert_eq!(pagination.page_numbers(0).unwrap().display(), "Copertina");
        assert_eq!(
            pagination.page_numbers(1).unwrap(),
            PhotoPages::Pages(vec![1, 2])
        );
        assert_eq!(
            pagination.page_numbers(4).unwrap(),
            PhotoPages::Pages(vec![7, 8])
        );
        assert_eq!(pagination.total_pages(), 8);
    }

    #[test]
    fn test_page_beyond_total_clamps_to_last_photo() {
        let config = config(1, 1, 2);
        let pagination = Pagination::new("libro", &config, 5);

        assert_eq!(pagination.photo_index_for_page(100).unwrap(), 4);
        // Below start_page also falls through to the last photo
        let late_start = PaginationConfig {
            start_page: 5,
            ..config.clone()
        };
        let pagination = Pagination::new("libro", &late_start, 5);
        assert_eq!(pagination.photo_index_for_page(2).unwrap(), 4);
    }

    #[test]
    fn test_skip_labels() {
        let config = config(4, 1, 2);
        let pagination = Pagination::new("libro", &config, 6);

        let labels: Vec<String> = (0..4)
            .map(|i| pagination.page_numbers(i).unwrap().display())
            .collect();
        assert_eq!(
            labels,
            vec![
                "Copertina",
                "Introduzione/Indice 1",
                "Introduzione/Indice 2",
                "Retro copertina"
            ]
        );
        assert_eq!(
            pagination.page_numbers(4).unwrap(),
            PhotoPages::Pages(vec![1, 2])
        );
    }

    #[test]
    fn test_single_skip_is_cover() {
        let config = config(1, 1, 1);
        let pagination = Pagination::new("libro", &config, 3);
        assert_eq!(
            pagination.page_numbers(0).unwrap(),
            PhotoPages::Labeled(PageLabel::Cover)
        );
    }

    #[test]
    fn test_exceptions_shift_following_pages() {
        let mut config = config(0, 1, 2);
        config.exceptions.insert(1, 1);
        let pagination = Pagination::new("libro", &config, 4);

        assert_eq!(
            pagination.page_numbers(0).unwrap(),
            PhotoPages::Pages(vec![1, 2])
        );
        assert_eq!(pagination.page_numbers(1).unwrap(), PhotoPages::Pages(vec![3]));
        assert_eq!(
            pagination.page_numbers(2).unwrap(),
            PhotoPages::Pages(vec![4, 5])
        );
        assert_eq!(pagination.photo_index_for_page(3).unwrap(), 1);
        assert_eq!(pagination.photo_index_for_page(4).unwrap(), 2);
        assert_eq!(pagination.total_pages(), 7);
    }

    #[test]
    fn test_photo_out_of_range() {
        let config = PaginationConfig::default();
        let pagination = Pagination::new("libro", &config, 3);

        assert!(matches!(
            pagination.page_numbers(3),
            Err(RegistryError::OutOfRange { .. })
        ));
        assert!(pagination.pages_from(3).is_err());
    }

    #[test]
    fn test_all_photos_skipped() {
        let config = config(5, 1, 2);
        let pagination = Pagination::new("libro", &config, 3);

        assert!(!pagination.has_pages());
        assert_eq!(pagination.total_pages(), 0);
        assert!(pagination.page_numbers(2).unwrap().is_labeled());
        assert!(matches!(
            pagination.photo_index_for_page(1),
            Err(RegistryError::OutOfRange { .. })
        ));
        assert!(pagination.pages_from(0).unwrap().is_empty());
    }

    #[test]
    fn test_empty_book() {
        let config = PaginationConfig::default();
        let pagination = Pagination::new("vuoto", &config, 0);

        assert_eq!(pagination.total_pages(), 0);
        assert!(pagination.photo_index_for_page(1).is_err());
        assert!(pagination.page_numbers(0).is_err());
        assert_eq!(pagination.photos().count(), 0);
    }

    #[test]
    fn test_pages_from_starts_at_photo() {
        let config = config(1, 1, 2);
        let pagination = Pagination::new("libro", &config, 5);

        assert_eq!(pagination.pages_from(2).unwrap(), vec![3, 4, 5, 6, 7, 8]);
        assert_eq!(pagination.pages_from(4).unwrap(), vec![7, 8]);
        // Starting on the cover skips it
        assert_eq!(pagination.pages_from(0).unwrap(), (1..=8).collect::<Vec<_>>());
    }

    #[test]
    fn test_inverse_property() {
        for config in sample_configs() {
            for photo_count in 0..9 {
                let pagination = Pagination::new("libro", &config, photo_count);
                for photo_index in config.skip_images..photo_count {
                    let first = pagination
                        .page_numbers(photo_index)
                        .unwrap()
                        .first_page()
                        .unwrap();
                    assert_eq!(
                        pagination.photo_index_for_page(first).unwrap(),
                        photo_index,
                        "config {:?}, {} photos",
                        config,
                        photo_count
                    );
                }
            }
        }
    }

    #[test]
    fn test_every_page_maps_back_to_its_photo() {
        for config in sample_configs() {
            let pagination = Pagination::new("libro", &config, 8);
            for (photo_index, pages) in pagination.photos() {
                if let PhotoPages::Pages(pages) = pages {
                    for page in pages {
                        assert_eq!(pagination.photo_index_for_page(page).unwrap(), photo_index);
                    }
                }
            }
        }
    }

    #[test]
    fn test_partition_property() {
        for config in sample_configs() {
            for photo_count in 0..9 {
                let pagination = Pagination::new("libro", &config, photo_count);
                let mut expected_next = config.start_page;
                let mut last_page = None;

                for photo_index in config.skip_images..photo_count {
                    match pagination.page_numbers(photo_index).unwrap() {
                        PhotoPages::Pages(pages) => {
                            assert!(!pages.is_empty());
                            assert_eq!(pages[0], expected_next, "ranges must be contiguous");
                            for pair in pages.windows(2) {
                                assert_eq!(pair[1], pair[0] + 1);
                            }
                            expected_next = pages[pages.len() - 1] + 1;
                            last_page = pages.last().copied();
                        }
                        PhotoPages::Labeled(label) => panic!("unexpected label {}", label),
                    }
                }

                let total = pagination.total_pages();
                match last_page {
                    Some(last) => assert_eq!(total, last - config.start_page + 1),
                    None => assert_eq!(total, 0),
                }
            }
        }
    }

    #[test]
    fn test_photos_matches_page_numbers() {
        for config in sample_configs() {
            let pagination = Pagination::new("libro", &config, 7);
            for (photo_index, pages) in pagination.photos() {
                assert_eq!(pages, pagination.page_numbers(photo_index).unwrap());
            }
        }
    }

    #[test]
    fn test_store_defaults_for_unknown_book() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("book-pagination-config.json");
        let store = PaginationStore::open(&path);

        assert_eq!(store.get("libro"), &PaginationConfig::default());
        assert!(!store.is_custom("libro"));
        assert!(path.exists());
    }

    #[test]
    fn test_store_set_normalizes_and_persists() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("book-pagination-config.json");

        {
            let mut store = PaginationStore::open(&path);
            let mut config = config(1, 1, 2);
            config.mode = PaginationMode::AutoSingle;
            config.exceptions.insert(3, 2);

            let saved = store.set("libro", config).unwrap();
            assert_eq!(saved.default_pages_per_image, 1);
            assert!(saved.exceptions.is_empty());
        }

        let store = PaginationStore::open(&path);
        assert!(store.is_custom("libro"));
        assert_eq!(store.get("libro").mode, PaginationMode::AutoSingle);
        assert_eq!(store.get("libro").skip_images, 1);
    }

    #[test]
    fn test_store_rejects_invalid_config() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let mut store = PaginationStore::open(temp_dir.path().join("book-pagination-config.json"));

        let result = store.set("libro", config(0, 0, 2));
        assert!(matches!(result, Err(RegistryError::InvalidPagination(_))));
        assert!(!store.is_custom("libro"));
    }

    #[test]
    fn test_store_normalizes_loaded_entries() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("book-pagination-config.json");
        std::fs::write(
            &path,
            r#"{"libro": {"mode": "auto-double", "startPage": 3, "skipImages": 1,
                "defaultPagesPerImage": 1, "exceptions": {"2": 1}}}"#,
        )
        .unwrap();

        let store = PaginationStore::open(&path);
        let config = store.get("libro");
        assert_eq!(config.start_page, 3);
        assert_eq!(config.default_pages_per_image, 2);
        assert!(config.exceptions.is_empty());
    }

    #[test]
    fn test_store_fills_missing_keys() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("book-pagination-config.json");
        std::fs::write(&path, r#"{"libro": {"mode": "manual", "skipImages": 2}}"#).unwrap();

        let mut store = PaginationStore::open(&path);
        assert!(store.take_load_error().is_none());
        let config = store.get("libro");
        assert_eq!(config.skip_images, 2);
        assert_eq!(config.start_page, 1);
        assert_eq!(config.default_pages_per_image, 2);
    }

    #[test]
    fn test_store_drops_invalid_loaded_entries() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("book-pagination-config.json");
        std::fs::write(
            &path,
            r#"{"rotto": {"mode": "manual", "defaultPagesPerImage": 0},
                "buono": {"mode": "auto-single"}}"#,
        )
        .unwrap();

        let store = PaginationStore::open(&path);
        assert!(!store.is_custom("rotto"));
        assert_eq!(store.get("rotto"), &PaginationConfig::default());
        assert_eq!(store.get("buono").default_pages_per_image, 1);
    }

    #[test]
    fn test_store_drops_oversized_loaded_entries() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("book-pagination-config.json");
        std::fs::write(
            &path,
            r#"{"inizio": {"startPage": 4294967295},
                "piega": {"mode": "manual", "exceptions": {"0": 3000000000, "1": 3000000000}}}"#,
        )
        .unwrap();

        let store = PaginationStore::open(&path);
        assert!(!store.is_custom("inizio"));
        assert!(!store.is_custom("piega"));

        let pagination = Pagination::new("piega", store.get("piega"), 2);
        assert_eq!(pagination.total_pages(), 4);
    }

    #[test]
    fn test_resolver_saturates_instead_of_overflowing() {
        let config = PaginationConfig {
            mode: PaginationMode::Manual,
            start_page: u32::MAX - 1,
            ..PaginationConfig::default()
        };
        let pagination = Pagination::new("libro", &config, 3);

        assert_eq!(pagination.total_pages(), 6);
        assert_eq!(
            pagination.page_numbers(0).unwrap(),
            PhotoPages::Pages(vec![u32::MAX - 1])
        );
        assert_eq!(pagination.photo_index_for_page(1).unwrap(), 2);
    }
}
