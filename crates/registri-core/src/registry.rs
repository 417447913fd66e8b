//! Unified registry interface
//!
//! The `Registry` owns everything the viewer works with:
//! - the books found by the catalog
//! - the year annotations (`page-annotations.json`)
//! - the pagination configs (`book-pagination-config.json`)
//!
//! It is constructed once and handed to the front end by reference. Reads
//! take `&self`, mutations take `&mut self` and save before returning.
//!
//! ## Usage
//!
//! ```ignore
//! let mut registry = Registry::open()?;
//!
//! let pages = registry.page_numbers("1.registro-1650-1700", 3)?;
//! registry.set_year_from_photo("1.registro-1650-1700", 3, "1652")?;
//! let year = registry.page_year("1.registro-1650-1700", 5)?;
//! ```

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info};

use crate::annotations::{AnnotationSet, AnnotationStore};
use crate::catalog::Catalog;
use crate::config::Config;
use crate::error::{RegistryError, RegistryResult};
use crate::models::{Book, PaginationConfig, PhotoPages, Year, YearRange};
use crate::pagination::{Pagination, PaginationStore};

/// Outcome of a successful year assignment
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct YearAssignment {
    pub book_id: String,
    pub year: Year,
    /// Pages of the photo the assignment started from
    pub photo_pages: Vec<u32>,
    /// Pages now recorded under `year` from that photo onward
    pub pages_assigned: usize,
}

/// Where a year search landed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct YearSearchHit {
    pub book_id: String,
    /// First annotated page of the year and the photo showing it
    pub location: Option<PageLocation>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageLocation {
    pub page: u32,
    pub photo_index: usize,
}

/// Books, annotations and pagination for one user
pub struct Registry {
    books: Vec<Book>,
    annotations: AnnotationStore,
    pagination: PaginationStore,
    config: Config,
    load_warnings: Vec<RegistryError>,
}

impl Registry {
    /// Open the registry using the default configuration
    pub fn open() -> Result<Self> {
        let config = Config::load().context("Failed to load configuration")?;
        Self::open_with_config(config)
    }

    /// Open the registry with a specific configuration
    ///
    /// Scans the images directory and loads both state files.
    pub fn open_with_config(config: Config) -> Result<Self> {
        let catalog = Catalog::new(config.images_path());
        let books = catalog
            .scan()
            .with_context(|| format!("Failed to scan books in {:?}", catalog.root()))?;
        Ok(Self::with_books(books, config))
    }

    /// Build a registry around books supplied by the caller
    pub fn with_books(books: Vec<Book>, config: Config) -> Self {
        let mut annotations = AnnotationStore::open(config.annotations_path());
        let mut pagination = PaginationStore::open(config.pagination_path());

        let load_warnings = [annotations.take_load_error(), pagination.take_load_error()]
            .into_iter()
            .flatten()
            .collect();

        let mut registry = Self {
            books,
            annotations,
            pagination,
            config,
            load_warnings,
        };
        for index in 0..registry.books.len() {
            registry.refresh_total_pages(index);
        }
        info!("Registry ready with {} book(s)", registry.books.len());
        registry
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Problems recovered from while loading state, reported once
    pub fn take_load_warnings(&mut self) -> Vec<RegistryError> {
        std::mem::take(&mut self.load_warnings)
    }

    // ==================== Books ====================

    pub fn books(&self) -> &[Book] {
        &self.books
    }

    pub fn book(&self, book_id: &str) -> RegistryResult<&Book> {
        self.books
            .iter()
            .find(|b| b.id == book_id)
            .ok_or_else(|| RegistryError::UnknownBook(book_id.to_string()))
    }

    fn book_index(&self, book_id: &str) -> RegistryResult<usize> {
        self.books
            .iter()
            .position(|b| b.id == book_id)
            .ok_or_else(|| RegistryError::UnknownBook(book_id.to_string()))
    }

    fn refresh_total_pages(&mut self, index: usize) {
        let book = &self.books[index];
        let total = Pagination::for_book(book, self.pagination.get(&book.id)).total_pages();
        debug!("'{}' has {} printed pages", book.id, total);
        self.books[index].total_pages = total;
    }

    // ==================== Pagination ====================

    /// Page layout of a book under its current config
    pub fn pagination(&self, book_id: &str) -> RegistryResult<Pagination<'_>> {
        let book = self.book(book_id)?;
        Ok(Pagination::for_book(book, self.pagination.get(book_id)))
    }

    /// Current config of a book (the default when none is stored)
    pub fn pagination_config(&self, book_id: &str) -> RegistryResult<&PaginationConfig> {
        self.book(book_id)?;
        Ok(self.pagination.get(book_id))
    }

    /// Whether the book has a stored config
    pub fn has_custom_pagination(&self, book_id: &str) -> bool {
        self.pagination.is_custom(book_id)
    }

    /// Replace a book's config and recompute its page count
    ///
    /// Returns the config as stored (normalized to its mode). Existing
    /// annotations are left as they are, even past the new last page.
    pub fn set_pagination_config(
        &mut self,
        book_id: &str,
        config: PaginationConfig,
    ) -> RegistryResult<PaginationConfig> {
        let index = self.book_index(book_id)?;
        let outcome = self.pagination.set(book_id, config).map(|c| c.clone());
        // A failed save still changed the in-memory config
        self.refresh_total_pages(index);
        if outcome.is_ok() {
            info!(
                "Pagination for '{}' updated: {} pages",
                book_id, self.books[index].total_pages
            );
        }
        outcome
    }

    /// Printed pages (or label) of a photo
    pub fn page_numbers(&self, book_id: &str, photo_index: usize) -> RegistryResult<PhotoPages> {
        self.pagination(book_id)?.page_numbers(photo_index)
    }

    /// Photo showing a printed page, clamped to the last photo when no photo
    /// holds it
    pub fn photo_index_for_page(&self, book_id: &str, page: u32) -> RegistryResult<usize> {
        self.pagination(book_id)?.photo_index_for_page(page)
    }

    pub fn total_pages(&self, book_id: &str) -> RegistryResult<u32> {
        Ok(self.pagination(book_id)?.total_pages())
    }

    // ==================== Annotations ====================

    /// Assign `year` to the pages of `photo_index` and every page after it
    ///
    /// Earlier pages keep their years. Cover and front-matter photos are
    /// rejected with `InvalidTarget` and nothing changes. The annotation file
    /// is rewritten before returning; if that fails the change stays in
    /// memory and `PersistenceFailure` is returned.
    pub fn set_year_from_photo(
        &mut self,
        book_id: &str,
        photo_index: usize,
        year: &str,
    ) -> RegistryResult<YearAssignment> {
        let year: Year = year.parse()?;
        let pagination = self.pagination(book_id)?;

        let photo_pages = match pagination.page_numbers(photo_index)? {
            PhotoPages::Pages(pages) => pages,
            PhotoPages::Labeled(label) => {
                return Err(RegistryError::InvalidTarget {
                    book_id: book_id.to_string(),
                    photo_index,
                    label: label.to_string(),
                })
            }
        };
        let Some(&start_page) = photo_pages.first() else {
            return Err(RegistryError::photo_out_of_range(
                book_id,
                photo_index,
                pagination.photo_count(),
            ));
        };
        let pages = pagination.pages_from(photo_index)?;
        let pages_assigned = pages.len();

        self.annotations
            .assign_from(book_id, &year, start_page, pages)?;

        info!(
            "Year {} set for {} page(s) of '{}' from page {}",
            year, pages_assigned, book_id, start_page
        );
        Ok(YearAssignment {
            book_id: book_id.to_string(),
            year,
            photo_pages,
            pages_assigned,
        })
    }

    /// Year recorded for a photo's first page
    ///
    /// Cover and front-matter photos have no year.
    pub fn page_year(&self, book_id: &str, photo_index: usize) -> RegistryResult<Option<Year>> {
        let Some(first_page) = self.page_numbers(book_id, photo_index)?.first_page() else {
            return Ok(None);
        };
        Ok(self
            .annotations
            .get(book_id)
            .and_then(|set| set.year_of(first_page))
            .cloned())
    }

    /// Pages recorded under `year`, each minus one
    ///
    /// The offsets are what the year-search path expects; everywhere else
    /// pages are the 1-based printed numbers.
    pub fn find_pages_by_year(&self, book_id: &str, year: &str) -> RegistryResult<Vec<u32>> {
        let year: Year = year.parse()?;
        self.book(book_id)?;
        Ok(self
            .annotations
            .get(book_id)
            .and_then(|set| set.pages(&year))
            .map(|pages| pages.iter().filter_map(|page| page.checked_sub(1)).collect())
            .unwrap_or_default())
    }

    /// Lowest and highest annotated year of a book
    pub fn book_year_range(&self, book_id: &str) -> RegistryResult<Option<YearRange>> {
        self.book(book_id)?;
        Ok(self
            .annotations
            .get(book_id)
            .and_then(AnnotationSet::year_range))
    }

    /// All annotations of a book
    pub fn annotations(&self, book_id: &str) -> RegistryResult<Option<&AnnotationSet>> {
        self.book(book_id)?;
        Ok(self.annotations.get(book_id))
    }

    /// Find the book for a year
    ///
    /// Folder-name year ranges are checked first, then annotations. When the
    /// chosen book has pages annotated with the year, the first one is
    /// located too.
    pub fn search_year(&self, year: &str) -> RegistryResult<Option<YearSearchHit>> {
        let year: Year = year.parse()?;
        let value = year.value();

        let has_year = |book: &Book| {
            self.annotations
                .get(&book.id)
                .and_then(|set| set.pages(&year))
                .is_some()
        };

        let Some(book) = self
            .books
            .iter()
            .find(|b| b.covers_year(value))
            .or_else(|| self.books.iter().find(|&b| has_year(b)))
        else {
            debug!("No book found for {}", year);
            return Ok(None);
        };

        let first_page = self
            .annotations
            .get(&book.id)
            .and_then(|set| set.pages(&year))
            .and_then(|pages| pages.first().copied());

        let location = match first_page {
            Some(page) => self
                .photo_index_for_page(&book.id, page)
                .ok()
                .map(|photo_index| PageLocation { page, photo_index }),
            None => None,
        };

        Ok(Some(YearSearchHit {
            book_id: book.id.clone(),
            location,
        }))
    }

    // ==================== Stats ====================

    /// Number of books with at least one annotated year
    pub fn annotated_book_count(&self) -> usize {
        self.annotations
            .books()
            .values()
            .filter(|set| !set.is_empty())
            .count()
    }
}
