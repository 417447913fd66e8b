//! Data models for Registri
//!
//! Defines the core data structures: books, per-book pagination settings,
//! the page-or-label result of resolving a photo, and calendar years.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RegistryError;

/// A register volume: one folder of photographed pages
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Book {
    /// Folder name, unique across the catalog
    pub id: String,
    /// Display name derived from the folder name
    pub name: String,
    /// Folder holding the images
    pub folder: PathBuf,
    /// Image filenames in capture order
    pub images: Vec<String>,
    /// First year found in the folder name
    pub start_year: Option<i32>,
    /// Second year found in the folder name (defaults to `start_year`)
    pub end_year: Option<i32>,
    /// Printed pages addressable under the current pagination config
    pub total_pages: u32,
}

impl Book {
    /// Create a book with the given id and images (for tests and embedders)
    pub fn new(id: impl Into<String>, images: Vec<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            folder: PathBuf::from(&id),
            id,
            images,
            start_year: None,
            end_year: None,
            total_pages: 0,
        }
    }

    /// Number of photos in the book
    pub fn photo_count(&self) -> usize {
        self.images.len()
    }

    /// Whether the folder-name year range covers `year`
    pub fn covers_year(&self, year: i32) -> bool {
        match (self.start_year, self.end_year) {
            (Some(start), Some(end)) => year >= start && year <= end,
            (Some(start), None) => year == start,
            _ => false,
        }
    }
}

/// How a book's photos map to printed pages
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum PaginationMode {
    /// One printed page per photo
    AutoSingle,
    /// Two printed pages per photo
    #[default]
    AutoDouble,
    /// Custom default with per-photo exceptions
    Manual,
}

impl PaginationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaginationMode::AutoSingle => "auto-single",
            PaginationMode::AutoDouble => "auto-double",
            PaginationMode::Manual => "manual",
        }
    }
}

impl fmt::Display for PaginationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaginationMode {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto-single" => Ok(PaginationMode::AutoSingle),
            "auto-double" => Ok(PaginationMode::AutoDouble),
            "manual" => Ok(PaginationMode::Manual),
            other => Err(RegistryError::InvalidPagination(format!(
                "unknown mode '{}' (expected auto-single, auto-double or manual)",
                other
            ))),
        }
    }
}

/// Highest accepted `startPage`
pub const MAX_START_PAGE: u32 = 1_000_000;

/// Highest page count a single photo exception may carry (fold-outs)
pub const MAX_PAGES_PER_IMAGE: u32 = 8;

/// Per-book pagination settings
///
/// Serialized with the camelCase keys of `book-pagination-config.json`.
/// Exception keys are photo indices, written as strings by `serde_json`.
/// Missing keys take their default values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct PaginationConfig {
    pub mode: PaginationMode,
    /// Printed number of the first non-skipped photo
    pub start_page: u32,
    /// Leading photos without a printed number (covers, flyleaf)
    pub skip_images: usize,
    pub default_pages_per_image: u32,
    /// Photo index -> page count override
    pub exceptions: BTreeMap<usize, u32>,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            mode: PaginationMode::AutoDouble,
            start_page: 1,
            skip_images: 0,
            default_pages_per_image: 2,
            exceptions: BTreeMap::new(),
        }
    }
}

impl PaginationConfig {
    /// Pages depicted by the photo at `photo_index`, ignoring the skip range
    ///
    /// A zero override counts as absent.
    pub fn pages_in_photo(&self, photo_index: usize) -> u32 {
        self.exceptions
            .get(&photo_index)
            .copied()
            .filter(|&n| n > 0)
            .unwrap_or(self.default_pages_per_image)
    }

    /// Bring the config in line with its mode
    ///
    /// Auto modes fix the pages per image and carry no exceptions.
    pub fn normalized(mut self) -> Self {
        match self.mode {
            PaginationMode::AutoSingle => {
                self.default_pages_per_image = 1;
                self.exceptions.clear();
            }
            PaginationMode::AutoDouble => {
                self.default_pages_per_image = 2;
                self.exceptions.clear();
            }
            PaginationMode::Manual => {}
        }
        self
    }

    /// Check the numeric bounds of the config
    pub fn validate(&self) -> Result<(), RegistryError> {
        if self.start_page < 1 {
            return Err(RegistryError::InvalidPagination(
                "startPage must be at least 1".to_string(),
            ));
        }
        if !(1..=2).contains(&self.default_pages_per_image) {
            return Err(RegistryError::InvalidPagination(format!(
                "defaultPagesPerImage must be 1 or 2, got {}",
                self.default_pages_per_image
            )));
        }
        if self.start_page > MAX_START_PAGE {
            return Err(RegistryError::InvalidPagination(format!(
                "startPage must be at most {}, got {}",
                MAX_START_PAGE, self.start_page
            )));
        }
        if let Some((index, _)) = self.exceptions.iter().find(|(_, &n)| n == 0) {
            return Err(RegistryError::InvalidPagination(format!(
                "exception for photo {} must cover at least one page",
                index
            )));
        }
        if let Some((index, n)) = self
            .exceptions
            .iter()
            .find(|(_, &n)| n > MAX_PAGES_PER_IMAGE)
        {
            return Err(RegistryError::InvalidPagination(format!(
                "exception for photo {} covers {} pages (at most {})",
                index, n, MAX_PAGES_PER_IMAGE
            )));
        }
        Ok(())
    }
}

/// Parse `index:pages` exception entries
///
/// Entries are separated by newlines or commas. Blank and malformed entries
/// are skipped.
pub fn parse_exceptions(text: &str) -> BTreeMap<usize, u32> {
    text.split(['\n', ','])
        .filter_map(|entry| {
            let (index, pages) = entry.split_once(':')?;
            let index = index.trim().parse().ok()?;
            let pages = pages.trim().parse().ok()?;
            Some((index, pages))
        })
        .collect()
}

/// Format exceptions as `index:pages` lines
pub fn format_exceptions(exceptions: &BTreeMap<usize, u32>) -> String {
    exceptions
        .iter()
        .map(|(index, pages)| format!("{}:{}", index, pages))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Why a photo carries no printed page number
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageLabel {
    /// First photo of the book
    Cover,
    /// Last skipped photo
    BackCover,
    /// Any other skipped photo (front matter, index)
    FrontMatter(usize),
}

impl fmt::Display for PageLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageLabel::Cover => f.write_str("Copertina"),
            PageLabel::BackCover => f.write_str("Retro copertina"),
            PageLabel::FrontMatter(index) => write!(f, "Introduzione/Indice {}", index),
        }
    }
}

/// What a single photo depicts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhotoPages {
    /// A skipped photo; cannot be annotated
    Labeled(PageLabel),
    /// Consecutive printed page numbers, never empty
    Pages(Vec<u32>),
}

impl PhotoPages {
    /// First printed page, if any
    pub fn first_page(&self) -> Option<u32> {
        match self {
            PhotoPages::Labeled(_) => None,
            PhotoPages::Pages(pages) => pages.first().copied(),
        }
    }

    pub fn is_labeled(&self) -> bool {
        matches!(self, PhotoPages::Labeled(_))
    }

    /// Text shown for the photo: the label, `"5"`, or `"5-6"`
    pub fn display(&self) -> String {
        match self {
            PhotoPages::Labeled(label) => label.to_string(),
            PhotoPages::Pages(pages) => match (pages.first(), pages.last()) {
                (Some(first), Some(last)) if first != last => format!("{}-{}", first, last),
                (Some(first), _) => first.to_string(),
                _ => String::new(),
            },
        }
    }
}

/// A four-digit calendar year as written in the register
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Year(String);

impl Year {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn value(&self) -> i32 {
        // Four ASCII digits always fit
        self.0.bytes().fold(0, |acc, b| acc * 10 + i32::from(b - b'0'))
    }
}

impl FromStr for Year {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() == 4 && s.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Year(s.to_string()))
        } else {
            Err(RegistryError::InvalidYear(s.to_string()))
        }
    }
}

impl TryFrom<String> for Year {
    type Error = RegistryError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Year> for String {
    fn from(year: Year) -> Self {
        year.0
    }
}

impl fmt::Display for Year {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Span of annotated years in one book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct YearRange {
    pub start: i32,
    pub end: i32,
    pub total_years: usize,
}
