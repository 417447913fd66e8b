//! Book discovery
//!
//! The images directory holds one subfolder per register:
//!
//! ```text
//! images/
//!   1.registro-1650-1700/   IMG_0001.jpg IMG_0002.jpg ...
//!   2.registro-1701-1745/   ...
//! ```
//!
//! Folders are ordered by their leading number, images inside a folder by
//! capture time (EXIF, falling back to filesystem timestamps). Pagination is
//! not computed here; `total_pages` is filled in by the registry.

use std::cmp::Ordering;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use chrono::{DateTime, NaiveDateTime, Utc};
use exif::{In, Reader, Tag, Value};
use regex::Regex;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::models::Book;
use crate::storage::{StorageError, StorageResult};

/// Extensions accepted as page photos (compared lowercase)
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif"];

/// EXIF tags consulted for the capture time, in order
const CAPTURE_TAGS: &[Tag] = &[Tag::DateTime, Tag::DateTimeOriginal, Tag::DateTimeDigitized];

/// Scanner for the images directory
#[derive(Debug, Clone)]
pub struct Catalog {
    root: PathBuf,
}

impl Catalog {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Discover every book under the root
    ///
    /// A missing root yields no books. Folders without images are skipped.
    pub fn scan(&self) -> StorageResult<Vec<Book>> {
        if !self.root.exists() {
            warn!("Images directory {:?} does not exist", self.root);
            return Ok(Vec::new());
        }

        let mut folders = Vec::new();
        for entry in WalkDir::new(&self.root).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| walk_error(e, &self.root))?;
            if entry.file_type().is_dir() {
                folders.push(entry.into_path());
            }
        }
        folders.sort_by(|a, b| compare_folders(a, b));

        let mut books = Vec::new();
        for folder in folders {
            if let Some(book) = self.load_book(&folder)? {
                info!(
                    "Loaded book '{}' ({} photos)",
                    book.id,
                    book.photo_count()
                );
                books.push(book);
            }
        }

        books.sort_by(|a, b| match (a.start_year, b.start_year) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        });
        Ok(books)
    }

    fn load_book(&self, folder: &Path) -> StorageResult<Option<Book>> {
        let Some(id) = folder.file_name().and_then(|n| n.to_str()) else {
            warn!("Skipping folder with non UTF-8 name: {:?}", folder);
            return Ok(None);
        };

        let mut photos = Vec::new();
        for entry in WalkDir::new(folder).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| walk_error(e, folder))?;
            let path = entry.path();
            if !entry.file_type().is_file() || !is_page_image(path) {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let taken = capture_time(path);
            debug!("{}: captured {}", name, taken);
            photos.push((taken, name.to_string()));
        }

        if photos.is_empty() {
            debug!("Skipping '{}': no images", id);
            return Ok(None);
        }

        photos.sort();
        let (start_year, end_year) = folder_years(id);

        Ok(Some(Book {
            id: id.to_string(),
            name: display_name(id),
            folder: folder.to_path_buf(),
            images: photos.into_iter().map(|(_, name)| name).collect(),
            start_year,
            end_year,
            total_pages: 0,
        }))
    }
}

fn walk_error(error: walkdir::Error, fallback: &Path) -> StorageError {
    let path = error
        .path()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| fallback.to_path_buf());
    let io = error
        .into_io_error()
        .unwrap_or_else(|| std::io::Error::new(std::io::ErrorKind::Other, "filesystem loop"));
    StorageError::from_read(io, path)
}

/// Whether the file has a page photo extension
pub fn is_page_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// When the photo was taken
///
/// EXIF first, then file creation time, then modification time. Files with
/// no usable timestamp sort first (Unix epoch).
pub fn capture_time(path: &Path) -> DateTime<Utc> {
    exif_capture_time(path)
        .or_else(|| file_time(path))
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

fn exif_capture_time(path: &Path) -> Option<DateTime<Utc>> {
    let file = File::open(path).ok()?;
    let mut bufreader = BufReader::new(&file);
    let exif = Reader::new().read_from_container(&mut bufreader).ok()?;

    CAPTURE_TAGS.iter().find_map(|&tag| {
        let field = exif.get_field(tag, In::PRIMARY)?;
        match field.value {
            Value::Ascii(ref vec) => vec.first().and_then(|bytes| parse_exif_datetime(bytes)),
            _ => None,
        }
    })
}

/// Parse an EXIF `"YYYY:MM:DD HH:MM:SS"` value
fn parse_exif_datetime(bytes: &[u8]) -> Option<DateTime<Utc>> {
    let s = std::str::from_utf8(bytes).ok()?;
    let naive = NaiveDateTime::parse_from_str(s.trim_end_matches('\0').trim(), "%Y:%m:%d %H:%M:%S").ok()?;
    Some(DateTime::from_naive_utc_and_offset(naive, Utc))
}

fn file_time(path: &Path) -> Option<DateTime<Utc>> {
    let metadata = std::fs::metadata(path).ok()?;
    metadata
        .created()
        .or_else(|_| metadata.modified())
        .ok()
        .map(DateTime::<Utc>::from)
}

/// Order folders by leading number (missing counts as 0), then by name
fn compare_folders(a: &Path, b: &Path) -> Ordering {
    let name = |p: &Path| {
        p.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    };
    let (a, b) = (name(a), name(b));
    leading_number(&a)
        .cmp(&leading_number(&b))
        .then_with(|| a.cmp(&b))
}

fn leading_number(name: &str) -> u64 {
    let digits: String = name.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().unwrap_or(0)
}

/// First and second four-digit runs in a folder name
///
/// The end year defaults to the start year.
pub fn folder_years(name: &str) -> (Option<i32>, Option<i32>) {
    static YEAR: OnceLock<Regex> = OnceLock::new();
    let re = YEAR.get_or_init(|| Regex::new(r"\d{4}").expect("valid year pattern"));

    let mut years = re.find_iter(name).filter_map(|m| m.as_str().parse().ok());
    let start = years.next();
    let end = years.next().or(start);
    (start, end)
}

/// `"1.registro-battesimi"` -> `"1.Registro Battesimi"`
pub fn display_name(folder: &str) -> String {
    let mut out = String::with_capacity(folder.len());
    let mut prev_is_word = false;
    for c in folder.chars().map(|c| if c == '-' { ' ' } else { c }) {
        let is_word = c.is_alphanumeric() || c == '_';
        if is_word && !prev_is_word {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        prev_is_word = is_word;
    }
    out
}
