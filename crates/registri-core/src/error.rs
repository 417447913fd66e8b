//! Registry error handling
//!
//! Every failure the pagination and annotation operations report to their
//! caller. None of them is fatal; the front end turns them into messages.

use std::path::PathBuf;

use thiserror::Error;

use crate::storage::StorageError;

#[derive(Error, Debug)]
pub enum RegistryError {
    /// Attempt to annotate a cover or front-matter photo
    #[error("Photo {photo_index} of '{book_id}' is '{label}' and cannot be annotated")]
    InvalidTarget {
        book_id: String,
        photo_index: usize,
        label: String,
    },

    /// Photo index or page number outside the book
    #[error("{what} is out of range for '{book_id}' ({details})")]
    OutOfRange {
        book_id: String,
        what: String,
        details: String,
    },

    #[error("Unknown book: '{0}'")]
    UnknownBook(String),

    #[error("Invalid year '{0}': expected four digits (e.g. 1650)")]
    InvalidYear(String),

    #[error("Invalid pagination config: {0}")]
    InvalidPagination(String),

    /// A state file could not be parsed and was reset to empty
    #[error("State file '{path}' was unreadable and has been reset: {source}")]
    MalformedPersistedState {
        path: PathBuf,
        #[source]
        source: StorageError,
    },

    /// The in-memory change succeeded but could not be written to disk
    #[error("Change applied but not saved to '{path}': {source}")]
    PersistenceFailure {
        path: PathBuf,
        #[source]
        source: StorageError,
    },
}

impl RegistryError {
    pub(crate) fn photo_out_of_range(book_id: &str, photo_index: usize, photo_count: usize) -> Self {
        RegistryError::OutOfRange {
            book_id: book_id.to_string(),
            what: format!("Photo {}", photo_index),
            details: format!("book has {} photos", photo_count),
        }
    }

    pub(crate) fn no_pages(book_id: &str, page: u32) -> Self {
        RegistryError::OutOfRange {
            book_id: book_id.to_string(),
            what: format!("Page {}", page),
            details: "book has no numbered pages".to_string(),
        }
    }

    /// Get a recovery suggestion for this error
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            RegistryError::InvalidTarget { .. } => {
                Some("Move to the first numbered page and set the year from there.")
            }
            RegistryError::MalformedPersistedState { source, .. }
            | RegistryError::PersistenceFailure { source, .. } => source.recovery_suggestion(),
            _ => None,
        }
    }
}

pub type RegistryResult<T> = Result<T, RegistryError>;
