//! Storage layer
//!
//! Handles persistence of the two JSON state files.
//!
//! ## Architecture
//!
//! - **Annotations**: book id -> year -> printed page numbers
//! - **Pagination**: book id -> pagination configuration
//!
//! Both files are read once at startup and rewritten in full after every
//! mutation. There is no background flush; saves block the caller.

pub mod error;
pub mod persistence;

pub use error::{StorageError, StorageResult};
pub use persistence::{JsonFile, Loaded};
