//! Registri Core Library
//!
//! This crate provides the core functionality for Registri, a viewer for
//! photographed parish baptismal registers.
//!
//! # Architecture
//!
//! - **Catalog**: one folder of photos per register volume
//! - **Pagination**: maps photos to the page numbers printed on them
//! - **Annotations**: partitions each book's pages into calendar years
//!
//! Both state files are plain JSON in the data directory and are rewritten
//! after every change.
//!
//! # Quick Start
//!
//! ```text
//! let mut registry = Registry::open()?;
//!
//! // What does the fourth photo show?
//! let pages = registry.page_numbers("1.registro-1650-1700", 3)?;
//!
//! // Everything from here on was written in 1652
//! registry.set_year_from_photo("1.registro-1650-1700", 3, "1652")?;
//! ```
//!
//! # Modules
//!
//! - `registry`: Unified interface (main entry point)
//! - `models`: Books, pagination configs, page labels and years
//! - `pagination`: Photo to page resolution and the config store
//! - `annotations`: Year partition and the annotation store
//! - `catalog`: Book discovery in the images directory
//! - `storage`: JSON persistence with atomic writes
//! - `config`: Application configuration

pub mod annotations;
pub mod catalog;
pub mod config;
pub mod error;
pub mod models;
pub mod pagination;
pub mod registry;
pub mod storage;

pub use annotations::{format_page_ranges, AnnotationSet, AnnotationStore};
pub use catalog::Catalog;
pub use config::Config;
pub use error::{RegistryError, RegistryResult};
pub use models::{
    format_exceptions, parse_exceptions, Book, PageLabel, PaginationConfig, PaginationMode,
    PhotoPages, Year, YearRange,
};
pub use pagination::{Pagination, PaginationStore};
pub use registry::{PageLocation, Registry, YearAssignment, YearSearchHit};
pub use storage::{StorageError, StorageResult};
