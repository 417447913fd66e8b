//! Command handlers for the CLI

pub mod book;
pub mod config;
pub mod pagination;
pub mod status;
pub mod year;
