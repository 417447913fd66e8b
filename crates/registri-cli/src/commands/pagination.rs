//! Pagination command handlers

use anyhow::{bail, Result};

use registri_core::{format_exceptions, parse_exceptions, PaginationConfig, Registry};

use crate::output::{Output, OutputFormat};

/// Changes requested on the command line; unset fields keep their value
#[derive(Debug, Default)]
pub struct PaginationUpdate {
    pub mode: Option<String>,
    pub start_page: Option<u32>,
    pub skip_images: Option<usize>,
    pub default_pages: Option<u32>,
    pub exceptions: Vec<String>,
    pub clear_exceptions: bool,
}

impl PaginationUpdate {
    /// Apply the changes on top of `current`
    pub fn apply(self, mut config: PaginationConfig) -> Result<PaginationConfig> {
        if let Some(mode) = self.mode {
            config.mode = mode.parse()?;
        }
        if let Some(start_page) = self.start_page {
            config.start_page = start_page;
        }
        if let Some(skip_images) = self.skip_images {
            config.skip_images = skip_images;
        }
        if let Some(default_pages) = self.default_pages {
            config.default_pages_per_image = default_pages;
        }
        if self.clear_exceptions {
            config.exceptions.clear();
        }
        for entry in &self.exceptions {
            let parsed = parse_exceptions(entry);
            if parsed.is_empty() {
                bail!(
                    "Invalid exception '{}': expected <photo>:<pages>, e.g. 3:1",
                    entry
                );
            }
            config.exceptions.extend(parsed);
        }
        Ok(config)
    }
}

/// Show a book's pagination config
pub fn show(registry: &Registry, book_id: String, output: &Output) -> Result<()> {
    let config = registry.pagination_config(&book_id)?;
    let total = registry.total_pages(&book_id)?;

    match output.format {
        OutputFormat::Json => output.print_json(config)?,
        OutputFormat::Quiet => println!("{}", config.mode),
        OutputFormat::Human => {
            print_config(config, total);
            if !registry.has_custom_pagination(&book_id) {
                println!();
                println!("(default layout, nothing stored for '{}')", book_id);
            }
        }
    }

    Ok(())
}

/// Update a book's pagination config
pub fn set(
    registry: &mut Registry,
    book_id: String,
    update: PaginationUpdate,
    output: &Output,
) -> Result<()> {
    let current = registry.pagination_config(&book_id)?.clone();
    let config = update.apply(current)?;
    let stored = registry.set_pagination_config(&book_id, config)?;
    let total = registry.total_pages(&book_id)?;

    match output.format {
        OutputFormat::Json => output.print_json(&stored)?,
        OutputFormat::Quiet => {}
        OutputFormat::Human => {
            output.success(&format!("Pagination for '{}' saved", book_id));
            print_config(&stored, total);
        }
    }

    Ok(())
}

fn print_config(config: &PaginationConfig, total_pages: u32) {
    println!("Mode:            {}", config.mode);
    println!("Start page:      {}", config.start_page);
    println!("Skipped photos:  {}", config.skip_images);
    println!("Pages per photo: {}", config.default_pages_per_image);
    if !config.exceptions.is_empty() {
        println!("Exceptions:");
        for line in format_exceptions(&config.exceptions).lines() {
            println!("  {}", line);
        }
    }
    println!("Total pages:     {}", total_pages);
}
