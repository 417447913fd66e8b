//! Year annotation command handlers

use anyhow::Result;

use registri_core::{format_page_ranges, Registry};

use crate::output::{format_year_range, Output, OutputFormat};

/// Assign a year to a photo and every page after it
pub fn set(
    registry: &mut Registry,
    book_id: String,
    photo: usize,
    year: String,
    output: &Output,
) -> Result<()> {
    let assignment = registry.set_year_from_photo(&book_id, photo, &year)?;

    if output.is_json() {
        return output.print_json(&assignment);
    }
    output.success(&format!(
        "Year {} set for {} page(s) from page {} onward",
        assignment.year,
        assignment.pages_assigned,
        assignment.photo_pages[0]
    ));
    Ok(())
}

/// Show the year of a photo
pub fn get(registry: &Registry, book_id: String, photo: usize, output: &Output) -> Result<()> {
    let year = registry.page_year(&book_id, photo)?;

    match output.format {
        OutputFormat::Json => output.print_json(&serde_json::json!({
            "book": book_id,
            "photo": photo,
            "year": year,
        }))?,
        OutputFormat::Quiet => {
            if let Some(year) = year {
                println!("{}", year);
            }
        }
        OutputFormat::Human => match year {
            Some(year) => println!("Photo {}: {}", photo, year),
            None => println!("Photo {}: no year recorded", photo),
        },
    }

    Ok(())
}

/// List the (zero-based) pages recorded under a year
pub fn pages(registry: &Registry, book_id: String, year: String, output: &Output) -> Result<()> {
    let pages = registry.find_pages_by_year(&book_id, &year)?;

    match output.format {
        OutputFormat::Json => output.print_json(&pages)?,
        OutputFormat::Quiet => {
            for page in &pages {
                println!("{}", page);
            }
        }
        OutputFormat::Human => {
            if pages.is_empty() {
                println!("No pages recorded for {} in '{}'.", year, book_id);
            } else {
                println!("{}: {}", year, format_page_ranges(&pages));
            }
        }
    }

    Ok(())
}

/// Show the span of annotated years in a book
pub fn range(registry: &Registry, book_id: String, output: &Output) -> Result<()> {
    let range = registry.book_year_range(&book_id)?;

    match output.format {
        OutputFormat::Json => output.print_json(&range)?,
        OutputFormat::Quiet => {
            if let Some(range) = range {
                println!("{} {}", range.start, range.end);
            }
        }
        OutputFormat::Human => match range {
            Some(range) => println!("{}", format_year_range(range)),
            None => println!("No years recorded for '{}'.", book_id),
        },
    }

    Ok(())
}

/// Find the book (and first page) for a year
pub fn search(registry: &Registry, year: String, output: &Output) -> Result<()> {
    let hit = registry.search_year(&year)?;

    match output.format {
        OutputFormat::Json => output.print_json(&hit)?,
        OutputFormat::Quiet => {
            if let Some(hit) = hit {
                match hit.location {
                    Some(location) => println!("{} {}", hit.book_id, location.photo_index),
                    None => println!("{}", hit.book_id),
                }
            }
        }
        OutputFormat::Human => match hit {
            Some(hit) => {
                let book = registry.book(&hit.book_id)?;
                match hit.location {
                    Some(location) => println!(
                        "{}: {}, page {} (photo {})",
                        year, book.name, location.page, location.photo_index
                    ),
                    None => println!("{}: {} (no pages annotated yet)", year, book.name),
                }
            }
            None => println!("No book found for {}.", year),
        },
    }

    Ok(())
}

/// Show every year of a book with its page ranges
pub fn annotations(registry: &Registry, book_id: String, output: &Output) -> Result<()> {
    let set = registry.annotations(&book_id)?;
    output.print_annotations(&book_id, set)
}
