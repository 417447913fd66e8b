//! Book and page command handlers

use anyhow::Result;

use registri_core::{PhotoPages, Registry};

use crate::output::{format_year_range, Output, OutputFormat};

/// List all books
pub fn list(registry: &Registry, output: &Output) -> Result<()> {
    let books = registry
        .books()
        .iter()
        .map(|book| registry.book_year_range(&book.id).map(|range| (book, range)))
        .collect::<Result<Vec<_>, _>>()?;

    output.print_books(&books)
}

/// Show every photo of a book with its pages and year
pub fn show(registry: &Registry, book_id: String, output: &Output) -> Result<()> {
    let book = registry.book(&book_id)?;
    let pagination = registry.pagination(&book_id)?;

    let mut rows = Vec::with_capacity(book.photo_count());
    for (index, pages) in pagination.photos() {
        let year = registry.page_year(&book_id, index)?;
        rows.push((index, &book.images[index], pages, year));
    }

    match output.format {
        OutputFormat::Json => {
            let json: Vec<_> = rows
                .iter()
                .map(|(index, image, pages, year)| {
                    serde_json::json!({
                        "photo": index,
                        "image": image,
                        "pages": pages_json(pages),
                        "label": label_json(pages),
                        "year": year,
                    })
                })
                .collect();
            output.print_json(&json)?;
        }
        OutputFormat::Quiet => {
            for (_, _, pages, _) in &rows {
                println!("{}", pages.display());
            }
        }
        OutputFormat::Human => {
            println!("{} ({})", book.name, book.id);
            println!(
                "{} photos, {} pages, years: {}",
                book.photo_count(),
                book.total_pages,
                registry
                    .book_year_range(&book_id)?
                    .map(format_year_range)
                    .unwrap_or_else(|| "-".to_string())
            );
            println!();
            for (index, image, pages, year) in &rows {
                println!(
                    "{:>4} | {:<24} | {:<22} | {}",
                    index,
                    image,
                    pages.display(),
                    year.as_ref().map(|y| y.as_str()).unwrap_or("")
                );
            }
        }
    }

    Ok(())
}

/// Show the pages and year of one photo
pub fn page(registry: &Registry, book_id: String, photo: usize, output: &Output) -> Result<()> {
    let pages = registry.page_numbers(&book_id, photo)?;
    let year = registry.page_year(&book_id, photo)?;

    match output.format {
        OutputFormat::Json => {
            output.print_json(&serde_json::json!({
                "book": book_id,
                "photo": photo,
                "pages": pages_json(&pages),
                "label": label_json(&pages),
                "year": year,
            }))?;
        }
        OutputFormat::Quiet => println!("{}", pages.display()),
        OutputFormat::Human => {
            let total = registry.total_pages(&book_id)?;
            if pages.is_labeled() {
                println!("Photo {}: {}", photo, pages.display());
            } else {
                println!("Photo {}: page {} of {}", photo, pages.display(), total);
            }
            if let Some(year) = year {
                println!("Year: {}", year);
            }
        }
    }

    Ok(())
}

/// Find the photo showing a printed page
pub fn goto(registry: &Registry, book_id: String, page: u32, output: &Output) -> Result<()> {
    let photo = registry.photo_index_for_page(&book_id, page)?;
    let book = registry.book(&book_id)?;

    match output.format {
        OutputFormat::Json => {
            output.print_json(&serde_json::json!({
                "book": book_id,
                "page": page,
                "photo": photo,
                "image": book.images[photo],
            }))?;
        }
        OutputFormat::Quiet => println!("{}", photo),
        OutputFormat::Human => {
            let shown = registry.page_numbers(&book_id, photo)?;
            let clamped = !matches!(&shown, PhotoPages::Pages(p) if p.contains(&page));
            if clamped {
                println!(
                    "Page {} is past the end; showing photo {} ({})",
                    page,
                    photo,
                    shown.display()
                );
            } else {
                println!("Page {} is on photo {} ({})", page, photo, book.images[photo]);
            }
        }
    }

    Ok(())
}

fn pages_json(pages: &PhotoPages) -> serde_json::Value {
    match pages {
        PhotoPages::Pages(pages) => serde_json::json!(pages),
        PhotoPages::Labeled(_) => serde_json::Value::Null,
    }
}

fn label_json(pages: &PhotoPages) -> serde_json::Value {
    match pages {
        PhotoPages::Labeled(label) => serde_json::json!(label.to_string()),
        PhotoPages::Pages(_) => serde_json::Value::Null,
    }
}
