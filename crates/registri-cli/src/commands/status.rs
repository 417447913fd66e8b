//! Status command handler

use anyhow::Result;

use registri_core::Registry;

use crate::output::{Output, OutputFormat};

/// Show status information
pub fn show(registry: &Registry, output: &Output) -> Result<()> {
    let config = registry.config();
    let photos: usize = registry.books().iter().map(|b| b.photo_count()).sum();
    let pages: u32 = registry.books().iter().map(|b| b.total_pages).sum();

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "paths": {
                        "data_dir": config.data_dir,
                        "images_dir": config.images_path(),
                        "annotations": config.annotations_path(),
                        "pagination": config.pagination_path()
                    },
                    "counts": {
                        "books": registry.books().len(),
                        "photos": photos,
                        "pages": pages,
                        "annotated_books": registry.annotated_book_count()
                    }
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", registry.books().len());
        }
        OutputFormat::Human => {
            println!("Registri Status");
            println!("===============");
            println!();
            println!("Storage:");
            println!("  Images:      {}", config.images_path().display());
            println!("  Annotations: {}", config.annotations_path().display());
            println!("  Pagination:  {}", config.pagination_path().display());
            println!();
            println!("Contents:");
            println!("  Books:           {}", registry.books().len());
            println!("  Photos:          {}", photos);
            println!("  Pages:           {}", pages);
            println!("  Annotated books: {}", registry.annotated_book_count());
        }
    }

    Ok(())
}
