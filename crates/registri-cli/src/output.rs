//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use anyhow::Result;
use serde::Serialize;

use registri_core::{format_page_ranges, AnnotationSet, Book, YearRange};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Check if output is in quiet mode
    pub fn is_quiet(&self) -> bool {
        matches!(self.format, OutputFormat::Quiet)
    }

    pub fn is_json(&self) -> bool {
        matches!(self.format, OutputFormat::Json)
    }

    /// Print any serializable value as pretty JSON
    pub fn print_json<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }

    /// Print the book list with page counts and annotated years
    pub fn print_books(&self, books: &[(&Book, Option<YearRange>)]) -> Result<()> {
        match self.format {
            OutputFormat::Human => {
                if books.is_empty() {
                    println!("No books found.");
                    return Ok(());
                }
                for (book, range) in books {
                    println!(
                        "{} | {} photos | {} pages | {}",
                        truncate(&book.id, 30),
                        book.photo_count(),
                        book.total_pages,
                        range.map(format_year_range).unwrap_or_else(|| "-".to_string())
                    );
                }
                println!("\n{} book(s)", books.len());
            }
            OutputFormat::Json => {
                let json: Vec<_> = books
                    .iter()
                    .map(|(book, range)| {
                        serde_json::json!({
                            "id": book.id,
                            "name": book.name,
                            "photos": book.photo_count(),
                            "total_pages": book.total_pages,
                            "start_year": book.start_year,
                            "end_year": book.end_year,
                            "annotated_years": range,
                        })
                    })
                    .collect();
                self.print_json(&json)?;
            }
            OutputFormat::Quiet => {
                for (book, _) in books {
                    println!("{}", book.id);
                }
            }
        }
        Ok(())
    }

    /// Print a book's years with their page ranges
    pub fn print_annotations(&self, book_id: &str, set: Option<&AnnotationSet>) -> Result<()> {
        let years: Vec<_> = set.map(|s| s.years().collect()).unwrap_or_default();
        match self.format {
            OutputFormat::Human => {
                if years.is_empty() {
                    println!("No years recorded for '{}'.", book_id);
                    return Ok(());
                }
                for (year, pages) in &years {
                    println!("{}: {}", year, format_page_ranges(pages.iter()));
                }
                println!("\n{} year(s)", years.len());
            }
            OutputFormat::Json => match set {
                Some(set) => self.print_json(set)?,
                None => println!("{{}}"),
            },
            OutputFormat::Quiet => {
                for (year, _) in &years {
                    println!("{}", year);
                }
            }
        }
        Ok(())
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print a warning to stderr (suppressed in quiet mode)
    pub fn warning(&self, msg: &str) {
        if !self.is_quiet() {
            eprintln!("⚠ {}", msg);
        }
    }
}

/// `1650-1700 (12 years)`, or just `1650` for a single year
pub fn format_year_range(range: YearRange) -> String {
    if range.start == range.end {
        range.start.to_string()
    } else {
        format!("{}-{} ({} years)", range.start, range.end, range.total_years)
    }
}

/// Truncate a string to max characters, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len - 3).collect();
        format!("{}...", kept)
    }
}
