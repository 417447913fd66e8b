//! Registri CLI
//!
//! Command-line interface for Registri - browsing and dating photographed
//! baptismal registers.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use registri_core::{Config, Registry, RegistryError};

mod commands;
mod output;

use commands::pagination::PaginationUpdate;
use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "registri")]
#[command(about = "Registri - Parish baptismal register viewer")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Use this config file instead of the default
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log debug output (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all books
    #[command(alias = "ls")]
    Books,
    /// Show every photo of a book with its pages and year
    Book {
        /// Book ID (folder name)
        id: String,
    },
    /// Show the pages and year of a photo
    Page {
        /// Book ID (folder name)
        id: String,
        /// Photo index (0-based)
        photo: usize,
    },
    /// Find the photo showing a printed page
    Goto {
        /// Book ID (folder name)
        id: String,
        /// Printed page number
        page: u32,
    },
    /// Manage year annotations
    Year {
        #[command(subcommand)]
        command: YearCommands,
    },
    /// Show the years of a book with their page ranges
    Annotations {
        /// Book ID (folder name)
        id: String,
    },
    /// Show or change how photos map to pages
    Pagination {
        #[command(subcommand)]
        command: PaginationCommands,
    },
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
    /// Show paths and counts
    Status,
}

#[derive(Subcommand)]
enum YearCommands {
    /// Assign a year to a photo and every page after it
    Set {
        /// Book ID (folder name)
        id: String,
        /// Photo index (0-based)
        photo: usize,
        /// Four-digit year
        year: String,
    },
    /// Show the year of a photo
    Get {
        /// Book ID (folder name)
        id: String,
        /// Photo index (0-based)
        photo: usize,
    },
    /// List the pages recorded under a year (0-based)
    Pages {
        /// Book ID (folder name)
        id: String,
        /// Four-digit year
        year: String,
    },
    /// Show the span of annotated years
    Range {
        /// Book ID (folder name)
        id: String,
    },
    /// Find the book and first page for a year
    Search {
        /// Four-digit year
        year: String,
    },
}

#[derive(Subcommand)]
enum PaginationCommands {
    /// Show a book's pagination config
    Show {
        /// Book ID (folder name)
        id: String,
    },
    /// Update a book's pagination config
    Set {
        /// Book ID (folder name)
        id: String,
        /// auto-single, auto-double or manual
        #[arg(long)]
        mode: Option<String>,
        /// Printed number of the first counted photo
        #[arg(long)]
        start_page: Option<u32>,
        /// Leading photos without page numbers
        #[arg(long)]
        skip_images: Option<usize>,
        /// Pages per photo in manual mode (1 or 2)
        #[arg(long)]
        default_pages: Option<u32>,
        /// Per-photo page count, as <photo>:<pages> (repeatable)
        #[arg(short, long)]
        exception: Vec<String>,
        /// Remove existing exceptions first
        #[arg(long)]
        clear_exceptions: bool,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, images_dir, log_file)
        key: String,
        /// Configuration value
        value: String,
    },
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    if let Err(e) = run(cli, &output) {
        eprintln!("Error: {:#}", e);
        if let Some(hint) = e
            .downcast_ref::<RegistryError>()
            .and_then(RegistryError::recovery_suggestion)
        {
            eprintln!("Hint: {}", hint);
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli, output: &Output) -> Result<()> {
    // Commands that don't need the registry
    if let Commands::Config { command } = &cli.command {
        return handle_config_command(command.clone(), cli.config.as_ref(), output);
    }

    let config = Config::load_with_cli_override(cli.config.as_ref())
        .context("Failed to load configuration")?;
    init_logging(&config, cli.verbose);

    let mut registry = Registry::open_with_config(config)?;
    for warning in registry.take_load_warnings() {
        output.warning(&warning.to_string());
    }

    match cli.command {
        Commands::Books => commands::book::list(&registry, output),
        Commands::Book { id } => commands::book::show(&registry, id, output),
        Commands::Page { id, photo } => commands::book::page(&registry, id, photo, output),
        Commands::Goto { id, page } => commands::book::goto(&registry, id, page, output),
        Commands::Year { command } => handle_year_command(command, &mut registry, output),
        Commands::Annotations { id } => commands::year::annotations(&registry, id, output),
        Commands::Pagination { command } => {
            handle_pagination_command(command, &mut registry, output)
        }
        Commands::Config { .. } => unreachable!(), // Handled above
        Commands::Status => commands::status::show(&registry, output),
    }
}

fn handle_year_command(
    command: YearCommands,
    registry: &mut Registry,
    output: &Output,
) -> Result<()> {
    match command {
        YearCommands::Set { id, photo, year } => {
            commands::year::set(registry, id, photo, year, output)
        }
        YearCommands::Get { id, photo } => commands::year::get(registry, id, photo, output),
        YearCommands::Pages { id, year } => commands::year::pages(registry, id, year, output),
        YearCommands::Range { id } => commands::year::range(registry, id, output),
        YearCommands::Search { year } => commands::year::search(registry, year, output),
    }
}

fn handle_pagination_command(
    command: PaginationCommands,
    registry: &mut Registry,
    output: &Output,
) -> Result<()> {
    match command {
        PaginationCommands::Show { id } => commands::pagination::show(registry, id, output),
        PaginationCommands::Set {
            id,
            mode,
            start_page,
            skip_images,
            default_pages,
            exception,
            clear_exceptions,
        } => {
            let update = PaginationUpdate {
                mode,
                start_page,
                skip_images,
                default_pages,
                exceptions: exception,
                clear_exceptions,
            };
            commands::pagination::set(registry, id, update, output)
        }
    }
}

fn handle_config_command(
    command: Option<ConfigCommands>,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(config_path, output),
        Some(ConfigCommands::Set { key, value }) => {
            commands::config::set(key, value, config_path, output)
        }
    }
}

/// Install the tracing subscriber
///
/// RUST_LOG wins; otherwise `warn`, or `debug` with `--verbose`. Logs go to
/// the configured log file, or stderr.
fn init_logging(config: &Config, verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("registri_core={},registri_cli={}", level, level))
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false);

    // Ignore error if already initialized
    match &config.log_file {
        Some(log_path) => {
            let log_file = match OpenOptions::new().create(true).append(true).open(log_path) {
                Ok(f) => f,
                Err(e) => {
                    eprintln!("Warning: Could not open log file {:?}: {}", log_path, e);
                    return;
                }
            };
            let _ = builder
                .with_ansi(false)
                .with_writer(Mutex::new(log_file))
                .try_init();
            info!("Logging to {:?}", log_path);
        }
        None => {
            let _ = builder.with_writer(std::io::stderr).try_init();
        }
    }
}
