//! docport command line.
//!
//! Copies every document from one store to another:
//!
//! ```text
//! docport --source couchdb://localhost:5984/beers --destination zip://beers.zip
//! docport -s json:dump.jsonl -d dir://backup --expand
//! ```

use std::io::IsTerminal;
use std::process;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};

use docport::{
    Locator, MigrateStats, migrate_with_progress, open_expanded_writer, open_reader, open_writer,
};

#[derive(Parser)]
#[command(name = "docport")]
#[command(
    about = "Copies documents between CouchDB, CSV, JSON Lines, directories and ZIP archives",
    long_about = None
)]
struct Cli {
    /// Store to read from: couchdb://host[:port]/db, csv:file, json:file,
    /// dir://directory or zip://archive
    #[arg(long, short)]
    source: Locator,

    /// Store to write to, same notation as --source
    #[arg(long, short)]
    destination: Locator,

    /// Write each document as a file tree, one file per leaf value
    /// (dir and zip destinations only)
    #[arg(long, default_value_t = false)]
    expand: bool,

    /// Suppress the progress spinner
    #[arg(short, long, default_value_t = false)]
    quiet: bool,

    /// Log level used when RUST_LOG is not set
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn main() {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match run(&cli) {
        Ok(stats) => {
            println!(
                "✅ Copied {} documents ({} design) from {} to {} in {:.2}s",
                stats.total(),
                stats.design_documents,
                cli.source,
                cli.destination,
                stats.duration_secs
            );
        }
        Err(e) => {
            eprintln!("❌ Migration failed: {e:#}");
            process::exit(1);
        }
    }
}

fn run(cli: &Cli) -> Result<MigrateStats> {
    let reader =
        open_reader(&cli.source).with_context(|| format!("cannot open source {}", cli.source))?;
    let writer = if cli.expand {
        open_expanded_writer(&cli.destination)
    } else {
        open_writer(&cli.destination)
    }
    .with_context(|| format!("cannot open destination {}", cli.destination))?;

    let spinner = progress_spinner(cli.quiet);
    let stats = migrate_with_progress(reader, writer, |record| {
        spinner.inc(1);
        spinner.set_message(record.id.clone());
    })?;
    spinner.finish_and_clear();

    Ok(stats)
}

/// Spinner on stderr; document counts are unknown up front, so there is
/// no bar to fill.
fn progress_spinner(quiet: bool) -> ProgressBar {
    if quiet || !std::io::stderr().is_terminal() {
        return ProgressBar::hidden();
    }
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {pos} documents {msg}")
            .unwrap(),
    );
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Initialize logging based on log level
fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .try_init()
        .ok(); // Ignore error if already initialized
}
