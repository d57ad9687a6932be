//! flyer-ingest: load lab records and analysed flyer frames into DuckDB.

mod commands;
mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Deduplicated ingestion of flyer analysis results and lab records
#[derive(Parser, Debug)]
#[command(name = "flyer-ingest")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert exported layouts into synthesized tables
    Convert {
        /// DuckDB database file
        #[arg(long, env = "FLYER_DATABASE")]
        database: PathBuf,

        /// Layout configuration (TOML)
        #[arg(long)]
        layouts: PathBuf,

        /// Directory holding one `<layout name>.jsonl` file per layout
        #[arg(long)]
        source: PathBuf,

        /// Drop existing layout tables first
        #[arg(long)]
        drop_existing: bool,

        /// Abort on the first invalid record
        #[arg(long)]
        strict: bool,
    },
    /// Ingest analysed image frames from a directory
    Ingest {
        /// DuckDB database file
        #[arg(long, env = "FLYER_DATABASE")]
        database: PathBuf,

        /// Directory holding the frames
        #[arg(long)]
        images: PathBuf,

        /// JSONL manifest of analysis results
        #[arg(long)]
        manifest: PathBuf,

        /// Glob pattern relative to the images directory
        #[arg(long, default_value = "**/*")]
        pattern: String,

        /// Accepted file extension
        #[arg(long, default_value = "bmp")]
        extension: String,

        /// Number of worker threads
        #[arg(long, default_value_t = 4)]
        workers: usize,

        /// Drop and recreate the result tables first
        #[arg(long)]
        drop_existing: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match cli.command {
        Command::Convert {
            database,
            layouts,
            source,
            drop_existing,
            strict,
        } => commands::convert::handle_convert(&commands::convert::ConvertArgs {
            database,
            layouts,
            source,
            drop_existing,
            strict,
        }),
        Command::Ingest {
            database,
            images,
            manifest,
            pattern,
            extension,
            workers,
            drop_existing,
        } => commands::ingest::handle_ingest(&commands::ingest::IngestArgs {
            database,
            images,
            manifest,
            pattern,
            extension,
            workers,
            drop_existing,
        }),
    }
}
