use crate::commands::CommandReport;
use crate::commands::fetch::{self, DEFAULT_DUMP_URL, FetchOptions};
use crate::commands::update::{self, UpdateOptions};
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "starcat",
    version,
    about = "Builds and incrementally updates sharded star-system catalogs from compressed NDJSON dumps."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Ingest a systems dump and update every shard store.
    Update {
        /// Directory holding the shard stores.
        base_dir: PathBuf,
        /// Path to the gzip-compressed NDJSON dump.
        dump: PathBuf,
        /// Sector-name registry CSV sidecar (defaults next to the stores).
        names_csv: Option<PathBuf>,
        /// Log and skip malformed records instead of aborting the run.
        #[arg(long)]
        skip_malformed: bool,
    },
    /// Download the systems dump.
    Fetch {
        /// Destination file for the compressed dump.
        dest: PathBuf,
        #[arg(long, default_value = DEFAULT_DUMP_URL)]
        url: String,
    },
}

fn finish(report: CommandReport) -> Result<()> {
    for line in &report.details {
        eprintln!("{line}");
    }
    for line in &report.issues {
        eprintln!("issue: {line}");
    }
    if !report.ok {
        anyhow::bail!("{} failed", report.command);
    }
    Ok(())
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Update {
            base_dir,
            dump,
            names_csv,
            skip_malformed,
        } => finish(update::run(&UpdateOptions {
            base_dir,
            dump,
            names_csv,
            skip_malformed,
        })?),
        Command::Fetch { dest, url } => finish(fetch::run(&FetchOptions { dest, url })?),
    }
}
