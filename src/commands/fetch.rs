use crate::commands::CommandReport;
use anyhow::{Context, Result};
use std::fs::File;
use std::path::PathBuf;

pub const DEFAULT_DUMP_URL: &str = "https://www.edsm.net/dump/systemsWithCoordinates.json.gz";

#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub dest: PathBuf,
    pub url: String,
}

pub fn run(opts: &FetchOptions) -> Result<CommandReport> {
    let mut report = CommandReport::new("fetch");

    let mut response = reqwest::blocking::get(&opts.url)
        .with_context(|| format!("request to {} failed", opts.url))?
        .error_for_status()
        .with_context(|| format!("{} returned an error status", opts.url))?;

    let mut dest = File::create(&opts.dest)
        .with_context(|| format!("failed to create {}", opts.dest.display()))?;
    let bytes = std::io::copy(&mut response, &mut dest)
        .with_context(|| format!("failed to write {}", opts.dest.display()))?;

    report.detail(format!("downloaded {bytes} bytes to {}", opts.dest.display()));
    Ok(report)
}
