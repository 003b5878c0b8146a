//! Sector-name registry sidecar: a CSV (`ID,Name`) loaded before a run and
//! rewritten atomically after, so permanent sector ids survive restarts.

use crate::catalog::sector::SectorNameRegistry;
use anyhow::{Context, Result, bail};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

pub fn load(path: &Path, registry: &mut SectorNameRegistry) -> Result<usize> {
    let raw =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;

    let mut loaded = 0usize;
    for (lineno, line) in raw.lines().enumerate().skip(1) {
        if line.trim().is_empty() {
            continue;
        }
        let Some((id, name)) = line.split_once(',') else {
            bail!("{}:{}: expected ID,Name", path.display(), lineno + 1);
        };
        let id: i32 = id
            .trim()
            .parse()
            .with_context(|| format!("{}:{}: bad id {id:?}", path.display(), lineno + 1))?;
        registry.insert(id, name);
        loaded += 1;
    }
    Ok(loaded)
}

/// Write-to-temp then rename, in the target's own directory so the rename
/// stays on one filesystem.
pub fn save(path: &Path, registry: &SectorNameRegistry) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;

    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("failed to create temp file in {}", dir.display()))?;
    writeln!(tmp, "ID,Name")?;
    for (id, name) in registry.entries() {
        writeln!(tmp, "{id},{name}")?;
    }
    tmp.persist(path)
        .with_context(|| format!("failed to replace {}", path.display()))?;
    Ok(())
}
