use std::env;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct CatalogPaths {
    pub base_dir: PathBuf,
    pub names_csv: PathBuf,
    pub lock_file: PathBuf,
}

fn env_or_default_path(var: &str, fallback: PathBuf) -> PathBuf {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => PathBuf::from(v.trim()),
        _ => fallback,
    }
}

/// Resolve the run's filesystem surface. The sidecar path falls back to
/// `STARCAT_NAMES_CSV`, then to `sector-names.csv` next to the stores.
pub fn resolve_paths(base_dir: &Path, names_csv: Option<PathBuf>) -> CatalogPaths {
    let names_csv = names_csv.unwrap_or_else(|| {
        env_or_default_path("STARCAT_NAMES_CSV", base_dir.join("sector-names.csv"))
    });

    CatalogPaths {
        base_dir: base_dir.to_path_buf(),
        names_csv,
        lock_file: base_dir.join("starcat.lock"),
    }
}
