use crate::catalog::paths::resolve_paths;
use crate::catalog::pipeline::{self, PipelineOptions};
use crate::catalog::shards::{SHARDS, ShardSelector};
use crate::catalog::state::CatalogState;
use crate::catalog::{sidecar, store};
use crate::commands::CommandReport;
use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use fs2::FileExt;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct UpdateOptions {
    pub base_dir: PathBuf,
    pub dump: PathBuf,
    pub names_csv: Option<PathBuf>,
    pub skip_malformed: bool,
}

pub fn run(opts: &UpdateOptions) -> Result<CommandReport> {
    let paths = resolve_paths(&opts.base_dir, opts.names_csv.clone());
    let mut report = CommandReport::new("update");

    fs::create_dir_all(&paths.base_dir)
        .with_context(|| format!("failed to create {}", paths.base_dir.display()))?;

    // One run at a time per base directory; a second writer would interleave
    // shard transactions against the same stores.
    let lock = File::create(&paths.lock_file)
        .with_context(|| format!("failed to create {}", paths.lock_file.display()))?;
    lock.try_lock_exclusive().with_context(|| {
        format!(
            "another run holds the lock on {}",
            paths.lock_file.display()
        )
    })?;

    // The All store holds the prior catalog; without it there is no diff, so
    // any failure here is fatal. The other shards are opened at write time.
    let mut state = CatalogState::default();
    {
        let conn = store::open(&paths.base_dir, "All")?;
        store::init(&conn, &SHARDS[0])
            .with_context(|| format!("failed to initialize shard {}", SHARDS[0].name))?;
        store::load_state(&conn, &mut state).context("failed to load prior catalog")?;
    }
    report.detail(format!(
        "prior catalog: {} systems, {} sectors",
        state.systems.len(),
        state.sectors.iter().count()
    ));

    if paths.names_csv.exists() {
        let loaded = sidecar::load(&paths.names_csv, &mut state.sector_names)
            .with_context(|| format!("failed to load {}", paths.names_csv.display()))?;
        report.detail(format!(
            "sector-name sidecar: {loaded} entries from {}",
            paths.names_csv.display()
        ));
    }

    let dump = File::open(&opts.dump)
        .with_context(|| format!("failed to open dump {}", opts.dump.display()))?;
    let stats = pipeline::ingest(
        GzDecoder::new(dump),
        &mut state,
        &PipelineOptions {
            skip_malformed: opts.skip_malformed,
        },
    )
    .context("dump ingestion failed")?;

    let renumbered = state.renumber_sectors();
    report.detail(format!(
        "records={} skipped={} added={} updated={} new_sectors={renumbered}",
        stats.records,
        stats.skipped,
        state.added.len(),
        state.updated.len(),
    ));

    // Shards are independent stores; a failure in one aborts only that
    // shard's transaction and the rest are still written. The run as a whole
    // still fails so the caller knows to restart.
    for shard in &SHARDS {
        match write_shard(&paths.base_dir, shard, &state) {
            Ok(written) => report.detail(format!(
                "shard {}: sectors={} names={} systems={} deleted={} permits={}",
                shard.name,
                written.sectors,
                written.names,
                written.systems,
                written.deleted_systems,
                written.permits,
            )),
            Err(err) => report.issue(format!("shard {}: {err:#}", shard.name)),
        }
    }

    sidecar::save(&paths.names_csv, &state.sector_names)
        .with_context(|| format!("failed to save {}", paths.names_csv.display()))?;
    report.detail(format!(
        "sector-name sidecar: {} entries written",
        state.sector_names.len()
    ));

    Ok(report)
}

fn write_shard(
    base_dir: &Path,
    shard: &ShardSelector,
    state: &CatalogState,
) -> Result<store::ShardWriteStats> {
    let mut conn = store::open(base_dir, shard.name)?;
    store::init(&conn, shard)
        .with_context(|| format!("failed to initialize shard {}", shard.name))?;
    store::write_shard(&mut conn, shard, state)
        .with_context(|| format!("failed to write shard {}", shard.name))
}
