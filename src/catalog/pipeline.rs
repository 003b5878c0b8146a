//! Pipeline driver: frames lines off the decompressed stream, decodes each
//! record, runs the name codec and sector assignor, and folds the result
//! into the catalog diff.

use crate::catalog::frame::FrameReader;
use crate::catalog::progress::{self, Progress};
use crate::catalog::record::{self, DumpRecord};
use crate::catalog::state::{CatalogState, SystemEntry};
use crate::catalog::{grid, names};
use anyhow::Result;
use std::io::Read;

/// Below this length a line is frame noise (array brackets, blank lines),
/// not a record.
const MIN_RECORD_LEN: usize = 5;

#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineOptions {
    /// Log and skip a malformed record instead of aborting the run.
    pub skip_malformed: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineStats {
    pub records: u64,
    pub skipped: u64,
}

/// Fold one decoded record into the state: encode the name, register any
/// literal, assign the sector from the grid cell, diff, and track the
/// permit flag and timestamp.
fn absorb(state: &mut CatalogState, record: DumpRecord) {
    let coded = names::encode_name(&record.name, record.address);
    if let Some(literal) = coded.literal {
        state.names.insert(record.address, literal);
    }

    let grid_id = grid::grid_assign(record.x, record.z);
    let sector_id = state.sectors.resolve(&coded.sector_name, grid_id);

    state.observe(SystemEntry {
        address: record.address,
        sector_id,
        name_id: coded.code.raw(),
        x: record.x,
        y: record.y,
        z: record.z,
        info: record.info,
    });
    state.observe_permit(record.address, record.needs_permit);
    if let Some(ts) = record.timestamp {
        state.note_timestamp(ts);
    }
}

/// One pass over the whole dump. Structural errors abort unless
/// `skip_malformed` is set; an overlong record is fatal either way.
pub fn ingest<R: Read>(
    source: R,
    state: &mut CatalogState,
    opts: &PipelineOptions,
) -> Result<PipelineStats> {
    let mut frames = FrameReader::new(source);
    let mut ticker = Progress::new();
    let mut stats = PipelineStats::default();

    loop {
        let Some(line) = frames.next_line()? else {
            break;
        };

        if line.len() < MIN_RECORD_LEN {
            continue;
        }

        match record::decode_line(line) {
            Ok(record) => {
                absorb(state, record);
                stats.records += 1;
                ticker.tick();
            }
            Err(err) if opts.skip_malformed => {
                stats.skipped += 1;
                progress::warn("MALFORMED_RECORD", "decode", &err.to_string());
            }
            Err(err) => return Err(err.into()),
        }
    }

    ticker.finish();
    Ok(stats)
}
