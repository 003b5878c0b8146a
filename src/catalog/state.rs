//! Run-lifetime catalog state: the prior catalog loaded at startup, the
//! diff accumulated against it, and the registries the name codec and
//! sector assignor feed. Owned by the pipeline driver; the frame reader and
//! record decoder never see it.

use crate::catalog::sector::{SectorNameRegistry, SectorTable};
use chrono::NaiveDateTime;
use std::collections::{BTreeSet, HashMap, HashSet};

/// One catalog row. `address` is the immutable primary key; `sector_id`
/// mutates only through renumbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemEntry {
    pub address: i64,
    pub sector_id: i32,
    pub name_id: i64,
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub info: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    Added,
    Updated,
    Unchanged,
}

#[derive(Debug, Default)]
pub struct CatalogState {
    /// Live catalog keyed by address. Entries absent from the current run
    /// are never removed.
    pub systems: HashMap<i64, SystemEntry>,
    pub sectors: SectorTable,
    pub sector_names: SectorNameRegistry,
    /// Catalogued-name literals keyed by address.
    pub names: HashMap<i64, String>,
    /// As-persisted shadow of `names`, to detect no-op writes.
    pub orig_names: HashMap<i64, String>,
    /// Access-restricted addresses as persisted.
    pub permits: HashSet<i64>,
    pub added: HashSet<i64>,
    pub updated: HashSet<i64>,
    pub add_permits: BTreeSet<i64>,
    pub del_permits: BTreeSet<i64>,
    /// Run-wide maximum record timestamp.
    pub last_timestamp: Option<NaiveDateTime>,
}

impl CatalogState {
    /// Diff one processed entry against the live catalog and fold it in.
    pub fn observe(&mut self, entry: SystemEntry) -> Observation {
        match self.systems.get(&entry.address) {
            None => {
                self.added.insert(entry.address);
                self.systems.insert(entry.address, entry);
                Observation::Added
            }
            Some(prev) if *prev == entry => Observation::Unchanged,
            Some(_) => {
                if !self.added.contains(&entry.address) {
                    self.updated.insert(entry.address);
                }
                self.systems.insert(entry.address, entry);
                Observation::Updated
            }
        }
    }

    /// Track the permit flag as a pure add/remove delta against the
    /// persisted set. A later record for the same address overrides.
    pub fn observe_permit(&mut self, address: i64, needs_permit: bool) {
        if needs_permit {
            self.del_permits.remove(&address);
            if !self.permits.contains(&address) {
                self.add_permits.insert(address);
            }
        } else {
            self.add_permits.remove(&address);
            if self.permits.contains(&address) {
                self.del_permits.insert(address);
            }
        }
    }

    pub fn note_timestamp(&mut self, ts: NaiveDateTime) {
        if self.last_timestamp.is_none_or(|prev| ts > prev) {
            self.last_timestamp = Some(ts);
        }
    }

    /// Rewrite phase of the renumbering pass: after assigning permanent
    /// sector ids, walk every system referencing a renumbered sector and
    /// rewrite it. Systems untouched this run are promoted to updated so
    /// the permanent id reaches the stores. Returns the number of sectors
    /// renumbered.
    pub fn renumber_sectors(&mut self) -> usize {
        let map = self.sectors.renumber(&mut self.sector_names);
        if map.is_empty() {
            return 0;
        }

        for (address, system) in self.systems.iter_mut() {
            if let Some(permanent) = map.get(&system.sector_id) {
                system.sector_id = *permanent;
                if !self.added.contains(address) {
                    self.updated.insert(*address);
                }
            }
        }

        map.len()
    }
}
