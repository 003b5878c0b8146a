//! Sector table and the two-phase transient/permanent id scheme.
//!
//! Sectors discovered during a run get transient positive ids. At run end
//! the renumbering pass assigns each one a permanent negative id derived
//! from the sector-name registry, so re-runs resolve the same sector to the
//! same id. Ids loaded from storage are never positive and never change.

use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sector {
    pub id: i32,
    pub name: String,
    pub grid_id: i32,
}

/// Identity key is (lowercased name, grid cell): the same region name in
/// two grid cells is two sectors.
fn sector_key(name: &str, grid_id: i32) -> (String, i32) {
    (name.to_lowercase(), grid_id)
}

#[derive(Debug, Default)]
pub struct SectorTable {
    by_key: HashMap<(String, i32), i32>,
    by_id: HashMap<i32, Sector>,
    next_transient: i32,
}

impl SectorTable {
    /// Register a sector loaded from storage.
    pub fn insert_loaded(&mut self, sector: Sector) {
        self.next_transient = self.next_transient.max(sector.id + 1);
        self.by_key
            .insert(sector_key(&sector.name, sector.grid_id), sector.id);
        self.by_id.insert(sector.id, sector);
    }

    /// Resolve a (name, grid cell) to a sector id, allocating the next
    /// transient id on first sight.
    pub fn resolve(&mut self, name: &str, grid_id: i32) -> i32 {
        let key = sector_key(name, grid_id);
        if let Some(id) = self.by_key.get(&key) {
            return *id;
        }

        let id = self.next_transient.max(1);
        self.next_transient = id + 1;
        self.by_id.insert(
            id,
            Sector {
                id,
                name: name.to_string(),
                grid_id,
            },
        );
        self.by_key.insert(key, id);
        id
    }

    pub fn get(&self, id: i32) -> Option<&Sector> {
        self.by_id.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sector> {
        self.by_id.values()
    }

    /// Next unused id, for the housekeeping register. Always 1 once every
    /// transient id has been renumbered away.
    pub fn next_id(&self) -> i32 {
        self.by_id.keys().max().map_or(1, |max| max + 1).max(1)
    }

    /// Assign phase of the renumbering pass: pick each still-transient
    /// sector's permanent id (name-registry id and grid cell, recoverable),
    /// rewrite the table, and return the transient-to-permanent map for the
    /// caller's system rewrite.
    pub fn renumber(&mut self, registry: &mut SectorNameRegistry) -> HashMap<i32, i32> {
        let mut transient: Vec<Sector> = self
            .by_id
            .values()
            .filter(|s| s.id > 0)
            .cloned()
            .collect();
        transient.sort_by_key(|s| s.name.to_lowercase());

        let mut map = HashMap::with_capacity(transient.len());
        for sector in &transient {
            let name_id = registry.resolve(&sector.name);
            map.insert(sector.id, -(name_id * 10000 + sector.grid_id));
        }

        for sector in transient {
            let permanent = map[&sector.id];
            self.by_id.remove(&sector.id);
            self.by_key
                .insert(sector_key(&sector.name, sector.grid_id), permanent);
            self.by_id.insert(
                permanent,
                Sector {
                    id: permanent,
                    ..sector
                },
            );
        }

        map
    }
}

/// Persistent mapping from exact sector name to a stable small integer id.
/// Grows monotonically; lookups are case-insensitive.
#[derive(Debug, Default)]
pub struct SectorNameRegistry {
    by_name: HashMap<String, (String, i32)>,
    next_id: i32,
}

impl SectorNameRegistry {
    /// Seed an entry with a known id (sidecar load, or recovered from a
    /// permanent sector id). First writer for a name wins.
    pub fn insert(&mut self, id: i32, name: &str) {
        self.next_id = self.next_id.max(id + 1);
        self.by_name
            .entry(name.to_lowercase())
            .or_insert_with(|| (name.to_string(), id));
    }

    /// Look up a name's id, assigning the next free one on a miss.
    pub fn resolve(&mut self, name: &str) -> i32 {
        if let Some((_, id)) = self.by_name.get(&name.to_lowercase()) {
            return *id;
        }
        let id = self.next_id.max(1);
        self.next_id = id + 1;
        self.by_name
            .insert(name.to_lowercase(), (name.to_string(), id));
        id
    }

    /// (id, exact name) pairs in id order, for the sidecar write.
    pub fn entries(&self) -> Vec<(i32, &str)> {
        let mut out: Vec<(i32, &str)> = self
            .by_name
            .values()
            .map(|(name, id)| (*id, name.as_str()))
            .collect();
        out.sort_by_key(|(id, _)| *id);
        out
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}
