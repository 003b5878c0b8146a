//! Fixed shard selectors: named, overlapping views over the grid.

use crate::catalog::state::CatalogState;
use std::collections::HashSet;

/// A named output partition: either every grid cell currently in use, or an
/// explicit cell list.
#[derive(Debug, Clone, Copy)]
pub struct ShardSelector {
    pub name: &'static str,
    /// `None` is the "all grid cells" sentinel.
    pub grid_ids: Option<&'static [i32]>,
}

const BUBBLE: &[i32] = &[810];

const EXTENDED_BUBBLE: &[i32] = &[
    608, 609, 610, 611, 612, 708, 709, 710, 711, 712, 808, 809, 810, 811, 812, 908, 909, 910, 911,
    912, 1008, 1009, 1010, 1011, 1012,
];

const BUBBLE_COLONIA: &[i32] = &[
    608, 609, 610, 611, 612, 708, 709, 710, 711, 712, 808, 809, 810, 811, 812, 908, 909, 910, 911,
    912, 1008, 1009, 1010, 1011, 1012, 1108, 1109, 1110, 1207, 1208, 1209, 1306, 1307, 1308, 1405,
    1406, 1407, 1504, 1505, 1603, 1604, 1703,
];

pub const SHARDS: [ShardSelector; 4] = [
    ShardSelector {
        name: "All",
        grid_ids: None,
    },
    ShardSelector {
        name: "Bubble",
        grid_ids: Some(BUBBLE),
    },
    ShardSelector {
        name: "ExtendedBubble",
        grid_ids: Some(EXTENDED_BUBBLE),
    },
    ShardSelector {
        name: "BubbleColonia",
        grid_ids: Some(BUBBLE_COLONIA),
    },
];

impl ShardSelector {
    /// Filter description persisted in the store's register table.
    pub fn describe(&self) -> String {
        match self.grid_ids {
            None => "All".to_string(),
            Some(ids) => ids
                .iter()
                .map(|id| id.to_string())
                .collect::<Vec<_>>()
                .join(","),
        }
    }

    /// The shard's concrete cell set: the configured list, or every cell a
    /// known sector occupies for the "all" sentinel.
    pub fn cell_set(&self, state: &CatalogState) -> HashSet<i32> {
        match self.grid_ids {
            Some(ids) => ids.iter().copied().collect(),
            None => state.sectors.iter().map(|s| s.grid_id).collect(),
        }
    }
}

/// Addresses of systems whose sector's grid cell is in `cells`.
pub fn member_addresses(state: &CatalogState, cells: &HashSet<i32>) -> HashSet<i64> {
    state
        .systems
        .values()
        .filter(|sys| {
            state
                .sectors
                .get(sys.sector_id)
                .is_some_and(|sector| cells.contains(&sector.grid_id))
        })
        .map(|sys| sys.address)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{SHARDS, member_addresses};
    use crate::catalog::state::{CatalogState, SystemEntry};

    fn seed(state: &mut CatalogState, address: i64, sector_name: &str, grid_id: i32) {
        let sector_id = state.sectors.resolve(sector_name, grid_id);
        state.observe(SystemEntry {
            address,
            sector_id,
            name_id: 0,
            x: 0,
            y: 0,
            z: 0,
            info: 0,
        });
    }

    #[test]
    fn bubble_shard_only_keeps_core_cell_members() {
        let mut state = CatalogState::default();
        seed(&mut state, 1, "Core Sector", 810);
        seed(&mut state, 2, "Rim Sector", 1703);

        let bubble = SHARDS.iter().find(|s| s.name == "Bubble").unwrap();
        let members = member_addresses(&state, &bubble.cell_set(&state));
        assert!(members.contains(&1));
        assert!(!members.contains(&2));
    }

    #[test]
    fn all_sentinel_covers_every_cell_in_use() {
        let mut state = CatalogState::default();
        seed(&mut state, 1, "Core Sector", 810);
        seed(&mut state, 2, "Odd Sector", 42);

        let all = &SHARDS[0];
        assert!(all.grid_ids.is_none());
        let members = member_addresses(&state, &all.cell_set(&state));
        assert_eq!(members.len(), 2);
    }

    #[test]
    fn describe_lists_cells_or_sentinel() {
        assert_eq!(SHARDS[0].describe(), "All");
        assert_eq!(SHARDS[1].describe(), "810");
    }
}
