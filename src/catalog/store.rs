//! Shard stores: one SQLite file per selector, each holding its own copy of
//! sectors, names, systems, and permit flags restricted to its membership.

use crate::catalog::sector::Sector;
use crate::catalog::shards::{self, ShardSelector};
use crate::catalog::state::{CatalogState, SystemEntry};
use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, params};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

pub const SCHEMA_VERSION: i64 = 200;
pub const DATA_SOURCE: &str = "systemsWithCoordinates";

pub fn store_path(base_dir: &Path, shard_name: &str) -> PathBuf {
    base_dir.join(format!("starcat-{shard_name}.sqlite"))
}

pub fn open(base_dir: &Path, shard_name: &str) -> Result<Connection> {
    let path = store_path(base_dir, shard_name);
    Connection::open(&path).with_context(|| format!("failed to open {}", path.display()))
}

/// Create tables and the init-time registers. Idempotent.
pub fn init(conn: &Connection, shard: &ShardSelector) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS Register (
            ID TEXT PRIMARY KEY NOT NULL,
            ValueInt INTEGER,
            ValueDouble DOUBLE,
            ValueString TEXT,
            ValueBlob BLOB
        );
        CREATE TABLE IF NOT EXISTS Sectors (
            id INTEGER PRIMARY KEY NOT NULL,
            gridid INTEGER,
            Name TEXT NOT NULL COLLATE NOCASE
        );
        CREATE TABLE IF NOT EXISTS Systems (
            address INTEGER PRIMARY KEY NOT NULL,
            sectorid INTEGER,
            nameid INTEGER,
            x INTEGER,
            y INTEGER,
            z INTEGER,
            info INTEGER
        );
        CREATE TABLE IF NOT EXISTS Names (
            id INTEGER PRIMARY KEY NOT NULL,
            Name TEXT NOT NULL COLLATE NOCASE
        );
        CREATE TABLE IF NOT EXISTS PermitSystems (
            address INTEGER PRIMARY KEY NOT NULL
        );
        "#,
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO Register (ID, ValueInt) VALUES ('SchemaVersion', ?1)",
        params![SCHEMA_VERSION],
    )?;
    conn.execute(
        "INSERT OR IGNORE INTO Register (ID, ValueString) VALUES ('DataSource', ?1)",
        params![DATA_SOURCE],
    )?;
    conn.execute(
        "INSERT OR IGNORE INTO Register (ID, ValueString) VALUES ('GridIds', ?1)",
        params![shard.describe()],
    )?;

    Ok(())
}

/// Load the persisted catalog into memory: sectors (seeding the name
/// registry from permanent ids), catalogued names plus their as-persisted
/// shadow, systems, and the permit set.
pub fn load_state(conn: &Connection, state: &mut CatalogState) -> Result<()> {
    let mut stmt = conn.prepare("SELECT id, Name, gridid FROM Sectors")?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let sector = Sector {
            id: row.get(0)?,
            name: row.get(1)?,
            grid_id: row.get(2)?,
        };
        if sector.id < 0 {
            state
                .sector_names
                .insert(-sector.id / 10000, &sector.name);
        }
        state.sectors.insert_loaded(sector);
    }
    drop(rows);
    drop(stmt);

    let mut stmt = conn.prepare("SELECT id, Name FROM Names")?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let id: i64 = row.get(0)?;
        let name: String = row.get(1)?;
        state.names.insert(id, name.clone());
        state.orig_names.insert(id, name);
    }
    drop(rows);
    drop(stmt);

    let mut stmt = conn.prepare("SELECT address, sectorid, nameid, x, y, z, info FROM Systems")?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let entry = SystemEntry {
            address: row.get(0)?,
            sector_id: row.get(1)?,
            name_id: row.get(2)?,
            x: row.get(3)?,
            y: row.get(4)?,
            z: row.get(5)?,
            info: row.get::<_, Option<i32>>(6)?.unwrap_or(0),
        };
        state.systems.insert(entry.address, entry);
    }
    drop(rows);
    drop(stmt);

    let mut stmt = conn.prepare("SELECT address FROM PermitSystems")?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        state.permits.insert(row.get(0)?);
    }

    Ok(())
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ShardWriteStats {
    pub sectors: usize,
    pub names: usize,
    pub systems: usize,
    pub deleted_systems: usize,
    pub permits: usize,
}

/// Materialize the accumulated (already renumbered) state into one shard's
/// store, inside a single transaction. A failure aborts the whole shard;
/// other shards are unaffected.
pub fn write_shard(
    conn: &mut Connection,
    shard: &ShardSelector,
    state: &CatalogState,
) -> Result<ShardWriteStats> {
    let cells = shard.cell_set(state);
    let members = shards::member_addresses(state, &cells);
    let mut stats = ShardWriteStats::default();

    let tx = conn.transaction()?;

    {
        // 1. Sectors not yet present in this store whose cell is in-shard.
        let mut present = HashSet::new();
        let mut stmt = tx.prepare("SELECT id FROM Sectors")?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            present.insert(row.get::<_, i32>(0)?);
        }
        drop(rows);
        drop(stmt);

        let mut insert =
            tx.prepare("INSERT INTO Sectors (id, Name, gridid) VALUES (?1, ?2, ?3)")?;
        for sector in state.sectors.iter() {
            if cells.contains(&sector.grid_id) && !present.contains(&sector.id) {
                insert.execute(params![sector.id, sector.name, sector.grid_id])?;
                stats.sectors += 1;
            }
        }

        // 2. Name literals: upsert in-shard rows that differ from the
        //    as-persisted shadow, delete rows that fell out of shard.
        let mut upsert = tx.prepare("INSERT OR REPLACE INTO Names (id, Name) VALUES (?1, ?2)")?;
        let mut delete = tx.prepare("DELETE FROM Names WHERE id = ?1")?;
        for (address, name) in &state.names {
            if members.contains(address) {
                if state.orig_names.get(address) != Some(name) {
                    upsert.execute(params![address, name])?;
                    stats.names += 1;
                }
            } else {
                delete.execute(params![address])?;
            }
        }

        // 3. Next-sector-id housekeeping register.
        tx.execute(
            "INSERT OR REPLACE INTO Register (ID, ValueInt) VALUES ('NextSectorId', ?1)",
            params![state.sectors.next_id()],
        )?;

        // 4/5. System rows: upsert added and updated members, delete
        //      updated entries that fell out of shard.
        let mut upsert = tx.prepare(
            "INSERT OR REPLACE INTO Systems (address, sectorid, nameid, x, y, z, info) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;
        let mut delete = tx.prepare("DELETE FROM Systems WHERE address = ?1")?;

        for address in state.added.iter().chain(state.updated.iter()) {
            let Some(sys) = state.systems.get(address) else {
                continue;
            };
            if members.contains(address) {
                let info = (sys.info != 0).then_some(sys.info);
                upsert.execute(params![
                    sys.address,
                    sys.sector_id,
                    sys.name_id,
                    sys.x,
                    sys.y,
                    sys.z,
                    info
                ])?;
                stats.systems += 1;
            } else if state.updated.contains(address) {
                delete.execute(params![address])?;
                stats.deleted_systems += 1;
            }
        }

        // 6. Permit deltas; the set is small and address-keyed, no shard
        //    filtering needed.
        let mut add = tx.prepare("INSERT OR REPLACE INTO PermitSystems (address) VALUES (?1)")?;
        let mut del = tx.prepare("DELETE FROM PermitSystems WHERE address = ?1")?;
        for address in &state.add_permits {
            add.execute(params![address])?;
            stats.permits += 1;
        }
        for address in &state.del_permits {
            del.execute(params![address])?;
        }

        // 7. Supporting indexes, idempotent.
        tx.execute_batch(
            r#"
            CREATE INDEX IF NOT EXISTS SystemsSectorName ON Systems (sectorid, nameid);
            CREATE INDEX IF NOT EXISTS SystemsXZY ON Systems (x, z, y);
            CREATE INDEX IF NOT EXISTS NamesName ON Names (Name);
            CREATE INDEX IF NOT EXISTS SectorName ON Sectors (Name);
            CREATE INDEX IF NOT EXISTS SectorGridId ON Sectors (gridid);
            "#,
        )?;

        // 8. Most recent timestamp observed this run.
        if let Some(ts) = state.last_timestamp {
            tx.execute(
                "INSERT OR REPLACE INTO Register (ID, ValueString) VALUES ('LastDumpTimestamp', ?1)",
                params![ts.format("%Y-%m-%dT%H:%M:%S").to_string()],
            )?;
        }
    }

    tx.commit()?;
    Ok(stats)
}

/// Read a register value, for housekeeping checks and tests.
pub fn register_string(conn: &Connection, key: &str) -> Result<Option<String>> {
    Ok(conn
        .query_row(
            "SELECT ValueString FROM Register WHERE ID = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()?)
}

#[cfg(test)]
mod tests {
    use super::{init, load_state, register_string, write_shard};
    use crate::catalog::pipeline::{PipelineOptions, ingest};
    use crate::catalog::shards::SHARDS;
    use crate::catalog::state::CatalogState;
    use rusqlite::Connection;

    const DUMP: &str = concat!(
        r#"{"id64":201,"name":"Cephei Sector ZZ-Z b1-2","coords":{"x":10.0,"y":0.0,"z":-5.0},"date":"2021-01-01 00:00:00"},"#,
        "\n",
        r#"{"id64":202,"name":"HD 12345","coords":{"x":21500.0,"y":1.0,"z":22000.0},"date":"2021-06-01 00:00:00","needsPermit":true},"#,
        "\n",
    );

    fn ingested_state() -> CatalogState {
        let mut state = CatalogState::default();
        ingest(DUMP.as_bytes(), &mut state, &PipelineOptions::default()).expect("ingest");
        state.renumber_sectors();
        state
    }

    #[test]
    fn written_all_store_reloads_to_the_same_state() {
        let mut conn = Connection::open_in_memory().expect("open");
        init(&conn, &SHARDS[0]).expect("init");

        let state = ingested_state();
        let stats = write_shard(&mut conn, &SHARDS[0], &state).expect("write");
        assert_eq!(stats.systems, 2);
        assert_eq!(stats.sectors, 2);
        assert_eq!(stats.permits, 1);

        let mut reloaded = CatalogState::default();
        load_state(&conn, &mut reloaded).expect("load");
        assert_eq!(reloaded.systems.len(), 2);
        assert_eq!(reloaded.systems[&201], state.systems[&201]);
        assert_eq!(
            reloaded.names.get(&202).map(String::as_str),
            Some("12345")
        );
        assert!(reloaded.permits.contains(&202));
        assert_eq!(
            register_string(&conn, "LastDumpTimestamp").expect("register"),
            Some("2021-06-01T00:00:00".to_string())
        );
    }

    #[test]
    fn bubble_shard_excludes_out_of_cell_systems() {
        let mut conn = Connection::open_in_memory().expect("open");
        let bubble = &SHARDS[1];
        init(&conn, bubble).expect("init");

        let state = ingested_state();
        let stats = write_shard(&mut conn, bubble, &state).expect("write");
        assert_eq!(stats.systems, 1);

        // partition correctness: every persisted system's sector cell is
        // in the shard's configured set
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM Systems s JOIN Sectors sec ON s.sectorid = sec.id \
                 WHERE sec.gridid NOT IN (810)",
                [],
                |row| row.get(0),
            )
            .expect("query");
        assert_eq!(count, 0);
        assert_eq!(
            register_string(&conn, "GridIds").expect("register"),
            Some("810".to_string())
        );
    }

    #[test]
    fn second_write_of_unchanged_state_writes_no_rows() {
        let mut conn = Connection::open_in_memory().expect("open");
        init(&conn, &SHARDS[0]).expect("init");

        let state = ingested_state();
        write_shard(&mut conn, &SHARDS[0], &state).expect("first write");

        // reload as the next run would, then ingest the same dump again
        let mut next = CatalogState::default();
        load_state(&conn, &mut next).expect("load");
        ingest(DUMP.as_bytes(), &mut next, &PipelineOptions::default()).expect("ingest");
        next.renumber_sectors();

        let stats = write_shard(&mut conn, &SHARDS[0], &next).expect("second write");
        assert_eq!(stats.sectors, 0);
        assert_eq!(stats.names, 0);
        assert_eq!(stats.systems, 0);
        assert_eq!(stats.deleted_systems, 0);
        assert_eq!(stats.permits, 0);
    }

    #[test]
    fn updated_system_leaving_the_shard_cell_is_deleted() {
        let mut conn = Connection::open_in_memory().expect("open");
        let bubble = &SHARDS[1];
        init(&conn, bubble).expect("init");

        let state = ingested_state();
        let stats = write_shard(&mut conn, bubble, &state).expect("first write");
        assert_eq!(stats.systems, 1);

        // next run sees 201 at coordinates far outside the shard's cell
        const MOVED: &str = concat!(
            r#"{"id64":201,"name":"Cephei Sector ZZ-Z b1-2","coords":{"x":21500.0,"y":0.0,"z":22000.0},"date":"2021-07-01 00:00:00"},"#,
            "\n",
        );
        let mut next = CatalogState::default();
        load_state(&conn, &mut next).expect("load");
        ingest(MOVED.as_bytes(), &mut next, &PipelineOptions::default()).expect("ingest");
        next.renumber_sectors();
        assert!(next.updated.contains(&201));

        let stats = write_shard(&mut conn, bubble, &next).expect("second write");
        assert_eq!(stats.systems, 0);
        assert_eq!(stats.deleted_systems, 1);

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM Systems WHERE address = 201", [], |row| {
                row.get(0)
            })
            .expect("query");
        assert_eq!(count, 0);
    }

    #[test]
    fn sector_ids_are_permanent_across_runs() {
        let mut conn = Connection::open_in_memory().expect("open");
        init(&conn, &SHARDS[0]).expect("init");

        let state = ingested_state();
        write_shard(&mut conn, &SHARDS[0], &state).expect("write");
        let first_id = state.systems[&201].sector_id;
        assert!(first_id < 0);

        let mut next = CatalogState::default();
        load_state(&conn, &mut next).expect("load");
        ingest(DUMP.as_bytes(), &mut next, &PipelineOptions::default()).expect("ingest");
        next.renumber_sectors();
        assert_eq!(next.systems[&201].sector_id, first_id);
    }
}
