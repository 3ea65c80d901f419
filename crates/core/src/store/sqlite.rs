//! SQLite attribution store.
//!
//! A run writes inside a single transaction opened by [`SqliteStore::begin_run`].
//! Committing makes the whole run visible at once; dropping the [`SqliteRun`]
//! without committing rolls everything back.

use std::collections::BTreeSet;
use std::path::Path;

use bus_buffers_transit::{StopIdentifier, StopSet};
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use tracing::debug;

use super::AttributionStore;
use crate::cell::{Cell, CellId, CellStopLink};
use crate::encoding::polygon_to_json;
use crate::error::StorageError;

const SCHEMA: &str = "
DROP TABLE IF EXISTS cell_stops;
DROP TABLE IF EXISTS cells;
DROP TABLE IF EXISTS stops;

CREATE TABLE stops (
    stop_id TEXT PRIMARY KEY,
    x REAL NOT NULL,
    y REAL NOT NULL
);

CREATE TABLE cells (
    cell_id INTEGER PRIMARY KEY,
    area REAL NOT NULL,
    geometry TEXT NOT NULL,
    num_trips INTEGER,
    num_trips_per_hr REAL,
    num_stops_in_range INTEGER,
    max_wait_time REAL
);

CREATE TABLE cell_stops (
    cell_id INTEGER NOT NULL REFERENCES cells(cell_id) ON DELETE CASCADE ON UPDATE CASCADE,
    stop_id TEXT NOT NULL,
    PRIMARY KEY (cell_id, stop_id)
);

CREATE INDEX cell_stops_stop_id ON cell_stops (stop_id);
";

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        Self::from_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StorageError> {
        // Must be set outside a transaction to take effect
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self { conn })
    }

    /// Start a run, replacing whatever a previous run stored
    pub fn begin_run(&mut self) -> Result<SqliteRun<'_>, StorageError> {
        let tx = self.conn.transaction()?;
        tx.execute_batch(SCHEMA)?;
        Ok(SqliteRun { tx })
    }

    pub fn links_for_cell(&self, cell_id: CellId) -> Result<BTreeSet<StopIdentifier>, StorageError> {
        links_for_cell(&self.conn, cell_id)
    }

    pub fn cells_without_links(&self) -> Result<BTreeSet<CellId>, StorageError> {
        cells_without_links(&self.conn)
    }

    pub fn cell_ids(&self) -> Result<Vec<CellId>, StorageError> {
        cell_ids(&self.conn)
    }

    pub fn link_count(&self) -> Result<usize, StorageError> {
        link_count(&self.conn)
    }

    /// Stored area of a cell, if present
    pub fn cell_area(&self, cell_id: CellId) -> Result<Option<f64>, StorageError> {
        Ok(self
            .conn
            .query_row(
                "SELECT area FROM cells WHERE cell_id = ?1",
                params![cell_id.get()],
                |row| row.get(0),
            )
            .optional()?)
    }
}

/// An open run; see [`SqliteStore::begin_run`]
pub struct SqliteRun<'conn> {
    tx: Transaction<'conn>,
}

impl SqliteRun<'_> {
    pub fn commit(self) -> Result<(), StorageError> {
        self.tx.commit()?;
        debug!("Committed attribution store run");
        Ok(())
    }
}

impl AttributionStore for SqliteRun<'_> {
    fn insert_stops(&mut self, stops: &StopSet) -> Result<(), StorageError> {
        let mut stmt = self
            .tx
            .prepare_cached("INSERT INTO stops (stop_id, x, y) VALUES (?1, ?2, ?3)")?;
        for stop in stops {
            stmt.execute(params![stop.id.as_str(), stop.location.x(), stop.location.y()])?;
        }
        Ok(())
    }

    fn insert_cells(&mut self, cells: &[Cell]) -> Result<(), StorageError> {
        let mut stmt = self
            .tx
            .prepare_cached("INSERT INTO cells (cell_id, area, geometry) VALUES (?1, ?2, ?3)")?;
        for cell in cells {
            stmt.execute(params![cell.id.get(), cell.area, polygon_to_json(&cell.geometry)?])?;
        }
        Ok(())
    }

    fn upsert_links(&mut self, rows: &[CellStopLink]) -> Result<(), StorageError> {
        let mut stmt = self
            .tx
            .prepare_cached("INSERT OR IGNORE INTO cell_stops (cell_id, stop_id) VALUES (?1, ?2)")?;
        for row in rows {
            stmt.execute(params![row.cell_id.get(), row.stop_id.as_str()])?;
        }
        Ok(())
    }

    fn links_for_cell(&self, cell_id: CellId) -> Result<BTreeSet<StopIdentifier>, StorageError> {
        links_for_cell(&self.tx, cell_id)
    }

    fn cells_without_links(&self) -> Result<BTreeSet<CellId>, StorageError> {
        cells_without_links(&self.tx)
    }

    fn cell_ids(&self) -> Result<Vec<CellId>, StorageError> {
        cell_ids(&self.tx)
    }

    fn link_count(&self) -> Result<usize, StorageError> {
        link_count(&self.tx)
    }

    fn purge_cells(&mut self, ids: &BTreeSet<CellId>) -> Result<usize, StorageError> {
        let mut stmt = self.tx.prepare_cached("DELETE FROM cells WHERE cell_id = ?1")?;
        let mut removed = 0;
        for id in ids {
            removed += stmt.execute(params![id.get()])?;
        }
        Ok(removed)
    }

    fn renumber_cells(&mut self, mapping: &[(CellId, CellId)]) -> Result<(), StorageError> {
        // Links follow through ON UPDATE CASCADE
        let mut stmt = self
            .tx
            .prepare_cached("UPDATE cells SET cell_id = ?1 WHERE cell_id = ?2")?;
        for &(old, new) in mapping {
            if stmt.execute(params![new.get(), old.get()])? == 0 {
                return Err(StorageError::UnknownCell(old.get()));
            }
        }
        Ok(())
    }
}

// ============================================================================
// Queries shared by the store and an open run
// ============================================================================

fn links_for_cell(conn: &Connection, cell_id: CellId) -> Result<BTreeSet<StopIdentifier>, StorageError> {
    let mut stmt = conn.prepare_cached("SELECT stop_id FROM cell_stops WHERE cell_id = ?1")?;
    let rows = stmt.query_map(params![cell_id.get()], |row| row.get::<_, String>(0))?;

    let mut stops = BTreeSet::new();
    for row in rows {
        stops.insert(StopIdentifier::new(row?));
    }
    Ok(stops)
}

fn cells_without_links(conn: &Connection) -> Result<BTreeSet<CellId>, StorageError> {
    let mut stmt = conn.prepare_cached(
        "SELECT cell_id FROM cells
         WHERE NOT EXISTS (SELECT 1 FROM cell_stops WHERE cell_stops.cell_id = cells.cell_id)",
    )?;
    let rows = stmt.query_map([], |row| row.get::<_, u32>(0))?;

    let mut ids = BTreeSet::new();
    for row in rows {
        ids.insert(CellId::new(row?));
    }
    Ok(ids)
}

fn cell_ids(conn: &Connection) -> Result<Vec<CellId>, StorageError> {
    let mut stmt = conn.prepare_cached("SELECT cell_id FROM cells ORDER BY cell_id")?;
    let rows = stmt.query_map([], |row| row.get::<_, u32>(0))?;

    let mut ids = Vec::new();
    for row in rows {
        ids.push(CellId::new(row?));
    }
    Ok(ids)
}

fn link_count(conn: &Connection) -> Result<usize, StorageError> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM cell_stops", [], |row| row.get(0))?;
    Ok(count as usize)
}
