//! Storage for the cell → stop relation.
//!
//! Stages receive the store as an explicit `&mut` handle. A store is written
//! once per run: links are only ever inserted, cleanup may delete and renumber
//! cells, and nothing else mutates it.

pub mod memory;
pub mod sqlite;

use std::collections::BTreeSet;

use bus_buffers_transit::{StopIdentifier, StopSet};

use crate::cell::{Cell, CellId, CellStopLink};
use crate::error::StorageError;

pub use memory::MemoryStore;
pub use sqlite::{SqliteRun, SqliteStore};

pub trait AttributionStore {
    /// Record the stop set the run was computed from
    fn insert_stops(&mut self, stops: &StopSet) -> Result<(), StorageError>;

    fn insert_cells(&mut self, cells: &[Cell]) -> Result<(), StorageError>;

    /// Bulk insert links. Rows already present are left as they are.
    fn upsert_links(&mut self, rows: &[CellStopLink]) -> Result<(), StorageError>;

    fn links_for_cell(&self, cell_id: CellId) -> Result<BTreeSet<StopIdentifier>, StorageError>;

    /// Cells that have no link at all
    fn cells_without_links(&self) -> Result<BTreeSet<CellId>, StorageError>;

    /// All stored cell identifiers, ascending
    fn cell_ids(&self) -> Result<Vec<CellId>, StorageError>;

    fn link_count(&self) -> Result<usize, StorageError>;

    /// Delete cells together with their links; returns how many cells were removed
    fn purge_cells(&mut self, ids: &BTreeSet<CellId>) -> Result<usize, StorageError>;

    /// Move cells (and their links) from old to new identifiers.
    ///
    /// Pairs are applied in order; each target must be free when it is applied.
    fn renumber_cells(&mut self, mapping: &[(CellId, CellId)]) -> Result<(), StorageError>;
}
