//! In-memory attribution store.

use std::collections::{BTreeMap, BTreeSet};

use bus_buffers_transit::{StopIdentifier, StopSet};
use geo::Point;

use super::AttributionStore;
use crate::cell::{Cell, CellId, CellStopLink};
use crate::error::StorageError;

#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    stops: BTreeMap<StopIdentifier, Point<f64>>,
    cells: BTreeMap<CellId, Cell>,
    links: BTreeSet<CellStopLink>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop_count(&self) -> usize {
        self.stops.len()
    }

    pub fn cell(&self, cell_id: CellId) -> Option<&Cell> {
        self.cells.get(&cell_id)
    }
}

impl AttributionStore for MemoryStore {
    fn insert_stops(&mut self, stops: &StopSet) -> Result<(), StorageError> {
        self.stops
            .extend(stops.iter().map(|stop| (stop.id.clone(), stop.location)));
        Ok(())
    }

    fn insert_cells(&mut self, cells: &[Cell]) -> Result<(), StorageError> {
        if let Some(cell) = cells.iter().find(|cell| self.cells.contains_key(&cell.id)) {
            return Err(StorageError::DuplicateCell(cell.id.get()));
        }
        self.cells
            .extend(cells.iter().map(|cell| (cell.id, cell.clone())));
        Ok(())
    }

    fn upsert_links(&mut self, rows: &[CellStopLink]) -> Result<(), StorageError> {
        if let Some(row) = rows.iter().find(|row| !self.cells.contains_key(&row.cell_id)) {
            return Err(StorageError::UnknownCell(row.cell_id.get()));
        }
        self.links.extend(rows.iter().cloned());
        Ok(())
    }

    fn links_for_cell(&self, cell_id: CellId) -> Result<BTreeSet<StopIdentifier>, StorageError> {
        Ok(self
            .links
            .iter()
            .filter(|link| link.cell_id == cell_id)
            .map(|link| link.stop_id.clone())
            .collect())
    }

    fn cells_without_links(&self) -> Result<BTreeSet<CellId>, StorageError> {
        let linked: BTreeSet<CellId> = self.links.iter().map(|link| link.cell_id).collect();
        Ok(self
            .cells
            .keys()
            .filter(|id| !linked.contains(id))
            .copied()
            .collect())
    }

    fn cell_ids(&self) -> Result<Vec<CellId>, StorageError> {
        Ok(self.cells.keys().copied().collect())
    }

    fn link_count(&self) -> Result<usize, StorageError> {
        Ok(self.links.len())
    }

    fn purge_cells(&mut self, ids: &BTreeSet<CellId>) -> Result<usize, StorageError> {
        let before = self.cells.len();
        self.cells.retain(|id, _| !ids.contains(id));
        self.links.retain(|link| !ids.contains(&link.cell_id));
        Ok(before - self.cells.len())
    }

    fn renumber_cells(&mut self, mapping: &[(CellId, CellId)]) -> Result<(), StorageError> {
        for &(old, new) in mapping {
            if self.cells.contains_key(&new) {
                return Err(StorageError::DuplicateCell(new.get()));
            }
            let Some(mut cell) = self.cells.remove(&old) else {
                return Err(StorageError::UnknownCell(old.get()));
            };
            cell.id = new;
            self.cells.insert(new, cell);

            let moved: Vec<CellStopLink> = self
                .links
                .iter()
                .filter(|link| link.cell_id == old)
                .cloned()
                .collect();
            for link in moved {
                self.links.remove(&link);
                self.links.insert(CellStopLink::new(new, link.stop_id));
            }
        }
        Ok(())
    }
}
