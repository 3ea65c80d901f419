//! Partition cells and their stop links.

use std::fmt;

use bus_buffers_transit::StopIdentifier;
use geo::{Area, Polygon};

/// Area at or below which a cell counts as degenerate, in square working units
pub const DEGENERATE_AREA: f64 = 1e-9;

/// Sequential identifier of a partition cell, starting at 1
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellId(u32);

impl CellId {
    pub const FIRST: CellId = CellId(1);

    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Identifier of the cell at `position` (0-based) in an output collection
    pub fn from_position(position: usize) -> Self {
        Self(position as u32 + 1)
    }

    pub fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One region of the flattened partition
#[derive(Clone, Debug, PartialEq)]
pub struct Cell {
    pub id: CellId,
    pub geometry: Polygon<f64>,
    pub area: f64,
}

impl Cell {
    pub fn new(id: CellId, geometry: Polygon<f64>) -> Self {
        let area = geometry.unsigned_area();
        Self { id, geometry, area }
    }

    pub fn is_degenerate(&self) -> bool {
        !(self.area > DEGENERATE_AREA)
    }
}

/// One (cell, contributing stop) pair
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellStopLink {
    pub cell_id: CellId,
    pub stop_id: StopIdentifier,
}

impl CellStopLink {
    pub fn new(cell_id: CellId, stop_id: StopIdentifier) -> Self {
        Self { cell_id, stop_id }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::LineString;

    #[test]
    fn test_cell_area_and_degeneracy() {
        let square = Polygon::new(
            LineString::from(vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0), (0.0, 0.0)]),
            vec![],
        );
        let cell = Cell::new(CellId::FIRST, square);
        assert_eq!(cell.area, 100.0);
        assert!(!cell.is_degenerate());

        let line = Polygon::new(
            LineString::from(vec![(0.0, 0.0), (10.0, 0.0), (20.0, 0.0), (0.0, 0.0)]),
            vec![],
        );
        assert!(Cell::new(CellId::new(2), line).is_degenerate());
    }

    #[test]
    fn test_cell_id_positions() {
        assert_eq!(CellId::from_position(0), CellId::FIRST);
        assert_eq!(CellId::from_position(4).get(), 5);
        assert_eq!(CellId::new(7).to_string(), "7");
    }
}
