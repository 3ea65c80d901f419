//! Purging unusable cells and re-deriving dense identifiers.
//!
//! A cell is purged when it has zero area or when the store holds no link for
//! it. Survivors are renumbered by position so that `cell_id` runs 1..=n with
//! no gaps. Running cleanup again on its own output changes nothing.

use std::collections::BTreeSet;

use itertools::Itertools;
use tracing::{debug, warn};

use crate::cell::{Cell, CellId};
use crate::error::StorageError;
use crate::store::AttributionStore;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub degenerate: usize,
    pub unattributed: usize,
    pub renumbered: usize,
}

/// Remove degenerate and unattributed cells from `cells` and `store`, then
/// renumber the rest.
///
/// `store` must already hold `cells` and their links.
pub fn clean_partition<S: AttributionStore + ?Sized>(
    cells: Vec<Cell>,
    store: &mut S,
) -> Result<(Vec<Cell>, CleanupReport), StorageError> {
    let mut report = CleanupReport::default();

    let degenerate: BTreeSet<CellId> = cells
        .iter()
        .filter(|cell| cell.is_degenerate())
        .map(|cell| cell.id)
        .collect();
    let unattributed: BTreeSet<CellId> = store
        .cells_without_links()?
        .into_iter()
        .filter(|id| !degenerate.contains(id))
        .collect();
    report.degenerate = degenerate.len();
    report.unattributed = unattributed.len();

    let purge: BTreeSet<CellId> = degenerate.union(&unattributed).copied().collect();
    if !purge.is_empty() {
        warn!(
            "Purging {} cells ({} zero-area, {} without stops)",
            purge.len(),
            report.degenerate,
            report.unattributed
        );
        store.purge_cells(&purge)?;
    }

    // Ascending old ids keep every rename target free when it is applied
    let mut cells: Vec<Cell> = cells
        .into_iter()
        .filter(|cell| !purge.contains(&cell.id))
        .sorted_by_key(|cell| cell.id)
        .collect();
    let mut mapping = Vec::new();
    for (position, cell) in cells.iter_mut().enumerate() {
        let id = CellId::from_position(position);
        if cell.id != id {
            mapping.push((cell.id, id));
            cell.id = id;
        }
    }
    report.renumbered = mapping.len();
    store.renumber_cells(&mapping)?;

    debug!(
        "Cleanup kept {} cells, renumbered {}",
        cells.len(),
        report.renumbered
    );
    Ok((cells, report))
}
