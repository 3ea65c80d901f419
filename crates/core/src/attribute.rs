//! Attributing partition cells back to the stops that cover them.
//!
//! Every point of a cell has the same coverage by the original buffers, so one
//! interior point per cell is enough. Buffers are looked up through an R-tree
//! of their bounding boxes before the exact point-in-polygon test.

use std::collections::BTreeSet;

use bus_buffers_transit::StopIdentifier;
use geo::{BoundingRect, Intersects, Point, Polygon};
use rstar::{RTree, RTreeObject, AABB};
use tracing::{debug, warn};

use crate::buffer::BufferPolygon;
use crate::cell::{Cell, CellId, CellStopLink};
use crate::geometry::representative_point;

// ============================================================================
// Buffer Spatial Node
// ============================================================================

struct BufferNode {
    stop_id: StopIdentifier,
    geometry: Polygon<f64>,
    envelope: AABB<[f64; 2]>,
}

impl BufferNode {
    fn new(buffer: &BufferPolygon) -> Option<Self> {
        let rect = buffer.geometry.bounding_rect()?;
        Some(Self {
            stop_id: buffer.stop_id.clone(),
            geometry: buffer.geometry.clone(),
            envelope: AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
        })
    }
}

impl RTreeObject for BufferNode {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

// ============================================================================
// Attributor
// ============================================================================

/// Links produced for a partition, plus the cells no buffer covered
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Attribution {
    /// Sorted by cell, then stop
    pub links: Vec<CellStopLink>,
    pub unattributed: Vec<CellId>,
}

pub struct StopAttributor {
    tree: RTree<BufferNode>,
}

impl StopAttributor {
    /// Index the original, unsnapped buffers (in the working plane)
    pub fn new(buffers: &[BufferPolygon]) -> Self {
        let nodes: Vec<BufferNode> = buffers.iter().filter_map(BufferNode::new).collect();
        Self {
            tree: RTree::bulk_load(nodes),
        }
    }

    /// Stops whose buffer contains `point`, boundary included
    pub fn stops_at(&self, point: Point<f64>) -> BTreeSet<StopIdentifier> {
        let query = AABB::from_point([point.x(), point.y()]);
        self.tree
            .locate_in_envelope_intersecting(&query)
            .filter(|node| node.geometry.intersects(&point))
            .map(|node| node.stop_id.clone())
            .collect()
    }

    pub fn attribute(&self, cells: &[Cell]) -> Attribution {
        let mut attribution = Attribution::default();

        for cell in cells {
            let stops = match representative_point(&cell.geometry) {
                Some(point) => self.stops_at(point),
                None => {
                    warn!("Cell {} has no interior point", cell.id);
                    BTreeSet::new()
                }
            };

            if stops.is_empty() {
                attribution.unattributed.push(cell.id);
                continue;
            }

            attribution
                .links
                .extend(stops.into_iter().map(|stop_id| CellStopLink::new(cell.id, stop_id)));
        }

        attribution.links.sort();
        debug!(
            "Attributed {} cells with {} links, {} unattributed",
            cells.len() - attribution.unattributed.len(),
            attribution.links.len(),
            attribution.unattributed.len()
        );

        attribution
    }
}
