//! Flattening overlapping service areas into a planar partition.
//!
//! Polygons are snapped to shared vertices and then inserted one at a time.
//! Each insertion splits every face it overlaps into the part inside the new
//! polygon and the part outside, and whatever is left of the new polygon
//! becomes a face of its own. Faces therefore never overlap, and together they
//! cover exactly the union of the snapped inputs.

use geo::algorithm::area::Area;
use geo::{BooleanOps, BoundingRect, MultiPolygon, Polygon, Rect};
use tracing::{debug, info, warn};

use crate::buffer::BufferPolygon;
use crate::cell::{Cell, CellId, DEGENERATE_AREA};
use crate::error::GeometryError;
use crate::geometry::{rects_overlap, try_overlay};
use crate::snap::VertexSnapper;

/// Cells produced by flattening, numbered from [`CellId::FIRST`]
#[derive(Clone, Debug, Default)]
pub struct Partition {
    pub cells: Vec<Cell>,
    pub stats: FlattenStats,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FlattenStats {
    pub input_polygons: usize,
    /// Inputs whose exterior collapsed while snapping
    pub collapsed_polygons: usize,
    pub merged_vertices: usize,
    pub degenerate_cells: usize,
}

/// A region with uniform coverage; may have several disjoint parts
struct Face {
    shape: MultiPolygon<f64>,
    bounds: Rect<f64>,
}

impl Face {
    fn new(shape: MultiPolygon<f64>) -> Option<Self> {
        let bounds = shape.bounding_rect()?;
        Some(Self { shape, bounds })
    }
}

pub struct PolygonFlattener {
    tolerance: f64,
}

impl PolygonFlattener {
    pub fn new(tolerance: f64) -> Self {
        Self { tolerance }
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Flatten buffers that are already in the working plane.
    ///
    /// An empty input yields an empty partition. A non-empty input that leaves
    /// no cell behind is an error.
    pub fn flatten(&self, buffers: &[BufferPolygon]) -> Result<Partition, GeometryError> {
        let mut stats = FlattenStats {
            input_polygons: buffers.len(),
            ..Default::default()
        };

        if buffers.is_empty() {
            debug!("No buffer polygons to flatten");
            return Ok(Partition {
                cells: Vec::new(),
                stats,
            });
        }

        let mut snapper = VertexSnapper::new(self.tolerance);
        let mut faces: Vec<Face> = Vec::new();

        for buffer in buffers {
            let Some(polygon) = snapper.snap_polygon(&buffer.geometry) else {
                warn!(
                    "Buffer for stop {} collapsed at snap tolerance {}",
                    buffer.stop_id, self.tolerance
                );
                stats.collapsed_polygons += 1;
                continue;
            };
            faces = insert_polygon(faces, polygon)?;
        }
        stats.merged_vertices = snapper.merged_vertices();
        debug!(
            "Flattened {} polygons into {} faces ({} vertices snapped)",
            buffers.len(),
            faces.len(),
            stats.merged_vertices
        );

        let mut cells = Vec::new();
        for polygon in faces.into_iter().flat_map(|face| face.shape.0) {
            let cell = Cell::new(CellId::from_position(cells.len()), polygon);
            if cell.is_degenerate() {
                stats.degenerate_cells += 1;
                continue;
            }
            cells.push(cell);
        }

        if cells.is_empty() {
            return Err(GeometryError::EmptyPartition {
                input: buffers.len(),
            });
        }

        if stats.degenerate_cells > 0 {
            warn!("Discarded {} zero-area cells", stats.degenerate_cells);
        }
        info!("Partition has {} cells", cells.len());

        Ok(Partition { cells, stats })
    }
}

/// Split existing faces by `polygon` and add the uncovered remainder as a new face
fn insert_polygon(faces: Vec<Face>, polygon: Polygon<f64>) -> Result<Vec<Face>, GeometryError> {
    let Some(bounds) = polygon.bounding_rect() else {
        return Ok(faces);
    };

    let mut remaining = MultiPolygon::new(vec![polygon]);
    let mut next = Vec::with_capacity(faces.len() + 2);

    for face in faces {
        if remaining.0.is_empty() || !rects_overlap(&face.bounds, &bounds) {
            next.push(face);
            continue;
        }

        let inside = try_overlay("intersection", || face.shape.intersection(&remaining))?;
        if inside.unsigned_area() <= DEGENERATE_AREA {
            // Touching along a boundary only
            next.push(face);
            continue;
        }

        let outside = try_overlay("difference", || face.shape.difference(&remaining))?;
        remaining = try_overlay("difference", || remaining.difference(&face.shape))?;

        next.extend(Face::new(outside));
        next.extend(Face::new(inside));
    }

    next.extend(Face::new(remaining));
    Ok(next)
}
