//! Vertex clustering ahead of flattening.
//!
//! Vertices are visited in input order. A vertex within the tolerance of an
//! existing cluster center moves onto that center; otherwise it becomes a new
//! center. The result only depends on input order, and no vertex moves further
//! than the tolerance.

use geo::{Coord, LineString, Polygon};
use rstar::RTree;

use crate::geometry::{is_valid_polygon, normalize_ring};

pub struct VertexSnapper {
    tolerance_sq: f64,
    centers: RTree<[f64; 2]>,
    merged: usize,
}

impl VertexSnapper {
    pub fn new(tolerance: f64) -> Self {
        Self {
            tolerance_sq: tolerance * tolerance,
            centers: RTree::new(),
            merged: 0,
        }
    }

    /// Number of vertices moved onto a different existing vertex so far
    pub fn merged_vertices(&self) -> usize {
        self.merged
    }

    pub fn snap(&mut self, coord: Coord<f64>) -> Coord<f64> {
        let query = [coord.x, coord.y];

        if let Some(center) = self.centers.nearest_neighbor(&query) {
            let dx = center[0] - query[0];
            let dy = center[1] - query[1];
            let distance_sq = dx * dx + dy * dy;

            if distance_sq <= self.tolerance_sq {
                if distance_sq > 0.0 {
                    self.merged += 1;
                }
                return Coord {
                    x: center[0],
                    y: center[1],
                };
            }
        }

        self.centers.insert(query);
        coord
    }

    fn snap_ring(&mut self, ring: &LineString<f64>) -> Option<LineString<f64>> {
        // The closing vertex is re-added by normalize_ring
        let open = match ring.0.split_last() {
            Some((_, rest)) if ring.is_closed() && !rest.is_empty() => rest,
            _ => &ring.0[..],
        };
        let coords: Vec<Coord<f64>> = open.iter().map(|&c| self.snap(c)).collect();
        normalize_ring(coords)
    }

    /// Snap every ring of a polygon.
    ///
    /// Returns `None` when the exterior collapses; collapsed holes are dropped.
    pub fn snap_polygon(&mut self, polygon: &Polygon<f64>) -> Option<Polygon<f64>> {
        let exterior = self.snap_ring(polygon.exterior())?;
        let interiors: Vec<LineString<f64>> = polygon
            .interiors()
            .iter()
            .filter_map(|ring| self.snap_ring(ring))
            .collect();

        let snapped = Polygon::new(exterior, interiors);
        is_valid_polygon(&snapped).then_some(snapped)
    }
}
