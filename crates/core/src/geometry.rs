//! Polygon checks and overlay helpers shared by the flatten and attribute stages.

use std::panic;

use geo::algorithm::area::Area;
use geo::{Centroid, Contains, Coord, InteriorPoint, LineString, MultiPolygon, Point, Polygon, Rect};

use crate::cell::DEGENERATE_AREA;
use crate::error::GeometryError;

/// Explain why a polygon cannot be used as a service area, or `None` if it can
pub fn invalid_reason(poly: &Polygon<f64>) -> Option<String> {
    let exterior = poly.exterior();

    // Must have at least 4 points (3 unique + closing point)
    if exterior.0.len() < 4 {
        return Some(format!("exterior ring has only {} points", exterior.0.len()));
    }

    if distinct_vertices(exterior) < 3 {
        return Some("exterior ring has fewer than 3 distinct vertices".to_string());
    }

    if poly.unsigned_area() <= DEGENERATE_AREA {
        return Some("polygon has zero area".to_string());
    }

    None
}

/// Check if a polygon is valid (basic checks)
pub fn is_valid_polygon(poly: &Polygon<f64>) -> bool {
    invalid_reason(poly).is_none()
}

fn distinct_vertices(ring: &LineString<f64>) -> usize {
    let mut seen: Vec<Coord<f64>> = Vec::with_capacity(ring.0.len());
    for coord in &ring.0 {
        if !seen.contains(coord) {
            seen.push(*coord);
        }
    }
    seen.len()
}

/// Drop repeated consecutive vertices and make sure the ring is closed.
///
/// Returns `None` if fewer than three distinct vertices remain.
pub fn normalize_ring(mut coords: Vec<Coord<f64>>) -> Option<LineString<f64>> {
    coords.dedup();
    if coords.len() > 1 && coords.first() == coords.last() {
        coords.pop();
    }
    if coords.len() < 3 {
        return None;
    }
    coords.push(coords[0]);
    Some(LineString::new(coords))
}

/// Whether two bounding rectangles share any area or boundary
pub fn rects_overlap(a: &Rect<f64>, b: &Rect<f64>) -> bool {
    a.min().x <= b.max().x && b.min().x <= a.max().x && a.min().y <= b.max().y && b.min().y <= a.max().y
}

/// Run a boolean overlay, turning a panic inside the overlay engine into an error
pub fn try_overlay<F>(operation: &str, op: F) -> Result<MultiPolygon<f64>, GeometryError>
where
    F: FnOnce() -> MultiPolygon<f64>,
{
    panic::catch_unwind(panic::AssertUnwindSafe(op)).map_err(|_| {
        tracing::warn!("{} operation panicked", operation);
        GeometryError::OverlayFailed(format!("{} panicked", operation))
    })
}

/// A point strictly inside the polygon.
///
/// Prefers the centroid when it falls in the interior, otherwise falls back to
/// the interior point from a horizontal scan through the polygon. Either
/// candidate is accepted only if it is not on the boundary.
pub fn representative_point(poly: &Polygon<f64>) -> Option<Point<f64>> {
    if let Some(centroid) = poly.centroid() {
        if poly.contains(&centroid) {
            return Some(centroid);
        }
    }

    poly.interior_point().filter(|point| poly.contains(point))
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::BooleanOps;

    fn make_square(x: f64, y: f64, size: f64) -> Polygon<f64> {
        Polygon::new(
            LineString::new(vec![
                Coord { x, y },
                Coord { x: x + size, y },
                Coord {
                    x: x + size,
                    y: y + size,
                },
                Coord { x, y: y + size },
                Coord { x, y },
            ]),
            vec![],
        )
    }

    #[test]
    fn test_is_valid_polygon() {
        let valid = make_square(0.0, 0.0, 1.0);
        assert!(is_valid_polygon(&valid));

        // Too few points
        let invalid = Polygon::new(
            LineString::new(vec![
                Coord { x: 0.0, y: 0.0 },
                Coord { x: 1.0, y: 0.0 },
                Coord { x: 0.0, y: 0.0 },
            ]),
            vec![],
        );
        assert!(!is_valid_polygon(&invalid));

        // Enough points but all on one line
        let flat = Polygon::new(
            LineString::from(vec![(0.0, 0.0), (1.0, 0.0), (2.0, 0.0), (0.0, 0.0)]),
            vec![],
        );
        assert_eq!(invalid_reason(&flat).as_deref(), Some("polygon has zero area"));
    }

    #[test]
    fn test_normalize_ring() {
        let ring = normalize_ring(vec![
            Coord { x: 0.0, y: 0.0 },
            Coord { x: 0.0, y: 0.0 },
            Coord { x: 1.0, y: 0.0 },
            Coord { x: 1.0, y: 1.0 },
        ])
        .unwrap();
        assert_eq!(ring.0.len(), 4);
        assert_eq!(ring.0.first(), ring.0.last());

        let collapsed = normalize_ring(vec![
            Coord { x: 0.0, y: 0.0 },
            Coord { x: 1.0, y: 0.0 },
            Coord { x: 0.0, y: 0.0 },
        ]);
        assert!(collapsed.is_none());
    }

    #[test]
    fn test_rects_overlap() {
        let a = Rect::new(Coord { x: 0.0, y: 0.0 }, Coord { x: 2.0, y: 2.0 });
        let b = Rect::new(Coord { x: 1.0, y: 1.0 }, Coord { x: 3.0, y: 3.0 });
        let c = Rect::new(Coord { x: 5.0, y: 5.0 }, Coord { x: 6.0, y: 6.0 });
        assert!(rects_overlap(&a, &b));
        assert!(!rects_overlap(&a, &c));
    }

    #[test]
    fn test_try_overlay() {
        let a = make_square(0.0, 0.0, 2.0);
        let b = make_square(1.0, 0.0, 2.0);
        let result = try_overlay("intersection", || a.intersection(&b)).unwrap();
        assert_eq!(result.0.len(), 1);
        assert!((result.unsigned_area() - 2.0).abs() < 1e-9);

        let failed = try_overlay("union", || panic!("overlay engine failure"));
        assert!(matches!(failed, Err(GeometryError::OverlayFailed(_))));
    }

    #[test]
    fn test_representative_point_is_interior() {
        let square = make_square(0.0, 0.0, 10.0);
        assert_eq!(representative_point(&square), Some(Point::new(5.0, 5.0)));

        // U shape: the centroid falls in the notch, outside the polygon
        let u_shape = Polygon::new(
            LineString::from(vec![
                (0.0, 0.0),
                (30.0, 0.0),
                (30.0, 30.0),
                (20.0, 30.0),
                (20.0, 5.0),
                (10.0, 5.0),
                (10.0, 30.0),
                (0.0, 30.0),
                (0.0, 0.0),
            ]),
            vec![],
        );
        let centroid = u_shape.centroid().unwrap();
        assert!(!u_shape.contains(&centroid));

        let point = representative_point(&u_shape).unwrap();
        assert!(u_shape.contains(&point));
    }
}
