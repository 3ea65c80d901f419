//! Equal-area working projections.
//!
//! Flattening merges vertices closer than a fixed distance, so it has to run in
//! a plane where a unit means the same thing everywhere. Both supported
//! projections are the ellipsoidal Lambert cylindrical equal-area projection on
//! WGS84, differing only in their standard parallel.

use std::fmt;

use geo::{Coord, LineString, Point, Polygon};
use serde::{Deserialize, Serialize};

use crate::error::SetupError;

// WGS84 ellipsoid
const SEMI_MAJOR_AXIS: f64 = 6_378_137.0;
const FLATTENING: f64 = 1.0 / 298.257_223_563;

// ============================================================================
// Projection selection
// ============================================================================

/// Equal-area projection that flattening runs in
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum WorkingProjection {
    /// ESRI:54034, standard parallel 0°
    #[default]
    WorldCylindricalEqualArea,
    /// EPSG:6933 (NSIDC EASE-Grid 2.0 Global), standard parallel 30°
    EaseGrid2Global,
}

impl WorkingProjection {
    pub fn from_code(code: &str) -> Result<Self, SetupError> {
        match code.trim().to_ascii_uppercase().as_str() {
            "ESRI:54034" | "54034" => Ok(Self::WorldCylindricalEqualArea),
            "EPSG:6933" | "6933" => Ok(Self::EaseGrid2Global),
            _ => Err(SetupError::UnsupportedProjection(code.to_string())),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::WorldCylindricalEqualArea => "ESRI:54034",
            Self::EaseGrid2Global => "EPSG:6933",
        }
    }

    fn standard_parallel_deg(&self) -> f64 {
        match self {
            Self::WorldCylindricalEqualArea => 0.0,
            Self::EaseGrid2Global => 30.0,
        }
    }
}

impl fmt::Display for WorkingProjection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl TryFrom<String> for WorkingProjection {
    type Error = SetupError;

    fn try_from(code: String) -> Result<Self, Self::Error> {
        Self::from_code(&code)
    }
}

impl From<WorkingProjection> for String {
    fn from(projection: WorkingProjection) -> Self {
        projection.code().to_string()
    }
}

/// Reference system of the stop locations and buffer polygons handed to a run
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputCrs {
    /// WGS84 longitude/latitude in degrees
    #[default]
    Geographic,
    /// Already planar in the working projection
    Working,
}

// ============================================================================
// Projector
// ============================================================================

/// Moves geometry between the input reference system and the working plane
#[derive(Clone, Debug)]
pub struct Projector {
    projection: WorkingProjection,
    input: InputCrs,
    e: f64,
    e2: f64,
    k0: f64,
    qp: f64,
}

impl Projector {
    pub fn new(projection: WorkingProjection, input: InputCrs) -> Self {
        let e2 = FLATTENING * (2.0 - FLATTENING);
        let e = e2.sqrt();
        let phi_s = projection.standard_parallel_deg().to_radians();
        let k0 = phi_s.cos() / (1.0 - e2 * phi_s.sin().powi(2)).sqrt();
        let qp = authalic_q(1.0, e, e2);

        Self {
            projection,
            input,
            e,
            e2,
            k0,
            qp,
        }
    }

    pub fn projection(&self) -> WorkingProjection {
        self.projection
    }

    pub fn input_crs(&self) -> InputCrs {
        self.input
    }

    /// Longitude/latitude in degrees to working-plane metres
    pub fn forward(&self, lon: f64, lat: f64) -> Coord<f64> {
        let lambda = lon.to_radians();
        let q = authalic_q(lat.to_radians().sin(), self.e, self.e2);
        Coord {
            x: SEMI_MAJOR_AXIS * self.k0 * lambda,
            y: SEMI_MAJOR_AXIS * q / (2.0 * self.k0),
        }
    }

    /// Working-plane metres to longitude/latitude in degrees
    pub fn inverse(&self, x: f64, y: f64) -> Coord<f64> {
        let q = 2.0 * y * self.k0 / SEMI_MAJOR_AXIS;
        let beta = (q / self.qp).clamp(-1.0, 1.0).asin();

        let e4 = self.e2 * self.e2;
        let e6 = e4 * self.e2;
        let phi = beta
            + (self.e2 / 3.0 + 31.0 * e4 / 180.0 + 517.0 * e6 / 5040.0) * (2.0 * beta).sin()
            + (23.0 * e4 / 360.0 + 251.0 * e6 / 3780.0) * (4.0 * beta).sin()
            + (761.0 * e6 / 45360.0) * (6.0 * beta).sin();

        Coord {
            x: (x / (SEMI_MAJOR_AXIS * self.k0)).to_degrees(),
            y: phi.to_degrees(),
        }
    }

    pub fn point_to_working(&self, point: Point<f64>) -> Result<Point<f64>, String> {
        match self.input {
            InputCrs::Working => {
                check_finite(&point.0)?;
                Ok(point)
            }
            InputCrs::Geographic => {
                check_geographic(&point.0)?;
                Ok(self.forward(point.x(), point.y()).into())
            }
        }
    }

    /// Reproject a polygon into the working plane.
    ///
    /// Returns a description of the first offending coordinate when the input
    /// is not valid in the input reference system.
    pub fn polygon_to_working(&self, polygon: &Polygon<f64>) -> Result<Polygon<f64>, String> {
        match self.input {
            InputCrs::Working => {
                for coord in polygon_coords(polygon) {
                    check_finite(coord)?;
                }
                Ok(polygon.clone())
            }
            InputCrs::Geographic => {
                for coord in polygon_coords(polygon) {
                    check_geographic(coord)?;
                }
                Ok(map_polygon(polygon, |c| self.forward(c.x, c.y)))
            }
        }
    }

    /// Reproject a working-plane polygon back into the input reference system
    pub fn polygon_to_input(&self, polygon: &Polygon<f64>) -> Polygon<f64> {
        match self.input {
            InputCrs::Working => polygon.clone(),
            InputCrs::Geographic => map_polygon(polygon, |c| self.inverse(c.x, c.y)),
        }
    }
}

fn authalic_q(sin_phi: f64, e: f64, e2: f64) -> f64 {
    let e_sin = e * sin_phi;
    (1.0 - e2) * (sin_phi / (1.0 - e_sin * e_sin) - (1.0 / (2.0 * e)) * ((1.0 - e_sin) / (1.0 + e_sin)).ln())
}

fn check_finite(coord: &Coord<f64>) -> Result<(), String> {
    if coord.x.is_finite() && coord.y.is_finite() {
        Ok(())
    } else {
        Err(format!("non-finite coordinate ({}, {})", coord.x, coord.y))
    }
}

fn check_geographic(coord: &Coord<f64>) -> Result<(), String> {
    check_finite(coord)?;
    if !(-180.0..=180.0).contains(&coord.x) || !(-90.0..=90.0).contains(&coord.y) {
        return Err(format!(
            "coordinate ({}, {}) is outside longitude/latitude bounds",
            coord.x, coord.y
        ));
    }
    Ok(())
}

fn polygon_coords(polygon: &Polygon<f64>) -> impl Iterator<Item = &Coord<f64>> {
    polygon
        .exterior()
        .0
        .iter()
        .chain(polygon.interiors().iter().flat_map(|ring| ring.0.iter()))
}

fn map_polygon(polygon: &Polygon<f64>, f: impl Fn(&Coord<f64>) -> Coord<f64>) -> Polygon<f64> {
    let map_ring = |ring: &LineString<f64>| LineString::new(ring.0.iter().map(&f).collect());
    Polygon::new(
        map_ring(polygon.exterior()),
        polygon.interiors().iter().map(map_ring).collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use geo::Area;

    #[test]
    fn test_projection_codes() {
        assert_eq!(
            WorkingProjection::from_code("esri:54034").unwrap(),
            WorkingProjection::WorldCylindricalEqualArea
        );
        assert_eq!(
            WorkingProjection::from_code("EPSG:6933").unwrap(),
            WorkingProjection::EaseGrid2Global
        );
        assert!(matches!(
            WorkingProjection::from_code("EPSG:3857"),
            Err(SetupError::UnsupportedProjection(code)) if code == "EPSG:3857"
        ));
    }

    #[test]
    fn test_equator_scale() {
        let projector = Projector::new(WorkingProjection::WorldCylindricalEqualArea, InputCrs::Geographic);
        let origin = projector.forward(0.0, 0.0);
        assert_relative_eq!(origin.x, 0.0);
        assert_relative_eq!(origin.y, 0.0, epsilon = 1e-9);

        // One degree of longitude along the equator is a*pi/180 with k0 = 1
        let east = projector.forward(1.0, 0.0);
        assert_relative_eq!(east.x, 111_319.490_793, epsilon = 1e-3);
    }

    #[test]
    fn test_round_trip() {
        for projection in [WorkingProjection::WorldCylindricalEqualArea, WorkingProjection::EaseGrid2Global] {
            let projector = Projector::new(projection, InputCrs::Geographic);
            for &(lon, lat) in &[(-122.68, 45.52), (151.2, -33.87), (0.0, 0.0), (-73.99, 40.75)] {
                let projected = projector.forward(lon, lat);
                let back = projector.inverse(projected.x, projected.y);
                assert_relative_eq!(back.x, lon, epsilon = 1e-9);
                assert_relative_eq!(back.y, lat, epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn test_equal_area_bands() {
        // Two one-degree cells on the same meridian have the same planar area
        // in both projections; equal-area means only latitude changes it.
        let projector = Projector::new(WorkingProjection::EaseGrid2Global, InputCrs::Geographic);
        let cell = |lon: f64| {
            Polygon::new(
                LineString::from(vec![(lon, 40.0), (lon + 1.0, 40.0), (lon + 1.0, 41.0), (lon, 41.0), (lon, 40.0)]),
                vec![],
            )
        };

        let a = projector.polygon_to_working(&cell(-120.0)).unwrap().unsigned_area();
        let b = projector.polygon_to_working(&cell(10.0)).unwrap().unsigned_area();
        assert_relative_eq!(a, b, max_relative = 1e-9);
        // Roughly 9,400 km² at 40°N
        assert!(a > 9.0e9 && a < 9.8e9);
    }

    #[test]
    fn test_geographic_bounds_checked() {
        let projector = Projector::new(WorkingProjection::default(), InputCrs::Geographic);
        assert!(projector.point_to_working(Point::new(200.0, 10.0)).is_err());
        assert!(projector.point_to_working(Point::new(10.0, f64::NAN)).is_err());

        let planar = Projector::new(WorkingProjection::default(), InputCrs::Working);
        let p = planar.point_to_working(Point::new(500_000.0, 4_000_000.0)).unwrap();
        assert_eq!(p, Point::new(500_000.0, 4_000_000.0));
    }
}
