//! Service-area polygons around stops.
//!
//! Real service areas come from a routing engine outside this crate; the
//! [`BufferGenerator`] trait is the seam it plugs into. [`RadiusBuffer`] is a
//! straight-line distance stand-in.

use std::f64::consts::TAU;

use bus_buffers_transit::StopIdentifier;
use geo::{Coord, LineString, Point, Polygon};

use crate::error::SetupError;

/// Service area of one stop
#[derive(Clone, Debug, PartialEq)]
pub struct BufferPolygon {
    pub stop_id: StopIdentifier,
    pub geometry: Polygon<f64>,
}

impl BufferPolygon {
    pub fn new(stop_id: impl Into<StopIdentifier>, geometry: Polygon<f64>) -> Self {
        Self {
            stop_id: stop_id.into(),
            geometry,
        }
    }
}

/// Produces the area reachable from a stop within a time or distance budget
pub trait BufferGenerator {
    /// Service area around `location`, which is given in working-plane units.
    /// The returned polygon is in the same plane.
    fn service_area(&self, stop_id: &StopIdentifier, location: Point<f64>) -> Result<Polygon<f64>, SetupError>;
}

/// Regular polygon approximating a circle of fixed radius
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RadiusBuffer {
    pub radius: f64,
    pub segments: usize,
}

impl RadiusBuffer {
    pub const DEFAULT_SEGMENTS: usize = 64;

    pub fn new(radius: f64) -> Self {
        Self {
            radius,
            segments: Self::DEFAULT_SEGMENTS,
        }
    }

    pub fn with_segments(mut self, segments: usize) -> Self {
        self.segments = segments;
        self
    }
}

impl BufferGenerator for RadiusBuffer {
    fn service_area(&self, _stop_id: &StopIdentifier, location: Point<f64>) -> Result<Polygon<f64>, SetupError> {
        if !self.radius.is_finite() || self.radius <= 0.0 {
            return Err(SetupError::InvalidBuffer(format!(
                "radius must be positive, got {}",
                self.radius
            )));
        }
        if self.segments < 3 {
            return Err(SetupError::InvalidBuffer(format!(
                "a buffer needs at least 3 segments, got {}",
                self.segments
            )));
        }

        Ok(circle(location, self.radius, self.segments))
    }
}

/// Counter-clockwise ring of `segments` vertices starting due east of `center`
pub fn circle(center: Point<f64>, radius: f64, segments: usize) -> Polygon<f64> {
    let mut coords: Vec<Coord<f64>> = (0..segments)
        .map(|i| {
            let angle = TAU * i as f64 / segments as f64;
            Coord {
                x: center.x() + radius * angle.cos(),
                y: center.y() + radius * angle.sin(),
            }
        })
        .collect();
    coords.push(coords[0]);

    Polygon::new(LineString::new(coords), vec![])
}
