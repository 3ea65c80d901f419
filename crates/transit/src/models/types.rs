//! Core data types for transit stops.

use geo::Point;

use crate::identifiers::*;

// ============================================================================
// Data Structures
// ============================================================================

/// A boarding location with a unique identifier.
///
/// The location is stored in whatever reference system the stop loader
/// produced; consumers decide whether it needs reprojecting.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Stop {
    pub id: StopIdentifier,
    pub location: Point,
}

impl Stop {
    pub fn new(id: impl Into<StopIdentifier>, location: Point) -> Self {
        Self {
            id: id.into(),
            location,
        }
    }

    /// Returns `Err` if the stop has a blank identifier or a non-finite location.
    pub fn validate(&self) -> Result<()> {
        if self.id.is_blank() {
            return Err(TransitError::InvalidData(
                "Stop identifier must not be blank".to_string(),
            ));
        }

        if !self.location.x().is_finite() || !self.location.y().is_finite() {
            return Err(TransitError::InvalidData(format!(
                "Stop {} has a non-finite location ({}, {})",
                self.id,
                self.location.x(),
                self.location.y()
            )));
        }

        Ok(())
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum TransitError {
    #[error("Stop not found: {0}")]
    StopNotFound(StopIdentifier),

    #[error("Duplicate stop identifier: {0}")]
    DuplicateStop(StopIdentifier),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

pub type Result<T> = std::result::Result<T, TransitError>;
