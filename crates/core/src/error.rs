//! Error taxonomy for a flattening run.
//!
//! Every failure is fatal to the run. [`PipelineError`] carries the [`Stage`]
//! that failed so callers can tell a flatten failure from a storage failure.

use std::fmt;

use bus_buffers_transit::{StopIdentifier, TransitError};

/// Pipeline stage a failure is attributed to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
    Setup,
    Flatten,
    Attribute,
    Cleanup,
    Store,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Setup => "setup",
            Stage::Flatten => "flatten",
            Stage::Attribute => "attribute",
            Stage::Cleanup => "cleanup",
            Stage::Store => "store",
        };
        f.write_str(name)
    }
}

/// Invalid inputs or configuration, raised before anything is written
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error("Unsupported working projection: {0} (expected an equal-area projection such as ESRI:54034 or EPSG:6933)")]
    UnsupportedProjection(String),

    #[error("Snap tolerance must be a finite, non-negative distance, got {0}")]
    InvalidTolerance(f64),

    #[error("Invalid geometry for stop {stop_id}: {reason}")]
    InvalidGeometry {
        stop_id: StopIdentifier,
        reason: String,
    },

    #[error("Buffer references unknown stop: {0}")]
    UnknownStop(StopIdentifier),

    #[error("Invalid buffer parameters: {0}")]
    InvalidBuffer(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Transit(#[from] TransitError),
}

/// Flattening or attribution produced something downstream cannot use
#[derive(Debug, thiserror::Error)]
pub enum GeometryError {
    #[error("Flattening {input} buffer polygons produced an empty partition")]
    EmptyPartition { input: usize },

    #[error("Polygon overlay failed: {0}")]
    OverlayFailed(String),
}

/// Failure reading or writing the attribution store
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Failed to encode cell geometry: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("Cell identifier {0} already present in store")]
    DuplicateCell(u32),

    #[error("Link references unknown cell {0}")]
    UnknownCell(u32),
}

/// A failed run, tagged with the stage that failed
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("setup failed: {0}")]
    Setup(#[from] SetupError),

    #[error("{stage} stage failed: {source}")]
    Geometry {
        stage: Stage,
        #[source]
        source: GeometryError,
    },

    #[error("{stage} stage failed: {source}")]
    Storage {
        stage: Stage,
        #[source]
        source: StorageError,
    },
}

impl PipelineError {
    pub fn geometry(stage: Stage, source: GeometryError) -> Self {
        Self::Geometry { stage, source }
    }

    pub fn storage(stage: Stage, source: StorageError) -> Self {
        Self::Storage { stage, source }
    }

    /// The stage the run failed in
    pub fn stage(&self) -> Stage {
        match self {
            Self::Setup(_) => Stage::Setup,
            Self::Geometry { stage, .. } | Self::Storage { stage, .. } => *stage,
        }
    }
}

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_attached_to_message() {
        let err = PipelineError::geometry(Stage::Flatten, GeometryError::EmptyPartition { input: 3 });
        assert_eq!(err.stage(), Stage::Flatten);
        assert_eq!(
            err.to_string(),
            "flatten stage failed: Flattening 3 buffer polygons produced an empty partition"
        );
    }

    #[test]
    fn test_setup_error_stage() {
        let err: PipelineError = SetupError::UnsupportedProjection("EPSG:3857".into()).into();
        assert_eq!(err.stage(), Stage::Setup);
    }
}
