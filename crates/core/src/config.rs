//! Run configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::SetupError;
use crate::projection::{InputCrs, Projector, WorkingProjection};

/// Default vertex snapping distance, in working-plane units (metres)
pub const DEFAULT_SNAP_TOLERANCE: f64 = 5.0;

/// Options recognized by a flattening run
///
/// Missing fields fall back to their defaults, so `{}` is a valid config file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FlattenConfig {
    /// Boundary vertices closer than this are merged before partitioning
    pub snap_tolerance_distance: f64,
    pub working_projection: WorkingProjection,
    pub input_crs: InputCrs,
}

impl Default for FlattenConfig {
    fn default() -> Self {
        Self {
            snap_tolerance_distance: DEFAULT_SNAP_TOLERANCE,
            working_projection: WorkingProjection::default(),
            input_crs: InputCrs::default(),
        }
    }
}

impl FlattenConfig {
    pub fn from_json_str(json: &str) -> Result<Self, SetupError> {
        let config: Self = serde_json::from_str(json).map_err(|e| SetupError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, SetupError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SetupError::Config(format!("failed to read {}: {}", path.display(), e)))?;
        Self::from_json_str(&content)
    }

    pub fn validate(&self) -> Result<(), SetupError> {
        let tolerance = self.snap_tolerance_distance;
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(SetupError::InvalidTolerance(tolerance));
        }
        Ok(())
    }

    pub fn projector(&self) -> Projector {
        Projector::new(self.working_projection, self.input_crs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = FlattenConfig::from_json_str("{}").unwrap();
        assert_eq!(config, FlattenConfig::default());
        assert_eq!(config.snap_tolerance_distance, 5.0);
        assert_eq!(config.working_projection.code(), "ESRI:54034");
        assert_eq!(config.input_crs, InputCrs::Geographic);
    }

    #[test]
    fn test_parse_full_config() {
        let config = FlattenConfig::from_json_str(
            r#"{"snap_tolerance_distance": 2.5, "working_projection": "EPSG:6933", "input_crs": "working"}"#,
        )
        .unwrap();

        assert_eq!(config.snap_tolerance_distance, 2.5);
        assert_eq!(config.working_projection, WorkingProjection::EaseGrid2Global);
        assert_eq!(config.input_crs, InputCrs::Working);
    }

    #[test]
    fn test_unsupported_projection_rejected() {
        let err = FlattenConfig::from_json_str(r#"{"working_projection": "EPSG:3857"}"#).unwrap_err();
        assert!(matches!(err, SetupError::Config(msg) if msg.contains("EPSG:3857")));
    }

    #[test]
    fn test_negative_tolerance_rejected() {
        let err = FlattenConfig::from_json_str(r#"{"snap_tolerance_distance": -1.0}"#).unwrap_err();
        assert!(matches!(err, SetupError::InvalidTolerance(t) if t == -1.0));
    }
}
