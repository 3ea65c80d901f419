//! Core traits for transit entities.
//!
//! These traits define the public interface for stop data.
//! Implementations can be in-memory, database-backed, or remote.

use crate::identifiers::*;
use crate::models::types::*;

/// Read access to the stops of a single transit network
pub trait StopLookup: Send + Sync {
    fn get_stop(&self, id: &StopIdentifier) -> Option<&Stop>;

    /// All stops, in load order
    fn all_stops(&self) -> &[Stop];

    fn contains_stop(&self, id: &StopIdentifier) -> bool {
        self.get_stop(id).is_some()
    }

    /// Look a stop up, failing with [`TransitError::StopNotFound`]
    fn require_stop(&self, id: &StopIdentifier) -> Result<&Stop> {
        self.get_stop(id)
            .ok_or_else(|| TransitError::StopNotFound(id.clone()))
    }
}
