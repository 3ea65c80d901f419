//! In-memory stop set.
//!
//! The canonical list of stops for one run. Stops keep their load order, and
//! every identifier appears exactly once.

use std::collections::HashMap;

use crate::identifiers::*;
use crate::models::{traits::*, types::*};

// ============================================================================
// Stop Set
// ============================================================================

/// Immutable collection of uniquely identified stops
#[derive(Clone, Debug, Default)]
pub struct StopSet {
    stops: Vec<Stop>,
    index: HashMap<StopIdentifier, usize>,
}

impl StopSet {
    /// Create a new empty stop set
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a stop set from loader output.
    ///
    /// Fails on the first invalid stop or repeated identifier.
    pub fn from_stops(stops: Vec<Stop>) -> Result<Self> {
        let mut index = HashMap::with_capacity(stops.len());

        for (position, stop) in stops.iter().enumerate() {
            stop.validate()?;
            if index.insert(stop.id.clone(), position).is_some() {
                return Err(TransitError::DuplicateStop(stop.id.clone()));
            }
        }

        Ok(Self { stops, index })
    }

    pub fn len(&self) -> usize {
        self.stops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Stop> {
        self.stops.iter()
    }
}

impl StopLookup for StopSet {
    fn get_stop(&self, id: &StopIdentifier) -> Option<&Stop> {
        self.index.get(id).map(|&position| &self.stops[position])
    }

    fn all_stops(&self) -> &[Stop] {
        &self.stops
    }
}

impl<'a> IntoIterator for &'a StopSet {
    type Item = &'a Stop;
    type IntoIter = std::slice::Iter<'a, Stop>;

    fn into_iter(self) -> Self::IntoIter {
        self.stops.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Point;

    #[test]
    fn test_empty_stop_set() {
        let stops = StopSet::new();
        assert!(stops.is_empty());
        assert_eq!(stops.all_stops().len(), 0);
    }

    #[test]
    fn test_stop_set_lookups() {
        let stops = StopSet::from_stops(vec![
            Stop::new("s1", Point::new(-74.0, 40.7)),
            Stop::new("s2", Point::new(-74.1, 40.8)),
        ])
        .unwrap();

        assert_eq!(stops.len(), 2);
        assert!(stops.contains_stop(&StopIdentifier::new("s1")));
        assert_eq!(
            stops.get_stop(&StopIdentifier::new("s2")).map(|s| s.location),
            Some(Point::new(-74.1, 40.8))
        );
        assert!(matches!(
            stops.require_stop(&StopIdentifier::new("missing")),
            Err(TransitError::StopNotFound(_))
        ));
    }

    #[test]
    fn test_stop_set_keeps_load_order() {
        let stops = StopSet::from_stops(vec![
            Stop::new("b", Point::new(1.0, 1.0)),
            Stop::new("a", Point::new(2.0, 2.0)),
        ])
        .unwrap();

        let ids: Vec<&str> = stops.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn test_duplicate_stop_rejected() {
        let result = StopSet::from_stops(vec![
            Stop::new("s1", Point::new(0.0, 0.0)),
            Stop::new("s1", Point::new(1.0, 1.0)),
        ]);

        assert!(matches!(result, Err(TransitError::DuplicateStop(id)) if id.as_str() == "s1"));
    }
}
