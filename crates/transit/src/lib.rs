//! # bus-buffers-transit
//!
//! Transit stop data for service-area analysis.
//!
//! ## Features
//!
//! - **Type-safe identifiers**: cheap-to-clone, ordered stop identifiers
//! - **Stop sets**: load-ordered stop collections with duplicate detection
//! - **Pluggable lookups**: implement [`StopLookup`] over your own storage
//!
//! ## Example
//!
//! ```
//! use bus_buffers_transit::prelude::*;
//! use geo::Point;
//!
//! let stops = StopSet::from_stops(vec![
//!     Stop::new("S1", Point::new(-122.6765, 45.5231)),
//!     Stop::new("S2", Point::new(-122.6587, 45.5122)),
//! ])
//! .unwrap();
//!
//! assert_eq!(stops.len(), 2);
//! assert!(stops.contains_stop(&StopIdentifier::new("S1")));
//! ```

pub mod identifiers;
pub mod models;
pub mod provider;

// Re-exports for convenience
pub mod prelude {
    pub use crate::identifiers::*;
    pub use crate::models::{traits::*, types::*};
    pub use crate::provider::stop_set::StopSet;
}

pub use prelude::*;
