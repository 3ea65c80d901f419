//! Transit data models, types, and traits.

pub mod traits;
pub mod types;

// Re-exports for convenience
pub use traits::StopLookup;
pub use types::{Result, Stop, TransitError};
