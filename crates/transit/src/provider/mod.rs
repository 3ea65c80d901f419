//! Stop collections.

pub mod stop_set;

pub use stop_set::StopSet;
