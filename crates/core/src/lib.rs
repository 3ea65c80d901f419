//! Flattening overlapping transit stop buffers into a non-overlapping
//! partition of cells, each attributed to the stops whose buffer covers it.
//!
//! ```no_run
//! use bus_buffers_core::prelude::*;
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let stops = StopSet::from_stops(vec![Stop::new("S1", geo::Point::new(-122.67, 45.52))])?;
//! let pipeline = BufferPipeline::new(FlattenConfig::default())?;
//! let buffers = pipeline.buffers_around(&stops, &RadiusBuffer::new(400.0))?;
//!
//! let mut store = SqliteStore::open(std::path::Path::new("cells.sqlite"))?;
//! let mut run = store.begin_run()?;
//! let output = pipeline.run(&stops, &buffers, &mut run)?;
//! run.commit()?;
//! output.summary.log_summary();
//! # Ok(())
//! # }
//! ```

pub mod attribute;
pub mod buffer;
pub mod cell;
pub mod cleanup;
pub mod config;
pub mod encoding;
pub mod error;
pub mod flatten;
pub mod geometry;
pub mod pipeline;
pub mod projection;
pub mod snap;
pub mod store;

// Re-export transit from the transit crate
pub use bus_buffers_transit as transit;

pub mod prelude {
    pub use crate::attribute::{Attribution, StopAttributor};
    pub use crate::buffer::{BufferGenerator, BufferPolygon, RadiusBuffer};
    pub use crate::cell::{Cell, CellId, CellStopLink};
    pub use crate::cleanup::{clean_partition, CleanupReport};
    pub use crate::config::FlattenConfig;
    pub use crate::error::{GeometryError, PipelineError, SetupError, Stage, StorageError};
    pub use crate::flatten::{FlattenStats, Partition, PolygonFlattener};
    pub use crate::pipeline::{BufferPipeline, RunOutput, RunSummary};
    pub use crate::projection::{InputCrs, Projector, WorkingProjection};
    pub use crate::store::{AttributionStore, MemoryStore, SqliteRun, SqliteStore};
    pub use bus_buffers_transit::{Stop, StopIdentifier, StopLookup, StopSet};
}
