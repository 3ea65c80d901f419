//! The flatten → attribute → cleanup run.
//!
//! [`BufferPipeline::run`] drives every stage against a caller-owned store.
//! Stages run one after another, each consuming the previous stage's output in
//! full. Any failure aborts the run and is tagged with the stage that failed.

use bus_buffers_transit::{StopLookup, StopSet};
use tracing::{info, warn};

use crate::attribute::StopAttributor;
use crate::buffer::{BufferGenerator, BufferPolygon};
use crate::cell::Cell;
use crate::cleanup::clean_partition;
use crate::config::FlattenConfig;
use crate::error::{PipelineError, Result, SetupError, Stage};
use crate::flatten::PolygonFlattener;
use crate::geometry::invalid_reason;
use crate::projection::Projector;
use crate::store::AttributionStore;

/// Counts reported at the end of a run
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub stops: usize,
    pub input_buffers: usize,
    pub collapsed_buffers: usize,
    pub merged_vertices: usize,
    pub raw_cells: usize,
    pub degenerate_cells: usize,
    pub unattributed_cells: usize,
    pub final_cells: usize,
    pub links: usize,
}

impl RunSummary {
    pub fn log_summary(&self) {
        info!("=== Flattening Statistics ===");
        info!("Stops: {}", self.stops);
        info!("Buffer polygons: {}", self.input_buffers);
        info!("Vertices snapped: {}", self.merged_vertices);
        info!("Cells before cleanup: {}", self.raw_cells);
        info!("Cells (result): {}", self.final_cells);
        info!("Cell/stop links: {}", self.links);
        if self.collapsed_buffers > 0 {
            warn!("Buffers collapsed by snapping: {}", self.collapsed_buffers);
        }
        if self.degenerate_cells > 0 {
            warn!("Zero-area cells discarded: {}", self.degenerate_cells);
        }
        if self.unattributed_cells > 0 {
            warn!("Cells without stops purged: {}", self.unattributed_cells);
        }
    }
}

/// Final cells (in the working plane) and run statistics
#[derive(Clone, Debug, Default)]
pub struct RunOutput {
    pub cells: Vec<Cell>,
    pub summary: RunSummary,
}

pub struct BufferPipeline {
    config: FlattenConfig,
    projector: Projector,
}

impl BufferPipeline {
    pub fn new(config: FlattenConfig) -> std::result::Result<Self, SetupError> {
        config.validate()?;
        let projector = config.projector();
        Ok(Self { config, projector })
    }

    pub fn config(&self) -> &FlattenConfig {
        &self.config
    }

    pub fn projector(&self) -> &Projector {
        &self.projector
    }

    /// Generate one buffer per stop, returned in the input reference system
    pub fn buffers_around<G: BufferGenerator + ?Sized>(
        &self,
        stops: &StopSet,
        generator: &G,
    ) -> std::result::Result<Vec<BufferPolygon>, SetupError> {
        stops
            .iter()
            .map(|stop| {
                let location = self
                    .projector
                    .point_to_working(stop.location)
                    .map_err(|reason| SetupError::InvalidGeometry {
                        stop_id: stop.id.clone(),
                        reason,
                    })?;
                let area = generator.service_area(&stop.id, location)?;
                Ok(BufferPolygon::new(stop.id.clone(), self.projector.polygon_to_input(&area)))
            })
            .collect()
    }

    /// Validate buffers against the stop set and move them into the working plane
    fn prepare_buffers(
        &self,
        stops: &StopSet,
        buffers: &[BufferPolygon],
    ) -> std::result::Result<Vec<BufferPolygon>, SetupError> {
        buffers
            .iter()
            .map(|buffer| {
                if !stops.contains_stop(&buffer.stop_id) {
                    return Err(SetupError::UnknownStop(buffer.stop_id.clone()));
                }
                let invalid = |reason: String| SetupError::InvalidGeometry {
                    stop_id: buffer.stop_id.clone(),
                    reason,
                };

                let projected = self.projector.polygon_to_working(&buffer.geometry).map_err(invalid)?;
                if let Some(reason) = invalid_reason(&projected) {
                    return Err(invalid(reason));
                }
                Ok(BufferPolygon::new(buffer.stop_id.clone(), projected))
            })
            .collect()
    }

    /// Flatten `buffers`, attribute the cells to stops and clean the result.
    ///
    /// Every write goes through `store`; callers that need all-or-nothing
    /// persistence pass a transaction-backed store and commit it on success.
    pub fn run<S: AttributionStore + ?Sized>(
        &self,
        stops: &StopSet,
        buffers: &[BufferPolygon],
        store: &mut S,
    ) -> Result<RunOutput> {
        let mut summary = RunSummary {
            stops: stops.len(),
            input_buffers: buffers.len(),
            ..Default::default()
        };

        info!(
            "Preparing {} buffers for {} stops ({})",
            buffers.len(),
            stops.len(),
            self.projector.projection()
        );
        let working = self.prepare_buffers(stops, buffers)?;

        store
            .insert_stops(stops)
            .map_err(|e| PipelineError::storage(Stage::Store, e))?;

        info!(
            "Flattening {} buffers at snap tolerance {}",
            working.len(),
            self.config.snap_tolerance_distance
        );
        let partition = PolygonFlattener::new(self.config.snap_tolerance_distance)
            .flatten(&working)
            .map_err(|e| PipelineError::geometry(Stage::Flatten, e))?;
        summary.collapsed_buffers = partition.stats.collapsed_polygons;
        summary.merged_vertices = partition.stats.merged_vertices;
        summary.raw_cells = partition.cells.len();

        info!("Attributing {} cells to stops", partition.cells.len());
        let attribution = StopAttributor::new(&working).attribute(&partition.cells);

        store
            .insert_cells(&partition.cells)
            .and_then(|_| store.upsert_links(&attribution.links))
            .map_err(|e| PipelineError::storage(Stage::Attribute, e))?;

        info!("Cleaning up partition");
        let (cells, report) =
            clean_partition(partition.cells, store).map_err(|e| PipelineError::storage(Stage::Cleanup, e))?;
        summary.degenerate_cells = partition.stats.degenerate_cells + report.degenerate;
        summary.unattributed_cells = report.unattributed;
        summary.final_cells = cells.len();
        summary.links = store
            .link_count()
            .map_err(|e| PipelineError::storage(Stage::Store, e))?;

        Ok(RunOutput { cells, summary })
    }
}
