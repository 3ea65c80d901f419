use anyhow::{bail, Context, Result};
use bus_buffers_core::buffer::RadiusBuffer;
use bus_buffers_core::cell::CellId;
use bus_buffers_core::config::FlattenConfig;
use bus_buffers_core::pipeline::BufferPipeline;
use bus_buffers_core::projection::{InputCrs, WorkingProjection};
use bus_buffers_core::store::SqliteStore;
use bus_buffers_transit::StopIdentifier;
use clap::{Parser, ValueEnum};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

mod input;
mod output;

use input::{read_buffers, read_stops};
use output::write_cells_geojson;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum CrsArg {
    /// Longitude/latitude degrees (WGS84)
    Geographic,
    /// Already in the working equal-area plane
    Working,
}

impl From<CrsArg> for InputCrs {
    fn from(arg: CrsArg) -> Self {
        match arg {
            CrsArg::Geographic => InputCrs::Geographic,
            CrsArg::Working => InputCrs::Working,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "flatten-buffers",
    author,
    version,
    about = "Flatten overlapping transit stop buffers into attributed service-area cells",
    long_about = "Reads transit stops and their service-area buffers, splits the overlapping \
                  buffers into a non-overlapping set of cells, and records which stops \
                  serve each cell.\n\n\
                  Buffers come from a GeoJSON file whose features carry a stop_id property, \
                  or are generated as circles with --radius. Cells are written to a SQLite \
                  database and optionally to GeoJSON."
)]
struct Args {
    /// GTFS stops.txt file
    #[arg(short, long)]
    stops: PathBuf,

    /// GeoJSON file with one buffer feature per stop
    #[arg(short, long, conflicts_with = "radius", required_unless_present = "radius")]
    buffers: Option<PathBuf>,

    /// Generate circular buffers of this radius (working-plane metres)
    #[arg(short, long)]
    radius: Option<f64>,

    /// Segments per generated circle
    #[arg(long, default_value_t = RadiusBuffer::DEFAULT_SEGMENTS)]
    segments: usize,

    /// SQLite database to write cells and links to (in-memory if omitted)
    #[arg(short, long)]
    database: Option<PathBuf>,

    /// Output GeoJSON file for the flattened cells
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// JSON config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Vertex snapping tolerance (overrides config)
    #[arg(short, long)]
    tolerance: Option<f64>,

    /// Working projection code, ESRI:54034 or EPSG:6933 (overrides config)
    #[arg(short, long)]
    projection: Option<String>,

    /// Reference system of the input coordinates (overrides config)
    #[arg(long, value_enum)]
    input_crs: Option<CrsArg>,

    /// Verbose output (show debug messages)
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn flatten_config(&self) -> Result<FlattenConfig> {
        let mut config = match &self.config {
            Some(path) => FlattenConfig::from_path(path)?,
            None => FlattenConfig::default(),
        };
        if let Some(tolerance) = self.tolerance {
            config.snap_tolerance_distance = tolerance;
        }
        if let Some(code) = &self.projection {
            config.working_projection = WorkingProjection::from_code(code)?;
        }
        if let Some(crs) = self.input_crs {
            config.input_crs = crs.into();
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if args.verbose { "debug" } else { "info" }),
    )
    .format_timestamp(None)
    .init();

    log::info!("=== Stop Buffer Flattener ===");
    log::info!("Stops: {}", args.stops.display());

    if !args.stops.exists() {
        bail!("Stops file does not exist: {}", args.stops.display());
    }

    let config = args.flatten_config().context("Invalid configuration")?;
    let pipeline = BufferPipeline::new(config).context("Invalid configuration")?;
    log::info!(
        "Projection: {}, snap tolerance: {}",
        pipeline.projector().projection(),
        pipeline.config().snap_tolerance_distance
    );

    // Phase 1: Load stops and buffers
    log::info!("");
    log::info!("Phase 1: Loading stops and buffers...");
    let stops = read_stops(&args.stops)?;
    log::info!("  Loaded {} stops", stops.len());

    let buffers = match (&args.buffers, args.radius) {
        (Some(path), _) => {
            log::info!("  Reading buffers from {}", path.display());
            read_buffers(path)?
        }
        (None, Some(radius)) => {
            log::info!("  Generating {} m buffers ({} segments)", radius, args.segments);
            let generator = RadiusBuffer::new(radius).with_segments(args.segments);
            pipeline
                .buffers_around(&stops, &generator)
                .context("Failed to generate buffers")?
        }
        (None, None) => bail!("Either --buffers or --radius is required"),
    };
    log::info!("  {} buffer polygons", buffers.len());

    // Phase 2: Flatten, attribute and clean up
    log::info!("");
    log::info!("Phase 2: Flattening buffers...");
    let mut store = match &args.database {
        Some(path) => {
            log::info!("  Database: {}", path.display());
            SqliteStore::open(path)
        }
        None => SqliteStore::open_in_memory(),
    }
    .context("Failed to open database")?;

    let mut run = store.begin_run().context("Failed to start run")?;
    let output = pipeline.run(&stops, &buffers, &mut run)?;
    run.commit().context("Failed to commit run")?;

    // Phase 3: Write output
    if let Some(output_path) = &args.output {
        log::info!("");
        log::info!("Phase 3: Writing output...");
        let mut stops_by_cell: BTreeMap<CellId, BTreeSet<StopIdentifier>> = BTreeMap::new();
        for cell in &output.cells {
            stops_by_cell.insert(cell.id, store.links_for_cell(cell.id)?);
        }
        write_cells_geojson(&output.cells, &stops_by_cell, pipeline.projector(), output_path)
            .context("Failed to write cells GeoJSON")?;
    }

    // Summary
    log::info!("");
    output.summary.log_summary();
    log::info!("");
    if let Some(path) = &args.database {
        log::info!("Database written to: {}", path.display());
    }
    if let Some(path) = &args.output {
        log::info!("Output written to: {}", path.display());
    }
    log::info!("Done!");

    Ok(())
}
