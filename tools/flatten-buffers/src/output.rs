use anyhow::{Context, Result};
use bus_buffers_core::cell::{Cell, CellId};
use bus_buffers_core::encoding::{cell_to_feature, feature_collection};
use bus_buffers_core::projection::Projector;
use bus_buffers_transit::StopIdentifier;
use geojson::{Feature, GeoJson};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Build one feature per cell with geometry back in the input reference system
pub fn cells_to_features(
    cells: &[Cell],
    stops_by_cell: &BTreeMap<CellId, BTreeSet<StopIdentifier>>,
    projector: &Projector,
) -> Vec<Feature> {
    let none = BTreeSet::new();
    cells
        .iter()
        .map(|cell| {
            let stops = stops_by_cell.get(&cell.id).unwrap_or(&none);
            cell_to_feature(cell, &projector.polygon_to_input(&cell.geometry), stops)
        })
        .collect()
}

/// Write the partition to a GeoJSON file (each cell as separate feature)
pub fn write_cells_geojson(
    cells: &[Cell],
    stops_by_cell: &BTreeMap<CellId, BTreeSet<StopIdentifier>>,
    projector: &Projector,
    output_path: &Path,
) -> Result<()> {
    log::info!("Writing {} cells to {}", cells.len(), output_path.display());

    let feature_collection = feature_collection(cells_to_features(cells, stops_by_cell, projector));

    let geojson = GeoJson::from(feature_collection);
    let json_string = serde_json::to_string_pretty(&geojson)
        .context("Failed to serialize GeoJSON")?;

    std::fs::write(output_path, json_string)
        .with_context(|| format!("Failed to write GeoJSON to {}", output_path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bus_buffers_core::projection::{InputCrs, WorkingProjection};
    use geo::{LineString, Polygon};

    fn square_cell(id: u32) -> Cell {
        Cell::new(
            CellId::new(id),
            Polygon::new(
                LineString::from(vec![(0.0, 0.0), (1000.0, 0.0), (1000.0, 1000.0), (0.0, 1000.0), (0.0, 0.0)]),
                vec![],
            ),
        )
    }

    #[test]
    fn test_features_carry_stops() {
        let projector = Projector::new(WorkingProjection::default(), InputCrs::Working);
        let cells = vec![square_cell(1), square_cell(2)];
        let stops = BTreeMap::from([(CellId::new(1), BTreeSet::from([StopIdentifier::new("A")]))]);

        let features = cells_to_features(&cells, &stops, &projector);

        assert_eq!(features.len(), 2);
        assert_eq!(features[0].property("stop_count"), Some(&serde_json::json!(1)));
        assert_eq!(features[1].property("stop_count"), Some(&serde_json::json!(0)));
    }

    #[test]
    fn test_features_reprojected_to_geographic() {
        let projector = Projector::new(WorkingProjection::default(), InputCrs::Geographic);
        let features = cells_to_features(&[square_cell(1)], &BTreeMap::new(), &projector);

        let Some(geojson::Value::Polygon(rings)) = features[0].geometry.as_ref().map(|g| g.value.clone()) else {
            panic!("expected a polygon");
        };
        // 1 km in the working plane is about 0.009 degrees at the equator
        assert!(rings[0].iter().all(|c| c[0].abs() < 0.01 && c[1].abs() < 0.01));
        assert!(rings[0].iter().any(|c| c[0] > 0.008));
    }
}
