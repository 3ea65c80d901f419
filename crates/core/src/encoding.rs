//! GeoJSON encoding of partition cells.

use std::collections::BTreeSet;

use bus_buffers_transit::StopIdentifier;
use geo::Polygon;
use geojson::{Feature, FeatureCollection, Geometry, Value};

use crate::cell::Cell;

/// Property names reserved for downstream trip aggregation, written as null
pub const TRIP_FIELDS: [&str; 4] = ["num_trips", "num_trips_per_hr", "num_stops_in_range", "max_wait_time"];

/// Convert a geo Polygon to GeoJSON Value
pub fn polygon_to_geojson(poly: &Polygon<f64>) -> Value {
    let exterior: Vec<Vec<f64>> = poly
        .exterior()
        .0
        .iter()
        .map(|c| vec![c.x, c.y])
        .collect();

    let mut rings = vec![exterior];

    for interior in poly.interiors() {
        let hole: Vec<Vec<f64>> = interior.0.iter().map(|c| vec![c.x, c.y]).collect();
        rings.push(hole);
    }

    Value::Polygon(rings)
}

/// Serialized GeoJSON geometry, as stored alongside each cell
pub fn polygon_to_json(poly: &Polygon<f64>) -> Result<String, serde_json::Error> {
    serde_json::to_string(&Geometry::new(polygon_to_geojson(poly)))
}

/// Create a GeoJSON Feature for a cell.
///
/// `geometry` is the cell outline in whichever reference system the caller
/// wants written; `area` stays in working-plane units.
pub fn cell_to_feature(cell: &Cell, geometry: &Polygon<f64>, stops: &BTreeSet<StopIdentifier>) -> Feature {
    let mut properties = serde_json::Map::new();
    properties.insert("cell_id".to_string(), serde_json::json!(cell.id.get()));
    properties.insert("area".to_string(), serde_json::json!(cell.area));
    properties.insert("stop_count".to_string(), serde_json::json!(stops.len()));
    properties.insert(
        "stop_ids".to_string(),
        serde_json::json!(stops.iter().map(|s| s.as_str()).collect::<Vec<_>>()),
    );
    for field in TRIP_FIELDS {
        properties.insert(field.to_string(), serde_json::Value::Null);
    }

    Feature {
        bbox: None,
        geometry: Some(Geometry::new(polygon_to_geojson(geometry))),
        id: Some(geojson::feature::Id::Number(cell.id.get().into())),
        properties: Some(properties),
        foreign_members: None,
    }
}

pub fn feature_collection(features: Vec<Feature>) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::CellId;
    use geo::LineString;

    fn make_cell() -> Cell {
        let square = Polygon::new(
            LineString::from(vec![(0.0, 0.0), (2.0, 0.0), (2.0, 2.0), (0.0, 2.0), (0.0, 0.0)]),
            vec![LineString::from(vec![(0.5, 0.5), (1.0, 0.5), (1.0, 1.0), (0.5, 0.5)])],
        );
        Cell::new(CellId::new(3), square)
    }

    #[test]
    fn test_polygon_to_geojson_keeps_holes() {
        let cell = make_cell();
        match polygon_to_geojson(&cell.geometry) {
            Value::Polygon(rings) => {
                assert_eq!(rings.len(), 2);
                assert_eq!(rings[0].len(), 5);
                assert_eq!(rings[1][0], vec![0.5, 0.5]);
            }
            other => panic!("expected polygon, got {:?}", other),
        }
    }

    #[test]
    fn test_cell_feature_properties() {
        let cell = make_cell();
        let stops: BTreeSet<StopIdentifier> = ["S2", "S1"].into_iter().map(StopIdentifier::from).collect();
        let feature = cell_to_feature(&cell, &cell.geometry, &stops);

        let properties = feature.properties.unwrap();
        assert_eq!(properties["cell_id"], serde_json::json!(3));
        assert_eq!(properties["stop_count"], serde_json::json!(2));
        assert_eq!(properties["stop_ids"], serde_json::json!(["S1", "S2"]));
        assert!(properties["num_trips"].is_null());
    }

    #[test]
    fn test_polygon_to_json() {
        let cell = make_cell();
        let json = polygon_to_json(&cell.geometry).unwrap();
        assert!(json.contains(r#""type":"Polygon""#));
    }
}
