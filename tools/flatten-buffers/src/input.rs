use anyhow::{bail, Context, Result};
use bus_buffers_core::buffer::BufferPolygon;
use bus_buffers_transit::{Stop, StopIdentifier, StopSet};
use geo::{Coord, LineString, Point, Polygon};
use geojson::GeoJson;
use serde::Deserialize;
use std::io::Read;
use std::path::Path;

#[derive(Deserialize)]
struct RawStop {
    stop_id: String,
    #[serde(rename = "stop_lat")]
    latitude: Option<f64>,
    #[serde(rename = "stop_lon")]
    longitude: Option<f64>,
    #[serde(default)]
    location_type: Option<u8>,
}

impl RawStop {
    /// Stations, entrances, generic nodes and boarding areas carry no service
    fn is_boardable(&self) -> bool {
        matches!(self.location_type, None | Some(0))
    }
}

/// Read boardable stops from a GTFS stops.txt file
pub fn read_stops(path: &Path) -> Result<StopSet> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open stops file: {}", path.display()))?;
    parse_stops(std::io::BufReader::new(file))
        .with_context(|| format!("Failed to read stops from: {}", path.display()))
}

fn parse_stops<R: Read>(reader: R) -> Result<StopSet> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

    let mut stops = Vec::new();
    let mut skipped = 0usize;
    for result in rdr.deserialize() {
        let record: RawStop = result?;
        if !record.is_boardable() {
            skipped += 1;
            continue;
        }
        let (Some(lon), Some(lat)) = (record.longitude, record.latitude) else {
            bail!("Stop {} has no coordinates", record.stop_id);
        };
        stops.push(Stop::new(record.stop_id, Point::new(lon, lat)));
    }

    if skipped > 0 {
        log::debug!("  Skipped {} stations and other non-boardable locations", skipped);
    }

    Ok(StopSet::from_stops(stops)?)
}

/// Read buffer polygons from a GeoJSON file.
///
/// Every feature needs a `stop_id` property. MultiPolygon features become one
/// buffer per part.
pub fn read_buffers(path: &Path) -> Result<Vec<BufferPolygon>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read buffers file: {}", path.display()))?;

    let geojson: GeoJson = content
        .parse()
        .with_context(|| format!("Failed to parse GeoJSON from: {}", path.display()))?;

    extract_buffers(geojson).with_context(|| format!("Invalid buffers in: {}", path.display()))
}

fn extract_buffers(geojson: GeoJson) -> Result<Vec<BufferPolygon>> {
    let features = match geojson {
        GeoJson::FeatureCollection(fc) => fc.features,
        GeoJson::Feature(feature) => vec![feature],
        GeoJson::Geometry(_) => bail!("Buffers must be features carrying a stop_id property"),
    };

    let mut buffers = Vec::new();
    for (index, feature) in features.into_iter().enumerate() {
        let stop_id = feature_stop_id(&feature)
            .with_context(|| format!("Feature {} has no stop_id property", index))?;
        let Some(geometry) = feature.geometry else {
            bail!("Feature {} (stop {}) has no geometry", index, stop_id);
        };
        for polygon in geometry_to_polygons(geometry.value)
            .with_context(|| format!("Feature {} (stop {})", index, stop_id))?
        {
            buffers.push(BufferPolygon::new(stop_id.clone(), polygon));
        }
    }

    Ok(buffers)
}

fn feature_stop_id(feature: &geojson::Feature) -> Option<StopIdentifier> {
    match feature.property("stop_id")? {
        serde_json::Value::String(s) => Some(StopIdentifier::new(s)),
        serde_json::Value::Number(n) => Some(StopIdentifier::new(n.to_string())),
        _ => None,
    }
}

/// Convert a GeoJSON geometry value to geo Polygons
fn geometry_to_polygons(value: geojson::Value) -> Result<Vec<Polygon<f64>>> {
    match value {
        geojson::Value::Polygon(rings) => Ok(vec![rings_to_polygon(&rings)?]),
        geojson::Value::MultiPolygon(polygons) => polygons.iter().map(|rings| rings_to_polygon(rings)).collect(),
        _ => bail!("Expected Polygon or MultiPolygon geometry"),
    }
}

fn rings_to_polygon(rings: &[Vec<Vec<f64>>]) -> Result<Polygon<f64>> {
    let Some((exterior, interiors)) = rings.split_first() else {
        bail!("Polygon has no rings");
    };
    let interiors = interiors
        .iter()
        .map(|ring| coords_to_linestring(ring))
        .collect::<Result<Vec<_>>>()?;
    Ok(Polygon::new(coords_to_linestring(exterior)?, interiors))
}

fn coords_to_linestring(coords: &[Vec<f64>]) -> Result<LineString<f64>> {
    coords
        .iter()
        .map(|c| match c.as_slice() {
            [x, y, ..] => Ok(Coord { x: *x, y: *y }),
            _ => bail!("Position needs at least two values"),
        })
        .collect::<Result<Vec<_>>>()
        .map(LineString::new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bus_buffers_transit::StopLookup;

    #[test]
    fn test_parse_stops_skips_stations() {
        let data = "\
stop_id,stop_name,stop_lat,stop_lon,location_type,parent_station
PLATFORM_1,Main St,45.5231,-122.6765,0,STATION
STATION,Main St Station,45.5232,-122.6766,1,
ENTRANCE,Main St Entrance,45.5233,-122.6767,2,STATION
STOP_2,Oak Ave,45.5240,-122.6700,,
";
        let stops = parse_stops(data.as_bytes()).unwrap();

        assert_eq!(stops.len(), 2);
        let platform = stops.require_stop(&StopIdentifier::new("PLATFORM_1")).unwrap();
        assert_eq!(platform.location, Point::new(-122.6765, 45.5231));
        assert!(stops.contains_stop(&StopIdentifier::new("STOP_2")));
        assert!(!stops.contains_stop(&StopIdentifier::new("STATION")));
    }

    #[test]
    fn test_parse_stops_without_location_type_column() {
        let data = "stop_id,stop_lat,stop_lon\nA,1.0,2.0\nB,3.0,4.0\n";
        let stops = parse_stops(data.as_bytes()).unwrap();
        assert_eq!(stops.len(), 2);
    }

    #[test]
    fn test_parse_stops_rejects_duplicates() {
        let data = "stop_id,stop_lat,stop_lon\nA,1.0,2.0\nA,3.0,4.0\n";
        assert!(parse_stops(data.as_bytes()).is_err());
    }

    #[test]
    fn test_parse_stops_requires_coordinates() {
        let data = "stop_id,stop_lat,stop_lon\nA,,\n";
        assert!(parse_stops(data.as_bytes()).is_err());
    }

    #[test]
    fn test_extract_buffers() {
        let geojson: GeoJson = r#"{
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "properties": {"stop_id": "A"},
                    "geometry": {"type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,1],[0,0]]]}
                },
                {
                    "type": "Feature",
                    "properties": {"stop_id": 42},
                    "geometry": {"type": "MultiPolygon", "coordinates": [
                        [[[5,5],[6,5],[6,6],[5,5]]],
                        [[[8,8],[9,8],[9,9],[8,8]]]
                    ]}
                }
            ]
        }"#
        .parse()
        .unwrap();

        let buffers = extract_buffers(geojson).unwrap();
        assert_eq!(buffers.len(), 3);
        assert_eq!(buffers[0].stop_id.as_str(), "A");
        assert_eq!(buffers[0].geometry.exterior().0.len(), 5);
        assert!(buffers[1..].iter().all(|b| b.stop_id.as_str() == "42"));
    }

    #[test]
    fn test_extract_buffers_requires_stop_id() {
        let geojson: GeoJson = r#"{
            "type": "Feature",
            "properties": {"name": "nope"},
            "geometry": {"type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,0]]]}
        }"#
        .parse()
        .unwrap();
        assert!(extract_buffers(geojson).is_err());
    }

    #[test]
    fn test_extract_buffers_rejects_points() {
        let geojson: GeoJson = r#"{
            "type": "Feature",
            "properties": {"stop_id": "A"},
            "geometry": {"type": "Point", "coordinates": [0, 0]}
        }"#
        .parse()
        .unwrap();
        assert!(extract_buffers(geojson).is_err());
    }
}
