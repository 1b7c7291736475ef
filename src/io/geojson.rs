use anyhow::{anyhow, bail, Context, Result};
use geo::{Coord, LineString, MultiPolygon, Polygon};
use serde_json::{json, Value};

use crate::io::wkb::multipolygon_to_wkb;
use crate::types::{Record, ResolvedRegion};

/// Read a GeoJSON FeatureCollection into WKB records.
///
/// The feature id is taken from `id`, `properties.id` or `properties.guid`,
/// falling back to the feature's position. Geometry is either a GeoJSON
/// Polygon/MultiPolygon or a hex WKB string in `properties.wkb`. A feature
/// whose geometry is null, malformed or not polygonal becomes a
/// [`Record::defective`], so it is excluded on its own instead of failing the
/// whole collection.
pub fn read_records(bytes: &[u8]) -> Result<Vec<Record>> {
    let value: Value = serde_json::from_slice(bytes).context("[io::geojson] Failed to parse GeoJSON bytes")?;
    let features = value["features"].as_array()
        .ok_or_else(|| anyhow!("[io::geojson] Expected a FeatureCollection with a features array"))?;

    Ok(features.iter().enumerate()
        .map(|(idx, feature)| {
            let id = feature_id(feature).unwrap_or_else(|| idx.to_string());
            match feature_wkb(feature) {
                Ok(wkb) => Record::new(id, wkb),
                Err(err) => Record::defective(id, format!("{err:#}")),
            }
        })
        .collect())
}

fn feature_wkb(feature: &Value) -> Result<Vec<u8>> {
    if let Some(hex_wkb) = feature["properties"]["wkb"].as_str() {
        return hex::decode(hex_wkb.trim()).context("[io::geojson] Malformed hex WKB")
    }
    if feature["geometry"].is_null() { bail!("[io::geojson] Null geometry") }
    let shape = geometry_from_geojson(&feature["geometry"]).context("[io::geojson] Unsupported geometry")?;
    Ok(multipolygon_to_wkb(&shape))
}

fn feature_id(feature: &Value) -> Option<String> {
    [&feature["id"], &feature["properties"]["id"], &feature["properties"]["guid"]].into_iter()
        .find_map(|v| match v {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
}

/// Parse a GeoJSON Polygon or MultiPolygon geometry object.
pub fn geometry_from_geojson(geometry: &Value) -> Result<MultiPolygon<f64>> {
    let coords = geometry["coordinates"].as_array()
        .ok_or_else(|| anyhow!("[io::geojson] Geometry has no coordinates array"))?;

    match geometry["type"].as_str() {
        Some("Polygon") => Ok(MultiPolygon::new(vec![parse_polygon_coords(coords)?])),
        Some("MultiPolygon") => coords.iter()
            .map(|polygon| polygon.as_array()
                .ok_or_else(|| anyhow!("[io::geojson] Invalid MultiPolygon member"))
                .and_then(|rings| parse_polygon_coords(rings)))
            .collect::<Result<Vec<_>>>()
            .map(MultiPolygon::new),
        other => bail!("[io::geojson] Expected Polygon or MultiPolygon, got {other:?}"),
    }
}

/// Parse GeoJSON polygon coordinates: `[exterior, hole, hole, ...]`.
fn parse_polygon_coords(rings: &[Value]) -> Result<Polygon<f64>> {
    let mut rings = rings.iter().map(|ring| {
        ring.as_array()
            .ok_or_else(|| anyhow!("[io::geojson] Ring is not an array"))
            .and_then(|coords| parse_ring_coords(coords))
    });
    let exterior = rings.next()
        .ok_or_else(|| anyhow!("[io::geojson] Polygon is missing its exterior ring"))??;
    let interiors = rings.collect::<Result<Vec<_>>>()?;
    Ok(Polygon::new(exterior, interiors))
}

/// Parse a ring from GeoJSON positions `[[x, y], ...]`.
fn parse_ring_coords(coords: &[Value]) -> Result<LineString<f64>> {
    coords.iter()
        .map(|position| {
            let x = position[0].as_f64().ok_or_else(|| anyhow!("[io::geojson] Invalid x coordinate"))?;
            let y = position[1].as_f64().ok_or_else(|| anyhow!("[io::geojson] Invalid y coordinate"))?;
            Ok(Coord { x, y })
        })
        .collect::<Result<Vec<_>>>()
        .map(LineString::new)
}

fn polygon_to_coords(polygon: &Polygon<f64>) -> Vec<Vec<[f64; 2]>> {
    std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .map(|ring| ring.coords().map(|c| [c.x, c.y]).collect())
        .collect()
}

/// Export resolved regions as a GeoJSON FeatureCollection, one feature per
/// region with its category and contributing feature ids.
pub fn regions_to_geojson(regions: &[ResolvedRegion]) -> Value {
    let features = regions.iter().enumerate().map(|(idx, region)| {
        json!({
            "type": "Feature",
            "id": idx,
            "geometry": {
                "type": "Polygon",
                "coordinates": polygon_to_coords(&region.geometry),
            },
            "properties": {
                "category": region.category,
                "area": region.area(),
                "source_ids": region.source_ids.iter().map(|s| s.id.as_str()).collect::<Vec<_>>(),
            },
        })
    }).collect::<Vec<_>>();

    json!({
        "type": "FeatureCollection",
        "features": features,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::wkb::multipolygon_from_wkb;
    use geo::{polygon, Area};

    #[test]
    fn reads_polygon_and_multipolygon_features() {
        let collection = json!({
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "properties": { "guid": "b-1" },
                    "geometry": { "type": "Polygon", "coordinates": [[[0, 0], [4, 0], [4, 4], [0, 4], [0, 0]]] },
                },
                {
                    "type": "Feature",
                    "id": 7,
                    "geometry": {
                        "type": "MultiPolygon",
                        "coordinates": [
                            [[[0, 0], [1, 0], [1, 1], [0, 0]]],
                            [[[5, 5], [6, 5], [6, 6], [5, 5]]],
                        ],
                    },
                },
                { "type": "Feature", "geometry": null },
            ],
        });
        let records = read_records(&serde_json::to_vec(&collection).unwrap()).unwrap();

        assert_eq!(records.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(), vec!["b-1", "7", "2"]);
        assert!((multipolygon_from_wkb(&records[0].wkb).unwrap().unsigned_area() - 16.0).abs() < 1e-12);
        assert_eq!(multipolygon_from_wkb(&records[1].wkb).unwrap().0.len(), 2);
        assert!(records[2].wkb.is_empty());
        assert!(records[2].defect.is_some());
    }

    #[test]
    fn bad_features_become_defective_records() {
        let collection = json!({
            "type": "FeatureCollection",
            "features": [
                { "type": "Feature", "id": "ok", "geometry": { "type": "Polygon", "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 0]]] } },
                { "type": "Feature", "id": "pt", "geometry": { "type": "Point", "coordinates": [1, 2] } },
                { "type": "Feature", "id": "hex", "properties": { "wkb": "zz" }, "geometry": null },
            ],
        });
        let records = read_records(&serde_json::to_vec(&collection).unwrap()).unwrap();

        assert_eq!(records.len(), 3);
        assert!(records[0].defect.is_none());
        assert!(records[1].defect.as_deref().unwrap().contains("Point"));
        assert!(records[2].defect.as_deref().unwrap().contains("hex"));
    }

    #[test]
    fn reads_hex_wkb_property() {
        let shape = MultiPolygon::new(vec![polygon![(x: 0.0, y: 0.0), (x: 2.0, y: 0.0), (x: 2.0, y: 2.0)]]);
        let collection = json!({
            "type": "FeatureCollection",
            "features": [{ "type": "Feature", "properties": { "id": "x", "wkb": hex::encode(multipolygon_to_wkb(&shape)) }, "geometry": null }],
        });
        let records = read_records(&serde_json::to_vec(&collection).unwrap()).unwrap();
        assert_eq!(multipolygon_from_wkb(&records[0].wkb).unwrap(), shape);
    }

    #[test]
    fn rejects_non_polygonal_geometry() {
        let point = json!({ "type": "Point", "coordinates": [1, 2] });
        assert!(geometry_from_geojson(&point).is_err());
        // Only a document that is not a FeatureCollection fails as a whole.
        assert!(read_records(br#"{"type": "Feature"}"#).is_err());
    }
}
