//! WKB writing operations.

use geo::{LineString, MultiPolygon, Polygon};

use super::{WKB_LE, WKB_MULTIPOLYGON, WKB_POLYGON};

fn write_ring(wkb: &mut Vec<u8>, ring: &LineString<f64>) {
    wkb.extend_from_slice(&(ring.0.len() as u32).to_le_bytes());
    for coord in ring.coords() {
        wkb.extend_from_slice(&coord.x.to_le_bytes());
        wkb.extend_from_slice(&coord.y.to_le_bytes());
    }
}

fn write_polygon(wkb: &mut Vec<u8>, polygon: &Polygon<f64>) {
    wkb.push(WKB_LE);
    wkb.extend_from_slice(&WKB_POLYGON.to_le_bytes());
    wkb.extend_from_slice(&((1 + polygon.interiors().len()) as u32).to_le_bytes());
    write_ring(wkb, polygon.exterior());
    for interior in polygon.interiors() {
        write_ring(wkb, interior);
    }
}

/// Encode a Polygon as little-endian WKB.
pub fn polygon_to_wkb(polygon: &Polygon<f64>) -> Vec<u8> {
    let mut wkb = Vec::new();
    write_polygon(&mut wkb, polygon);
    wkb
}

/// Encode a MultiPolygon as little-endian WKB.
pub fn multipolygon_to_wkb(shape: &MultiPolygon<f64>) -> Vec<u8> {
    let mut wkb = Vec::new();
    wkb.push(WKB_LE);
    wkb.extend_from_slice(&WKB_MULTIPOLYGON.to_le_bytes());
    wkb.extend_from_slice(&(shape.0.len() as u32).to_le_bytes());
    for polygon in shape.iter() {
        write_polygon(&mut wkb, polygon);
    }
    wkb
}
