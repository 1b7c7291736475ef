use geo::{BooleanOps, Coord, CoordsIter, LineString, MultiPolygon, Polygon, Validation};

use crate::error::GeometryError;
use super::geom::cascaded_union;

/// Repair a feature geometry so it can take part in boolean operations.
///
/// Rejects non-finite coordinates, merges consecutive vertices closer than
/// `tolerance`, closes open rings and drops rings that are degenerate (fewer
/// than four coordinates or area at most `tolerance²`). A dropped shell takes
/// its holes with it. If the cleaned geometry is still invalid, every polygon
/// is re-noded through a boolean union, which splits self-intersecting rings
/// into simple ones, and the parts are unioned together.
pub fn repair(geometry: &MultiPolygon<f64>, tolerance: f64) -> Result<MultiPolygon<f64>, GeometryError> {
    if geometry.coords_iter().any(|c| !c.x.is_finite() || !c.y.is_finite()) {
        return Err(GeometryError::NonFinite)
    }

    let min_ring_area = tolerance * tolerance;
    let cleaned = MultiPolygon::new(geometry.iter()
        .filter_map(|polygon| clean_polygon(polygon, tolerance, min_ring_area))
        .collect());
    if cleaned.0.is_empty() { return Err(GeometryError::Empty) }
    if cleaned.is_valid() { return Ok(cleaned) }

    let renoded = cascaded_union(cleaned.iter().map(renode).collect());
    let renoded = MultiPolygon::new(renoded.0.into_iter()
        .filter_map(|polygon| clean_polygon(&polygon, tolerance, min_ring_area))
        .collect());

    if renoded.0.is_empty() { return Err(GeometryError::Empty) }
    if !renoded.is_valid() { return Err(GeometryError::Unrepairable) }
    Ok(renoded)
}

/// Re-node a single polygon by running it through a union with nothing.
fn renode(polygon: &Polygon<f64>) -> MultiPolygon<f64> {
    MultiPolygon::new(vec![polygon.clone()]).union(&MultiPolygon::new(vec![]))
}

fn clean_polygon(polygon: &Polygon<f64>, tolerance: f64, min_area: f64) -> Option<Polygon<f64>> {
    let exterior = clean_ring(polygon.exterior(), tolerance, min_area)?;
    let interiors = polygon.interiors().iter()
        .filter_map(|ring| clean_ring(ring, tolerance, min_area))
        .collect();
    Some(Polygon::new(exterior, interiors))
}

/// Remove repeated vertices, close the ring, and reject it if it has no area.
fn clean_ring(ring: &LineString<f64>, tolerance: f64, min_area: f64) -> Option<LineString<f64>> {
    let mut coords: Vec<Coord<f64>> = Vec::with_capacity(ring.0.len() + 1);
    for &coord in ring.0.iter() {
        if coords.last().is_some_and(|&last| distance(last, coord) <= tolerance) { continue }
        coords.push(coord);
    }

    let first = *coords.first()?;
    if coords.len() > 1 && coords.last().is_some_and(|&last| distance(first, last) <= tolerance) {
        coords.pop();
    }
    coords.push(first);

    if coords.len() < 4 || signed_area(&coords).abs() <= min_area { return None }
    Some(LineString::new(coords))
}

#[inline]
fn distance(a: Coord<f64>, b: Coord<f64>) -> f64 { (a.x - b.x).hypot(a.y - b.y) }

/// Shoelace area of a closed coordinate list (negative when clockwise).
fn signed_area(pts: &[Coord<f64>]) -> f64 {
    let mut a = 0.0;
    for w in pts.windows(2) {
        a += w[0].x * w[1].y - w[1].x * w[0].y;
    }
    a / 2.0
}
