//! Minimal OGC Well-Known Binary codec for polygonal geometry.
//!
//! Reads Polygon and MultiPolygon in either byte order, including PostGIS
//! EWKB with an embedded SRID. Writes little-endian WKB.

mod read;
mod write;

pub use read::multipolygon_from_wkb;
pub use write::{multipolygon_to_wkb, polygon_to_wkb};

/// WKB geometry type for Polygon
const WKB_POLYGON: u32 = 3;
/// WKB geometry type for MultiPolygon
const WKB_MULTIPOLYGON: u32 = 6;
/// WKB byte order: big endian
const WKB_BE: u8 = 0;
/// WKB byte order: little endian
const WKB_LE: u8 = 1;
/// EWKB flag marking an SRID after the geometry type
const EWKB_SRID_FLAG: u32 = 0x2000_0000;
