//! Format-specific reading and writing.
//!
//! - `wkb` - Well-Known Binary, the wire format of layer and parcel records
//! - `geojson` - GeoJSON FeatureCollections for file-based layers and region export

pub mod geojson;
pub mod wkb;
