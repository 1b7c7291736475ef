use std::fmt;

use geo::MultiPolygon;
use serde::{Deserialize, Serialize};

use super::Category;

/// Raw record handed over by a layer or parcel source: an identifier and the
/// WKB-encoded polygon or multipolygon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub id: String,
    pub wkb: Vec<u8>,
    pub defect: Option<String>, // Why the source could not produce WKB, if it could not
}

impl Record {
    pub fn new(id: impl Into<String>, wkb: Vec<u8>) -> Self { Self { id: id.into(), wkb, defect: None } }

    /// A record whose geometry the source could not read. Decoding excludes it
    /// with the given reason.
    pub fn defective(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self { id: id.into(), wkb: Vec::new(), defect: Some(reason.into()) }
    }
}

/// Globally unique key of a feature. Feature ids are only unique within their
/// category, so the category is part of the key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceId {
    pub category: Category,
    pub id: String,
}

impl SourceId {
    pub fn new(category: Category, id: impl Into<String>) -> Self {
        Self { category, id: id.into() }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.category, self.id)
    }
}

/// A single planimetric feature of one surface category.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub id: String,
    pub category: Category,
    pub geometry: MultiPolygon<f64>,
    pub valid: bool, // Passed the validity-repair pass
}

impl Feature {
    /// Construct a feature that has not been through repair yet.
    pub fn new(id: impl Into<String>, category: Category, geometry: impl Into<MultiPolygon<f64>>) -> Self {
        Self { id: id.into(), category, geometry: geometry.into(), valid: false }
    }
}
