use std::collections::BTreeSet;

use geo::{Area, Polygon};

use super::{Category, SourceId};

/// One face of the resolved partition, owned by exactly one category.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRegion {
    pub geometry: Polygon<f64>,
    pub category: Category,
    pub source_ids: BTreeSet<SourceId>, // Features whose geometry overlaps this region
}

impl ResolvedRegion {
    #[inline] pub fn area(&self) -> f64 { self.geometry.unsigned_area() }
}
