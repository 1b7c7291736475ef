use std::collections::BTreeMap;

use geo::{Area, MultiPolygon};
use serde::{Deserialize, Serialize};

use super::Category;

/// Billing parcel, read-only input to aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct Parcel {
    pub id: String,
    pub geometry: MultiPolygon<f64>,
}

impl Parcel {
    pub fn new(id: impl Into<String>, geometry: impl Into<MultiPolygon<f64>>) -> Self {
        Self { id: id.into(), geometry: geometry.into() }
    }

    #[inline] pub fn area(&self) -> f64 { self.geometry.unsigned_area() }
}

/// Impervious coverage of a single parcel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParcelSummary {
    pub parcel_id: String,
    pub parcel_area: f64,
    pub total_impervious_area: f64,
    pub pervious_area: f64,
    pub area_by_category: BTreeMap<Category, f64>,
    /// Set when the numbers should not be trusted, see the run manifest.
    pub flagged: bool,
}

impl ParcelSummary {
    /// A summary with zero coverage in every category.
    pub fn empty(parcel_id: impl Into<String>, parcel_area: f64) -> Self {
        Self {
            parcel_id: parcel_id.into(),
            parcel_area,
            total_impervious_area: 0.0,
            pervious_area: parcel_area,
            area_by_category: Category::ALL.into_iter().map(|c| (c, 0.0)).collect(),
            flagged: false,
        }
    }

    #[inline]
    pub fn area_of(&self, category: Category) -> f64 {
        self.area_by_category.get(&category).copied().unwrap_or(0.0)
    }
}
