use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{error::RunError, types::Category};

/// Validated resolution order: non-empty, every category at most once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Category>", into = "Vec<Category>")]
pub struct Priority(Vec<Category>);

impl Priority {
    pub fn new(order: Vec<Category>) -> Result<Self, RunError> {
        if order.is_empty() { return Err(RunError::EmptyPriority) }
        for (i, category) in order.iter().enumerate() {
            if order[..i].contains(category) {
                return Err(RunError::DuplicatePriority(*category))
            }
        }
        Ok(Self(order))
    }

    /// Position of the category in the order, `None` if it is not ranked.
    #[inline]
    pub fn rank_of(&self, category: Category) -> Option<usize> {
        self.0.iter().position(|&c| c == category)
    }

    #[inline] pub fn categories(&self) -> &[Category] { &self.0 }

    #[inline] pub fn iter(&self) -> impl Iterator<Item = Category> + '_ { self.0.iter().copied() }
}

impl Default for Priority {
    fn default() -> Self { Self(Category::ALL.to_vec()) }
}

impl TryFrom<Vec<Category>> for Priority {
    type Error = RunError;

    fn try_from(order: Vec<Category>) -> Result<Self, Self::Error> { Priority::new(order) }
}

impl From<Priority> for Vec<Category> {
    fn from(priority: Priority) -> Self { priority.0 }
}

/// Tunables consumed by the resolver and the aggregator.
///
/// Areas and lengths are in the units of the source coordinate reference
/// system (typically square feet or square meters of a projected CRS).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Category resolution order, highest priority first.
    pub priority: Priority,
    /// Resolved polygons smaller than this are dropped as slivers.
    pub min_sliver_area: f64,
    /// Vertices closer than this are merged during repair.
    pub repair_tolerance: f64,
    /// Slack allowed when checking a parcel's impervious total against its
    /// area, relative to the parcel area (absolute below one square unit).
    pub area_tolerance: f64,
    /// Merge same-category features that only touch (no shared area).
    pub merge_touching: bool,
    /// Drop parcels nested inside container parcels before aggregation.
    pub drop_nested_parcels: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            priority: Priority::default(),
            min_sliver_area: 0.01,
            repair_tolerance: 1e-9,
            area_tolerance: 1e-8,
            merge_touching: false,
            drop_nested_parcels: false,
        }
    }
}

impl Config {
    /// Read a configuration from a JSON file. Missing fields take defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("[config] Failed to read {}", path.display()))?;
        let config: Config = serde_json::from_slice(&bytes)
            .with_context(|| format!("[config] Failed to parse {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every tolerance is a finite, non-negative number.
    pub fn validate(&self) -> Result<(), RunError> {
        for (name, value) in [
            ("min_sliver_area", self.min_sliver_area),
            ("repair_tolerance", self.repair_tolerance),
            ("area_tolerance", self.area_tolerance),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(RunError::InvalidConfig(format!("{name} must be finite and non-negative, got {value}")))
            }
        }
        Ok(())
    }
}
