use serde::{Deserialize, Serialize};

use crate::types::Category;

/// Kind of recoverable problem recorded during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    InvalidGeometry,
    EmptyCategory,
    DegenerateIntersection,
    ResolutionFailure,
    AggregationMismatch,
}

/// A feature that was left out of the resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExcludedFeature {
    pub category: Category,
    pub id: String,
    pub kind: IssueKind,
    pub reason: String,
}

/// A category whose contribution was aborted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryFailure {
    pub category: Category,
    pub kind: IssueKind,
    pub cause: IssueKind,
    pub reason: String,
}

/// A parcel whose summary should not be trusted as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlaggedParcel {
    pub parcel_id: String,
    pub kind: IssueKind,
    pub reason: String,
}

/// Everything a run excluded or flagged, reported next to the main output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub excluded: Vec<ExcludedFeature>,
    pub empty_categories: Vec<Category>,
    pub failed_categories: Vec<CategoryFailure>,
    pub flagged_parcels: Vec<FlaggedParcel>,
    pub nested_parcels: Vec<String>,
}

impl Manifest {
    pub(crate) fn exclude(&mut self, category: Category, id: &str, kind: IssueKind, reason: impl ToString) {
        let reason = reason.to_string();
        tracing::warn!(%category, id, ?kind, %reason, "excluding feature");
        self.excluded.push(ExcludedFeature { category, id: id.to_string(), kind, reason });
    }

    pub(crate) fn fail_category(&mut self, category: Category, reason: impl ToString) {
        let reason = reason.to_string();
        tracing::warn!(%category, %reason, "category contribution aborted");
        self.failed_categories.push(CategoryFailure {
            category,
            kind: IssueKind::ResolutionFailure,
            cause: IssueKind::DegenerateIntersection,
            reason,
        });
    }

    pub(crate) fn flag_parcel(&mut self, parcel_id: &str, kind: IssueKind, reason: impl ToString) {
        let reason = reason.to_string();
        tracing::warn!(parcel_id, ?kind, %reason, "flagging parcel");
        self.flagged_parcels.push(FlaggedParcel { parcel_id: parcel_id.to_string(), kind, reason });
    }

    /// True when at least one category's contribution was aborted.
    #[inline] pub fn is_degraded(&self) -> bool { !self.failed_categories.is_empty() }

    /// True when nothing was excluded, aborted or flagged.
    pub fn is_clean(&self) -> bool {
        self.excluded.is_empty() && self.failed_categories.is_empty() && self.flagged_parcels.is_empty()
    }

    /// Find the exclusion record of a feature, if it was excluded.
    pub fn exclusion(&self, category: Category, id: &str) -> Option<&ExcludedFeature> {
        self.excluded.iter().find(|e| e.category == category && e.id == id)
    }

    /// Append every entry of `other`.
    pub fn merge(&mut self, other: Manifest) {
        self.excluded.extend(other.excluded);
        self.empty_categories.extend(other.empty_categories);
        self.failed_categories.extend(other.failed_categories);
        self.flagged_parcels.extend(other.flagged_parcels);
        self.nested_parcels.extend(other.nested_parcels);
    }
}
