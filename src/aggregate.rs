use std::time::Instant;

use geo::{Area, BooleanOps, BoundingRect, Contains, MultiPolygon, Polygon};
use rayon::prelude::*;
use rstar::RTree;

use crate::config::Config;
use crate::error::RunError;
use crate::geom::{envelope, repair, BoundingBox};
use crate::manifest::{IssueKind, Manifest};
use crate::types::{Parcel, ParcelSummary, ResolvedRegion};

/// Output of [`aggregate`]: one summary per parcel, in input order.
#[derive(Debug, Clone, Default)]
pub struct Aggregation {
    pub summaries: Vec<ParcelSummary>,
    pub manifest: Manifest,
}

/// Compute impervious coverage per parcel from the resolved regions.
///
/// Every parcel gets a summary, including parcels without any coverage and
/// parcels whose geometry is unusable (flagged, all zero).
pub fn aggregate(regions: &[ResolvedRegion], parcels: &[Parcel], config: &Config) -> Result<Aggregation, RunError> {
    if parcels.is_empty() { return Err(RunError::NoParcels) }
    config.validate()?;
    let start = Instant::now();

    let mut manifest = Manifest::default();
    let cleansed;
    let parcels = if config.drop_nested_parcels {
        let (kept, nested) = drop_nested_parcels(parcels);
        tracing::info!(dropped = nested.len(), "dropped nested parcels");
        manifest.nested_parcels = nested;
        cleansed = kept;
        &cleansed[..]
    } else {
        parcels
    };

    let rtree = RTree::bulk_load(regions.iter().enumerate()
        .filter_map(|(i, region)| BoundingBox::of(i, &region.geometry))
        .collect());

    let results = parcels.par_iter()
        .map(|parcel| summarize(parcel, regions, &rtree, config))
        .collect::<Vec<_>>();

    let mut summaries = Vec::with_capacity(results.len());
    for (summary, flag) in results {
        if let Some((kind, reason)) = flag {
            manifest.flag_parcel(&summary.parcel_id, kind, reason);
        }
        summaries.push(summary);
    }

    tracing::info!(parcels = summaries.len(), flagged = manifest.flagged_parcels.len(), "aggregation complete");
    tracing::debug!(elapsed = ?start.elapsed(), "aggregation timing");
    Ok(Aggregation { summaries, manifest })
}

/// Clip every region near the parcel against it and sum the areas.
fn summarize(
    parcel: &Parcel,
    regions: &[ResolvedRegion],
    rtree: &RTree<BoundingBox>,
    config: &Config,
) -> (ParcelSummary, Option<(IssueKind, String)>) {
    let geometry = match repair(&parcel.geometry, config.repair_tolerance) {
        Ok(geometry) => geometry,
        Err(err) => {
            let mut summary = ParcelSummary::empty(parcel.id.clone(), parcel.area());
            summary.flagged = true;
            return (summary, Some((IssueKind::InvalidGeometry, err.to_string())))
        }
    };

    let parcel_area = geometry.unsigned_area();
    let mut summary = ParcelSummary::empty(parcel.id.clone(), parcel_area);
    if let Some(rect) = geometry.bounding_rect() {
        for bb in rtree.locate_in_envelope_intersecting(&envelope(&rect)) {
            let region = &regions[bb.idx()];
            let area = geometry.iter()
                .map(|part| part.intersection(&region.geometry).unsigned_area())
                .sum::<f64>();
            if area > 0.0 {
                *summary.area_by_category.entry(region.category).or_insert(0.0) += area;
                summary.total_impervious_area += area;
            }
        }
    }

    let total = summary.total_impervious_area;
    summary.pervious_area = (parcel_area - total).max(0.0);

    let slack = config.area_tolerance * parcel_area.max(1.0);
    if total < -slack || total > parcel_area + slack {
        summary.flagged = true;
        let reason = format!("impervious total {total} outside [0, {parcel_area}]");
        return (summary, Some((IssueKind::AggregationMismatch, reason)))
    }
    (summary, None)
}

/// Remove parcels nested inside container parcels.
///
/// A container is a parcel with interior rings (e.g. a common-area parcel
/// around condominium boxes). Container holes are filled, and every other
/// parcel whose parts all lie within a container's filled exterior is dropped.
/// Returns the kept parcels (holes filled) and the ids of dropped parcels.
pub fn drop_nested_parcels(parcels: &[Parcel]) -> (Vec<Parcel>, Vec<String>) {
    let filled = parcels.iter()
        .map(|parcel| MultiPolygon::new(parcel.geometry.iter()
            .map(|part| Polygon::new(part.exterior().clone(), vec![]))
            .collect()))
        .collect::<Vec<_>>();
    let is_container = parcels.iter()
        .map(|parcel| parcel.geometry.iter().any(|part| !part.interiors().is_empty()))
        .collect::<Vec<_>>();

    let containers: RTree<BoundingBox> = RTree::bulk_load(filled.iter().enumerate()
        .filter(|&(i, _)| is_container[i])
        .filter_map(|(i, shape)| BoundingBox::of(i, shape))
        .collect());

    let nested = (0..parcels.len()).into_par_iter()
        .map(|i| {
            if is_container[i] || filled[i].0.is_empty() { return false }
            filled[i].iter().all(|part| {
                let Some(rect) = part.bounding_rect() else { return false };
                containers.locate_in_envelope_intersecting(&envelope(&rect))
                    .any(|bb| bb.idx() != i && filled[bb.idx()].iter().any(|outer| outer.contains(part)))
            })
        })
        .collect::<Vec<_>>();

    let mut kept = Vec::new();
    let mut dropped = Vec::new();
    for ((parcel, shape), nested) in parcels.iter().zip(filled).zip(nested) {
        if nested {
            dropped.push(parcel.id.clone());
        } else {
            kept.push(Parcel::new(parcel.id.clone(), shape));
        }
    }
    (kept, dropped)
}
