use std::{collections::{BTreeMap, BTreeSet}, time::Instant};

use geo::{Area, BooleanOps, BoundingRect, Intersects, MultiPolygon, Polygon, Validation};
use rayon::prelude::*;
use rstar::RTree;

use crate::config::{Config, Priority};
use crate::error::{GeometryError, RunError};
use crate::geom::{cascaded_union, envelope, repair, split_slivers, BoundingBox, ShapeIndex};
use crate::manifest::{IssueKind, Manifest};
use crate::types::{Category, Feature, ResolvedRegion, SourceId};

/// All features of one surface category.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub category: Category,
    pub features: Vec<Feature>,
}

impl Layer {
    pub fn new(category: Category, features: Vec<Feature>) -> Self { Self { category, features } }

    pub fn empty(category: Category) -> Self { Self::new(category, Vec::new()) }
}

/// Output of [`resolve`]: the disjoint regions and everything that was left out.
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    pub regions: Vec<ResolvedRegion>,
    pub manifest: Manifest,
}

impl Resolution {
    /// Total area of all regions.
    pub fn total_area(&self) -> f64 { self.regions.iter().map(ResolvedRegion::area).sum() }

    /// Resolved area of each category. Categories without regions are absent.
    pub fn area_by_category(&self) -> BTreeMap<Category, f64> {
        let mut areas = BTreeMap::new();
        for region in &self.regions {
            *areas.entry(region.category).or_insert(0.0) += region.area();
        }
        areas
    }

    /// Union of all regions. Dropped slivers are not part of it.
    pub fn impervious_extent(&self) -> MultiPolygon<f64> {
        cascaded_union(self.regions.iter()
            .map(|region| MultiPolygon::new(vec![region.geometry.clone()]))
            .collect())
    }
}

/// Area already owned by higher-priority categories.
///
/// Stored as the interior-disjoint polygons of every region emitted so far,
/// plus the slivers dropped along the way, indexed by bounding box so a subtraction only touches nearby polygons.
#[derive(Debug, Default)]
pub struct Claimed {
    polygons: Vec<Polygon<f64>>,
    rtree: RTree<BoundingBox>,
}

impl Claimed {
    pub fn new() -> Self { Self::default() }

    #[inline] pub fn len(&self) -> usize { self.polygons.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.polygons.is_empty() }

    pub fn area(&self) -> f64 { self.polygons.iter().map(|p| p.unsigned_area()).sum() }

    /// The part of `shape` not claimed yet.
    pub fn subtract(&self, shape: &MultiPolygon<f64>) -> MultiPolygon<f64> {
        let Some(rect) = shape.bounding_rect() else { return MultiPolygon::new(vec![]) };
        let blockers = self.rtree.locate_in_envelope_intersecting(&envelope(&rect))
            .map(|bb| self.polygons[bb.idx()].clone())
            .collect::<Vec<_>>();
        if blockers.is_empty() { return shape.clone() }
        shape.difference(&MultiPolygon::new(blockers))
    }

    /// Claim additional polygons. Callers only pass area that is not claimed yet.
    pub fn extend(mut self, polygons: impl IntoIterator<Item = Polygon<f64>>) -> Self {
        for polygon in polygons {
            if let Some(bb) = BoundingBox::of(self.polygons.len(), &polygon) {
                self.rtree.insert(bb);
            }
            self.polygons.push(polygon);
        }
        self
    }
}

/// Resolve overlapping surface layers into a single planar partition.
///
/// Layers are processed in the configured priority order regardless of the
/// order they are passed in. Each category only receives the area that no
/// higher-priority category claimed before it. Categories in the priority
/// order without a layer are treated as empty.
pub fn resolve(layers: Vec<Layer>, config: &Config) -> Result<Resolution, RunError> {
    resolve_with(layers, config, settle_difference)
}

/// Validity step applied to every cluster difference: `(category, difference,
/// repair tolerance) -> usable difference`.
pub(crate) trait Settle: Fn(Category, MultiPolygon<f64>, f64) -> Result<MultiPolygon<f64>, GeometryError> + Sync {}

impl<F> Settle for F where F: Fn(Category, MultiPolygon<f64>, f64) -> Result<MultiPolygon<f64>, GeometryError> + Sync {}

/// Keep a valid difference, repair an invalid one. A difference that repairs
/// to nothing is an empty difference, not a failure.
pub(crate) fn settle_difference(_category: Category, visible: MultiPolygon<f64>, tolerance: f64) -> Result<MultiPolygon<f64>, GeometryError> {
    if visible.is_valid() { return Ok(visible) }
    match repair(&visible, tolerance) {
        Err(GeometryError::Empty) => Ok(MultiPolygon::new(vec![])),
        result => result,
    }
}

/// [`resolve`] with a custom validity step for cluster differences.
pub(crate) fn resolve_with(layers: Vec<Layer>, config: &Config, settle: impl Settle) -> Result<Resolution, RunError> {
    config.validate()?;
    let layers = order_layers(layers, &config.priority)?;

    let mut manifest = Manifest::default();
    let (claimed, regions) = layers.iter()
        .fold((Claimed::new(), Vec::new()), |(claimed, mut regions), layer| {
            let (claimed, resolved) = resolve_layer(claimed, layer, config, &settle, &mut manifest);
            regions.extend(resolved);
            (claimed, regions)
        });

    tracing::info!(regions = regions.len(), area = claimed.area(), "resolution complete");
    Ok(Resolution { regions, manifest })
}

/// Sort layers by priority rank, filling in empty layers for missing categories.
fn order_layers(layers: Vec<Layer>, priority: &Priority) -> Result<Vec<Layer>, RunError> {
    let mut slots: Vec<Option<Layer>> = vec![None; priority.categories().len()];
    for layer in layers {
        let rank = priority.rank_of(layer.category)
            .ok_or(RunError::UnrankedCategory(layer.category))?;
        if slots[rank].is_some() { return Err(RunError::DuplicateLayer(layer.category)) }
        slots[rank] = Some(layer);
    }
    Ok(priority.iter().zip(slots)
        .map(|(category, slot)| slot.unwrap_or_else(|| Layer::empty(category)))
        .collect())
}

/// Run the repair pass over a layer. Features that cannot be repaired are
/// recorded in the manifest and left out.
pub(crate) fn repair_layer(layer: &Layer, tolerance: f64, manifest: &mut Manifest) -> Vec<Feature> {
    let repaired = layer.features.par_iter()
        .map(|feature| repair(&feature.geometry, tolerance).map(|geometry| Feature {
            id: feature.id.clone(),
            category: layer.category,
            geometry,
            valid: true,
        }))
        .collect::<Vec<_>>();

    layer.features.iter().zip(repaired)
        .filter_map(|(feature, result)| match result {
            Ok(feature) => Some(feature),
            Err(err) => {
                manifest.exclude(layer.category, &feature.id, IssueKind::InvalidGeometry, err);
                None
            }
        })
        .collect()
}

/// One step of the fold: claim the visible part of a single category.
fn resolve_layer(
    claimed: Claimed,
    layer: &Layer,
    config: &Config,
    settle: &impl Settle,
    manifest: &mut Manifest,
) -> (Claimed, Vec<ResolvedRegion>) {
    let start = Instant::now();
    let category = layer.category;

    let features = repair_layer(layer, config.repair_tolerance, manifest);
    if features.is_empty() {
        tracing::info!(%category, "no valid features in category");
        manifest.empty_categories.push(category);
        return (claimed, Vec::new())
    }

    let (ids, shapes): (Vec<String>, Vec<MultiPolygon<f64>>) = features.into_iter()
        .map(|feature| (feature.id, feature.geometry))
        .unzip();
    let clusters = ShapeIndex::new(&shapes).clusters(config.merge_touching);

    // Clusters are interior-disjoint, so each one can be resolved independently.
    let outcomes = clusters.par_iter()
        .map(|members| resolve_cluster(category, members, &shapes, &claimed, config, settle))
        .collect::<Vec<_>>();

    let mut pieces = Vec::new();
    let mut slivers = Vec::new();
    for outcome in outcomes {
        match outcome {
            Ok(resolved) => {
                pieces.extend(resolved.pieces);
                slivers.extend(resolved.slivers);
            }
            Err(reason) => {
                manifest.fail_category(category, reason);
                return (claimed, Vec::new())
            }
        }
    }

    let regions = pieces.into_iter()
        .map(|(geometry, sources)| ResolvedRegion {
            source_ids: sources.into_iter()
                .map(|m| SourceId::new(category, ids[m].clone()))
                .collect::<BTreeSet<_>>(),
            geometry,
            category,
        })
        .collect::<Vec<_>>();

    tracing::info!(
        %category,
        features = ids.len(),
        clusters = clusters.len(),
        regions = regions.len(),
        slivers = slivers.len(),
        "resolved category"
    );
    tracing::debug!(%category, elapsed = ?start.elapsed(), "category timing");

    // Slivers are not emitted but still belong to this category's union.
    let claimed = claimed
        .extend(regions.iter().map(|region| region.geometry.clone()))
        .extend(slivers);
    (claimed, regions)
}

/// Visible part of one cluster: attributed polygons plus the dropped slivers.
struct ClusterResolution {
    pieces: Vec<(Polygon<f64>, Vec<usize>)>,
    slivers: Vec<Polygon<f64>>,
}

/// Union a cluster, subtract the claimed area and attribute each remaining
/// polygon to the members that overlap it.
fn resolve_cluster(
    category: Category,
    members: &[usize],
    shapes: &[MultiPolygon<f64>],
    claimed: &Claimed,
    config: &Config,
    settle: &impl Settle,
) -> Result<ClusterResolution, String> {
    let union = match members {
        [single] => shapes[*single].clone(),
        _ => cascaded_union(members.iter().map(|&m| shapes[m].clone()).collect()),
    };

    let visible = settle(category, claimed.subtract(&union), config.repair_tolerance).map_err(|err| {
        format!("difference for cluster of {} feature(s) is degenerate: {err}", members.len())
    })?;

    let (visible, slivers) = split_slivers(visible, config.min_sliver_area);
    if !slivers.is_empty() {
        tracing::debug!(%category, dropped = slivers.len(), "dropped slivers");
    }

    let pieces = visible.0.into_iter()
        .map(|polygon| {
            let sources = attribute(&polygon, members, shapes);
            (polygon, sources)
        })
        .collect();
    Ok(ClusterResolution { pieces, slivers })
}

/// Members of a cluster that share area with a resolved polygon.
fn attribute(polygon: &Polygon<f64>, members: &[usize], shapes: &[MultiPolygon<f64>]) -> Vec<usize> {
    if let [single] = members { return vec![*single] }

    let target = MultiPolygon::new(vec![polygon.clone()]);
    let overlapping = members.iter().copied()
        .filter(|&m| shapes[m].intersects(&target))
        .collect::<Vec<_>>();
    let sharing_area = overlapping.iter().copied()
        .filter(|&m| shapes[m].intersection(&target).unsigned_area() > 0.0)
        .collect::<Vec<_>>();

    if sharing_area.is_empty() { overlapping } else { sharing_area }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> MultiPolygon<f64> {
        MultiPolygon::new(vec![polygon![(x: x0, y: y0), (x: x1, y: y0), (x: x1, y: y1), (x: x0, y: y1)]])
    }

    #[test]
    fn claimed_subtracts_only_nearby_polygons() {
        let claimed = Claimed::new().extend(rect(0.0, 0.0, 10.0, 10.0).0);
        assert_eq!(claimed.len(), 1);

        let far = rect(20.0, 20.0, 30.0, 30.0);
        assert_eq!(claimed.subtract(&far), far);

        let partial = claimed.subtract(&rect(5.0, 0.0, 15.0, 10.0));
        assert!((partial.unsigned_area() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn order_layers_ranks_and_fills_gaps() {
        let priority = Priority::new(vec![Category::Building, Category::Road, Category::Driveway]).unwrap();
        let ordered = order_layers(vec![Layer::empty(Category::Driveway), Layer::empty(Category::Building)], &priority).unwrap();
        assert_eq!(
            ordered.iter().map(|l| l.category).collect::<Vec<_>>(),
            vec![Category::Building, Category::Road, Category::Driveway],
        );
    }

    #[test]
    fn order_layers_rejects_duplicates_and_unranked() {
        let priority = Priority::new(vec![Category::Building]).unwrap();
        assert_eq!(
            order_layers(vec![Layer::empty(Category::Building), Layer::empty(Category::Building)], &priority),
            Err(RunError::DuplicateLayer(Category::Building)),
        );
        assert_eq!(
            order_layers(vec![Layer::empty(Category::Road)], &priority),
            Err(RunError::UnrankedCategory(Category::Road)),
        );
    }

    #[test]
    fn repair_layer_marks_valid_and_records_failures() {
        let layer = Layer::new(Category::Sidewalk, vec![
            Feature::new("ok", Category::Sidewalk, rect(0.0, 0.0, 1.0, 1.0)),
            Feature::new("flat", Category::Sidewalk, rect(0.0, 0.0, 5.0, 0.0)),
        ]);
        let mut manifest = Manifest::default();
        let repaired = repair_layer(&layer, 1e-9, &mut manifest);

        assert_eq!(repaired.len(), 1);
        assert!(repaired[0].valid);
        let excluded = manifest.exclusion(Category::Sidewalk, "flat").unwrap();
        assert_eq!(excluded.kind, IssueKind::InvalidGeometry);
    }

    #[test]
    fn attribute_ignores_members_that_only_touch() {
        let shapes = vec![rect(0.0, 0.0, 2.0, 2.0), rect(1.0, 0.0, 3.0, 2.0), rect(3.0, 0.0, 4.0, 2.0)];
        let piece = polygon![(x: 0.0, y: 0.0), (x: 3.0, y: 0.0), (x: 3.0, y: 2.0), (x: 0.0, y: 2.0)];
        assert_eq!(attribute(&piece, &[0, 1, 2], &shapes), vec![0, 1]);
    }

    #[test]
    fn degenerate_difference_aborts_only_its_category() {
        let layers = vec![
            Layer::new(Category::Median, vec![Feature::new("m", Category::Median, rect(0.0, 0.0, 10.0, 10.0))]),
            Layer::new(Category::Building, vec![Feature::new("b", Category::Building, rect(10.0, 0.0, 20.0, 10.0))]),
            Layer::new(Category::Road, vec![Feature::new("r", Category::Road, rect(0.0, 0.0, 30.0, 10.0))]),
        ];
        let settle = |category: Category, visible: MultiPolygon<f64>, tolerance: f64| match category {
            Category::Building => Err(GeometryError::Unrepairable),
            _ => settle_difference(category, visible, tolerance),
        };
        let resolution = resolve_with(layers, &Config::default(), settle).unwrap();
        let areas = resolution.area_by_category();

        assert!(areas.get(&Category::Building).is_none());
        assert!((areas[&Category::Median] - 100.0).abs() < 1e-9);
        // The road takes everything the median did not claim, including the building footprint.
        assert!((areas[&Category::Road] - 200.0).abs() < 1e-9);

        assert!(resolution.manifest.is_degraded());
        let failure = &resolution.manifest.failed_categories[0];
        assert_eq!(failure.category, Category::Building);
        assert_eq!(failure.kind, IssueKind::ResolutionFailure);
        assert_eq!(failure.cause, IssueKind::DegenerateIntersection);
    }

    #[test]
    fn settle_difference_treats_collapsed_difference_as_empty() {
        // A ring with two distinct points, as left behind by a difference along a shared edge.
        let collapsed = MultiPolygon::new(vec![polygon![(x: 0.0, y: 0.0), (x: 4.0, y: 0.0)]]);
        let settled = settle_difference(Category::Road, collapsed, 1e-9).unwrap();
        assert!(settled.0.is_empty());
    }

    #[test]
    fn empty_layer_is_recorded_not_fatal() {
        let resolution = resolve(vec![Layer::empty(Category::Median)], &Config::default()).unwrap();
        assert!(resolution.regions.is_empty());
        assert_eq!(resolution.manifest.empty_categories, Category::ALL.to_vec());
    }
}
