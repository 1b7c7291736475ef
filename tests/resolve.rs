// Integration tests for the priority resolver:
//   documented scenarios, area conservation, non-overlap, priority
//   correctness, load-order independence and idempotence.

use geo::{polygon, Area, BooleanOps, MultiPolygon, Polygon};
use impervious::{resolve, Category, Config, Feature, IssueKind, Layer, Resolution, SourceId};

const EPS: f64 = 1e-6;

fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Polygon<f64> {
    polygon![(x: x0, y: y0), (x: x1, y: y0), (x: x1, y: y1), (x: x0, y: y1)]
}

fn feature(id: &str, category: Category, geometry: Polygon<f64>) -> Feature {
    Feature::new(id, category, geometry)
}

fn union_area(layers: &[Layer]) -> f64 {
    layers.iter()
        .flat_map(|layer| layer.features.iter())
        .fold(MultiPolygon::new(vec![]), |acc, f| acc.union(&f.geometry))
        .unsigned_area()
}

/// A handful of overlapping features spread over several categories.
fn city_block() -> Vec<Layer> {
    vec![
        Layer::new(Category::Driveway, vec![
            feature("d1", Category::Driveway, rect(8.0, 2.0, 14.0, 6.0)),
            feature("d2", Category::Driveway, rect(12.0, 4.0, 16.0, 12.0)),
        ]),
        Layer::new(Category::Building, vec![
            feature("b1", Category::Building, rect(0.0, 0.0, 10.0, 10.0)),
            feature("b2", Category::Building, rect(20.0, 0.0, 30.0, 10.0)),
        ]),
        Layer::new(Category::Road, vec![
            feature("r1", Category::Road, rect(-5.0, 10.0, 40.0, 15.0)),
        ]),
        Layer::new(Category::Sidewalk, vec![
            feature("s1", Category::Sidewalk, rect(-5.0, 9.0, 40.0, 11.0)),
        ]),
        Layer::new(Category::ParkingLot, vec![
            feature("p1", Category::ParkingLot, rect(25.0, 5.0, 35.0, 12.0)),
        ]),
    ]
}

fn resolve_default(layers: Vec<Layer>) -> Resolution {
    resolve(layers, &Config::default()).unwrap()
}

#[test]
fn building_over_inner_driveway_keeps_only_building() {
    let layers = vec![
        Layer::new(Category::Building, vec![feature("B", Category::Building, rect(0.0, 0.0, 10.0, 10.0))]),
        Layer::new(Category::Driveway, vec![feature("D", Category::Driveway, rect(1.0, 1.0, 8.5, 9.0))]),
    ];
    let resolution = resolve_default(layers);

    assert_eq!(resolution.regions.len(), 1);
    let region = &resolution.regions[0];
    assert_eq!(region.category, Category::Building);
    assert!((region.area() - 100.0).abs() < EPS);
    assert!(resolution.area_by_category().get(&Category::Driveway).is_none());
}

#[test]
fn overlapping_driveways_merge_into_one_region() {
    let layers = vec![Layer::new(Category::Driveway, vec![
        feature("D1", Category::Driveway, rect(0.0, 0.0, 10.0, 5.0)),
        feature("D2", Category::Driveway, rect(6.0, 0.0, 16.0, 5.0)),
    ])];
    let resolution = resolve_default(layers);

    assert_eq!(resolution.regions.len(), 1);
    let region = &resolution.regions[0];
    assert!((region.area() - 80.0).abs() < EPS);
    assert_eq!(
        region.source_ids.iter().cloned().collect::<Vec<_>>(),
        vec![SourceId::new(Category::Driveway, "D1"), SourceId::new(Category::Driveway, "D2")],
    );
}

#[test]
fn touching_same_category_features_stay_separate_by_default() {
    let layers = || vec![Layer::new(Category::Sidewalk, vec![
        feature("s1", Category::Sidewalk, rect(0.0, 0.0, 5.0, 1.0)),
        feature("s2", Category::Sidewalk, rect(5.0, 0.0, 10.0, 1.0)),
    ])];

    let separate = resolve_default(layers());
    assert_eq!(separate.regions.len(), 2);
    assert!(separate.regions.iter().all(|r| r.source_ids.len() == 1));

    let config = Config { merge_touching: true, ..Config::default() };
    let merged = resolve(layers(), &config).unwrap();
    assert_eq!(merged.regions.len(), 1);
    assert_eq!(merged.regions[0].source_ids.len(), 2);
    assert!((merged.total_area() - 10.0).abs() < EPS);
}

#[test]
fn unrepairable_feature_is_excluded_and_run_completes() {
    let spike = polygon![(x: 0.0, y: 0.0), (x: 4.0, y: 0.0), (x: 2.0, y: 0.0), (x: 6.0, y: 0.0)];
    let layers = vec![Layer::new(Category::Road, vec![
        feature("bad", Category::Road, spike),
        feature("good", Category::Road, rect(0.0, 0.0, 4.0, 4.0)),
    ])];
    let resolution = resolve_default(layers);

    assert_eq!(resolution.regions.len(), 1);
    assert!((resolution.total_area() - 16.0).abs() < EPS);
    let excluded = resolution.manifest.exclusion(Category::Road, "bad").unwrap();
    assert_eq!(excluded.kind, IssueKind::InvalidGeometry);
    assert!(!resolution.manifest.is_degraded());
}

#[test]
fn area_is_conserved() {
    let layers = city_block();
    let expected = union_area(&layers);
    let resolution = resolve_default(layers);
    assert!((resolution.total_area() - expected).abs() < EPS);
    assert!((resolution.impervious_extent().unsigned_area() - expected).abs() < EPS);
}

#[test]
fn regions_never_overlap() {
    let resolution = resolve_default(city_block());
    let regions = &resolution.regions;
    for i in 0..regions.len() {
        for j in (i + 1)..regions.len() {
            let overlap = regions[i].geometry.intersection(&regions[j].geometry).unsigned_area();
            assert!(overlap < EPS, "regions {i} and {j} overlap by {overlap}");
        }
    }
}

#[test]
fn higher_priority_owns_the_overlap() {
    let resolution = resolve_default(city_block());
    let areas = resolution.area_by_category();

    assert!((areas[&Category::Building] - 200.0).abs() < EPS);
    // The road only touches the buildings.
    assert!((areas[&Category::Road] - 225.0).abs() < EPS);
    // d1 and d2 share 4, lose 8 to b1 and 8 to the road.
    assert!((areas[&Category::Driveway] - 36.0).abs() < EPS);
    // Of the sidewalk strip only the gaps of y in [9, 10] survive:
    // x in [-5, 0], [10, 12], [16, 20] and [35, 40].
    assert!((areas[&Category::Sidewalk] - 16.0).abs() < EPS);
    // Parking lot loses its overlap with b2 (5 x 5) and with the road (10 x 2).
    assert!((areas[&Category::ParkingLot] - (70.0 - 25.0 - 20.0)).abs() < EPS);

    // No driveway area may sit inside the building footprint b1.
    let b1 = rect(0.0, 0.0, 10.0, 10.0);
    for region in resolution.regions.iter().filter(|r| r.category == Category::Driveway) {
        assert!(region.geometry.intersection(&b1).unsigned_area() < EPS);
    }
}

#[test]
fn load_order_does_not_matter() {
    let forward = resolve_default(city_block());
    let mut layers = city_block();
    layers.reverse();
    let reversed = resolve_default(layers);

    assert_eq!(forward.regions, reversed.regions);
}

#[test]
fn resolution_is_idempotent() {
    let first = resolve_default(city_block());
    let second = resolve_default(city_block());
    assert_eq!(first.regions, second.regions);
    assert_eq!(first.area_by_category(), second.area_by_category());
}

#[test]
fn custom_priority_changes_the_winner() {
    let layers = || vec![
        Layer::new(Category::Building, vec![feature("b", Category::Building, rect(0.0, 0.0, 10.0, 10.0))]),
        Layer::new(Category::Driveway, vec![feature("d", Category::Driveway, rect(5.0, 0.0, 15.0, 10.0))]),
    ];

    let default = resolve_default(layers());
    assert!((default.area_by_category()[&Category::Building] - 100.0).abs() < EPS);

    let config: Config = serde_json::from_str(r#"{ "priority": ["driveway", "building"] }"#).unwrap();
    let flipped = resolve(layers(), &config).unwrap();
    assert!((flipped.area_by_category()[&Category::Driveway] - 100.0).abs() < EPS);
    assert!((flipped.area_by_category()[&Category::Building] - 50.0).abs() < EPS);
}

#[test]
fn slivers_below_threshold_are_dropped() {
    let layers = || vec![
        Layer::new(Category::Building, vec![feature("b", Category::Building, rect(0.0, 0.0, 10.0, 10.0))]),
        Layer::new(Category::Road, vec![feature("r", Category::Road, rect(0.0, 0.0, 10.0, 10.05))]),
    ];

    // The road pokes out by a 10 x 0.05 strip.
    let kept = resolve(layers(), &Config { min_sliver_area: 0.0, ..Config::default() }).unwrap();
    assert!((kept.area_by_category()[&Category::Road] - 0.5).abs() < EPS);

    let dropped = resolve(layers(), &Config { min_sliver_area: 1.0, ..Config::default() }).unwrap();
    assert!(dropped.area_by_category().get(&Category::Road).is_none());
}

#[test]
fn dropped_slivers_stay_with_their_category() {
    let layers = vec![
        Layer::new(Category::Median, vec![feature("m", Category::Median, rect(0.0, 0.0, 10.0, 10.0))]),
        Layer::new(Category::Building, vec![feature("b", Category::Building, rect(0.0, 0.0, 10.0, 10.0005))]),
        Layer::new(Category::Road, vec![feature("r", Category::Road, rect(0.0, 0.0, 10.0, 20.0))]),
    ];
    let resolution = resolve_default(layers);
    let areas = resolution.area_by_category();

    // The building only reaches 0.005 past the median, below the sliver threshold.
    assert!(areas.get(&Category::Building).is_none());
    assert!((areas[&Category::Road] - 99.995).abs() < 1e-4);

    let strip = rect(0.0, 10.0, 10.0, 10.0005);
    for region in resolution.regions.iter().filter(|r| r.category == Category::Road) {
        assert!(region.geometry.intersection(&strip).unsigned_area() < 1e-6);
    }
}
