use std::time::Instant;

use ahash::AHashMap;
use anyhow::{Context, Result};

use crate::aggregate::aggregate;
use crate::config::Config;
use crate::error::{GeometryError, RunError};
use crate::fingerprint::LayerFingerprints;
use crate::io::wkb::multipolygon_from_wkb;
use crate::manifest::{IssueKind, Manifest};
use crate::resolve::{repair_layer, resolve, Layer};
use crate::source::{LayerSource, ParcelSource, Sink};
use crate::types::{Category, Feature, Parcel, ParcelSummary, Record, ResolvedRegion};

/// Layer key used for the parcel source in [`LayerFingerprints`].
pub const PARCELS_LAYER: &str = "parcels";

/// Everything a run needs, decoded and in memory.
#[derive(Debug, Clone, Default)]
pub struct Inputs {
    pub layers: Vec<Layer>,
    pub parcels: Vec<Parcel>,
    pub fingerprints: LayerFingerprints,
    manifest: Manifest,
    undecodable_parcels: AHashMap<String, String>,
}

/// Outputs of a completed run, as handed to the sink.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub regions: Vec<ResolvedRegion>,
    pub summaries: Vec<ParcelSummary>,
    pub manifest: Manifest,
    pub fingerprints: LayerFingerprints,
}

/// Decode a record's WKB, or report why it cannot be decoded.
fn decode_record(record: &Record) -> Result<geo::MultiPolygon<f64>, GeometryError> {
    if let Some(defect) = &record.defect {
        return Err(GeometryError::Undecodable(defect.clone()))
    }
    multipolygon_from_wkb(&record.wkb).map_err(|err| GeometryError::Undecodable(format!("{err:#}")))
}

/// Decode WKB records into features. Undecodable or defective records are
/// excluded with an `InvalidGeometry` entry.
pub fn decode_features(category: Category, records: Vec<Record>, manifest: &mut Manifest) -> Vec<Feature> {
    records.into_iter()
        .filter_map(|record| match decode_record(&record) {
            Ok(geometry) => Some(Feature::new(record.id, category, geometry)),
            Err(err) => {
                manifest.exclude(category, &record.id, IssueKind::InvalidGeometry, err);
                None
            }
        })
        .collect()
}

/// Decode parcel records. Undecodable parcels keep an empty geometry so they
/// still receive a (flagged) summary; the decoding error is returned by id.
fn decode_parcels(records: Vec<Record>) -> (Vec<Parcel>, AHashMap<String, String>) {
    let mut errors = AHashMap::new();
    let parcels = records.into_iter()
        .map(|record| {
            let geometry = decode_record(&record).unwrap_or_else(|err| {
                errors.insert(record.id.clone(), err.to_string());
                geo::MultiPolygon::new(vec![])
            });
            Parcel::new(record.id, geometry)
        })
        .collect();
    (parcels, errors)
}

/// Load and decode every layer in priority order, plus the parcels.
pub fn load(config: &Config, layers: &impl LayerSource, parcels: &impl ParcelSource) -> Result<Inputs> {
    config.validate()?;
    let start = Instant::now();
    let mut inputs = Inputs::default();

    for category in config.priority.iter() {
        let records = layers.load(category)
            .with_context(|| format!("[pipeline] Failed to load {category} layer"))?;
        tracing::info!(%category, records = records.len(), "loaded layer");
        inputs.fingerprints.insert(category.to_str(), &records);
        let features = decode_features(category, records, &mut inputs.manifest);
        inputs.layers.push(Layer::new(category, features));
    }

    let records = parcels.parcels().context("[pipeline] Failed to load parcels")?;
    if records.is_empty() { return Err(RunError::NoParcels.into()) }
    tracing::info!(records = records.len(), "loaded parcels");
    inputs.fingerprints.insert(PARCELS_LAYER, &records);
    (inputs.parcels, inputs.undecodable_parcels) = decode_parcels(records);

    tracing::debug!(elapsed = ?start.elapsed(), "load timing");
    Ok(inputs)
}

/// Resolve, aggregate and hand everything to the sink.
pub fn execute(config: &Config, inputs: Inputs, sink: &mut impl Sink) -> Result<RunReport> {
    let Inputs { layers, parcels, fingerprints, mut manifest, mut undecodable_parcels } = inputs;

    let resolution = resolve(layers, config)?;
    let mut aggregation = aggregate(&resolution.regions, &parcels, config)?;
    for flag in aggregation.manifest.flagged_parcels.iter_mut() {
        if let Some(reason) = undecodable_parcels.remove(&flag.parcel_id) {
            flag.reason = reason;
        }
    }

    manifest.merge(resolution.manifest);
    manifest.merge(aggregation.manifest);
    if manifest.is_degraded() {
        tracing::warn!(failed = manifest.failed_categories.len(), "run completed in degraded state");
    }

    sink.write_regions(&resolution.regions).context("[pipeline] Failed to write regions")?;
    sink.write_summaries(&aggregation.summaries).context("[pipeline] Failed to write summaries")?;
    sink.write_manifest(&manifest).context("[pipeline] Failed to write manifest")?;

    Ok(RunReport {
        regions: resolution.regions,
        summaries: aggregation.summaries,
        manifest,
        fingerprints,
    })
}

/// Full run: load, resolve, aggregate, write.
pub fn run(
    config: &Config,
    layers: &impl LayerSource,
    parcels: &impl ParcelSource,
    sink: &mut impl Sink,
) -> Result<RunReport> {
    let inputs = load(config, layers, parcels)?;
    execute(config, inputs, sink)
}

/// Decode and repair every layer without resolving. Returns the manifest of
/// excluded features and empty categories.
pub fn check(config: &Config, layers: &impl LayerSource) -> Result<Manifest> {
    config.validate()?;
    let mut manifest = Manifest::default();
    for category in config.priority.iter() {
        let records = layers.load(category)
            .with_context(|| format!("[pipeline] Failed to load {category} layer"))?;
        let layer = Layer::new(category, decode_features(category, records, &mut manifest));
        if repair_layer(&layer, config.repair_tolerance, &mut manifest).is_empty() {
            manifest.empty_categories.push(category);
        }
    }
    Ok(manifest)
}
