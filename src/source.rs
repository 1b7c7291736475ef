use std::path::{Path, PathBuf};

use ahash::AHashMap;
use anyhow::{anyhow, Context, Result};

use crate::io::geojson::{read_records, regions_to_geojson};
use crate::manifest::Manifest;
use crate::types::{Category, ParcelSummary, Record, ResolvedRegion};

/// File name of the resolved surface layer written by [`DiskStore`].
pub const REGIONS_FILE: &str = "impervious_surfaces.geojson";
/// File name of the per-parcel summaries written by [`DiskStore`].
pub const SUMMARIES_FILE: &str = "parcel_summaries.json";
/// File name of the run manifest written by [`DiskStore`].
pub const MANIFEST_FILE: &str = "manifest.json";

/// Read access to the active records of each surface layer.
pub trait LayerSource: Send + Sync {
    fn load(&self, category: Category) -> Result<Vec<Record>>;
}

/// Read access to the billing parcels.
pub trait ParcelSource: Send + Sync {
    fn parcels(&self) -> Result<Vec<Record>>;
}

/// Destination of a run's outputs. Owns the storage format.
pub trait Sink {
    fn write_regions(&mut self, regions: &[ResolvedRegion]) -> Result<()>;
    fn write_summaries(&mut self, summaries: &[ParcelSummary]) -> Result<()>;
    fn write_manifest(&mut self, manifest: &Manifest) -> Result<()>;
}

/// Simple disk-based store.
///
/// Layers are read from `<layers_dir>/<category>.geojson` (a missing file is
/// an empty layer), parcels from a GeoJSON file, outputs are written as JSON
/// into the output directory.
#[derive(Debug, Clone)]
pub struct DiskStore {
    layers_dir: PathBuf,
    parcels_path: Option<PathBuf>,
    output_dir: Option<PathBuf>,
}

impl DiskStore {
    pub fn new(layers_dir: impl Into<PathBuf>) -> Self {
        Self { layers_dir: layers_dir.into(), parcels_path: None, output_dir: None }
    }

    pub fn with_parcels(mut self, path: impl Into<PathBuf>) -> Self {
        self.parcels_path = Some(path.into());
        self
    }

    pub fn with_output(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    /// Path of the GeoJSON file holding a category's features.
    pub fn layer_path(&self, category: Category) -> PathBuf {
        self.layers_dir.join(format!("{}.geojson", category.to_str()))
    }

    fn put(&self, name: &str, bytes: &[u8]) -> Result<()> {
        let dir = self.output_dir.as_deref()
            .ok_or_else(|| anyhow!("[source] No output directory configured"))?;
        std::fs::create_dir_all(dir)
            .with_context(|| format!("[source] Failed to create {}", dir.display()))?;
        let path = dir.join(name);
        std::fs::write(&path, bytes)
            .with_context(|| format!("[source] Failed to write {}", path.display()))
    }
}

fn read_geojson_records(path: &Path) -> Result<Vec<Record>> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("[source] Failed to read {}", path.display()))?;
    read_records(&bytes).with_context(|| format!("[source] Failed to parse {}", path.display()))
}

impl LayerSource for DiskStore {
    fn load(&self, category: Category) -> Result<Vec<Record>> {
        let path = self.layer_path(category);
        if !path.exists() {
            tracing::info!(%category, path = %path.display(), "layer file not found, treating as empty");
            return Ok(Vec::new())
        }
        read_geojson_records(&path)
    }
}

impl ParcelSource for DiskStore {
    fn parcels(&self) -> Result<Vec<Record>> {
        let path = self.parcels_path.as_deref()
            .ok_or_else(|| anyhow!("[source] No parcel file configured"))?;
        read_geojson_records(path)
    }
}

impl Sink for DiskStore {
    fn write_regions(&mut self, regions: &[ResolvedRegion]) -> Result<()> {
        let bytes = serde_json::to_vec(&regions_to_geojson(regions))
            .context("[source] Failed to serialize regions")?;
        self.put(REGIONS_FILE, &bytes)
    }

    fn write_summaries(&mut self, summaries: &[ParcelSummary]) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(summaries).context("[source] Failed to serialize summaries")?;
        self.put(SUMMARIES_FILE, &bytes)
    }

    fn write_manifest(&mut self, manifest: &Manifest) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(manifest).context("[source] Failed to serialize manifest")?;
        self.put(MANIFEST_FILE, &bytes)
    }
}

/// Simple in-memory store. Keeps whatever was written to it.
#[derive(Debug, Default, Clone)]
pub struct MemStore {
    pub layers: AHashMap<Category, Vec<Record>>,
    pub parcels: Vec<Record>,
    pub regions: Vec<ResolvedRegion>,
    pub summaries: Vec<ParcelSummary>,
    pub manifest: Option<Manifest>,
}

impl MemStore {
    pub fn new() -> Self { Self::default() }

    pub fn with_layer(mut self, category: Category, records: Vec<Record>) -> Self {
        self.layers.entry(category).or_default().extend(records);
        self
    }

    pub fn with_parcels(mut self, records: Vec<Record>) -> Self {
        self.parcels.extend(records);
        self
    }
}

impl LayerSource for MemStore {
    fn load(&self, category: Category) -> Result<Vec<Record>> {
        Ok(self.layers.get(&category).cloned().unwrap_or_default())
    }
}

impl ParcelSource for MemStore {
    fn parcels(&self) -> Result<Vec<Record>> { Ok(self.parcels.clone()) }
}

impl Sink for MemStore {
    fn write_regions(&mut self, regions: &[ResolvedRegion]) -> Result<()> {
        self.regions = regions.to_vec();
        Ok(())
    }

    fn write_summaries(&mut self, summaries: &[ParcelSummary]) -> Result<()> {
        self.summaries = summaries.to_vec();
        Ok(())
    }

    fn write_manifest(&mut self, manifest: &Manifest) -> Result<()> {
        self.manifest = Some(manifest.clone());
        Ok(())
    }
}
