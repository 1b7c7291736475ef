use std::{collections::BTreeMap, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::types::Record;

/// SHA-256 of a layer's records, independent of record order.
pub fn fingerprint(records: &[Record]) -> String {
    let mut sorted = records.iter().collect::<Vec<_>>();
    sorted.sort_by(|a, b| a.id.cmp(&b.id).then_with(|| a.wkb.cmp(&b.wkb)).then_with(|| a.defect.cmp(&b.defect)));

    let mut hasher = Sha256::new();
    for record in sorted {
        hasher.update((record.id.len() as u64).to_le_bytes());
        hasher.update(record.id.as_bytes());
        hasher.update((record.wkb.len() as u64).to_le_bytes());
        hasher.update(&record.wkb);
        if let Some(defect) = &record.defect {
            hasher.update(defect.as_bytes());
        }
    }
    hex::encode(hasher.finalize())
}

/// Fingerprints of every input layer of a run, keyed by layer name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerFingerprints(BTreeMap<String, String>);

impl LayerFingerprints {
    pub fn new() -> Self { Self::default() }

    pub fn insert(&mut self, layer: &str, records: &[Record]) {
        self.0.insert(layer.to_string(), fingerprint(records));
    }

    #[inline] pub fn get(&self, layer: &str) -> Option<&str> { self.0.get(layer).map(String::as_str) }

    /// Names of layers that differ from `previous` (new, changed or removed).
    pub fn changed_since(&self, previous: &LayerFingerprints) -> Vec<String> {
        let mut changed = self.0.iter()
            .filter(|(layer, hash)| previous.0.get(*layer) != Some(*hash))
            .map(|(layer, _)| layer.clone())
            .collect::<Vec<_>>();
        changed.extend(previous.0.keys().filter(|layer| !self.0.contains_key(*layer)).cloned());
        changed
    }

    /// Load fingerprints stored by a previous run. A missing file yields `None`.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() { return Ok(None) }
        let bytes = std::fs::read(path)
            .with_context(|| format!("[fingerprint] Failed to read {}", path.display()))?;
        let fingerprints = serde_json::from_slice(&bytes)
            .with_context(|| format!("[fingerprint] Failed to parse {}", path.display()))?;
        Ok(Some(fingerprints))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("[fingerprint] Failed to create {}", parent.display()))?;
        }
        let bytes = serde_json::to_vec_pretty(self).context("[fingerprint] Failed to serialize fingerprints")?;
        std::fs::write(path, bytes).with_context(|| format!("[fingerprint] Failed to write {}", path.display()))
    }
}
