#![doc = "Impervious surface pseudo-topology: priority-based overlay resolution and per-parcel aggregation"]
mod aggregate;
mod config;
mod error;
mod fingerprint;
mod geom;
mod manifest;
mod pipeline;
mod resolve;
mod source;
mod types;

pub mod io;

#[doc(inline)]
pub use types::{Category, Feature, Parcel, ParcelSummary, Record, ResolvedRegion, SourceId};

#[doc(inline)]
pub use config::{Config, Priority};

#[doc(inline)]
pub use error::{GeometryError, RunError};

#[doc(inline)]
pub use manifest::{CategoryFailure, ExcludedFeature, FlaggedParcel, IssueKind, Manifest};

#[doc(inline)]
pub use geom::repair;

#[doc(inline)]
pub use resolve::{resolve, Claimed, Layer, Resolution};

#[doc(inline)]
pub use aggregate::{aggregate, drop_nested_parcels, Aggregation};

#[doc(inline)]
pub use fingerprint::{fingerprint, LayerFingerprints};

#[doc(inline)]
pub use source::{DiskStore, LayerSource, MemStore, ParcelSource, Sink, MANIFEST_FILE, REGIONS_FILE, SUMMARIES_FILE};

#[doc(inline)]
pub use pipeline::{check, decode_features, execute, load, run, Inputs, RunReport, PARCELS_LAYER};
