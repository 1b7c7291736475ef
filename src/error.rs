use thiserror::Error;

use crate::types::Category;

/// Structural failures that abort a run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RunError {
    #[error("priority order is empty")]
    EmptyPriority,

    #[error("category {0} appears more than once in the priority order")]
    DuplicatePriority(Category),

    #[error("layer for category {0} was supplied more than once")]
    DuplicateLayer(Category),

    #[error("category {0} has no rank in the configured priority order")]
    UnrankedCategory(Category),

    #[error("no parcels supplied")]
    NoParcels,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Reasons a geometry was rejected by decoding or repair.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    #[error("undecodable geometry: {0}")]
    Undecodable(String),

    #[error("non-finite coordinate")]
    NonFinite,

    #[error("no rings with area remain after repair")]
    Empty,

    #[error("self-intersection could not be repaired")]
    Unrepairable,
}
