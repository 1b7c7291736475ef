use geo::{BoundingRect, Rect};
use rstar::{RTreeObject, AABB};

/// A bounding box in an R-tree, associated with a shape by index.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct BoundingBox {
    idx: usize, // Index of the corresponding shape in its owning collection
    bbox: Rect<f64>,
}

impl BoundingBox {
    pub(crate) fn new(idx: usize, bbox: Rect<f64>) -> Self {
        Self { idx, bbox }
    }

    /// Bounding box of a shape, `None` for empty shapes.
    pub(crate) fn of<G: BoundingRect<f64>>(idx: usize, shape: &G) -> Option<Self> {
        Into::<Option<Rect<f64>>>::into(shape.bounding_rect()).map(|bbox| Self::new(idx, bbox))
    }

    /// Get the index of the corresponding shape.
    #[inline] pub(crate) fn idx(&self) -> usize { self.idx }

    /// Get a reference to the bounding rectangle.
    #[inline] pub(crate) fn bbox(&self) -> &Rect<f64> { &self.bbox }
}

impl RTreeObject for BoundingBox {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope { envelope(&self.bbox) }
}

/// R-tree envelope of a rectangle.
#[inline]
pub(crate) fn envelope(rect: &Rect<f64>) -> AABB<[f64; 2]> {
    AABB::from_corners(rect.min().into(), rect.max().into())
}
