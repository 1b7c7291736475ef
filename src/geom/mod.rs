mod bbox;
mod geom;
mod repair;

pub(crate) use bbox::{envelope, BoundingBox};
pub(crate) use geom::{cascaded_union, split_slivers, ShapeIndex};
pub use repair::repair;
