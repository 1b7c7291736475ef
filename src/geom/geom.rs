use geo::{Area, BooleanOps, Intersects, MultiPolygon, Polygon, Rect};
use rayon::prelude::*;
use rstar::RTree;

use super::bbox::{envelope, BoundingBox};

/// A borrowed collection of MultiPolygons with an R-tree over their bounding boxes.
#[derive(Debug)]
pub(crate) struct ShapeIndex<'a> {
    shapes: &'a [MultiPolygon<f64>],
    rtree: RTree<BoundingBox>,
}

impl<'a> ShapeIndex<'a> {
    /// Construct an index over the given shapes. Empty shapes are not indexed.
    pub(crate) fn new(shapes: &'a [MultiPolygon<f64>]) -> Self {
        Self {
            rtree: RTree::bulk_load(
                shapes.iter().enumerate()
                    .filter_map(|(i, shape)| BoundingBox::of(i, shape))
                    .collect()
            ),
            shapes,
        }
    }

    #[inline] pub(crate) fn len(&self) -> usize { self.shapes.len() }

    /// Indices of shapes whose bounding box intersects the given rectangle.
    #[inline]
    pub(crate) fn query(&self, rect: &Rect<f64>) -> impl Iterator<Item = usize> + '_ {
        self.rtree.locate_in_envelope_intersecting(&envelope(rect)).map(|bb| bb.idx())
    }

    /// All pairs `(i, j)` with `i < j` whose shapes share area. With
    /// `include_touching`, pairs that only share boundary are included as well.
    pub(crate) fn overlapping_pairs(&self, include_touching: bool) -> Vec<(usize, usize)> {
        self.rtree.iter().collect::<Vec<_>>()
            .par_iter()
            .flat_map_iter(|a| {
                let i = a.idx();
                self.query(a.bbox())
                    .filter(move |&j| j > i)
                    .filter(move |&j| shares_area(&self.shapes[i], &self.shapes[j], include_touching))
                    .map(move |j| (i, j))
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    /// Group shapes into connected components of the overlap relation.
    /// Components are ordered by their smallest member, members ascending.
    pub(crate) fn clusters(&self, include_touching: bool) -> Vec<Vec<usize>> {
        let mut sets = DisjointSets::new(self.len());
        for (i, j) in self.overlapping_pairs(include_touching) {
            sets.union(i, j);
        }

        let mut slot = vec![usize::MAX; self.len()];
        let mut clusters: Vec<Vec<usize>> = Vec::new();
        for i in 0..self.len() {
            if self.shapes[i].0.is_empty() { continue }
            let root = sets.find(i);
            if slot[root] == usize::MAX {
                slot[root] = clusters.len();
                clusters.push(Vec::new());
            }
            clusters[slot[root]].push(i);
        }
        clusters
    }
}

/// Whether two shapes share interior area (or, optionally, any boundary point).
fn shares_area(a: &MultiPolygon<f64>, b: &MultiPolygon<f64>, include_touching: bool) -> bool {
    if !a.intersects(b) { return false }
    include_touching || a.intersection(b).unsigned_area() > 0.0
}

/// Union-find over `0..n` with path halving. The smaller index becomes the root.
struct DisjointSets {
    parent: Vec<usize>,
}

impl DisjointSets {
    fn new(n: usize) -> Self { Self { parent: (0..n).collect() } }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb { self.parent[ra.max(rb)] = ra.min(rb) }
    }
}

/// Union many MultiPolygons with a fixed pairwise reduction tree.
/// Each level is unioned in parallel; the pairing never depends on scheduling,
/// so the result is deterministic.
pub(crate) fn cascaded_union(mut level: Vec<MultiPolygon<f64>>) -> MultiPolygon<f64> {
    level.retain(|shape| !shape.0.is_empty());
    while level.len() > 1 {
        level = level.par_chunks(2)
            .map(|pair| match pair {
                [a, b] => a.union(b),
                _ => pair[0].clone(),
            })
            .collect();
    }
    level.pop().unwrap_or_else(|| MultiPolygon::new(vec![]))
}

/// Split off polygons whose area is below `min_area`. Returns the kept
/// polygons and the slivers; zero-area polygons are discarded from both.
pub(crate) fn split_slivers(shape: MultiPolygon<f64>, min_area: f64) -> (MultiPolygon<f64>, Vec<Polygon<f64>>) {
    let (kept, slivers): (Vec<_>, Vec<_>) = shape.0.into_iter()
        .map(|polygon| (polygon.unsigned_area(), polygon))
        .filter(|(area, _)| *area > 0.0)
        .partition(|(area, _)| *area >= min_area);
    (
        MultiPolygon::new(kept.into_iter().map(|(_, polygon)| polygon).collect()),
        slivers.into_iter().map(|(_, polygon)| polygon).collect(),
    )
}
