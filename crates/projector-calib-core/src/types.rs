//! Marker correspondences observed in one coordinate frame.

use std::collections::btree_map::{self, BTreeMap};

use nalgebra::Point2;

/// Double precision 2D point.
pub type Point2D = Point2<f64>;

/// The four corners of one marker.
///
/// Order is top-left, top-right, bottom-right, bottom-left in the marker's
/// own frame (clockwise in y-down image coordinates), regardless of how the
/// marker is rotated in the observation. Index `i` must denote the same
/// physical corner in every set that contains the marker.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MarkerCorners(pub [Point2D; 4]);

impl MarkerCorners {
    pub fn new(corners: [Point2D; 4]) -> Self {
        Self(corners)
    }

    pub fn from_array(corners: [[f64; 2]; 4]) -> Self {
        Self(corners.map(|[x, y]| Point2::new(x, y)))
    }

    pub fn to_array(&self) -> [[f64; 2]; 4] {
        self.0.map(|p| [p.x, p.y])
    }

    #[inline]
    pub fn points(&self) -> &[Point2D; 4] {
        &self.0
    }

    pub fn center(&self) -> Point2D {
        let sum = self.0.iter().fold(nalgebra::Vector2::zeros(), |acc, p| acc + p.coords);
        Point2::from(sum / 4.0)
    }
}

/// Index-aligned point lists built from the markers two sets share.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PointPairs {
    pub src: Vec<Point2D>,
    pub dst: Vec<Point2D>,
    /// Number of marker ids that contributed points.
    pub shared_markers: usize,
}

impl PointPairs {
    #[inline]
    pub fn len(&self) -> usize {
        self.src.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.src.is_empty()
    }
}

/// Marker id -> corners for one observation frame (camera, world or
/// projector design space). Ids are unique; iteration is by ascending id.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CorrespondenceSet {
    markers: BTreeMap<u32, MarkerCorners>,
}

impl CorrespondenceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a marker, returning the corners previously stored for `id`.
    pub fn insert(&mut self, id: u32, corners: MarkerCorners) -> Option<MarkerCorners> {
        self.markers.insert(id, corners)
    }

    pub fn get(&self, id: u32) -> Option<&MarkerCorners> {
        self.markers.get(&id)
    }

    pub fn contains(&self, id: u32) -> bool {
        self.markers.contains_key(&id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.markers.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.markers.keys().copied()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, u32, MarkerCorners> {
        self.markers.iter()
    }

    /// Collect index-aligned corner pairs for every id present in both
    /// `self` (source) and `dst`. Ids present in only one set are skipped.
    pub fn shared_point_pairs(&self, dst: &CorrespondenceSet) -> PointPairs {
        let mut pairs = PointPairs::default();
        for (id, src_corners) in &self.markers {
            let Some(dst_corners) = dst.get(*id) else {
                continue;
            };
            pairs.src.extend_from_slice(src_corners.points());
            pairs.dst.extend_from_slice(dst_corners.points());
            pairs.shared_markers += 1;
        }
        pairs
    }
}

impl FromIterator<(u32, MarkerCorners)> for CorrespondenceSet {
    fn from_iter<I: IntoIterator<Item = (u32, MarkerCorners)>>(iter: I) -> Self {
        Self {
            markers: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for CorrespondenceSet {
    type Item = (u32, MarkerCorners);
    type IntoIter = btree_map::IntoIter<u32, MarkerCorners>;

    fn into_iter(self) -> Self::IntoIter {
        self.markers.into_iter()
    }
}

impl<'a> IntoIterator for &'a CorrespondenceSet {
    type Item = (&'a u32, &'a MarkerCorners);
    type IntoIter = btree_map::Iter<'a, u32, MarkerCorners>;

    fn into_iter(self) -> Self::IntoIter {
        self.markers.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x0: f64, y0: f64, s: f64) -> MarkerCorners {
        MarkerCorners::from_array([[x0, y0], [x0 + s, y0], [x0 + s, y0 + s], [x0, y0 + s]])
    }

    #[test]
    fn shared_pairs_keep_corner_alignment() {
        let src: CorrespondenceSet = [(3, square(0.0, 0.0, 1.0)), (7, square(5.0, 5.0, 2.0))]
            .into_iter()
            .collect();
        let dst: CorrespondenceSet = [(7, square(50.0, 50.0, 20.0)), (9, square(0.0, 0.0, 1.0))]
            .into_iter()
            .collect();

        let pairs = src.shared_point_pairs(&dst);
        assert_eq!(pairs.shared_markers, 1);
        assert_eq!(pairs.len(), 4);
        assert_eq!(pairs.src[2], Point2::new(7.0, 7.0));
        assert_eq!(pairs.dst[2], Point2::new(70.0, 70.0));
    }

    #[test]
    fn disjoint_sets_share_nothing() {
        let a: CorrespondenceSet = [(1, square(0.0, 0.0, 1.0))].into_iter().collect();
        let b: CorrespondenceSet = [(2, square(0.0, 0.0, 1.0))].into_iter().collect();
        assert!(a.shared_point_pairs(&b).is_empty());
    }

    #[test]
    fn center_is_corner_mean() {
        let c = square(10.0, 20.0, 4.0).center();
        assert_eq!(c, Point2::new(12.0, 22.0));
    }
}
