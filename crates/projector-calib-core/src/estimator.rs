//! Homography estimation between two correspondence sets.

use serde::{Deserialize, Serialize};

use crate::{estimate_homography, CorrespondenceSet, GeometryError, Homography, Point2D};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Numerical tolerances for estimation, inversion and composition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorParams {
    /// Smallest accepted ratio of the minor to the major principal axis of a
    /// normalized point cloud; below it the points count as collinear.
    pub collinearity_tolerance: f64,
    /// Smallest accepted ratio of singular values (runner-up to largest for
    /// the DLT system, smallest to largest for a 3x3 homography).
    pub singular_tolerance: f64,
}

impl Default for EstimatorParams {
    fn default() -> Self {
        Self {
            collinearity_tolerance: 1e-9,
            singular_tolerance: 1e-10,
        }
    }
}

/// Fits `H: source frame -> destination frame` from the markers two sets share.
#[derive(Clone, Debug, Default)]
pub struct HomographyEstimator {
    params: EstimatorParams,
}

impl HomographyEstimator {
    pub fn new(params: EstimatorParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &EstimatorParams {
        &self.params
    }

    /// Estimate H such that `dst ~ H * src` over every marker present in both
    /// sets. Markers seen in only one set are ignored.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(self, src, dst), fields(src = src.len(), dst = dst.len()))
    )]
    pub fn estimate(
        &self,
        src: &CorrespondenceSet,
        dst: &CorrespondenceSet,
    ) -> Result<Homography, GeometryError> {
        let pairs = src.shared_point_pairs(dst);
        let dropped = src.len() + dst.len() - 2 * pairs.shared_markers;
        if dropped > 0 {
            log::debug!(
                "{} shared markers, {} markers seen in only one set",
                pairs.shared_markers,
                dropped
            );
        }
        self.estimate_from_points(&pairs.src, &pairs.dst)
    }

    /// Estimate H from explicit index-aligned point lists.
    pub fn estimate_from_points(
        &self,
        src: &[Point2D],
        dst: &[Point2D],
    ) -> Result<Homography, GeometryError> {
        let h = estimate_homography(src, dst, &self.params)?;
        log::debug!(
            "homography from {} point pairs, reprojection rms {:.3e}",
            src.len(),
            h.reprojection_rms(src, dst)
        );
        Ok(h)
    }
}
