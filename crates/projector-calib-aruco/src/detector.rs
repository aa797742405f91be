//! Full-image marker detection producing a [`CorrespondenceSet`].

use log::debug;
use projector_calib_core::{CorrespondenceSet, GrayImageView, ImageView, MarkerCorners};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::quad::{blob_hull, dark_blobs, fit_quad};
use crate::scan::{decode_marker_in_quad, dedup_by_id_keep_best, MarkerDetection, ScanDecodeConfig};
use crate::threshold::{contrast, otsu_threshold_from_samples};
use crate::{MarkerDictionary, Matcher};

/// Configuration for [`MarkerCorrespondenceDetector`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorParams {
    /// Images whose darkest and brightest pixels differ by less than this
    /// are treated as blank.
    pub min_contrast: u8,
    /// Shortest accepted quad side in pixels.
    pub min_side_px: f64,
    /// Minimum ratio of quad area to the blob's convex hull area.
    pub min_quad_fill: f64,
    /// Maximum Hamming distance for marker matching (clamped to the
    /// dictionary's correction capability).
    pub max_hamming: u8,
    /// Marker module sampling.
    pub scan: ScanDecodeConfig,
}

impl Default for DetectorParams {
    fn default() -> Self {
        Self {
            min_contrast: 40,
            min_side_px: 12.0,
            min_quad_fill: 0.85,
            max_hamming: 1,
            scan: ScanDecodeConfig::default(),
        }
    }
}

/// Locates markers of one family and reports their corners.
///
/// Corners are listed in the marker's own winding (printed top-left,
/// top-right, bottom-right, bottom-left) whatever its rotation in the image,
/// so index `i` is the same physical corner in every frame.
#[derive(Clone, Debug)]
pub struct MarkerCorrespondenceDetector {
    dictionary: MarkerDictionary,
    params: DetectorParams,
    matcher: Matcher,
}

impl MarkerCorrespondenceDetector {
    pub fn new(dictionary: MarkerDictionary, params: DetectorParams) -> Self {
        let matcher = Matcher::new(dictionary.dictionary(), params.max_hamming);
        Self {
            dictionary,
            params,
            matcher,
        }
    }

    pub fn dictionary(&self) -> MarkerDictionary {
        self.dictionary
    }

    pub fn params(&self) -> &DetectorParams {
        &self.params
    }

    /// Detect markers and return id → corners. Finding nothing is not an error.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, image), fields(width = image.width, height = image.height, dictionary = %self.dictionary))
    )]
    pub fn detect(&self, image: &ImageView<'_>) -> CorrespondenceSet {
        self.detect_markers(image)
            .into_iter()
            .map(|d| (d.id, MarkerCorners::new(d.corners)))
            .collect()
    }

    /// Detailed detections, one per id, in ascending id order.
    pub fn detect_markers(&self, image: &ImageView<'_>) -> Vec<MarkerDetection> {
        if image.channels == 1 {
            let gray = GrayImageView {
                width: image.width,
                height: image.height,
                data: image.data,
            };
            return self.detect_gray(&gray);
        }
        let gray = image.to_gray();
        self.detect_gray(&gray.view())
    }

    /// Same as [`Self::detect_markers`] on an already gray image.
    pub fn detect_gray(&self, gray: &GrayImageView<'_>) -> Vec<MarkerDetection> {
        if gray.width < 3 || gray.height < 3 {
            return Vec::new();
        }
        let spread = contrast(gray.data);
        if spread < self.params.min_contrast {
            debug!("image contrast {spread} below {}, skipping", self.params.min_contrast);
            return Vec::new();
        }

        let threshold = otsu_threshold_from_samples(gray.data);
        let min_side = self.params.min_side_px.max(1.0);
        // A square outline of side s has at least 4(s - 1) pixels.
        let min_pixels = (4.0 * (min_side - 1.0)).max(1.0) as usize;
        let blobs = dark_blobs(gray, threshold, min_pixels);

        let mut quads = 0usize;
        let mut detections = Vec::new();
        for blob in blobs.iter().filter(|b| !b.touches_border) {
            let Some(quad) = fit_quad(&blob_hull(blob)) else {
                continue;
            };
            if quad.min_side() < min_side || quad.fill < self.params.min_quad_fill {
                continue;
            }
            quads += 1;
            if let Some(det) =
                decode_marker_in_quad(gray, &quad.corners, &self.params.scan, &self.matcher)
            {
                detections.push(det);
            }
        }

        let out = dedup_by_id_keep_best(detections);
        debug!(
            "threshold {threshold}: {} blobs, {quads} quads, {} markers ({})",
            blobs.len(),
            out.len(),
            self.dictionary
        );
        out
    }
}
