//! Marker decoding from an image-space quad.
//!
//! The quad is mapped onto a canonical square of `side` pixels, split into
//! `marker_size + 2 * border_bits` modules per side, and each module is read
//! as the 3x3 mean around its centre in the source image.

use std::collections::BTreeMap;

use projector_calib_core::{homography_from_4pt, GrayImageView, Homography, Point2D};
use serde::{Deserialize, Serialize};

use crate::threshold::otsu_threshold_from_samples;
use crate::Matcher;

/// Module sampling and border acceptance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanDecodeConfig {
    /// Border width in modules.
    pub border_bits: usize,
    /// Fraction of the marker side ignored along each edge before sampling.
    pub inset_frac: f64,
    /// Minimum fraction of border modules that must read black.
    pub min_border_score: f64,
}

impl Default for ScanDecodeConfig {
    fn default() -> Self {
        Self {
            border_bits: 1,
            inset_frac: 0.0,
            min_border_score: 0.85,
        }
    }
}

/// One decoded marker.
#[derive(Clone, Debug, PartialEq)]
pub struct MarkerDetection {
    pub id: u32,
    pub rotation: u8,
    pub hamming: u8,
    /// `border_score` scaled down by the fraction of corrected bits.
    pub score: f64,
    pub border_score: f64,
    /// Observed inner bits (row-major, black=1), in image-quad orientation.
    pub code: u64,
    /// Image corners in the marker's own order: `[0]` is the printed
    /// top-left corner, then clockwise.
    pub corners: [Point2D; 4],
}

/// Decode one marker whose outer border is the quad `corners_img`
/// (clockwise in image coordinates, starting at any corner).
pub fn decode_marker_in_quad(
    image: &GrayImageView<'_>,
    corners_img: &[Point2D; 4],
    cfg: &ScanDecodeConfig,
    matcher: &Matcher,
) -> Option<MarkerDetection> {
    let side = mean_side(corners_img);
    let grid = SampleGrid::new(cfg, matcher.dictionary().marker_size, side)?;
    let h = homography_from_4pt(&square_corners(side), corners_img)?;
    let obs = grid.decode(image, &h, cfg)?;
    build_detection(obs, corners_img, matcher)
}

/// Keep the best-scoring detection per id, returned in ascending id order.
pub(crate) fn dedup_by_id_keep_best(dets: Vec<MarkerDetection>) -> Vec<MarkerDetection> {
    let mut best: BTreeMap<u32, MarkerDetection> = BTreeMap::new();
    for d in dets {
        match best.get(&d.id) {
            Some(prev) if prev.score >= d.score => {}
            _ => {
                best.insert(d.id, d);
            }
        }
    }
    best.into_values().collect()
}

#[derive(Clone, Copy, Debug)]
struct MarkerObservation {
    code: u64,
    border_score: f64,
}

struct SampleGrid {
    bits: usize,
    border: usize,
    cells: usize,
    points: Vec<Point2D>, // row-major: cy * cells + cx
    threshold_points: Vec<Point2D>,
}

impl SampleGrid {
    fn new(cfg: &ScanDecodeConfig, bits: usize, side: f64) -> Option<Self> {
        if bits * bits > 64 {
            return None;
        }
        let border = cfg.border_bits;
        let cells = bits + 2 * border;

        let inset = (cfg.inset_frac * side).max(0.0);
        let inner = side - 2.0 * inset;
        // At least one pixel per module; the detector applies its own
        // `min_side_px` before decoding.
        if !inner.is_finite() || inner < cells as f64 {
            return None;
        }

        let step = inner / cells as f64;
        let mut points = Vec::with_capacity(cells * cells);
        for cy in 0..cells {
            for cx in 0..cells {
                points.push(Point2D::new(
                    inset + (cx as f64 + 0.5) * step,
                    inset + (cy as f64 + 0.5) * step,
                ));
            }
        }

        Some(Self {
            bits,
            border,
            cells,
            points,
            threshold_points: build_threshold_points(inset, inner, cells),
        })
    }

    fn decode(
        &self,
        img: &GrayImageView<'_>,
        h: &Homography,
        cfg: &ScanDecodeConfig,
    ) -> Option<MarkerObservation> {
        let samples = self
            .points
            .iter()
            .map(|p| {
                let q = h.apply(*p);
                sample_mean_3x3(img, q.x, q.y)
            })
            .collect::<Option<Vec<u8>>>()?;

        let thr_samples: Vec<u8> = self
            .threshold_points
            .iter()
            .filter_map(|p| {
                let q = h.apply(*p);
                sample_mean_3x3(img, q.x, q.y)
            })
            .collect();

        decode_samples(
            &samples,
            &thr_samples,
            self.cells,
            self.bits,
            self.border,
            cfg.min_border_score,
        )
    }
}

fn build_detection(
    obs: MarkerObservation,
    corners_img: &[Point2D; 4],
    matcher: &Matcher,
) -> Option<MarkerDetection> {
    let m = matcher.match_code(obs.code)?;
    let bits = matcher.dictionary().bit_count().max(1) as f64;
    let score = (obs.border_score * (1.0 - m.hamming as f64 / bits)).clamp(0.0, 1.0);

    // The printed top-left corner was turned `rotation` quarter turns clockwise.
    let r = m.rotation as usize;
    let corners = std::array::from_fn(|k| corners_img[(k + r) % 4]);

    Some(MarkerDetection {
        id: m.id,
        rotation: m.rotation,
        hamming: m.hamming,
        score,
        border_score: obs.border_score,
        code: obs.code,
        corners,
    })
}

fn decode_samples(
    samples: &[u8],
    thr_samples: &[u8],
    cells: usize,
    bits: usize,
    border: usize,
    min_border_score: f64,
) -> Option<MarkerObservation> {
    if samples.len() != cells * cells {
        return None;
    }

    let thr = if thr_samples.is_empty() {
        otsu_threshold_from_samples(samples)
    } else {
        otsu_threshold_from_samples(thr_samples)
    };

    // Markers are dark-bordered: only dark blobs become quads.
    let mut border_ok = 0u32;
    let mut border_total = 0u32;
    let mut code = 0u64;

    for cy in 0..cells {
        for cx in 0..cells {
            let is_black = samples[cy * cells + cx] < thr;
            let is_border = border > 0
                && (cx < border || cy < border || cx + border >= cells || cy + border >= cells);
            if is_border {
                border_total += 1;
                border_ok += is_black as u32;
            } else if is_black {
                code |= 1u64 << ((cy - border) * bits + (cx - border));
            }
        }
    }

    let border_score = if border_total > 0 {
        border_ok as f64 / border_total as f64
    } else {
        1.0
    };
    (border_score >= min_border_score).then_some(MarkerObservation { code, border_score })
}

fn build_threshold_points(start: f64, side: f64, cells: usize) -> Vec<Point2D> {
    const THRESH_SUBDIV: usize = 3;
    let grid = cells * THRESH_SUBDIV;
    let step = side / grid as f64;
    let mut points = Vec::with_capacity(grid * grid);
    for ty in 0..grid {
        for tx in 0..grid {
            points.push(Point2D::new(
                start + (tx as f64 + 0.5) * step,
                start + (ty as f64 + 0.5) * step,
            ));
        }
    }
    points
}

fn square_corners(side: f64) -> [Point2D; 4] {
    [
        Point2D::new(0.0, 0.0),
        Point2D::new(side, 0.0),
        Point2D::new(side, side),
        Point2D::new(0.0, side),
    ]
}

fn mean_side(c: &[Point2D; 4]) -> f64 {
    (0..4).map(|i| (c[(i + 1) % 4] - c[i]).norm()).sum::<f64>() / 4.0
}

fn sample_mean_3x3(img: &GrayImageView<'_>, x: f64, y: f64) -> Option<u8> {
    if !x.is_finite() || !y.is_finite() {
        return None;
    }
    let ix = x.floor() as i64;
    let iy = y.floor() as i64;
    if ix < 1 || iy < 1 || ix + 1 >= img.width as i64 || iy + 1 >= img.height as i64 {
        return None;
    }

    let (ix, iy) = (ix as usize, iy as usize);
    let mut sum = 0u32;
    for yy in iy - 1..=iy + 1 {
        let row = &img.data[yy * img.width..(yy + 1) * img.width];
        sum += row[ix - 1..=ix + 1].iter().map(|&v| v as u32).sum::<u32>();
    }
    Some((sum / 9) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{render_marker, MarkerDictionary};

    fn quad(x0: f64, y0: f64, s: f64) -> [Point2D; 4] {
        [
            Point2D::new(x0, y0),
            Point2D::new(x0 + s, y0),
            Point2D::new(x0 + s, y0 + s),
            Point2D::new(x0, y0 + s),
        ]
    }

    #[test]
    fn decodes_axis_aligned_marker() {
        let dict = MarkerDictionary::AprilTag16h5.dictionary();
        let matcher = Matcher::new(dict, 0);
        // 6 modules of 10 px plus a 20 px quiet zone.
        let img = render_marker(&dict, 3, 10, 20).expect("render");

        let det = decode_marker_in_quad(
            &img.view(),
            &quad(20.0, 20.0, 60.0),
            &ScanDecodeConfig::default(),
            &matcher,
        )
        .expect("decode");
        assert_eq!((det.id, det.rotation, det.hamming), (3, 0, 0));
        assert_eq!(det.corners[0], Point2D::new(20.0, 20.0));
    }

    #[test]
    fn starting_corner_shifts_with_rotation() {
        let dict = MarkerDictionary::AprilTag16h5.dictionary();
        let matcher = Matcher::new(dict, 0);
        let img = render_marker(&dict, 3, 10, 20).expect("render");

        // Same marker, quad listed starting from its top-right corner.
        let q = quad(20.0, 20.0, 60.0);
        let shifted = [q[1], q[2], q[3], q[0]];
        let det = decode_marker_in_quad(&img.view(), &shifted, &ScanDecodeConfig::default(), &matcher)
            .expect("decode");
        assert_eq!(det.id, 3);
        assert_eq!(det.rotation, 3);
        assert_eq!(det.corners, q);
    }

    #[test]
    fn rejects_quad_without_black_border() {
        let dict = MarkerDictionary::AprilTag16h5.dictionary();
        let matcher = Matcher::new(dict, 0);
        let img = render_marker(&dict, 3, 10, 20).expect("render");

        // Inner 4x4 modules only: the border ring lands on data bits.
        let det = decode_marker_in_quad(
            &img.view(),
            &quad(30.0, 30.0, 40.0),
            &ScanDecodeConfig {
                min_border_score: 1.0,
                ..ScanDecodeConfig::default()
            },
            &matcher,
        );
        assert!(det.is_none());
    }

    #[test]
    fn dedup_keeps_highest_score() {
        let mk = |id, score| MarkerDetection {
            id,
            rotation: 0,
            hamming: 0,
            score,
            border_score: score,
            code: 0,
            corners: quad(0.0, 0.0, 1.0),
        };
        let out = dedup_by_id_keep_best(vec![mk(2, 0.5), mk(1, 0.9), mk(2, 0.8)]);
        assert_eq!(out.len(), 2);
        assert_eq!((out[0].id, out[1].id), (1, 2));
        assert_eq!(out[1].score, 0.8);
    }

    #[test]
    fn white_bordered_marker_is_not_decoded() {
        let dict = MarkerDictionary::AprilTag16h5.dictionary();
        let matcher = Matcher::new(dict, 0);
        let mut img = render_marker(&dict, 3, 10, 20).expect("render");
        img.data.iter_mut().for_each(|v| *v = 255 - *v);

        let det = decode_marker_in_quad(
            &img.view(),
            &quad(20.0, 20.0, 60.0),
            &ScanDecodeConfig::default(),
            &matcher,
        );
        assert!(det.is_none());
    }

    #[test]
    fn sample_grid_needs_one_pixel_per_module() {
        let cfg = ScanDecodeConfig::default();
        // 4 data bits + 2 border modules per side.
        assert!(SampleGrid::new(&cfg, 4, 8.0).is_some());
        assert!(SampleGrid::new(&cfg, 4, 5.0).is_none());
        assert!(SampleGrid::new(&cfg, 4, f64::NAN).is_none());
    }
}
