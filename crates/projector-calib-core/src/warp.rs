//! Perspective warping of whole images.

use nalgebra::{DMatrix, Point2};
use serde::{Deserialize, Serialize};

use crate::image::sample_bilinear_clamped;
use crate::{GeometryError, Homography, Image, ImageView};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Warper configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WarpParams {
    /// Colour for destination pixels that map outside the source image.
    /// Channel `c` uses `fill[c]`; the default is black.
    pub fill: [u8; 4],
    /// Smallest accepted singular value ratio of the transform.
    pub singular_tolerance: f64,
}

impl Default for WarpParams {
    fn default() -> Self {
        Self {
            fill: [0, 0, 0, 0],
            singular_tolerance: 1e-10,
        }
    }
}

/// Applies a homography to an image. The output always has the input's
/// width, height and channel count.
#[derive(Clone, Debug, Default)]
pub struct ImageWarper {
    params: WarpParams,
}

impl ImageWarper {
    pub fn new(params: WarpParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &WarpParams {
        &self.params
    }

    /// Warp `src` by `h`, which maps source pixels to destination pixels.
    ///
    /// Every destination pixel centre is pulled back through `h^-1` and
    /// sampled bilinearly; samples landing outside the source take the fill
    /// colour.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, src, h), fields(width = src.width, height = src.height))
    )]
    pub fn warp(&self, src: &ImageView<'_>, h: &Homography) -> Result<Image, GeometryError> {
        h.validate(self.params.singular_tolerance)?;
        let h_src_from_dst = h
            .inverse()
            .ok_or_else(|| GeometryError::invalid("matrix is not invertible"))?;
        if !h_src_from_dst.is_finite() {
            return Err(GeometryError::invalid("inverse contains NaN or infinite values"));
        }
        Ok(warp_perspective(src, &h_src_from_dst, &self.params.fill))
    }

    /// Like [`ImageWarper::warp`], for a matrix whose shape is not known yet.
    /// Anything but a finite, invertible 3x3 matrix is rejected before any
    /// pixel is read.
    pub fn warp_matrix(
        &self,
        src: &ImageView<'_>,
        m: &DMatrix<f64>,
    ) -> Result<Image, GeometryError> {
        let h = Homography::try_from_dmatrix(m)?;
        self.warp(src, &h)
    }
}

/// Warp into a same-size image: for each dst pixel, map to src via
/// `h_src_from_dst` and sample.
pub fn warp_perspective(src: &ImageView<'_>, h_src_from_dst: &Homography, fill: &[u8; 4]) -> Image {
    let (w, h, c) = (src.width, src.height, src.channels);
    let mut out = vec![0u8; w * h * c];
    let fill = &fill[..c.min(4)];

    for y in 0..h {
        for x in 0..w {
            let px = &mut out[(y * w + x) * c..(y * w + x + 1) * c];
            // sample at pixel center
            let pd = Point2::new(x as f64 + 0.5, y as f64 + 0.5);
            let ps = h_src_from_dst.apply(pd);
            let inside = ps.x.is_finite()
                && ps.y.is_finite()
                && ps.x >= 0.0
                && ps.y >= 0.0
                && ps.x < w as f64
                && ps.y < h as f64;
            if inside {
                sample_bilinear_clamped(src, ps.x - 0.5, ps.y - 0.5, px);
            } else {
                px.copy_from_slice(fill);
            }
        }
    }

    Image {
        width: w,
        height: h,
        channels: c,
        data: out,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: usize, height: usize, channels: usize) -> Image {
        let data = (0..width * height * channels)
            .map(|i| ((i * 37) % 251) as u8)
            .collect();
        Image::new(width, height, channels, data).expect("image")
    }

    #[test]
    fn identity_warp_is_lossless() {
        let img = gradient(17, 11, 3);
        let out = ImageWarper::default()
            .warp(&img.view(), &Homography::identity())
            .expect("warp");
        assert_eq!(out, img);
    }

    #[test]
    fn translation_moves_pixels_and_fills_the_gap() {
        let img = gradient(8, 6, 1);
        let shift = Homography::from_array([[1.0, 0.0, 2.0], [0.0, 1.0, 1.0], [0.0, 0.0, 1.0]]);
        let warper = ImageWarper::new(WarpParams {
            fill: [9, 0, 0, 0],
            ..WarpParams::default()
        });
        let out = warper.warp(&img.view(), &shift).expect("warp");

        assert_eq!((out.width, out.height, out.channels), (8, 6, 1));
        assert_eq!(out.data[0], 9);
        assert_eq!(out.data[8 + 1], 9);
        for y in 1..6 {
            for x in 2..8 {
                assert_eq!(out.data[y * 8 + x], img.data[(y - 1) * 8 + (x - 2)]);
            }
        }
    }

    #[test]
    fn default_fill_is_black() {
        let img = Image::filled(4, 4, &[200, 100, 50]).expect("image");
        let far = Homography::from_array([[1.0, 0.0, 100.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]);
        let out = ImageWarper::default().warp(&img.view(), &far).expect("warp");
        assert!(out.data.iter().all(|&v| v == 0));
    }

    #[test]
    fn non_square_matrix_is_rejected() {
        let img = gradient(4, 4, 1);
        let m = DMatrix::<f64>::identity(2, 2);
        let err = ImageWarper::default()
            .warp_matrix(&img.view(), &m)
            .unwrap_err();
        assert!(matches!(err, GeometryError::InvalidTransform { .. }));
    }

    #[test]
    fn singular_and_non_finite_transforms_are_rejected() {
        let img = gradient(4, 4, 1);
        let warper = ImageWarper::default();

        let flat = Homography::from_array([[1.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]]);
        assert!(matches!(
            warper.warp(&img.view(), &flat),
            Err(GeometryError::InvalidTransform { .. })
        ));

        let nan = Homography::from_array([[f64::NAN, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]);
        assert!(matches!(
            warper.warp(&img.view(), &nan),
            Err(GeometryError::InvalidTransform { .. })
        ));
    }
}
