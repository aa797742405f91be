use crate::{EstimatorParams, GeometryError, Point2D};
use nalgebra::{DMatrix, Matrix3, Point2, Vector3};

/// Minimum number of point pairs that determine a homography.
pub const MIN_POINT_PAIRS: usize = 4;

/// Projective transform `p_dst ~ H * p_src`, stored with `h33 = 1` whenever
/// it comes out of estimation, composition or inversion.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Homography {
    pub h: Matrix3<f64>,
}

impl Homography {
    pub fn new(h: Matrix3<f64>) -> Self {
        Self { h }
    }

    pub fn identity() -> Self {
        Self::new(Matrix3::identity())
    }

    pub fn from_array(rows: [[f64; 3]; 3]) -> Self {
        Self::new(Matrix3::from_row_slice(&[
            rows[0][0], rows[0][1], rows[0][2], rows[1][0], rows[1][1], rows[1][2], rows[2][0],
            rows[2][1], rows[2][2],
        ]))
    }

    pub fn to_array(&self) -> [[f64; 3]; 3] {
        [
            [self.h[(0, 0)], self.h[(0, 1)], self.h[(0, 2)]],
            [self.h[(1, 0)], self.h[(1, 1)], self.h[(1, 2)]],
            [self.h[(2, 0)], self.h[(2, 1)], self.h[(2, 2)]],
        ]
    }

    /// Build from row-major nested rows, rejecting anything but 3x3 finite input.
    pub fn try_from_rows<R: AsRef<[f64]>>(rows: &[R]) -> Result<Self, GeometryError> {
        if rows.len() != 3 {
            return Err(GeometryError::invalid(format!(
                "expected 3 rows, got {}",
                rows.len()
            )));
        }
        let mut out = [[0.0; 3]; 3];
        for (r, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.len() != 3 {
                return Err(GeometryError::invalid(format!(
                    "row {r} has {} columns, expected 3",
                    row.len()
                )));
            }
            out[r].copy_from_slice(row);
        }
        let h = Self::from_array(out);
        h.ensure_finite()?;
        Ok(h)
    }

    /// Build from a dynamically sized matrix, rejecting anything but 3x3 finite input.
    pub fn try_from_dmatrix(m: &DMatrix<f64>) -> Result<Self, GeometryError> {
        if m.shape() != (3, 3) {
            return Err(GeometryError::invalid(format!(
                "expected a 3x3 matrix, got {}x{}",
                m.nrows(),
                m.ncols()
            )));
        }
        let h = Self::new(Matrix3::from_fn(|r, c| m[(r, c)]));
        h.ensure_finite()?;
        Ok(h)
    }

    pub fn is_finite(&self) -> bool {
        self.h.iter().all(|v| v.is_finite())
    }

    fn ensure_finite(&self) -> Result<(), GeometryError> {
        if self.is_finite() {
            Ok(())
        } else {
            Err(GeometryError::invalid("matrix contains NaN or infinite values"))
        }
    }

    /// Ratio of smallest to largest singular value, `0.0` for a zero or
    /// non-finite matrix.
    pub fn conditioning(&self) -> f64 {
        if !self.is_finite() {
            return 0.0;
        }
        let sv = self.h.singular_values();
        let max = sv.max();
        if max <= 0.0 {
            return 0.0;
        }
        sv.min() / max
    }

    /// Check the transform is usable downstream: finite and invertible.
    pub fn validate(&self, singular_tolerance: f64) -> Result<(), GeometryError> {
        self.ensure_finite()?;
        if self.conditioning() < singular_tolerance {
            return Err(GeometryError::invalid("matrix is not invertible"));
        }
        Ok(())
    }

    #[inline]
    pub fn apply(&self, p: Point2D) -> Point2D {
        let v = self.h * Vector3::new(p.x, p.y, 1.0);
        let w = v[2];
        Point2::new(v[0] / w, v[1] / w)
    }

    /// Plain matrix inverse without conditioning checks or rescaling.
    pub fn inverse(&self) -> Option<Self> {
        self.h.try_inverse().map(Self::new)
    }

    /// Checked inverse, rescaled to `h33 = 1`.
    pub fn try_inverse(&self, singular_tolerance: f64) -> Result<Self, GeometryError> {
        self.ensure_finite()?;
        if self.conditioning() < singular_tolerance {
            return Err(GeometryError::singular("matrix inversion"));
        }
        let inv = self
            .inverse()
            .ok_or_else(|| GeometryError::singular("matrix inversion"))?;
        inv.normalized()
    }

    /// `self ∘ inner`: apply `inner` first, then `self`.
    pub fn compose(&self, inner: &Homography) -> Result<Self, GeometryError> {
        let product = Self::new(self.h * inner.h);
        if !product.is_finite() {
            return Err(GeometryError::invalid(
                "composition produced NaN or infinite values",
            ));
        }
        product.normalized()
    }

    /// Rescale so that `h33 = 1`.
    pub fn normalized(&self) -> Result<Self, GeometryError> {
        self.ensure_finite()?;
        let s = self.h[(2, 2)];
        let scale = self.h.norm();
        if scale <= 0.0 || s.abs() <= 1e-12 * scale {
            return Err(GeometryError::singular("homography normalization"));
        }
        Ok(Self::new(self.h / s))
    }

    /// Root-mean-square distance between `H * src[i]` and `dst[i]`.
    pub fn reprojection_rms(&self, src: &[Point2D], dst: &[Point2D]) -> f64 {
        let n = src.len().min(dst.len());
        if n == 0 {
            return 0.0;
        }
        let sum: f64 = src
            .iter()
            .zip(dst)
            .map(|(s, d)| (self.apply(*s) - d).norm_squared())
            .sum();
        (sum / n as f64).sqrt()
    }
}

impl Default for Homography {
    fn default() -> Self {
        Self::identity()
    }
}

fn hartley_normalization(cx: f64, cy: f64, mean_dist: f64) -> Matrix3<f64> {
    let s = (2.0_f64).sqrt() / mean_dist;
    Matrix3::<f64>::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0)
}

/// Hartley normalization: translate to centroid, scale so mean distance = sqrt(2).
/// `None` when all points coincide.
fn normalize_points(pts: &[Point2D]) -> Option<(Vec<Point2D>, Matrix3<f64>)> {
    let n = pts.len() as f64;
    let mut cx = 0.0;
    let mut cy = 0.0;
    for p in pts {
        cx += p.x;
        cy += p.y;
    }
    cx /= n;
    cy /= n;

    let mut mean_dist = 0.0;
    for p in pts {
        let dx = p.x - cx;
        let dy = p.y - cy;
        mean_dist += (dx * dx + dy * dy).sqrt();
    }
    mean_dist /= n;
    if !(mean_dist > 1e-12) {
        return None;
    }

    let t = hartley_normalization(cx, cy, mean_dist);

    let out = pts
        .iter()
        .map(|p| {
            let v = t * Vector3::new(p.x, p.y, 1.0);
            Point2::new(v[0], v[1])
        })
        .collect();
    Some((out, t))
}

/// Points are centred by normalization, so the scatter matrix is the covariance.
fn all_collinear(pts: &[Point2D], tolerance: f64) -> bool {
    let n = pts.len() as f64;
    let (mut a, mut b, mut c) = (0.0, 0.0, 0.0);
    for p in pts {
        a += p.x * p.x;
        b += p.x * p.y;
        c += p.y * p.y;
    }
    a /= n;
    b /= n;
    c /= n;

    let mean = 0.5 * (a + c);
    let dev = (0.25 * (a - c) * (a - c) + b * b).sqrt();
    let l_max = mean + dev;
    let l_min = mean - dev;
    l_max <= 0.0 || l_min <= tolerance * l_max
}

/// Estimate H such that `dst ~ H * src` with the normalized DLT.
///
/// The design matrix is padded to at least 9 rows so the minimal 4-pair case
/// takes the same SVD path as the overdetermined one.
pub fn estimate_homography(
    src: &[Point2D],
    dst: &[Point2D],
    params: &EstimatorParams,
) -> Result<Homography, GeometryError> {
    let n = src.len();
    if n != dst.len() {
        return Err(GeometryError::degenerate(
            n.min(dst.len()),
            "source and destination point counts differ",
        ));
    }
    if n < MIN_POINT_PAIRS {
        return Err(GeometryError::degenerate(n, "at least 4 point pairs required"));
    }

    let (s, ts) = normalize_points(src)
        .ok_or_else(|| GeometryError::degenerate(n, "all source points coincide"))?;
    let (d, td) = normalize_points(dst)
        .ok_or_else(|| GeometryError::degenerate(n, "all destination points coincide"))?;
    if all_collinear(&s, params.collinearity_tolerance)
        || all_collinear(&d, params.collinearity_tolerance)
    {
        return Err(GeometryError::degenerate(n, "all points are collinear"));
    }

    let rows = (2 * n).max(9);
    let mut a = DMatrix::<f64>::zeros(rows, 9);

    for k in 0..n {
        let x = s[k].x;
        let y = s[k].y;
        let u = d[k].x;
        let v = d[k].y;

        // [ -x -y -1   0  0  0   u*x u*y u ]
        a[(2 * k, 0)] = -x;
        a[(2 * k, 1)] = -y;
        a[(2 * k, 2)] = -1.0;
        a[(2 * k, 6)] = u * x;
        a[(2 * k, 7)] = u * y;
        a[(2 * k, 8)] = u;

        // [ 0  0  0  -x -y -1   v*x v*y v ]
        a[(2 * k + 1, 3)] = -x;
        a[(2 * k + 1, 4)] = -y;
        a[(2 * k + 1, 5)] = -1.0;
        a[(2 * k + 1, 6)] = v * x;
        a[(2 * k + 1, 7)] = v * y;
        a[(2 * k + 1, 8)] = v;
    }

    // Solve Ah = 0 -> h is the right singular vector of the smallest singular value.
    let svd = a.svd(false, true);
    let vt = svd
        .v_t
        .ok_or_else(|| GeometryError::singular("homography DLT"))?;
    let sv = &svd.singular_values;

    let mut order: Vec<usize> = (0..sv.len()).collect();
    order.sort_by(|&i, &j| sv[i].total_cmp(&sv[j]));
    let smallest = order[0];
    let runner_up = order[1];
    let largest = order[order.len() - 1];

    // A second (near) zero singular value means the solution is not unique.
    if !(sv[largest] > 0.0) || sv[runner_up] < params.singular_tolerance * sv[largest] {
        return Err(GeometryError::singular("homography DLT"));
    }

    let h = vt.row(smallest);
    let hn =
        Matrix3::<f64>::from_row_slice(&[h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], h[8]]);

    // Denormalize: H = Td^{-1} * Hn * Ts
    let td_inv = td
        .try_inverse()
        .ok_or_else(|| GeometryError::singular("point denormalization"))?;
    let estimated = Homography::new(td_inv * hn * ts).normalized()?;
    if estimated.conditioning() < params.singular_tolerance {
        return Err(GeometryError::singular("homography DLT"));
    }
    Ok(estimated)
}

/// Compute H such that: dst ~ H * src (projective), using 4 point correspondences.
///
/// Corner order must be consistent between `src` and `dst`.
pub fn homography_from_4pt(src: &[Point2D; 4], dst: &[Point2D; 4]) -> Option<Homography> {
    estimate_homography(src, dst, &EstimatorParams::default()).ok()
}
