//! Dark-blob extraction and quadrilateral fitting.
//!
//! Corner coordinates are pixel edges: a pixel `(x, y)` covers
//! `[x, x+1) x [y, y+1)`.

use std::collections::VecDeque;

use projector_calib_core::{GrayImageView, Point2D};

/// 4-connected set of dark pixels.
#[derive(Clone, Debug)]
pub(crate) struct Blob {
    pub pixel_count: usize,
    pub touches_border: bool,
    /// Leftmost/rightmost pixel per row, starting at row `min_y`.
    pub min_y: usize,
    pub rows: Vec<(usize, usize)>,
}

/// Quadrilateral fitted to a blob outline.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Quad {
    /// Clockwise in image coordinates, starting nearest the image origin.
    pub corners: [Point2D; 4],
    /// Area of the quad over the area of the blob's convex hull.
    pub fill: f64,
}

impl Quad {
    pub fn min_side(&self) -> f64 {
        (0..4)
            .map(|i| (self.corners[(i + 1) % 4] - self.corners[i]).norm())
            .fold(f64::INFINITY, f64::min)
    }
}

/// Label 4-connected pixels with `value < threshold`, skipping blobs with
/// fewer than `min_pixels` pixels.
pub(crate) fn dark_blobs(img: &GrayImageView<'_>, threshold: u8, min_pixels: usize) -> Vec<Blob> {
    let (w, h) = (img.width, img.height);
    let mut visited = vec![false; w * h];
    let mut out = Vec::new();
    let mut queue = VecDeque::new();
    let mut pixels = Vec::new();

    for start in 0..w * h {
        if visited[start] || img.data[start] >= threshold {
            continue;
        }
        visited[start] = true;
        queue.push_back(start);
        pixels.clear();

        while let Some(idx) = queue.pop_front() {
            pixels.push(idx);
            let (x, y) = (idx % w, idx / w);
            let mut visit = |n: usize| {
                if !visited[n] && img.data[n] < threshold {
                    visited[n] = true;
                    queue.push_back(n);
                }
            };
            if x > 0 {
                visit(idx - 1);
            }
            if x + 1 < w {
                visit(idx + 1);
            }
            if y > 0 {
                visit(idx - w);
            }
            if y + 1 < h {
                visit(idx + w);
            }
        }

        if pixels.len() >= min_pixels {
            out.push(blob_from_pixels(&pixels, w, h));
        }
    }

    out
}

fn blob_from_pixels(pixels: &[usize], w: usize, h: usize) -> Blob {
    let min_y = pixels.iter().map(|&i| i / w).min().unwrap_or(0);
    let max_y = pixels.iter().map(|&i| i / w).max().unwrap_or(0);
    let mut rows = vec![(usize::MAX, 0usize); max_y - min_y + 1];
    let mut touches_border = false;

    for &idx in pixels {
        let (x, y) = (idx % w, idx / w);
        let row = &mut rows[y - min_y];
        row.0 = row.0.min(x);
        row.1 = row.1.max(x);
        touches_border |= x == 0 || y == 0 || x + 1 == w || y + 1 == h;
    }

    Blob {
        pixel_count: pixels.len(),
        touches_border,
        min_y,
        rows,
    }
}

/// Convex hull of the blob's pixel squares, counter-clockwise in image
/// coordinates, without collinear points.
pub(crate) fn blob_hull(blob: &Blob) -> Vec<(i64, i64)> {
    let mut pts = Vec::with_capacity(blob.rows.len() * 4);
    for (dy, &(x0, x1)) in blob.rows.iter().enumerate() {
        // 4-connected blobs have no empty rows.
        if x0 > x1 {
            continue;
        }
        let y = (blob.min_y + dy) as i64;
        let (x0, x1) = (x0 as i64, x1 as i64 + 1);
        pts.extend([(x0, y), (x0, y + 1), (x1, y), (x1, y + 1)]);
    }
    convex_hull(pts)
}

fn cross(o: (i64, i64), a: (i64, i64), b: (i64, i64)) -> i64 {
    (a.0 - o.0) * (b.1 - o.1) - (a.1 - o.1) * (b.0 - o.0)
}

/// Andrew's monotone chain.
fn convex_hull(mut pts: Vec<(i64, i64)>) -> Vec<(i64, i64)> {
    pts.sort_unstable();
    pts.dedup();
    if pts.len() < 3 {
        return pts;
    }

    let chain = |iter: &mut dyn Iterator<Item = &(i64, i64)>| {
        let mut out: Vec<(i64, i64)> = Vec::new();
        for &p in iter {
            while out.len() >= 2 && cross(out[out.len() - 2], out[out.len() - 1], p) <= 0 {
                out.pop();
            }
            out.push(p);
        }
        // Each chain ends where the other starts.
        out.pop();
        out
    };

    let mut hull = chain(&mut pts.iter());
    hull.extend(chain(&mut pts.iter().rev()));
    hull
}

fn polygon_area(pts: &[Point2D]) -> f64 {
    let n = pts.len();
    (0..n)
        .map(|i| {
            let (a, b) = (pts[i], pts[(i + 1) % n]);
            a.x * b.y - b.x * a.y
        })
        .sum::<f64>()
        * 0.5
}

/// Fit the largest quad spanned by hull vertices: the two farthest-apart
/// vertices and the farthest vertex on each side of their diagonal.
pub(crate) fn fit_quad(hull: &[(i64, i64)]) -> Option<Quad> {
    if hull.len() < 4 {
        return None;
    }
    let pts: Vec<Point2D> = hull.iter().map(|&(x, y)| Point2D::new(x as f64, y as f64)).collect();

    let mut diag = (0, 0, 0.0f64);
    for i in 0..pts.len() {
        for j in i + 1..pts.len() {
            let d = (pts[j] - pts[i]).norm_squared();
            if d > diag.2 {
                diag = (i, j, d);
            }
        }
    }
    let (a, c) = (pts[diag.0], pts[diag.1]);
    let ac = c - a;

    let mut left = (None, 0.0f64);
    let mut right = (None, 0.0f64);
    for p in &pts {
        let s = ac.x * (p.y - a.y) - ac.y * (p.x - a.x);
        if s > left.1 {
            left = (Some(*p), s);
        }
        if s < right.1 {
            right = (Some(*p), s);
        }
    }
    let (b, d) = (left.0?, right.0?);

    let mut corners = [a, b, c, d];
    let center = Point2D::from((a.coords + b.coords + c.coords + d.coords) / 4.0);
    // Ascending angle is clockwise on screen (y down).
    corners.sort_by(|p, q| {
        let ap = (p.y - center.y).atan2(p.x - center.x);
        let aq = (q.y - center.y).atan2(q.x - center.x);
        ap.total_cmp(&aq)
    });
    let first = (0..4)
        .min_by(|&i, &j| {
            let si = corners[i].x + corners[i].y;
            let sj = corners[j].x + corners[j].y;
            si.total_cmp(&sj)
        })
        .unwrap_or(0);
    corners.rotate_left(first);

    let area = polygon_area(&corners);
    let hull_area = polygon_area(&pts).abs();
    if area <= 0.0 || hull_area <= 0.0 {
        return None;
    }

    Some(Quad {
        corners,
        fill: area / hull_area,
    })
}
