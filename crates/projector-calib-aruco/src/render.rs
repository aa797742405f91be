//! Rasterize dictionary markers, e.g. to build a projector pattern.

use projector_calib_core::GrayImage;

use crate::Dictionary;

/// Render marker `id` with a one-module black border, `module_px` pixels per
/// module and a white quiet zone of `quiet_zone_px` on every side.
///
/// Returns `None` for an unknown id or a zero module size.
pub fn render_marker(
    dict: &Dictionary,
    id: u32,
    module_px: usize,
    quiet_zone_px: usize,
) -> Option<GrayImage> {
    if module_px == 0 {
        return None;
    }
    let code = dict.grid_code(id)?;
    let n = dict.marker_size;
    let cells = n + 2;
    let side = cells * module_px + 2 * quiet_zone_px;
    let mut data = vec![255u8; side * side];

    for cy in 0..cells {
        for cx in 0..cells {
            let is_border = cx == 0 || cy == 0 || cx + 1 == cells || cy + 1 == cells;
            let is_black = is_border || (code >> ((cy - 1) * n + (cx - 1))) & 1 == 1;
            if !is_black {
                continue;
            }
            let x0 = quiet_zone_px + cx * module_px;
            let y0 = quiet_zone_px + cy * module_px;
            for y in y0..y0 + module_px {
                data[y * side + x0..y * side + x0 + module_px].fill(0);
            }
        }
    }

    Some(GrayImage {
        width: side,
        height: side,
        data,
    })
}
