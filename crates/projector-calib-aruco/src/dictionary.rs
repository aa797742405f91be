//! Dictionary metadata and the closed set of supported marker families.

use std::fmt;
use std::str::FromStr;

use projector_calib_core::GrayImage;
use serde::{Deserialize, Serialize};

use crate::builtins;
use crate::render::render_marker;

/// A fixed AprilTag-style dictionary.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Dictionary {
    /// Human-readable name (for debugging/logging).
    pub name: &'static str,
    /// Marker side length (number of inner bits per side).
    pub marker_size: usize,
    /// Maximum error-correcting Hamming distance supported by the dictionary.
    pub max_correction_bits: u8,
    /// One code per marker id, most significant bit first in `bit_x`/`bit_y`
    /// order, **white = 1**.
    pub codes: &'static [u64],
    /// Module column of each code bit, `1..=marker_size` (the border is column 0).
    pub bit_x: &'static [u8],
    /// Module row of each code bit, `1..=marker_size` (the border is row 0).
    pub bit_y: &'static [u8],
}

impl Dictionary {
    /// Total number of inner bits per marker.
    #[inline]
    pub fn bit_count(&self) -> usize {
        self.marker_size * self.marker_size
    }

    /// Number of marker ids.
    #[inline]
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Inner bits of marker `id` on the module grid: row-major
    /// (`idx = y * marker_size + x`), **black = 1**.
    pub fn grid_code(&self, id: u32) -> Option<u64> {
        let code = *self.codes.get(id as usize)?;
        let nbits = self.bit_count();
        let mut out = 0u64;
        for (i, (&bx, &by)) in self.bit_x.iter().zip(self.bit_y).enumerate() {
            let white = (code >> (nbits - 1 - i)) & 1 == 1;
            if !white {
                let idx = (by as usize - 1) * self.marker_size + (bx as usize - 1);
                out |= 1u64 << idx;
            }
        }
        Some(out)
    }
}

/// Requested marker family is not in [`MarkerDictionary::ALL`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown marker dictionary {requested:?} (supported: {})", MarkerDictionary::supported_names().join(", "))]
pub struct UnknownMarkerDictionaryError {
    pub requested: String,
}

/// Supported marker families, named and numbered as in OpenCV's
/// `cv::aruco::PredefinedDictionaryType`.
///
/// Resolve one once (from a name or code) and pass it to the detector.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarkerDictionary {
    #[serde(rename = "DICT_APRILTAG_16h5")]
    AprilTag16h5,
    #[serde(rename = "DICT_APRILTAG_25h9")]
    AprilTag25h9,
}

impl MarkerDictionary {
    pub const ALL: [MarkerDictionary; 2] = [Self::AprilTag16h5, Self::AprilTag25h9];

    pub fn name(self) -> &'static str {
        self.dictionary().name
    }

    /// OpenCV numeric dictionary code.
    pub fn code(self) -> i32 {
        match self {
            Self::AprilTag16h5 => 17,
            Self::AprilTag25h9 => 18,
        }
    }

    pub fn from_code(code: i32) -> Result<Self, UnknownMarkerDictionaryError> {
        Self::ALL
            .into_iter()
            .find(|d| d.code() == code)
            .ok_or_else(|| UnknownMarkerDictionaryError {
                requested: code.to_string(),
            })
    }

    pub fn dictionary(self) -> Dictionary {
        match self {
            Self::AprilTag16h5 => builtins::DICT_APRILTAG_16H5,
            Self::AprilTag25h9 => builtins::DICT_APRILTAG_25H9,
        }
    }

    pub fn supported_names() -> Vec<&'static str> {
        Self::ALL.iter().map(|d| d.name()).collect()
    }

    /// Shorthand for [`render_marker`] on this family.
    pub fn render(self, id: u32, module_px: usize, quiet_zone_px: usize) -> Option<GrayImage> {
        render_marker(&self.dictionary(), id, module_px, quiet_zone_px)
    }
}

impl FromStr for MarkerDictionary {
    type Err = UnknownMarkerDictionaryError;

    /// Accepts the dictionary name (case-insensitive) or its numeric code.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(code) = s.parse::<i32>() {
            return Self::from_code(code);
        }
        Self::ALL
            .into_iter()
            .find(|d| d.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownMarkerDictionaryError {
                requested: s.to_string(),
            })
    }
}

impl fmt::Display for MarkerDictionary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_and_codes_resolve() {
        assert_eq!(
            "DICT_APRILTAG_16h5".parse::<MarkerDictionary>(),
            Ok(MarkerDictionary::AprilTag16h5)
        );
        assert_eq!(
            "dict_apriltag_25H9".parse::<MarkerDictionary>(),
            Ok(MarkerDictionary::AprilTag25h9)
        );
        assert_eq!("18".parse::<MarkerDictionary>(), Ok(MarkerDictionary::AprilTag25h9));
        assert_eq!(MarkerDictionary::from_code(17), Ok(MarkerDictionary::AprilTag16h5));
    }

    #[test]
    fn unknown_dictionary_is_a_typed_error() {
        let err = "DICT_4X4_50".parse::<MarkerDictionary>().unwrap_err();
        assert_eq!(err.requested, "DICT_4X4_50");
        assert!(err.to_string().contains("DICT_APRILTAG_16h5"));

        assert!(MarkerDictionary::from_code(0).is_err());
    }

    #[test]
    fn serde_uses_opencv_names() {
        let json = serde_json::to_string(&MarkerDictionary::AprilTag25h9).expect("serialize");
        assert_eq!(json, "\"DICT_APRILTAG_25h9\"");
        let back: MarkerDictionary = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, MarkerDictionary::AprilTag25h9);
    }

    #[test]
    fn grid_code_flips_polarity_and_layout() {
        let dict = MarkerDictionary::AprilTag16h5.dictionary();
        // 0x27c8: first (most significant) bit 0 -> module (1,1) black.
        let grid = dict.grid_code(0).expect("id 0");
        assert_eq!(grid & 1, 1);
        assert_eq!(
            grid.count_ones() as usize,
            dict.bit_count() - dict.codes[0].count_ones() as usize
        );
        assert!(dict.grid_code(30).is_none());
    }
}
