//! AprilTag-family marker dictionaries, rendering and detection.
//!
//! This crate focuses on:
//! - embedded built-in dictionaries behind the closed [`MarkerDictionary`] enum,
//! - matching observed marker codes against a dictionary in any rotation,
//! - finding black-bordered square markers in a full image and reporting
//!   their corners as a [`projector_calib_core::CorrespondenceSet`].
//!
//! ```
//! use projector_calib_aruco::{DetectorParams, MarkerCorrespondenceDetector, MarkerDictionary};
//!
//! let dictionary: MarkerDictionary = "DICT_APRILTAG_16h5".parse().unwrap();
//! let pattern = dictionary.render(4, 10, 20).unwrap().into_image();
//!
//! let detector = MarkerCorrespondenceDetector::new(dictionary, DetectorParams::default());
//! let markers = detector.detect(&pattern.view());
//! assert!(markers.contains(4));
//! ```

pub mod builtins;
mod detector;
mod dictionary;
mod matcher;
mod quad;
mod render;
mod scan;
mod threshold;

pub use detector::{DetectorParams, MarkerCorrespondenceDetector};
pub use dictionary::{Dictionary, MarkerDictionary, UnknownMarkerDictionaryError};
pub use matcher::{rotate_code_u64, Match, Matcher};
pub use render::render_marker;
pub use scan::{decode_marker_in_quad, MarkerDetection, ScanDecodeConfig};
