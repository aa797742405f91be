//! High-level facade for projector calibration.
//!
//! A projector shows a marker pattern, a camera photographs the scene, and
//! the markers' physical positions are known. From these three marker sets
//! the crate computes one correction homography that pre-warps projector
//! content so it lands where it was designed to.
//!
//! This crate provides:
//! - re-exports of the detector (`aruco`) and geometry (`core`) crates,
//! - the named-stage correction pipeline ([`HomographyComposer`]),
//! - JSON wire payloads compatible with the calibration service ([`wire`]),
//! - end-to-end helpers over those payloads ([`calibrate`]),
//! - (feature `image`) adapters for `image` crate buffers ([`convert`]).
//!
//! ## Quickstart
//!
//! ```
//! use projector_calib::core::{CorrespondenceSet, MarkerCorners};
//! use projector_calib::{CalibrationRequest, HomographyComposer};
//!
//! let marker = |x: f64, y: f64| {
//!     MarkerCorners::from_array([[x, y], [x + 10.0, y], [x + 10.0, y + 10.0], [x, y + 10.0]])
//! };
//! let real: CorrespondenceSet = [(0, marker(0.0, 0.0)), (1, marker(50.0, 20.0))].into_iter().collect();
//!
//! let request = CalibrationRequest::new(real.clone(), real.clone(), real);
//! let result = HomographyComposer::default().compose(&request).unwrap();
//! assert!((result.correction.h[(0, 0)] - 1.0).abs() < 1e-9);
//! ```

pub use projector_calib_aruco as aruco;
pub use projector_calib_core as core;

pub mod calibrate;
pub mod composer;
pub mod config;
#[cfg(feature = "image")]
pub mod convert;
mod error;
pub mod wire;

pub use composer::{
    CalibrationRequest, CompositionPipeline, CorrectionResult, Frame, HomographyComposer,
    PipelineError, PipelineTrace, Stage, StageKind,
};
pub use config::{CalibrationConfig, ConfigError};
pub use error::{CalibrationError, ErrorClass};
pub use wire::WireError;

pub use projector_calib_aruco::{
    DetectorParams, MarkerCorrespondenceDetector, MarkerDictionary, UnknownMarkerDictionaryError,
};
pub use projector_calib_core::{
    CorrespondenceSet, EstimatorParams, GeometryError, Homography, HomographyEstimator, Image,
    ImageView, ImageWarper, MarkerCorners, Point2D, WarpParams,
};

/// Route `log` records into `tracing` and install a `tracing` subscriber.
#[cfg(feature = "tracing")]
pub fn init_tracing(json: bool) {
    let _ = tracing_log::LogTracer::init();
    projector_calib_core::init_tracing(json);
}
