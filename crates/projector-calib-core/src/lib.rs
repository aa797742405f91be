//! Core geometry for projector calibration.
//!
//! This crate is purely geometric and performs no I/O:
//! - marker correspondences observed in one frame (`CorrespondenceSet`),
//! - homography estimation with the normalized DLT (`HomographyEstimator`),
//! - checked inversion and composition of homographies,
//! - perspective warping of decoded pixel buffers (`ImageWarper`).
//!
//! Marker detection lives in `projector-calib-aruco`; the three-frame
//! correction pipeline lives in `projector-calib`.

mod error;
mod estimator;
mod homography;
mod image;
mod logger;
mod types;
mod warp;

pub use error::GeometryError;
pub use estimator::{EstimatorParams, HomographyEstimator};
pub use homography::{estimate_homography, homography_from_4pt, Homography, MIN_POINT_PAIRS};
pub use image::{GrayImage, GrayImageView, Image, ImageError, ImageView};
pub use types::{CorrespondenceSet, MarkerCorners, Point2D, PointPairs};
pub use warp::{warp_perspective, ImageWarper, WarpParams};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::{init_from_env, init_with_level, LOG_ENV_VAR};
