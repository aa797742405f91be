use projector_calib_aruco::UnknownMarkerDictionaryError;
use projector_calib_core::{GeometryError, ImageError};

use crate::config::ConfigError;
use crate::wire::WireError;

/// Errors produced by the end-to-end calibration helpers.
#[derive(thiserror::Error, Debug)]
pub enum CalibrationError {
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    UnknownDictionary(#[from] UnknownMarkerDictionaryError),

    #[error(transparent)]
    Image(#[from] ImageError),

    #[error(transparent)]
    Wire(#[from] WireError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Who is at fault for a [`CalibrationError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorClass {
    /// The caller's input cannot be used (4xx).
    BadInput,
    /// The numerics broke down on otherwise well-formed input (5xx).
    Numerical,
}

impl CalibrationError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Geometry(GeometryError::SingularMatrix { .. }) => ErrorClass::Numerical,
            Self::Geometry(_)
            | Self::UnknownDictionary(_)
            | Self::Image(_)
            | Self::Wire(_)
            | Self::Config(_) => ErrorClass::BadInput,
        }
    }

    /// HTTP status an HTTP front end should answer with.
    pub fn status_code(&self) -> u16 {
        match self.class() {
            ErrorClass::BadInput => 400,
            ErrorClass::Numerical => 500,
        }
    }
}
