//! Calibration settings loaded from JSON.
//!
//! Every field is optional; missing ones take their defaults:
//!
//! ```json
//! {
//!   "dictionary": "DICT_APRILTAG_25h9",
//!   "detector": { "max_hamming": 0 },
//!   "estimator": { "singular_tolerance": 1e-10 },
//!   "warp": { "fill": [255, 255, 255, 255] }
//! }
//! ```

use std::path::{Path, PathBuf};

use projector_calib_aruco::{DetectorParams, MarkerDictionary};
use projector_calib_core::{EstimatorParams, WarpParams};
use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Marker family the projector pattern uses.
    pub dictionary: MarkerDictionary,
    pub detector: DetectorParams,
    pub estimator: EstimatorParams,
    pub warp: WarpParams,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            dictionary: MarkerDictionary::AprilTag16h5,
            detector: DetectorParams::default(),
            estimator: EstimatorParams::default(),
            warp: WarpParams::default(),
        }
    }
}

impl CalibrationConfig {
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }
}
