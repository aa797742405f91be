//! Calibrate a projector from a camera shot and pre-warp a pattern.
//!
//! ```text
//! cargo run -p projector-calib --example calibrate_projector -- session.json
//! ```
//!
//! `session.json`:
//!
//! ```json
//! {
//!   "camera_image": "capture.png",
//!   "real_markers": "real_markers.json",
//!   "projected_markers": "projected_markers.json",
//!   "pattern_image": "pattern.png",
//!   "output_image": "pattern_corrected.png",
//!   "calibration": { "dictionary": "DICT_APRILTAG_16h5" }
//! }
//! ```
//!
//! Marker files use the wire format `{"<id>": [[x, y], ...4 corners]}`.

use std::{env, fs, path::PathBuf};

use image::ImageReader;
use log::info;
use projector_calib::calibrate::{apply_correction, compute_correction, detect_markers};
use projector_calib::convert::{from_dynamic, into_dynamic};
use projector_calib::wire::{from_json_str, to_json_string, CorrectionRequestPayload};
use projector_calib::CalibrationConfig;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct SessionConfig {
    camera_image: PathBuf,
    real_markers: PathBuf,
    projected_markers: PathBuf,
    pattern_image: PathBuf,
    #[serde(default)]
    output_image: Option<PathBuf>,
    #[serde(default)]
    calibration: CalibrationConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    let config_path = env::args()
        .nth(1)
        .map(PathBuf::from)
        .ok_or("usage: calibrate_projector <session.json>")?;
    let session: SessionConfig = serde_json::from_str(&fs::read_to_string(&config_path)?)?;
    let cfg = &session.calibration;

    let camera = from_dynamic(&ImageReader::open(&session.camera_image)?.decode()?);
    let detection = detect_markers(&camera.view(), cfg.dictionary.name(), &cfg.detector)?;
    info!(
        "{} markers in {}",
        detection.detected_markers.0.len(),
        session.camera_image.display()
    );

    let request = CorrectionRequestPayload {
        detected_markers: detection.detected_markers,
        real_markers: from_json_str(&fs::read_to_string(&session.real_markers)?)?,
        projected_markers: from_json_str(&fs::read_to_string(&session.projected_markers)?)?,
    };
    let response = match compute_correction(&request, &cfg.estimator) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("calibration failed ({}): {e}", e.status_code());
            return Err(e.into());
        }
    };
    println!("{}", to_json_string(&response)?);

    let pattern = from_dynamic(&ImageReader::open(&session.pattern_image)?.decode()?);
    let corrected = apply_correction(&pattern.view(), &response.homography_correction, &cfg.warp)?;

    let output = session
        .output_image
        .unwrap_or_else(|| PathBuf::from("pattern_corrected.png"));
    into_dynamic(corrected)?.save(&output)?;
    println!("wrote corrected pattern to {}", output.display());

    Ok(())
}

fn init_logging() {
    #[cfg(feature = "tracing")]
    projector_calib::init_tracing(false);

    #[cfg(not(feature = "tracing"))]
    let _ = projector_calib::core::init_from_env(log::LevelFilter::Info);
}
