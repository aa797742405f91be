//! End-to-end operations behind the three service endpoints: marker
//! detection, correction computation and correction application.
//!
//! Inputs and outputs are wire payloads; pixel buffers arrive already decoded.

use log::info;
use projector_calib_aruco::{DetectorParams, MarkerCorrespondenceDetector, MarkerDictionary};
use projector_calib_core::{EstimatorParams, Image, ImageView, ImageWarper, WarpParams};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::wire::{
    CorrectionRequestPayload, CorrectionResponsePayload, DetectionResponsePayload,
    HomographyPayload,
};
use crate::{CalibrationError, CalibrationRequest, HomographyComposer};

/// Detect markers of the family named `dictionary` (name or numeric code).
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(image, params), fields(width = image.width, height = image.height))
)]
pub fn detect_markers(
    image: &ImageView<'_>,
    dictionary: &str,
    params: &DetectorParams,
) -> Result<DetectionResponsePayload, CalibrationError> {
    let dictionary: MarkerDictionary = dictionary.parse()?;
    let detector = MarkerCorrespondenceDetector::new(dictionary, params.clone());
    let markers = detector.detect(image);
    info!("detected {} {} markers", markers.len(), dictionary);
    Ok(DetectionResponsePayload {
        detected_markers: (&markers).into(),
    })
}

/// Compute the projector correction homography from three marker sets.
#[cfg_attr(feature = "tracing", instrument(level = "info", skip_all))]
pub fn compute_correction(
    payload: &CorrectionRequestPayload,
    params: &EstimatorParams,
) -> Result<CorrectionResponsePayload, CalibrationError> {
    let request = CalibrationRequest::try_from(payload)?;
    let result = HomographyComposer::new(params.clone()).compose(&request)?;
    info!(
        "correction from {}/{}/{} markers (detected/real/projected)",
        request.detected.len(),
        request.real.len(),
        request.expected_projected.len()
    );
    Ok(CorrectionResponsePayload {
        homography_correction: (&result.correction).into(),
    })
}

/// Warp `image` by the homography in `payload`.
///
/// The matrix is checked before any pixel is processed.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(image, payload, params), fields(width = image.width, height = image.height))
)]
pub fn apply_correction(
    image: &ImageView<'_>,
    payload: &HomographyPayload,
    params: &WarpParams,
) -> Result<Image, CalibrationError> {
    let h = payload.to_homography()?;
    Ok(ImageWarper::new(params.clone()).warp(image, &h)?)
}
