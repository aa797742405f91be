//! JSON payloads exchanged with the HTTP front end.
//!
//! Correspondence sets travel as `{"<id>": [[x, y], [x, y], [x, y], [x, y]]}`
//! and homographies as row-major `[[h11, h12, h13], [..], [..]]`. Doubles
//! survive a serialize/parse round trip bit for bit.
//!
//! Marker ids are dictionary indices, so keys must parse as non-negative
//! integers (`u32`). Negative keys such as `"-1"` fail with
//! [`WireError::InvalidMarkerId`] rather than being carried through.

use std::collections::BTreeMap;

use projector_calib_aruco::MarkerDictionary;
use projector_calib_core::{CorrespondenceSet, GeometryError, Homography, MarkerCorners};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{CalibrationError, CalibrationRequest, ErrorClass};

/// Malformed payload.
#[derive(thiserror::Error, Debug)]
pub enum WireError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("marker id {0:?} is not a non-negative integer")]
    InvalidMarkerId(String),

    #[error("marker id {0} appears more than once")]
    DuplicateMarkerId(u32),

    #[error("marker {id} has {got} corners, expected 4")]
    CornerCount { id: u32, got: usize },
}

/// Parse any payload from a JSON string.
pub fn from_json_str<T: DeserializeOwned>(s: &str) -> Result<T, WireError> {
    Ok(serde_json::from_str(s)?)
}

/// Serialize any payload to a compact JSON string.
pub fn to_json_string<T: Serialize>(value: &T) -> Result<String, WireError> {
    Ok(serde_json::to_string(value)?)
}

/// One correspondence set on the wire.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrespondencePayload(pub BTreeMap<String, Vec<[f64; 2]>>);

impl TryFrom<&CorrespondencePayload> for CorrespondenceSet {
    type Error = WireError;

    fn try_from(payload: &CorrespondencePayload) -> Result<Self, Self::Error> {
        let mut set = CorrespondenceSet::new();
        for (key, corners) in &payload.0 {
            let id: u32 = key
                .trim()
                .parse()
                .map_err(|_| WireError::InvalidMarkerId(key.clone()))?;
            let corners: [[f64; 2]; 4] =
                corners
                    .as_slice()
                    .try_into()
                    .map_err(|_| WireError::CornerCount {
                        id,
                        got: corners.len(),
                    })?;
            if set.insert(id, MarkerCorners::from_array(corners)).is_some() {
                return Err(WireError::DuplicateMarkerId(id));
            }
        }
        Ok(set)
    }
}

impl From<&CorrespondenceSet> for CorrespondencePayload {
    fn from(set: &CorrespondenceSet) -> Self {
        Self(
            set.iter()
                .map(|(id, corners)| (id.to_string(), corners.to_array().to_vec()))
                .collect(),
        )
    }
}

/// A homography on the wire. Any nesting is accepted here; shape is checked
/// when converting to [`Homography`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HomographyPayload(pub Vec<Vec<f64>>);

impl HomographyPayload {
    pub fn to_homography(&self) -> Result<Homography, GeometryError> {
        Homography::try_from_rows(&self.0)
    }
}

impl From<&Homography> for HomographyPayload {
    fn from(h: &Homography) -> Self {
        Self(h.to_array().iter().map(|row| row.to_vec()).collect())
    }
}

impl TryFrom<&HomographyPayload> for Homography {
    type Error = GeometryError;

    fn try_from(payload: &HomographyPayload) -> Result<Self, Self::Error> {
        payload.to_homography()
    }
}

/// Input of the correction computation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CorrectionRequestPayload {
    pub detected_markers: CorrespondencePayload,
    pub real_markers: CorrespondencePayload,
    /// Markers as the projector was designed to emit them.
    pub projected_markers: CorrespondencePayload,
}

impl TryFrom<&CorrectionRequestPayload> for CalibrationRequest {
    type Error = WireError;

    fn try_from(payload: &CorrectionRequestPayload) -> Result<Self, Self::Error> {
        Ok(CalibrationRequest::new(
            (&payload.detected_markers).try_into()?,
            (&payload.real_markers).try_into()?,
            (&payload.projected_markers).try_into()?,
        ))
    }
}

impl From<&CalibrationRequest> for CorrectionRequestPayload {
    fn from(request: &CalibrationRequest) -> Self {
        Self {
            detected_markers: (&request.detected).into(),
            real_markers: (&request.real).into(),
            projected_markers: (&request.expected_projected).into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CorrectionResponsePayload {
    pub homography_correction: HomographyPayload,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionResponsePayload {
    pub detected_markers: CorrespondencePayload,
}

/// Error body returned alongside a 4xx/5xx status.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponsePayload {
    pub error: String,
    pub message: String,
    /// Supported dictionary names, set when an unknown one was requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_types: Option<Vec<String>>,
}

impl From<&CalibrationError> for ErrorResponsePayload {
    fn from(err: &CalibrationError) -> Self {
        let error = match err.class() {
            ErrorClass::BadInput => "Bad Request",
            ErrorClass::Numerical => "Internal Server Error",
        };
        let valid_types = matches!(err, CalibrationError::UnknownDictionary(_)).then(|| {
            MarkerDictionary::supported_names()
                .into_iter()
                .map(String::from)
                .collect()
        });
        Self {
            error: error.to_string(),
            message: err.to_string(),
            valid_types,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correspondence_payload_parses_string_ids() {
        let payload: CorrespondencePayload =
            from_json_str(r#"{"7": [[0,0],[1,0],[1,1],[0,1]], "12": [[2.5,3],[4,3],[4,4],[2.5,4]]}"#)
                .expect("payload");
        let set = CorrespondenceSet::try_from(&payload).expect("set");
        assert_eq!(set.ids().collect::<Vec<_>>(), vec![7, 12]);
        assert_eq!(set.get(12).expect("12").to_array()[0], [2.5, 3.0]);

        let back = CorrespondencePayload::from(&set);
        assert_eq!(back, payload);
    }

    #[test]
    fn rejects_bad_ids_and_corner_counts() {
        let bad_id: CorrespondencePayload =
            from_json_str(r#"{"a": [[0,0],[1,0],[1,1],[0,1]]}"#).expect("payload");
        assert!(matches!(
            CorrespondenceSet::try_from(&bad_id),
            Err(WireError::InvalidMarkerId(k)) if k == "a"
        ));

        let negative: CorrespondencePayload =
            from_json_str(r#"{"-1": [[0,0],[1,0],[1,1],[0,1]]}"#).expect("payload");
        assert!(matches!(
            CorrespondenceSet::try_from(&negative),
            Err(WireError::InvalidMarkerId(k)) if k == "-1"
        ));

        let three: CorrespondencePayload =
            from_json_str(r#"{"3": [[0,0],[1,0],[1,1]]}"#).expect("payload");
        assert!(matches!(
            CorrespondenceSet::try_from(&three),
            Err(WireError::CornerCount { id: 3, got: 3 })
        ));

        let dup: CorrespondencePayload = from_json_str(
            r#"{"1": [[0,0],[1,0],[1,1],[0,1]], "01": [[0,0],[1,0],[1,1],[0,1]]}"#,
        )
        .expect("payload");
        assert!(matches!(
            CorrespondenceSet::try_from(&dup),
            Err(WireError::DuplicateMarkerId(1))
        ));

        assert!(matches!(
            from_json_str::<CorrespondencePayload>("{"),
            Err(WireError::Json(_))
        ));
    }

    #[test]
    fn homography_round_trip_is_bit_exact() {
        let h = Homography::from_array([
            [1.0 / 3.0, -2.0e-17, 1234.567_890_123_456_7],
            [std::f64::consts::PI, 0.1 + 0.2, -5.0e300],
            [1.0e-7 / 7.0, f64::MIN_POSITIVE, 1.0],
        ]);
        let json = to_json_string(&HomographyPayload::from(&h)).expect("serialize");
        let back: HomographyPayload = from_json_str(&json).expect("parse");
        let parsed = back.to_homography().expect("3x3");

        for (a, b) in h.to_array().iter().flatten().zip(parsed.to_array().iter().flatten()) {
            assert_eq!(a.to_bits(), b.to_bits());
        }
    }

    #[test]
    fn request_field_names() {
        let json = r#"{
            "detected_markers": {"0": [[0,0],[1,0],[1,1],[0,1]]},
            "real_markers": {},
            "projected_markers": {}
        }"#;
        let payload: CorrectionRequestPayload = from_json_str(json).expect("payload");
        let request = CalibrationRequest::try_from(&payload).expect("request");
        assert_eq!(request.detected.len(), 1);
        assert!(request.expected_projected.is_empty());
    }

    #[test]
    fn error_body_lists_dictionaries_for_unknown_names() {
        let err: CalibrationError = "DICT_6X6_250"
            .parse::<MarkerDictionary>()
            .unwrap_err()
            .into();
        let body = ErrorResponsePayload::from(&err);
        assert_eq!(body.error, "Bad Request");
        assert_eq!(
            body.valid_types,
            Some(vec![
                "DICT_APRILTAG_16h5".to_string(),
                "DICT_APRILTAG_25h9".to_string()
            ])
        );
    }
}
