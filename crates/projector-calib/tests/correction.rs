use approx::assert_relative_eq;
use projector_calib::calibrate::{apply_correction, compute_correction, detect_markers};
use projector_calib::composer::{PROJECTOR_DETECTED_TO_CAMERA, REAL_TO_CAMERA};
use projector_calib::wire::{
    from_json_str, to_json_string, CorrectionRequestPayload, CorrectionResponsePayload,
    CorrespondencePayload, HomographyPayload,
};
use projector_calib::{
    CalibrationError, CalibrationRequest, CorrespondenceSet, DetectorParams, EstimatorParams,
    ErrorClass, GeometryError, Homography, HomographyComposer, HomographyEstimator, Image,
    ImageWarper, MarkerCorners, MarkerDictionary, Point2D, WarpParams,
};

fn square(x0: f64, y0: f64, s: f64) -> MarkerCorners {
    MarkerCorners::from_array([[x0, y0], [x0 + s, y0], [x0 + s, y0 + s], [x0, y0 + s]])
}

fn real_board() -> CorrespondenceSet {
    [
        (0, square(0.0, 0.0, 40.0)),
        (3, square(200.0, 0.0, 40.0)),
        (5, square(0.0, 150.0, 40.0)),
        (8, square(200.0, 150.0, 40.0)),
        (9, square(110.0, 70.0, 25.0)),
    ]
    .into_iter()
    .collect()
}

fn map_set(set: &CorrespondenceSet, h: &Homography) -> CorrespondenceSet {
    set.iter()
        .map(|(id, c)| (*id, MarkerCorners::new(c.points().map(|p| h.apply(p)))))
        .collect()
}

fn camera() -> Homography {
    Homography::from_array([
        [1.8, 0.12, 320.0],
        [-0.05, 1.7, 140.0],
        [2.0e-4, 1.5e-4, 1.0],
    ])
}

#[test]
fn estimate_forward_then_backward_is_identity() {
    let real = real_board();
    let detected = map_set(&real, &camera());
    let estimator = HomographyEstimator::default();

    let forward = estimator.estimate(&real, &detected).expect("forward");
    let backward = estimator.estimate(&detected, &real).expect("backward");
    let round = backward.compose(&forward).expect("compose");
    assert_relative_eq!(round.h, Homography::identity().h, epsilon = 1e-6);
}

#[test]
fn identical_sets_give_identity_correction() {
    let set = real_board();
    let request = CalibrationRequest::new(set.clone(), set.clone(), set);
    let result = HomographyComposer::default()
        .compose(&request)
        .expect("compose");
    assert_relative_eq!(result.correction.h, Homography::identity().h, epsilon = 1e-9);
}

#[test]
fn marker_missing_from_projected_set_is_degenerate() {
    let real: CorrespondenceSet = [(4, square(0.0, 0.0, 40.0))].into_iter().collect();
    let detected = map_set(&real, &camera());
    let projected: CorrespondenceSet = [(6, square(0.0, 0.0, 40.0))].into_iter().collect();

    let estimator = HomographyEstimator::default();
    assert!(estimator.estimate(&real, &detected).is_ok());
    assert_eq!(
        estimator.estimate(&projected, &detected),
        Err(GeometryError::DegenerateCorrespondence {
            point_pairs: 0,
            reason: "at least 4 point pairs required",
        })
    );

    let request = CalibrationRequest::new(detected, real, projected);
    let err = HomographyComposer::default().compose(&request).unwrap_err();
    assert!(matches!(
        err,
        GeometryError::DegenerateCorrespondence { point_pairs: 0, .. }
    ));
}

#[test]
fn synthetic_correction_matches_hand_derivation() {
    let real = real_board();
    let h_camera = camera();
    // The projector emits its design slightly keystoned.
    let g = Homography::from_array([
        [0.97, 0.03, 4.0],
        [-0.02, 1.01, -3.0],
        [1.0e-4, 0.0, 1.0],
    ]);
    let expected = map_set(&real, &g);
    let detected = map_set(&real, &h_camera);

    let composer = HomographyComposer::default();
    let request = CalibrationRequest::new(detected, real, expected);
    let trace = composer.compose_traced(&request).expect("compose");

    let estimator = HomographyEstimator::default();
    let h_rc = estimator
        .estimate(&request.real, &request.detected)
        .expect("real to camera");
    let h_pc = estimator
        .estimate(&request.expected_projected, &request.detected)
        .expect("projected to camera");
    let by_hand = h_pc
        .try_inverse(1e-12)
        .expect("invert")
        .compose(&h_rc)
        .expect("compose");

    assert_relative_eq!(trace.correction.h, by_hand.h, epsilon = 1e-9);
    assert_relative_eq!(
        trace.get(REAL_TO_CAMERA).expect("stage").h,
        h_rc.h,
        epsilon = 1e-12
    );
    assert!(trace.get(PROJECTOR_DETECTED_TO_CAMERA).is_some());
    // Algebraically the correction is the projector distortion itself.
    assert_relative_eq!(trace.correction.h, g.h, epsilon = 1e-6);
}

#[test]
fn collinear_markers_are_rejected() {
    let line: CorrespondenceSet = [
        (
            0,
            MarkerCorners::from_array([[0.0, 0.0], [1.0, 1.0], [2.0, 2.0], [3.0, 3.0]]),
        ),
        (
            1,
            MarkerCorners::from_array([[4.0, 4.0], [5.0, 5.0], [6.0, 6.0], [7.0, 7.0]]),
        ),
    ]
    .into_iter()
    .collect();
    let request = CalibrationRequest::new(line.clone(), line.clone(), line);
    let err = HomographyComposer::new(EstimatorParams::default())
        .compose(&request)
        .unwrap_err();
    assert!(matches!(err, GeometryError::DegenerateCorrespondence { .. }));
}

#[test]
fn wire_request_produces_wire_response() {
    let real = real_board();
    let payload = CorrectionRequestPayload {
        detected_markers: (&map_set(&real, &camera())).into(),
        real_markers: (&real).into(),
        projected_markers: (&real).into(),
    };
    let json = to_json_string(&payload).expect("serialize");
    let parsed: CorrectionRequestPayload = from_json_str(&json).expect("parse");

    let response = compute_correction(&parsed, &EstimatorParams::default()).expect("correction");
    let body = to_json_string(&response).expect("serialize");
    assert!(body.starts_with(r#"{"homography_correction":[["#));

    let back: CorrectionResponsePayload = from_json_str(&body).expect("parse");
    let h = back.homography_correction.to_homography().expect("3x3");
    assert_relative_eq!(h.h, Homography::identity().h, epsilon = 1e-9);
}

#[test]
fn wire_errors_are_bad_input() {
    let mut payload = CorrectionRequestPayload::default();
    payload
        .detected_markers
        .0
        .insert("x".into(), vec![[0.0, 0.0]; 4]);
    let err = compute_correction(&payload, &EstimatorParams::default()).unwrap_err();
    assert!(matches!(err, CalibrationError::Wire(_)));
    assert_eq!(err.class(), ErrorClass::BadInput);
}

#[test]
fn two_by_two_matrix_is_rejected_before_warping() {
    let image = Image::filled(16, 9, &[1, 2, 3, 4]).expect("image");
    let payload: HomographyPayload = from_json_str("[[1.0, 0.0], [0.0, 1.0]]").expect("payload");
    let err = apply_correction(&image.view(), &payload, &WarpParams::default()).unwrap_err();
    assert!(matches!(
        err,
        CalibrationError::Geometry(GeometryError::InvalidTransform { .. })
    ));
    assert_eq!(err.class(), ErrorClass::BadInput);
}

#[test]
fn identity_correction_returns_input_unchanged() {
    let data: Vec<u8> = (0..20 * 12 * 3).map(|i| (i * 7 % 251) as u8).collect();
    let image = Image::new(20, 12, 3, data).expect("image");
    let payload = HomographyPayload::from(&Homography::identity());
    let out = apply_correction(&image.view(), &payload, &WarpParams::default()).expect("warp");
    assert_eq!(out, image);
}

#[test]
fn camera_view_of_projected_pattern_calibrates_end_to_end() {
    let dict = MarkerDictionary::AprilTag16h5;
    let (w, h) = (320usize, 240usize);

    // Projector pattern: four markers in design coordinates.
    let mut pattern = vec![255u8; w * h];
    let mut designed = CorrespondenceSet::new();
    for (id, ox, oy) in [(1u32, 30usize, 30usize), (4, 220, 30), (10, 30, 150), (17, 220, 150)] {
        let tile = dict.render(id, 10, 0).expect("render");
        for y in 0..tile.height {
            pattern[(oy + y) * w + ox..(oy + y) * w + ox + tile.width]
                .copy_from_slice(&tile.data[y * tile.width..(y + 1) * tile.width]);
        }
        designed.insert(id, square(ox as f64, oy as f64, tile.width as f64));
    }
    let pattern = Image::new(w, h, 1, pattern).expect("pattern");

    // The camera sees the pattern through a mild perspective.
    let h_cam = Homography::from_array([
        [0.95, 0.04, 10.0],
        [-0.03, 0.97, 8.0],
        [8.0e-5, -6.0e-5, 1.0],
    ]);
    let shot = ImageWarper::new(WarpParams {
        fill: [255; 4],
        ..WarpParams::default()
    })
    .warp(&pattern.view(), &h_cam)
    .expect("camera view");

    let detected = detect_markers(&shot.view(), "DICT_APRILTAG_16h5", &DetectorParams::default())
        .expect("detect")
        .detected_markers;
    let detected_set = CorrespondenceSet::try_from(&detected).expect("set");
    assert_eq!(detected_set.ids().collect::<Vec<_>>(), vec![1, 4, 10, 17]);

    let designed_payload = CorrespondencePayload::from(&designed);
    let response = compute_correction(
        &CorrectionRequestPayload {
            detected_markers: detected,
            real_markers: designed_payload.clone(),
            projected_markers: designed_payload,
        },
        &EstimatorParams::default(),
    )
    .expect("correction");

    // Real and projected agree, so the correction moves nothing noticeably.
    let correction = response.homography_correction.to_homography().expect("3x3");
    for corner in [
        Point2D::new(0.0, 0.0),
        Point2D::new(w as f64, 0.0),
        Point2D::new(w as f64, h as f64),
        Point2D::new(0.0, h as f64),
    ] {
        let moved = correction.apply(corner);
        assert!((moved - corner).norm() < 1e-6, "{corner} -> {moved}");
    }
}

#[test]
fn collinear_corners_in_projected_marker_are_a_numerical_failure() {
    let real = real_board();
    let detected = map_set(&real, &camera());
    let bent: CorrespondenceSet = [(
        5,
        MarkerCorners::from_array([[0.0, 0.0], [20.0, 0.0], [40.0, 0.0], [40.0, 40.0]]),
    )]
    .into_iter()
    .collect();

    let request = CalibrationRequest::new(detected.clone(), real.clone(), bent.clone());
    let err = HomographyComposer::default().compose(&request).unwrap_err();
    assert!(matches!(err, GeometryError::SingularMatrix { .. }), "{err:?}");

    let payload = CorrectionRequestPayload {
        detected_markers: (&detected).into(),
        real_markers: (&real).into(),
        projected_markers: (&bent).into(),
    };
    let err = compute_correction(&payload, &EstimatorParams::default()).unwrap_err();
    assert!(matches!(
        err,
        CalibrationError::Geometry(GeometryError::SingularMatrix { .. })
    ));
    assert_eq!(err.class(), ErrorClass::Numerical);
    assert_eq!(err.status_code(), 500);
}
