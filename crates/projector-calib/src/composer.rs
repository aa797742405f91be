//! Three-frame projector correction as an ordered list of named stages.
//!
//! The default pipeline ([`CompositionPipeline::projector_correction`]):
//!
//! | stage | value |
//! |---|---|
//! | `real_to_camera` | `Estimate(real -> detected)` |
//! | `projector_detected_to_camera` | `Estimate(expected_projected -> detected)` |
//! | `projector_corrected_to_real` | `Identity` |
//! | `projector_corrected_to_camera` | `real_to_camera ∘ projector_corrected_to_real` |
//! | `camera_to_projector_detected` | `Invert(projector_detected_to_camera)` |
//! | `correction` | `camera_to_projector_detected ∘ projector_corrected_to_camera` |
//!
//! `projector_corrected_to_real` assumes the expected-projected markers are
//! already expressed in the real frame. Nothing checks units or scale.

use std::collections::HashMap;

use log::{debug, warn};
use projector_calib_core::{
    CorrespondenceSet, EstimatorParams, GeometryError, Homography, HomographyEstimator,
};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

pub const REAL_TO_CAMERA: &str = "real_to_camera";
pub const PROJECTOR_DETECTED_TO_CAMERA: &str = "projector_detected_to_camera";
pub const PROJECTOR_CORRECTED_TO_REAL: &str = "projector_corrected_to_real";
pub const PROJECTOR_CORRECTED_TO_CAMERA: &str = "projector_corrected_to_camera";
pub const CAMERA_TO_PROJECTOR_DETECTED: &str = "camera_to_projector_detected";
pub const CORRECTION: &str = "correction";

/// One observation frame of a [`CalibrationRequest`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frame {
    /// Camera pixels.
    Detected,
    /// Physical scene.
    Real,
    /// Projector design space.
    ExpectedProjected,
}

/// The three marker observations of one calibration.
///
/// `real` and `expected_projected` share one coordinate convention.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CalibrationRequest {
    pub detected: CorrespondenceSet,
    pub real: CorrespondenceSet,
    pub expected_projected: CorrespondenceSet,
}

impl CalibrationRequest {
    pub fn new(
        detected: CorrespondenceSet,
        real: CorrespondenceSet,
        expected_projected: CorrespondenceSet,
    ) -> Self {
        Self {
            detected,
            real,
            expected_projected,
        }
    }

    pub fn frame(&self, frame: Frame) -> &CorrespondenceSet {
        match frame {
            Frame::Detected => &self.detected,
            Frame::Real => &self.real,
            Frame::ExpectedProjected => &self.expected_projected,
        }
    }
}

/// Maps the as-designed projector image plane to the corrected plane the
/// projector should emit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CorrectionResult {
    pub correction: Homography,
}

/// How a stage produces its homography.
#[derive(Clone, Debug, PartialEq)]
pub enum StageKind {
    /// Fit `source -> destination` from the request's correspondences.
    Estimate { source: Frame, destination: Frame },
    Identity,
    /// `outer ∘ inner` of two earlier stages.
    Compose { outer: String, inner: String },
    /// Checked inverse of an earlier stage.
    Invert { input: String },
}

impl StageKind {
    fn references(&self) -> Vec<&str> {
        match self {
            Self::Estimate { .. } | Self::Identity => Vec::new(),
            Self::Compose { outer, inner } => vec![outer, inner],
            Self::Invert { input } => vec![input],
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Stage {
    pub name: String,
    pub kind: StageKind,
}

impl Stage {
    pub fn estimate(name: impl Into<String>, source: Frame, destination: Frame) -> Self {
        Self {
            name: name.into(),
            kind: StageKind::Estimate {
                source,
                destination,
            },
        }
    }

    pub fn identity(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: StageKind::Identity,
        }
    }

    pub fn compose(name: impl Into<String>, outer: impl Into<String>, inner: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: StageKind::Compose {
                outer: outer.into(),
                inner: inner.into(),
            },
        }
    }

    pub fn invert(name: impl Into<String>, input: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: StageKind::Invert {
                input: input.into(),
            },
        }
    }
}

/// Rejected pipeline layout.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error("stage name {0:?} is used more than once")]
    DuplicateStage(String),
    #[error("stage {stage:?} refers to {reference:?}, which is not an earlier stage")]
    UnknownReference { stage: String, reference: String },
    #[error("output stage {0:?} is not part of the pipeline")]
    MissingOutput(String),
    #[error("no stage named {0:?}")]
    NoSuchStage(String),
}

/// Ordered, validated list of stages with a designated output stage.
///
/// Every reference points at an earlier stage, so running the stages in order
/// always finds its inputs.
#[derive(Clone, Debug, PartialEq)]
pub struct CompositionPipeline {
    stages: Vec<Stage>,
    output: String,
}

impl CompositionPipeline {
    pub fn new(stages: Vec<Stage>, output: impl Into<String>) -> Result<Self, PipelineError> {
        let pipeline = Self {
            stages,
            output: output.into(),
        };
        pipeline.check()?;
        Ok(pipeline)
    }

    /// The projector correction pipeline described in the module docs.
    pub fn projector_correction() -> Self {
        Self {
            stages: vec![
                Stage::estimate(REAL_TO_CAMERA, Frame::Real, Frame::Detected),
                Stage::estimate(
                    PROJECTOR_DETECTED_TO_CAMERA,
                    Frame::ExpectedProjected,
                    Frame::Detected,
                ),
                Stage::identity(PROJECTOR_CORRECTED_TO_REAL),
                Stage::compose(
                    PROJECTOR_CORRECTED_TO_CAMERA,
                    REAL_TO_CAMERA,
                    PROJECTOR_CORRECTED_TO_REAL,
                ),
                Stage::invert(CAMERA_TO_PROJECTOR_DETECTED, PROJECTOR_DETECTED_TO_CAMERA),
                Stage::compose(
                    CORRECTION,
                    CAMERA_TO_PROJECTOR_DETECTED,
                    PROJECTOR_CORRECTED_TO_CAMERA,
                ),
            ],
            output: CORRECTION.to_string(),
        }
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn stage_names(&self) -> impl Iterator<Item = &str> {
        self.stages.iter().map(|s| s.name.as_str())
    }

    /// Append a stage; with `as_output` it becomes the pipeline result.
    pub fn push(&mut self, stage: Stage, as_output: bool) -> Result<(), PipelineError> {
        let mut next = self.clone();
        if as_output {
            next.output = stage.name.clone();
        }
        next.stages.push(stage);
        next.check()?;
        *self = next;
        Ok(())
    }

    /// Insert a stage right before the stage named `before`.
    pub fn insert_before(&mut self, before: &str, stage: Stage) -> Result<(), PipelineError> {
        let idx = self
            .stages
            .iter()
            .position(|s| s.name == before)
            .ok_or_else(|| PipelineError::NoSuchStage(before.to_string()))?;
        let mut next = self.clone();
        next.stages.insert(idx, stage);
        next.check()?;
        *self = next;
        Ok(())
    }

    /// Replace how an existing stage is computed, keeping its name and position.
    pub fn replace(&mut self, name: &str, kind: StageKind) -> Result<(), PipelineError> {
        let mut next = self.clone();
        let stage = next
            .stages
            .iter_mut()
            .find(|s| s.name == name)
            .ok_or_else(|| PipelineError::NoSuchStage(name.to_string()))?;
        stage.kind = kind;
        next.check()?;
        *self = next;
        Ok(())
    }

    fn check(&self) -> Result<(), PipelineError> {
        let mut seen: Vec<&str> = Vec::with_capacity(self.stages.len());
        for stage in &self.stages {
            if seen.contains(&stage.name.as_str()) {
                return Err(PipelineError::DuplicateStage(stage.name.clone()));
            }
            for reference in stage.kind.references() {
                if !seen.contains(&reference) {
                    return Err(PipelineError::UnknownReference {
                        stage: stage.name.clone(),
                        reference: reference.to_string(),
                    });
                }
            }
            seen.push(&stage.name);
        }
        if !seen.contains(&self.output.as_str()) {
            return Err(PipelineError::MissingOutput(self.output.clone()));
        }
        Ok(())
    }

    /// Run every stage and return the output stage's homography.
    pub fn run(
        &self,
        request: &CalibrationRequest,
        estimator: &HomographyEstimator,
    ) -> Result<CorrectionResult, GeometryError> {
        self.run_traced(request, estimator)
            .map(|trace| CorrectionResult {
                correction: trace.correction,
            })
    }

    /// Like [`Self::run`], also returning every intermediate homography.
    ///
    /// The first failing stage aborts the run with its own error.
    pub fn run_traced(
        &self,
        request: &CalibrationRequest,
        estimator: &HomographyEstimator,
    ) -> Result<PipelineTrace, GeometryError> {
        let tol = estimator.params().singular_tolerance;
        let mut values: HashMap<&str, Homography> = HashMap::with_capacity(self.stages.len());
        let mut trace = Vec::with_capacity(self.stages.len());

        for stage in &self.stages {
            let result = match &stage.kind {
                StageKind::Estimate {
                    source,
                    destination,
                } => estimator.estimate(request.frame(*source), request.frame(*destination)),
                StageKind::Identity => Ok(Homography::identity()),
                StageKind::Compose { outer, inner } => {
                    lookup(&values, outer)?.compose(&lookup(&values, inner)?)
                }
                StageKind::Invert { input } => lookup(&values, input)?.try_inverse(tol),
            };
            let h = result.inspect_err(|e| warn!("stage {} failed: {e}", stage.name))?;
            debug!("stage {}: {:?}", stage.name, h.to_array());
            values.insert(&stage.name, h);
            trace.push((stage.name.clone(), h));
        }

        Ok(PipelineTrace {
            correction: lookup(&values, &self.output)?,
            stages: trace,
        })
    }
}

impl Default for CompositionPipeline {
    fn default() -> Self {
        Self::projector_correction()
    }
}

fn lookup(values: &HashMap<&str, Homography>, name: &str) -> Result<Homography, GeometryError> {
    values
        .get(name)
        .copied()
        .ok_or_else(|| GeometryError::InvalidTransform {
            reason: format!("stage {name:?} has not been computed"),
        })
}

/// Intermediate results of a pipeline run, in stage order.
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineTrace {
    pub stages: Vec<(String, Homography)>,
    pub correction: Homography,
}

impl PipelineTrace {
    pub fn get(&self, name: &str) -> Option<&Homography> {
        self.stages.iter().find(|(n, _)| n == name).map(|(_, h)| h)
    }
}

/// Computes the projector correction for a [`CalibrationRequest`].
#[derive(Clone, Debug, Default)]
pub struct HomographyComposer {
    estimator: HomographyEstimator,
    pipeline: CompositionPipeline,
}

impl HomographyComposer {
    pub fn new(params: EstimatorParams) -> Self {
        Self {
            estimator: HomographyEstimator::new(params),
            pipeline: CompositionPipeline::projector_correction(),
        }
    }

    pub fn with_pipeline(params: EstimatorParams, pipeline: CompositionPipeline) -> Self {
        Self {
            estimator: HomographyEstimator::new(params),
            pipeline,
        }
    }

    pub fn pipeline(&self) -> &CompositionPipeline {
        &self.pipeline
    }

    pub fn estimator(&self) -> &HomographyEstimator {
        &self.estimator
    }

    #[cfg_attr(
        feature = "tracing",
        instrument(
            level = "info",
            skip(self, request),
            fields(
                detected = request.detected.len(),
                real = request.real.len(),
                expected_projected = request.expected_projected.len()
            )
        )
    )]
    pub fn compose(&self, request: &CalibrationRequest) -> Result<CorrectionResult, GeometryError> {
        self.pipeline.run(request, &self.estimator)
    }

    pub fn compose_traced(&self, request: &CalibrationRequest) -> Result<PipelineTrace, GeometryError> {
        self.pipeline.run_traced(request, &self.estimator)
    }
}
