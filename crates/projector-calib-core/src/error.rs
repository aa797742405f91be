/// Errors produced by homography estimation, composition and validation.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    /// Too few shared point pairs, or every point on one line.
    #[error("degenerate correspondences ({point_pairs} point pairs): {reason}")]
    DegenerateCorrespondence {
        point_pairs: usize,
        reason: &'static str,
    },

    /// A linear system or matrix inverse has no stable solution.
    #[error("singular matrix in {operation}")]
    SingularMatrix { operation: &'static str },

    /// A supplied or produced transform is not a finite 3x3 matrix.
    #[error("invalid transform: {reason}")]
    InvalidTransform { reason: String },
}

impl GeometryError {
    pub(crate) fn degenerate(point_pairs: usize, reason: &'static str) -> Self {
        Self::DegenerateCorrespondence {
            point_pairs,
            reason,
        }
    }

    pub(crate) fn singular(operation: &'static str) -> Self {
        Self::SingularMatrix { operation }
    }

    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidTransform {
            reason: reason.into(),
        }
    }
}
