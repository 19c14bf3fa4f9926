use crate::annotation::AnnotationId;
use crate::geometry::Point3;

use thiserror::Error;

/// Failures of a tool operation. Each one aborts the operation for the
/// annotation involved and leaves every other annotation untouched.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Stack viewports are not supported, the tool needs a volume viewport")]
    NotSupportedOnStackViewport,

    #[error("No acquisition plane matches the view plane normal {0:?}")]
    NoAcquisitionPlane(Point3),

    #[error("Start slice does not match: annotation starts at {expected} but its first corner lies on slice {actual}")]
    GeometryMismatch { expected: usize, actual: i64 },

    #[error("Volume {0} is not loaded")]
    VolumeNotLoaded(String),

    #[error("Annotation {0} not found")]
    AnnotationNotFound(AnnotationId),
}
