use thiserror::Error;

/// Failure classes of the cloud rendering core.
///
/// None of these cross the pipeline boundary: the frame hook converts them
/// into a pass-through of the source image for that frame.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum VolkenError {
    #[error("missing dependency: {0}")]
    MissingDependency(String),

    #[error("invalid parameter {name} = {value}")]
    InvalidParameter { name: &'static str, value: f32 },

    #[error("render target allocation failed: {0}")]
    ResourceAllocation(String),
}
