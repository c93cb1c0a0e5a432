use ort::Error as OrtError;

/// Reasons an image is rejected before any inference work starts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("No image provided")]
    NoImage,
    #[error("Image is too small. Please upload a larger image (minimum {min}x{min} pixels)")]
    TooSmall { width: u32, height: u32, min: u32 },
    #[error("Unsupported image mode: {0}. Please upload RGB images")]
    UnsupportedMode(String),
}

/// Represents the different ways a single inference call can fail.
///
/// These never reach callers of the connector; they select the
/// simulated path and are logged.
#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    /// The image could not be turned into model input
    #[error("Preprocessing error: {0}")]
    Preprocessing(String),
    /// The runtime rejected the input or failed during the forward pass
    #[error("Model error: {0}")]
    Model(String),
    /// The model produced a vector that does not line up with the vocabulary
    #[error("Model returned {actual} scores, expected {expected}")]
    OutputShape { expected: usize, actual: usize },
    /// Scores or probabilities contain NaN, infinities, negatives or sum to zero
    #[error("Invalid probabilities: {0}")]
    InvalidProbabilities(String),
}

impl From<OrtError> for InferenceError {
    fn from(err: OrtError) -> Self {
        InferenceError::Model(err.to_string())
    }
}
