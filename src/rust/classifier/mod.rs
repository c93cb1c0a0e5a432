mod error;
mod model;
mod prediction;
mod preprocess;
mod simulated;
mod strategy;
mod utils;
mod validation;

pub use error::{InferenceError, ValidationError};
pub use model::{ImageModel, ModelHandle, OnnxImageModel};
pub use prediction::PredictionResult;
pub use preprocess::{ImagePreprocessor, ImageSize};
pub use simulated::{SimulatedInference, CONFIDENCE_FLOOR};
pub use strategy::{InferenceStrategy, RealInference};
pub use validation::{color_mode_name, validate, validate_image, MIN_IMAGE_SIDE, VALID_MESSAGE};
