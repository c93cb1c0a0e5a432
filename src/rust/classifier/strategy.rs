use std::sync::Arc;

use image::DynamicImage;
use log::debug;
use ndarray::Array1;

use super::error::InferenceError;
use super::model::ModelHandle;
use super::prediction::PredictionResult;
use super::utils::softmax;
use crate::disease::DiseaseClass;

/// One way of turning a validated image into a prediction.
///
/// The connector picks the implementation per call: [`RealInference`] when a
/// model is available, otherwise its fallback (by default
/// [`SimulatedInference`](super::SimulatedInference)).
pub trait InferenceStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn predict(&self, image: &DynamicImage) -> Result<PredictionResult, InferenceError>;
}

/// Classification through the loaded model.
#[derive(Debug, Clone)]
pub struct RealInference {
    handle: Arc<ModelHandle>,
}

impl RealInference {
    pub fn new(handle: Arc<ModelHandle>) -> Self {
        Self { handle }
    }

    pub fn handle(&self) -> &Arc<ModelHandle> {
        &self.handle
    }
}

impl InferenceStrategy for RealInference {
    fn name(&self) -> &'static str {
        "model"
    }

    fn predict(&self, image: &DynamicImage) -> Result<PredictionResult, InferenceError> {
        let pixel_values = self.handle.preprocessor.preprocess(image);
        debug!("Running '{}' on tensor of shape {:?}", self.handle.name, pixel_values.shape());

        let logits: Array1<f32> = self.handle.model.forward(pixel_values)?;
        if logits.len() != DiseaseClass::COUNT {
            return Err(InferenceError::OutputShape {
                expected: DiseaseClass::COUNT,
                actual: logits.len(),
            });
        }
        if logits.iter().any(|l| !l.is_finite()) {
            return Err(InferenceError::InvalidProbabilities("model returned non-finite logits".into()));
        }

        let probabilities = softmax(&logits);
        PredictionResult::from_probabilities(probabilities.to_vec(), false)
    }
}
