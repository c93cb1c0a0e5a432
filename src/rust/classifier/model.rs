use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use log::info;
use ndarray::{Array1, Array4};
use ort::session::Session;
use ort::value::Tensor;

use super::error::InferenceError;
use super::preprocess::ImagePreprocessor;
use crate::model_manager::ModelError;
use crate::runtime::{create_session_builder, RuntimeConfig};

/// A forward pass from a preprocessed image tensor to raw class scores.
pub trait ImageModel: Send + Sync {
    /// Runs the model on a `[1, 3, H, W]` tensor and returns one logit
    /// per output class.
    fn forward(&self, pixel_values: Array4<f32>) -> Result<Array1<f32>, InferenceError>;
}

/// Image classifier backed by an ONNX Runtime session.
///
/// The model is expected to:
/// - Accept a single float tensor (usually named `pixel_values`) of shape
///   `[batch_size, 3, height, width]`
/// - Output logits of shape `[batch_size, num_classes]` as its first output
#[derive(Debug)]
pub struct OnnxImageModel {
    session: Session,
    input_name: String,
}

impl OnnxImageModel {
    pub fn from_file<P: AsRef<Path>>(path: P, config: &RuntimeConfig) -> Result<Self, ModelError> {
        let session = create_session_builder(config)?.commit_from_file(path.as_ref())?;
        Self::validate_model(&session)?;
        info!("Model structure validated successfully");

        let input_name = session.inputs[0].name.clone();
        Ok(Self { session, input_name })
    }

    /// Checks that the model has at least one input and one output.
    fn validate_model(session: &Session) -> Result<(), ModelError> {
        if session.inputs.is_empty() {
            return Err(ModelError::InvalidModel(
                "Model must have an image input tensor".to_string(),
            ));
        }
        if session.outputs.is_empty() {
            return Err(ModelError::InvalidModel(
                "Model must have at least 1 output for logits".to_string(),
            ));
        }
        Ok(())
    }
}

impl ImageModel for OnnxImageModel {
    fn forward(&self, pixel_values: Array4<f32>) -> Result<Array1<f32>, InferenceError> {
        let input_dyn = pixel_values.into_dyn();
        let input = input_dyn.as_standard_layout();

        let mut input_tensors = HashMap::new();
        input_tensors.insert(
            self.input_name.as_str(),
            Tensor::from_array(&input)
                .map_err(|e| InferenceError::Model(format!("Failed to create input tensor: {}", e)))?,
        );

        let outputs = self
            .session
            .run(input_tensors)
            .map_err(|e| InferenceError::Model(format!("Failed to run model: {}", e)))?;
        let logits = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| InferenceError::Model(format!("Failed to extract output tensor: {}", e)))?;

        let shape = logits.shape();
        if shape.len() > 2 || (shape.len() == 2 && shape[0] != 1) {
            return Err(InferenceError::Model(format!(
                "Expected logits of shape [1, num_classes], got {:?}",
                shape
            )));
        }
        Ok(logits.iter().cloned().collect())
    }
}

/// The loaded `(preprocessor, classifier)` pair.
///
/// Built once per process (or per cache), then shared read-only behind
/// an `Arc`.
pub struct ModelHandle {
    pub name: String,
    pub preprocessor: ImagePreprocessor,
    pub model: Arc<dyn ImageModel>,
}

impl ModelHandle {
    pub fn new(name: impl Into<String>, preprocessor: ImagePreprocessor, model: Arc<dyn ImageModel>) -> Self {
        Self {
            name: name.into(),
            preprocessor,
            model,
        }
    }
}

impl fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelHandle")
            .field("name", &self.name)
            .field("preprocessor", &self.preprocessor)
            .finish_non_exhaustive()
    }
}

// Compile-time verification of thread-safety
const _: () = {
    fn assert_send_sync<T: Send + Sync>() {}
    fn verify_thread_safety() {
        assert_send_sync::<ModelHandle>();
        assert_send_sync::<OnnxImageModel>();
    }
};
