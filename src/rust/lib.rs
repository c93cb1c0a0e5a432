//! Plant leaf disease classification with an ONNX backend and a demo-mode
//! fallback.
//!
//! # Basic Usage
//!
//! ```no_run
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use agrodetect::{recommendations_for, HubConfig, InferenceConnector};
//!
//! let connector = InferenceConnector::from_hub(HubConfig::default());
//! let image = image::open("leaf.jpg")?;
//!
//! let (valid, reason) = connector.validate(Some(&image));
//! if !valid {
//!     println!("{}", reason);
//!     return Ok(());
//! }
//!
//! let result = connector.classify(&image).await?;
//! if result.is_simulated() {
//!     println!("Demo mode: this result is not a real diagnosis");
//! }
//! println!("{}", result.summary());
//! let advice = recommendations_for(result.predicted_label());
//! println!("{} ({})", advice.message, advice.severity);
//! # Ok(())
//! # }
//! ```
//!
//! # Fallback
//!
//! When ONNX Runtime is missing, the model cannot be downloaded, or the
//! forward pass fails, `classify` still returns a well-formed result with
//! `is_simulated` set. Only validation failures are errors.

pub mod classifier;
pub mod connector;
pub mod disease;
pub mod model_manager;
pub mod recommendations;
mod runtime;

pub use classifier::{
    validate, validate_image, ImageModel, ImagePreprocessor, InferenceError, InferenceStrategy,
    ModelHandle, PredictionResult, RealInference, SimulatedInference, ValidationError,
};
pub use connector::{
    Classification, ConnectorConfig, HubConfig, HubModelSource, InferenceConnector, InferencePath,
    ModelCache, ModelSource,
};
pub use disease::{dataset_info, DatasetInfo, DiseaseClass};
pub use model_manager::{ModelError, ModelInfo, ModelManager};
pub use recommendations::{recommendations_for, recommendations_for_class, RecommendationRecord, Severity};
pub use runtime::{create_session_builder, ensure_initialized, is_available as runtime_available, RuntimeConfig};

pub fn init_logger() {
    env_logger::init();
}
