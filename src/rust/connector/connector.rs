use std::sync::Arc;
use std::time::Duration;

use image::DynamicImage;
use log::{error, info, warn};

use super::cache::ModelCache;
use super::source::{HubConfig, HubModelSource, ModelSource};
use crate::classifier::{
    validate, validate_image, InferenceError, InferenceStrategy, ModelHandle, PredictionResult,
    RealInference, SimulatedInference, ValidationError,
};

#[derive(Debug, Clone)]
pub struct ConnectorConfig {
    /// Upper bound on a single model acquisition, download included
    pub acquire_timeout: Duration,
    /// How long a failed acquisition is remembered before retrying
    pub retry_after: Duration,
    /// Skip the model entirely and always use the fallback
    pub force_simulated: bool,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            acquire_timeout: Duration::from_secs(120),
            retry_after: Duration::from_secs(300),
            force_simulated: false,
        }
    }
}

/// Which path produced a prediction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InferencePath {
    /// The model classified the image
    Model,
    /// No model could be acquired
    ModelUnavailable,
    /// The model was available but failed on this image
    ModelFailed(String),
    /// Demo mode was requested in the configuration
    Forced,
}

/// A prediction together with the path that produced it.
#[derive(Debug, Clone)]
pub struct Classification {
    pub result: PredictionResult,
    pub path: InferencePath,
}

/// Entry point for classifying leaf images.
///
/// Owns its model cache, the source the model comes from and the fallback
/// strategy. Every validated image yields a [`PredictionResult`]: model
/// output when possible, otherwise a flagged simulated result.
pub struct InferenceConnector {
    config: ConnectorConfig,
    cache: ModelCache,
    source: Arc<dyn ModelSource>,
    fallback: Arc<dyn InferenceStrategy>,
}

// Compile-time verification of thread-safety
const _: () = {
    fn assert_send_sync<T: Send + Sync>() {}
    fn verify_thread_safety() {
        assert_send_sync::<InferenceConnector>();
    }
};

impl InferenceConnector {
    pub fn new(source: Arc<dyn ModelSource>) -> Self {
        let config = ConnectorConfig::default();
        Self {
            cache: ModelCache::new(config.retry_after),
            config,
            source,
            fallback: Arc::new(SimulatedInference::new()),
        }
    }

    /// Connector fetching the default model from the hub.
    pub fn from_hub(config: HubConfig) -> Self {
        Self::new(Arc::new(HubModelSource::new(config)))
    }

    /// Replaces the configuration. Also resets the model cache.
    pub fn with_config(mut self, config: ConnectorConfig) -> Self {
        self.cache = ModelCache::new(config.retry_after);
        self.config = config;
        self
    }

    /// Replaces the strategy used when the model cannot be used.
    pub fn with_fallback(mut self, fallback: Arc<dyn InferenceStrategy>) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn config(&self) -> &ConnectorConfig {
        &self.config
    }

    pub fn validate(&self, image: Option<&DynamicImage>) -> (bool, String) {
        validate(image)
    }

    /// Returns the model, fetching it on first use. `None` means the
    /// model is unavailable and predictions will be simulated.
    pub async fn acquire_model(&self) -> Option<Arc<ModelHandle>> {
        if self.config.force_simulated {
            return None;
        }
        self.cache
            .get_or_acquire(self.source.as_ref(), self.config.acquire_timeout)
            .await
    }

    pub async fn is_model_available(&self) -> bool {
        self.acquire_model().await.is_some()
    }

    pub fn clear_model_cache(&self) {
        self.cache.clear();
    }

    /// Validates and classifies an image. Only validation failures are
    /// reported as errors.
    pub async fn classify(&self, image: &DynamicImage) -> Result<PredictionResult, ValidationError> {
        self.classify_detailed(image).await.map(|c| c.result)
    }

    /// Like [`classify`](Self::classify), but also reports which path
    /// produced the result.
    pub async fn classify_detailed(&self, image: &DynamicImage) -> Result<Classification, ValidationError> {
        validate_image(Some(image))?;

        if self.config.force_simulated {
            return Ok(self.degrade(image, InferencePath::Forced));
        }

        let handle = match self.acquire_model().await {
            Some(handle) => handle,
            None => return Ok(self.degrade(image, InferencePath::ModelUnavailable)),
        };

        match Self::run_model(handle, image).await {
            Ok(result) => Ok(Classification {
                result,
                path: InferencePath::Model,
            }),
            Err(e) => {
                warn!("Model inference failed, falling back to demo mode: {}", e);
                Ok(self.degrade(image, InferencePath::ModelFailed(e.to_string())))
            }
        }
    }

    /// Preprocessing and the forward pass are CPU bound, so they run on the
    /// blocking pool.
    async fn run_model(handle: Arc<ModelHandle>, image: &DynamicImage) -> Result<PredictionResult, InferenceError> {
        let image = image.clone();
        tokio::task::spawn_blocking(move || RealInference::new(handle).predict(&image))
            .await
            .map_err(|e| InferenceError::Model(format!("Inference task failed: {}", e)))?
    }

    fn degrade(&self, image: &DynamicImage, path: InferencePath) -> Classification {
        info!("Using {} inference ({:?})", self.fallback.name(), path);
        let mut result = match self.fallback.predict(image) {
            Ok(result) => result,
            Err(e) => {
                error!("Fallback '{}' failed, using built-in demo mode: {}", self.fallback.name(), e);
                SimulatedInference::new().simulate(image)
            }
        };
        result.mark_simulated();
        Classification { result, path }
    }
}
